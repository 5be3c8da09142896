//! Core types for progress and content synchronization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::progress::identity::TabId;
use crate::storage::StorageKey;

/// Content collections served by the remote store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentCollection {
    Modules,
    Materials,
    Streams,
    Events,
    Scenarios,
}

impl ContentCollection {
    pub const ALL: [ContentCollection; 5] = [
        ContentCollection::Modules,
        ContentCollection::Materials,
        ContentCollection::Streams,
        ContentCollection::Events,
        ContentCollection::Scenarios,
    ];

    /// Name used by the remote store.
    pub fn remote_name(&self) -> &'static str {
        match self {
            ContentCollection::Modules => "modules",
            ContentCollection::Materials => "materials",
            ContentCollection::Streams => "streams",
            ContentCollection::Events => "events",
            ContentCollection::Scenarios => "scenarios",
        }
    }

    pub fn storage_key(&self) -> StorageKey {
        match self {
            ContentCollection::Modules => StorageKey::CourseModules,
            ContentCollection::Materials => StorageKey::Materials,
            ContentCollection::Streams => StorageKey::Streams,
            ContentCollection::Events => StorageKey::Events,
            ContentCollection::Scenarios => StorageKey::Scenarios,
        }
    }
}

impl std::str::FromStr for ContentCollection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ContentCollection::ALL
            .into_iter()
            .find(|c| c.remote_name() == s)
            .ok_or_else(|| format!("unknown collection: {s}"))
    }
}

/// Everything the coordinator reconciles. Serialized as its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Collection {
    Content(ContentCollection),
    Notifications,
    Leaderboard,
    Profile,
}

impl Collection {
    pub fn all() -> Vec<Collection> {
        let mut all = vec![Collection::Profile];
        all.extend(ContentCollection::ALL.into_iter().map(Collection::Content));
        all.push(Collection::Leaderboard);
        all.push(Collection::Notifications);
        all
    }

    pub fn name(&self) -> &'static str {
        match self {
            Collection::Content(c) => c.remote_name(),
            Collection::Notifications => "notifications",
            Collection::Leaderboard => "leaderboard",
            Collection::Profile => "profile",
        }
    }

    pub fn storage_key(&self) -> StorageKey {
        match self {
            Collection::Content(c) => c.storage_key(),
            Collection::Notifications => StorageKey::LocalNotifications,
            Collection::Leaderboard => StorageKey::AllUsers,
            Collection::Profile => StorageKey::Progress,
        }
    }
}

impl std::str::FromStr for Collection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Collection::all()
            .into_iter()
            .find(|c| c.name() == s)
            .ok_or_else(|| format!("unknown collection: {s}"))
    }
}

impl From<Collection> for String {
    fn from(c: Collection) -> Self {
        c.name().to_string()
    }
}

impl TryFrom<String> for Collection {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<ContentCollection> for Collection {
    fn from(c: ContentCollection) -> Self {
        Collection::Content(c)
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Local and remote view of one collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncEnvelope {
    pub collection: Collection,
    /// What the UI reads: the cached copy, or the seed when never cached.
    pub local_snapshot: serde_json::Value,
    /// Last successfully fetched remote copy, if any this session.
    pub remote_snapshot: Option<serde_json::Value>,
    pub last_attempt: Option<DateTime<Utc>>,
    pub last_success: Option<DateTime<Utc>>,
}

/// Why a sync round left the local snapshot in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "reason", content = "detail")]
pub enum KeepReason {
    /// Remote credentials are missing; nothing was requested.
    NotConfigured,
    /// The fetch failed after all retries.
    FetchFailed(String),
    /// The remote answered with nothing worth adopting.
    EmptyRemote,
    /// Local changes have not reached the remote yet.
    LocalPending,
    /// The remote copy could not be written to the local store.
    StoreFailed(String),
}

/// Per-collection result of one sync round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum CollectionOutcome {
    /// Remote copy differed and was written to the local store.
    Updated,
    /// Remote copy matched the local store.
    Unchanged,
    KeptLocal(KeepReason),
}

/// Summary of a `sync_all` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub started_at: DateTime<Utc>,
    /// Another sync was already running; nothing was done.
    pub skipped: bool,
    pub outcomes: BTreeMap<Collection, CollectionOutcome>,
}

impl SyncReport {
    pub(crate) fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            skipped: false,
            outcomes: BTreeMap::new(),
        }
    }

    pub(crate) fn skipped(started_at: DateTime<Utc>) -> Self {
        Self {
            skipped: true,
            ..Self::new(started_at)
        }
    }

    pub fn outcome(&self, collection: Collection) -> Option<&CollectionOutcome> {
        self.outcomes.get(&collection)
    }

    pub fn updated(&self) -> impl Iterator<Item = Collection> + '_ {
        self.outcomes
            .iter()
            .filter(|(_, o)| **o == CollectionOutcome::Updated)
            .map(|(c, _)| *c)
    }

    pub fn any_updated(&self) -> bool {
        self.updated().next().is_some()
    }

    /// Whether at least one collection got an answer from the remote.
    pub fn reached_remote(&self) -> bool {
        self.outcomes.values().any(|o| {
            !matches!(
                o,
                CollectionOutcome::KeptLocal(KeepReason::NotConfigured | KeepReason::FetchFailed(_))
            )
        })
    }
}

/// Current sync status.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncStatus {
    /// Last sync round that reached the remote, from any tab sharing the
    /// local store.
    pub last_sync_at: Option<DateTime<Utc>>,
    /// Number of collections with local changes not yet saved remotely,
    /// across every tab sharing the local store.
    pub pending_count: usize,
    /// Whether a sync is currently in progress.
    pub in_progress: bool,
}

/// Result of a remote save started by `push_local` or `push_user`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome", content = "detail")]
pub enum PushOutcome {
    Saved,
    /// The local write stands; the remote will be retried on the next sync.
    LocalOnly(String),
}

/// Kind of cross-tab message. Only one exists: "re-read local state".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalKind {
    #[serde(rename = "SYNC_UPDATE")]
    SyncUpdate,
}

/// Cross-tab notification. Carries no data beyond its kind and time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSignal {
    pub kind: SignalKind,
    pub timestamp: DateTime<Utc>,
    /// Publishing tab, used only to skip self-delivery.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub origin: Option<TabId>,
}
