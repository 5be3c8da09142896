//! Remote content store abstraction.
//!
//! The coordinator only talks to [`RemoteContentGateway`]. Implementations
//! report failures as [`SyncError`]; callers treat every error the same way
//! (retry, then fall back to the local copy).

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use super::types::ContentCollection;
use crate::content::{ContentItem, Notification, Profile};
use crate::error::SyncError;

#[async_trait]
pub trait RemoteContentGateway: Send + Sync {
    /// False when credentials are missing. An unconfigured gateway is
    /// never called.
    fn is_configured(&self) -> bool {
        true
    }

    async fn fetch_collection(
        &self,
        collection: ContentCollection,
    ) -> Result<Vec<ContentItem>, SyncError>;

    async fn save_collection(
        &self,
        collection: ContentCollection,
        items: &[ContentItem],
    ) -> Result<(), SyncError>;

    /// `Ok(None)` when the remote has no profile with this id.
    async fn fetch_profile(&self, id: &str) -> Result<Option<Profile>, SyncError>;

    async fn save_profile(&self, profile: &Profile) -> Result<(), SyncError>;

    async fn fetch_leaderboard(&self) -> Result<Vec<Profile>, SyncError>;

    async fn fetch_notifications(&self) -> Result<Vec<Notification>, SyncError>;
}

/// Gateway for running without a backend. Every call fails with
/// [`SyncError::NotConfigured`].
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineGateway;

#[async_trait]
impl RemoteContentGateway for OfflineGateway {
    fn is_configured(&self) -> bool {
        false
    }

    async fn fetch_collection(&self, _: ContentCollection) -> Result<Vec<ContentItem>, SyncError> {
        Err(SyncError::NotConfigured)
    }

    async fn save_collection(&self, _: ContentCollection, _: &[ContentItem]) -> Result<(), SyncError> {
        Err(SyncError::NotConfigured)
    }

    async fn fetch_profile(&self, _: &str) -> Result<Option<Profile>, SyncError> {
        Err(SyncError::NotConfigured)
    }

    async fn save_profile(&self, _: &Profile) -> Result<(), SyncError> {
        Err(SyncError::NotConfigured)
    }

    async fn fetch_leaderboard(&self) -> Result<Vec<Profile>, SyncError> {
        Err(SyncError::NotConfigured)
    }

    async fn fetch_notifications(&self) -> Result<Vec<Notification>, SyncError> {
        Err(SyncError::NotConfigured)
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    collections: BTreeMap<ContentCollection, Vec<ContentItem>>,
    profiles: BTreeMap<String, Profile>,
    notifications: Vec<Notification>,
    failing: BTreeSet<&'static str>,
}

/// In-process remote store. Useful for demos and tests: it keeps what is
/// saved, counts calls, and can be told to fail.
#[derive(Debug, Default)]
pub struct MemoryGateway {
    state: Mutex<MemoryState>,
    offline: AtomicBool,
    reject_saves: AtomicBool,
    fetches: AtomicUsize,
    saves: AtomicUsize,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn with_collection(self, collection: ContentCollection, items: Vec<ContentItem>) -> Self {
        self.state().collections.insert(collection, items);
        self
    }

    pub fn with_profile(self, profile: Profile) -> Self {
        self.state().profiles.insert(profile.id.clone(), profile);
        self
    }

    pub fn with_notifications(self, notifications: Vec<Notification>) -> Self {
        self.state().notifications = notifications;
        self
    }

    /// Make every call fail as if the network were down.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Make every save fail while fetches keep working.
    pub fn set_reject_saves(&self, reject: bool) {
        self.reject_saves.store(reject, Ordering::SeqCst);
    }

    /// Make calls touching `name` fail (a collection's remote name,
    /// "profile", "leaderboard" or "notifications").
    pub fn fail(&self, name: &'static str) {
        self.state().failing.insert(name);
    }

    pub fn recover(&self, name: &'static str) {
        self.state().failing.remove(name);
    }

    pub fn collection(&self, collection: ContentCollection) -> Option<Vec<ContentItem>> {
        self.state().collections.get(&collection).cloned()
    }

    pub fn set_collection(&self, collection: ContentCollection, items: Vec<ContentItem>) {
        self.state().collections.insert(collection, items);
    }

    pub fn profile(&self, id: &str) -> Option<Profile> {
        self.state().profiles.get(id).cloned()
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    fn check(&self, name: &'static str) -> Result<(), SyncError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(SyncError::Transient("remote unreachable".to_string()));
        }
        if self.state().failing.contains(name) {
            return Err(SyncError::Status {
                status: 503,
                endpoint: name.to_string(),
            });
        }
        Ok(())
    }

    fn fetched(&self, name: &'static str) -> Result<(), SyncError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.check(name)
    }

    fn saved(&self, name: &'static str) -> Result<(), SyncError> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        if self.reject_saves.load(Ordering::SeqCst) {
            return Err(SyncError::Status {
                status: 403,
                endpoint: name.to_string(),
            });
        }
        self.check(name)
    }
}

#[async_trait]
impl RemoteContentGateway for MemoryGateway {
    async fn fetch_collection(
        &self,
        collection: ContentCollection,
    ) -> Result<Vec<ContentItem>, SyncError> {
        self.fetched(collection.remote_name())?;
        Ok(self.state().collections.get(&collection).cloned().unwrap_or_default())
    }

    async fn save_collection(
        &self,
        collection: ContentCollection,
        items: &[ContentItem],
    ) -> Result<(), SyncError> {
        self.saved(collection.remote_name())?;
        self.state().collections.insert(collection, items.to_vec());
        Ok(())
    }

    async fn fetch_profile(&self, id: &str) -> Result<Option<Profile>, SyncError> {
        self.fetched("profile")?;
        Ok(self.state().profiles.get(id).cloned())
    }

    async fn save_profile(&self, profile: &Profile) -> Result<(), SyncError> {
        self.saved("profile")?;
        self.state().profiles.insert(profile.id.clone(), profile.clone());
        Ok(())
    }

    async fn fetch_leaderboard(&self) -> Result<Vec<Profile>, SyncError> {
        self.fetched("leaderboard")?;
        Ok(self
            .state()
            .profiles
            .values()
            .map(|p| Profile {
                progress: None,
                ..p.clone()
            })
            .collect())
    }

    async fn fetch_notifications(&self) -> Result<Vec<Notification>, SyncError> {
        self.fetched("notifications")?;
        Ok(self.state().notifications.clone())
    }
}
