//! Local-first sync coordinator.
//!
//! The local store is always the source of truth for the UI. The
//! coordinator:
//! - writes user changes locally first, then saves them remotely in the
//!   background (`push_local`, debounced `push_user`)
//! - periodically fetches every collection and adopts remote data unless
//!   local changes are still waiting to be saved (`sync_all`)
//! - tells other tabs to re-read local state whenever it changes
//!
//! Unsaved collections, write generations and the last sync time live in
//! the store under `syncState`, next to the data they describe. Every tab
//! and every restart on the same store sees them, so no tab adopts a
//! remote copy over another tab's unsaved write.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use super::bus::{Subscription, TabChannel};
use super::gateway::RemoteContentGateway;
use super::ledger::SyncLedger;
use super::push_queue::DebounceQueue;
use super::retry::RetryPolicy;
use super::types::{
    Collection, CollectionOutcome, ContentCollection, KeepReason, PushOutcome, SignalKind,
    SyncEnvelope, SyncReport, SyncStatus,
};
use crate::content::{ContentItem, Notification, Profile};
use crate::error::StoreError;
use crate::gamification::{normalize_record, rank_leaderboard};
use crate::progress::ProgressRecord;
use crate::storage::{LocalStore, StorageKey, StoreTxn, SyncSettings};

/// Coordinator tuning and seed content.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub retry: RetryPolicy,
    /// Period of the background sync. Zero runs a single sync on `start`.
    pub interval: Duration,
    /// Quiet period before a profile change is saved remotely.
    pub debounce: Duration,
    /// Remote profile id to use before the local record is linked.
    pub user_id: Option<String>,
    seeds: BTreeMap<ContentCollection, Vec<ContentItem>>,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self::from_settings(&SyncSettings::default())
    }
}

impl SyncOptions {
    pub fn from_settings(settings: &SyncSettings) -> Self {
        Self {
            retry: settings.retry_policy(),
            interval: settings.interval(),
            debounce: settings.debounce(),
            user_id: None,
            seeds: BTreeMap::new(),
        }
    }

    pub fn with_user_id(mut self, user_id: Option<String>) -> Self {
        self.user_id = user_id.filter(|id| !id.is_empty());
        self
    }

    /// Built-in content shown until something is cached. Seeds are never
    /// written to the store.
    pub fn with_seed(mut self, collection: ContentCollection, items: Vec<ContentItem>) -> Self {
        self.seeds.insert(collection, items);
        self
    }

    pub fn seed(&self, collection: ContentCollection) -> Vec<ContentItem> {
        self.seeds.get(&collection).cloned().unwrap_or_default()
    }
}

#[derive(Debug, Default, Clone)]
struct EnvelopeMeta {
    remote_snapshot: Option<serde_json::Value>,
    last_attempt: Option<DateTime<Utc>>,
    last_success: Option<DateTime<Utc>>,
}

#[derive(Debug)]
struct ProfileQueue {
    /// The saved record is read from the store when the debounce ends.
    queue: DebounceQueue<Collection, ()>,
    worker: Option<JoinHandle<()>>,
}

struct Inner {
    store: LocalStore,
    gateway: Arc<dyn RemoteContentGateway>,
    channel: TabChannel,
    options: SyncOptions,
    in_flight: AtomicBool,
    meta: Mutex<BTreeMap<Collection, EnvelopeMeta>>,
    profile_queue: Mutex<ProfileQueue>,
    /// Serializes remote saves per collection so the last save wins.
    save_locks: BTreeMap<ContentCollection, tokio::sync::Mutex<()>>,
    /// Bumped whenever local state changed under this tab: another tab
    /// signalled, or a sync adopted remote data.
    changes: watch::Sender<u64>,
}

/// Clears the in-flight flag even if `sync_all` is cancelled.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Handle to the remote save started by [`SyncCoordinator::push_local`].
///
/// Dropping the ticket does not cancel the save.
#[derive(Debug)]
pub struct PushTicket {
    outcome: TicketState,
}

#[derive(Debug)]
enum TicketState {
    Ready(PushOutcome),
    Running(JoinHandle<PushOutcome>),
}

impl PushTicket {
    fn ready(outcome: PushOutcome) -> Self {
        Self {
            outcome: TicketState::Ready(outcome),
        }
    }

    /// Wait for the remote save to finish.
    pub async fn wait(self) -> PushOutcome {
        match self.outcome {
            TicketState::Ready(outcome) => outcome,
            TicketState::Running(handle) => handle
                .await
                .unwrap_or_else(|e| PushOutcome::LocalOnly(format!("save task ended: {e}"))),
        }
    }
}

/// Keeps the local store and the remote content store in step.
pub struct SyncCoordinator {
    inner: Arc<Inner>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    subscription: Mutex<Option<Subscription>>,
}

impl std::fmt::Debug for SyncCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncCoordinator")
            .field("tab", self.inner.channel.tab_id())
            .field("configured", &self.inner.gateway.is_configured())
            .field("status", &self.status())
            .finish()
    }
}

impl SyncCoordinator {
    pub fn new(
        store: LocalStore,
        gateway: Arc<dyn RemoteContentGateway>,
        channel: TabChannel,
        options: SyncOptions,
    ) -> Self {
        let ledger: SyncLedger = store.get(StorageKey::SyncState, SyncLedger::default());
        if ledger.pending_count() > 0 {
            tracing::info!(count = ledger.pending_count(), "resuming with unsaved local changes");
        }
        let inner = Inner {
            profile_queue: Mutex::new(ProfileQueue {
                queue: DebounceQueue::new(options.debounce),
                worker: None,
            }),
            save_locks: ContentCollection::ALL
                .into_iter()
                .map(|c| (c, tokio::sync::Mutex::new(())))
                .collect(),
            meta: Mutex::new(BTreeMap::new()),
            changes: watch::channel(0).0,
            in_flight: AtomicBool::new(false),
            store,
            gateway,
            channel,
            options,
        };
        Self {
            inner: Arc::new(inner),
            tasks: Mutex::new(Vec::new()),
            subscription: Mutex::new(None),
        }
    }

    pub fn store(&self) -> &LocalStore {
        &self.inner.store
    }

    pub fn channel(&self) -> &TabChannel {
        &self.inner.channel
    }

    pub fn options(&self) -> &SyncOptions {
        &self.inner.options
    }

    pub fn is_configured(&self) -> bool {
        self.inner.gateway.is_configured()
    }

    /// Fetch everything once and reconcile it with the local store.
    ///
    /// Never fails: per-collection problems are reported in the result
    /// and the local copy is kept. A call made while another sync is
    /// running returns immediately with `skipped` set.
    pub async fn sync_all(&self) -> SyncReport {
        self.inner.sync_all().await
    }

    /// Write `items` locally, then save them remotely in the background.
    pub fn push_local(&self, collection: ContentCollection, items: &[ContentItem]) -> PushTicket {
        let key = Collection::Content(collection);
        self.inner
            .commit_local(key, |tx| tx.set(collection.storage_key(), items));
        self.inner.channel.publish(SignalKind::SyncUpdate);

        if !self.inner.gateway.is_configured() {
            return PushTicket::ready(PushOutcome::LocalOnly("remote not configured".into()));
        }
        let inner = Arc::clone(&self.inner);
        PushTicket {
            outcome: TicketState::Running(tokio::spawn(async move {
                inner.save_content(collection).await
            })),
        }
    }

    /// Write the learner's progress locally and schedule a debounced
    /// remote save. Rapid calls collapse into one save of the last record.
    pub fn push_user(&self, record: &ProgressRecord) {
        self.inner
            .commit_local(Collection::Profile, |tx| tx.set(StorageKey::Progress, record));
        self.inner.channel.publish(SignalKind::SyncUpdate);

        if self.inner.gateway.is_configured() {
            self.inner.enqueue_profile();
        }
    }

    /// Counter that ticks whenever this tab should re-read local state.
    /// Signals from other tabs only arrive after [`start`](Self::start).
    pub fn changes(&self) -> watch::Receiver<u64> {
        self.inner.changes.subscribe()
    }

    /// Listen to other tabs, run `sync_all` now and then every `interval`.
    /// Calling it again is a no-op.
    pub fn start(&self) {
        let mut tasks = lock(&self.tasks);
        if !tasks.is_empty() {
            return;
        }
        let listener = Arc::clone(&self.inner);
        *lock(&self.subscription) = Some(self.inner.channel.subscribe(move |signal| {
            tracing::debug!(origin = ?signal.origin, "another tab changed local state");
            listener.note_change();
        }));

        let inner = Arc::clone(&self.inner);
        let interval = inner.options.interval;
        tasks.push(tokio::spawn(async move {
            if interval.is_zero() {
                inner.sync_all().await;
                return;
            }
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                inner.sync_all().await;
            }
        }));
        tracing::debug!(?interval, "background sync started");
    }

    /// Stop background work. A profile save still waiting out its debounce
    /// is attempted once before returning.
    pub async fn shutdown(&self) {
        for task in lock(&self.tasks).drain(..) {
            task.abort();
        }
        lock(&self.subscription).take();
        let queued = {
            let mut queue = lock(&self.inner.profile_queue);
            if let Some(worker) = queue.worker.take() {
                worker.abort();
            }
            !queue.queue.drain_all().is_empty()
        };
        if queued {
            self.inner.save_profile(RetryPolicy::no_retry()).await;
        }
        tracing::debug!("sync coordinator shut down");
    }

    /// Sync status as recorded in the shared store, so writes made by
    /// other tabs are included.
    pub fn status(&self) -> SyncStatus {
        let ledger = self.inner.ledger();
        SyncStatus {
            last_sync_at: ledger.last_sync_at(),
            pending_count: ledger.pending_count(),
            in_progress: self.inner.in_flight.load(Ordering::SeqCst),
        }
    }

    pub fn envelope(&self, collection: Collection) -> SyncEnvelope {
        let meta = lock(&self.inner.meta)
            .get(&collection)
            .cloned()
            .unwrap_or_default();
        let local_snapshot = self
            .inner
            .store
            .get_raw(collection.storage_key())
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_else(|| match collection {
                Collection::Content(c) => {
                    serde_json::to_value(self.inner.options.seed(c)).unwrap_or_default()
                }
                _ => serde_json::Value::Null,
            });
        SyncEnvelope {
            collection,
            local_snapshot,
            remote_snapshot: meta.remote_snapshot,
            last_attempt: meta.last_attempt,
            last_success: meta.last_success,
        }
    }

    /// Cached content, or the seed when nothing is cached.
    pub fn content(&self, collection: ContentCollection) -> Vec<ContentItem> {
        self.inner
            .store
            .get(collection.storage_key(), self.inner.options.seed(collection))
    }
}

impl Drop for SyncCoordinator {
    fn drop(&mut self) {
        for task in lock(&self.tasks).drain(..) {
            task.abort();
        }
        if let Some(worker) = lock(&self.inner.profile_queue).worker.take() {
            worker.abort();
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Inner {
    fn ledger(&self) -> SyncLedger {
        self.store.get(StorageKey::SyncState, SyncLedger::default())
    }

    fn generation(&self, collection: Collection) -> u64 {
        self.ledger().generation(collection)
    }

    /// Mark `collection` unsaved and apply `write` in the same
    /// transaction. Returns the new generation, or `None` if the store
    /// rejected the write.
    fn commit_local(
        &self,
        collection: Collection,
        write: impl FnOnce(&StoreTxn<'_>) -> Result<(), StoreError>,
    ) -> Option<u64> {
        let result = self.store.atomically(|tx| {
            let mut ledger: SyncLedger = tx.get(StorageKey::SyncState, SyncLedger::default());
            let generation = ledger.record_write(collection);
            tx.set(StorageKey::SyncState, &ledger)?;
            write(tx)?;
            Ok(generation)
        });
        result
            .map_err(|e| tracing::warn!(%collection, error = %e, "local write failed"))
            .ok()
    }

    /// Mark `collection` saved, unless it changed again since `generation`.
    fn mark_saved(&self, collection: Collection, generation: u64) {
        self.store.update(StorageKey::SyncState, |ledger: &mut SyncLedger| {
            ledger.mark_saved(collection, generation);
        });
    }

    /// Generation and stored value of `key`, read together.
    fn read_for_save<T>(&self, collection: Collection, key: StorageKey, default: T) -> Result<(u64, T), StoreError>
    where
        T: serde::de::DeserializeOwned,
    {
        self.store.atomically(|tx| {
            let ledger: SyncLedger = tx.get(StorageKey::SyncState, SyncLedger::default());
            Ok((ledger.generation(collection), tx.get(key, default)))
        })
    }

    fn note_change(&self) {
        self.changes.send_modify(|n| *n += 1);
    }

    fn note_attempt(&self, collection: Collection, at: DateTime<Utc>) {
        lock(&self.meta).entry(collection).or_default().last_attempt = Some(at);
    }

    fn note_success<T: serde::Serialize>(&self, collection: Collection, remote: &T) {
        let snapshot = serde_json::to_value(remote).ok();
        let mut meta = lock(&self.meta);
        let meta = meta.entry(collection).or_default();
        meta.last_success = Some(Utc::now());
        meta.remote_snapshot = snapshot;
    }

    async fn sync_all(self: &Arc<Self>) -> SyncReport {
        let started = Utc::now();
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::debug!("sync already in progress, skipping");
            return SyncReport::skipped(started);
        }
        let _in_flight = InFlight(&self.in_flight);

        let mut report = SyncReport::new(started);
        if !self.gateway.is_configured() {
            for collection in Collection::all() {
                report
                    .outcomes
                    .insert(collection, CollectionOutcome::KeptLocal(KeepReason::NotConfigured));
            }
            return report;
        }

        self.flush_pending().await;

        let (profile, modules, materials, streams, events, scenarios, leaderboard, notifications) = tokio::join!(
            self.sync_profile(started),
            self.sync_content(ContentCollection::Modules, started),
            self.sync_content(ContentCollection::Materials, started),
            self.sync_content(ContentCollection::Streams, started),
            self.sync_content(ContentCollection::Events, started),
            self.sync_content(ContentCollection::Scenarios, started),
            self.sync_leaderboard(started),
            self.sync_notifications(started),
        );
        report.outcomes.insert(Collection::Profile, profile);
        for (collection, outcome) in ContentCollection::ALL
            .into_iter()
            .zip([modules, materials, streams, events, scenarios])
        {
            report.outcomes.insert(Collection::Content(collection), outcome);
        }
        report.outcomes.insert(Collection::Leaderboard, leaderboard);
        report.outcomes.insert(Collection::Notifications, notifications);

        // A round where nothing answered leaves the store untouched.
        if report.reached_remote() {
            let finished = Utc::now();
            self.store.update(StorageKey::SyncState, |ledger: &mut SyncLedger| {
                ledger.record_sync(finished);
            });
        }
        let updated: Vec<&str> = report.updated().map(|c| c.name()).collect();
        if !updated.is_empty() {
            self.channel.publish(SignalKind::SyncUpdate);
            self.note_change();
        }
        tracing::info!(?updated, "sync round complete");
        report
    }

    /// Re-push collections that still hold unsaved local changes, whichever
    /// tab wrote them.
    async fn flush_pending(self: &Arc<Self>) {
        let ledger = self.ledger();
        for collection in ledger.pending() {
            match collection {
                Collection::Content(c) => {
                    self.save_content(c).await;
                }
                Collection::Profile => {
                    if !lock(&self.profile_queue).queue.is_empty() {
                        // The debounce worker will save it.
                        continue;
                    }
                    self.save_profile(self.options.retry).await;
                }
                other => self.mark_saved(other, ledger.generation(other)),
            }
        }
    }

    async fn save_content(&self, collection: ContentCollection) -> PushOutcome {
        let key = Collection::Content(collection);
        let _serial = match self.save_locks.get(&collection) {
            Some(lock) => Some(lock.lock().await),
            None => None,
        };
        // Read at save time so a queued save always sends the newest data.
        let (generation, items) =
            match self.read_for_save::<Vec<ContentItem>>(key, collection.storage_key(), Vec::new()) {
                Ok(read) => read,
                Err(e) => {
                    tracing::warn!(collection = %key, error = %e, "could not read local copy for save");
                    return PushOutcome::LocalOnly(e.to_string());
                }
            };

        match self
            .options
            .retry
            .run(|| self.gateway.save_collection(collection, &items))
            .await
        {
            Ok(()) => {
                self.mark_saved(key, generation);
                tracing::debug!(collection = %key, count = items.len(), "saved remotely");
                PushOutcome::Saved
            }
            Err(e) => {
                tracing::warn!(collection = %key, error = %e, "remote save failed, keeping local copy");
                PushOutcome::LocalOnly(e.to_string())
            }
        }
    }

    fn enqueue_profile(self: &Arc<Self>) {
        let mut profile_queue = lock(&self.profile_queue);
        profile_queue.queue.enqueue(Collection::Profile, (), Instant::now());
        if profile_queue.worker.is_none() {
            let inner = Arc::clone(self);
            profile_queue.worker = Some(tokio::spawn(async move {
                inner.run_profile_worker().await;
            }));
        }
    }

    async fn run_profile_worker(self: Arc<Self>) {
        loop {
            let deadline = {
                let mut profile_queue = lock(&self.profile_queue);
                match profile_queue.queue.next_deadline() {
                    Some(deadline) => deadline,
                    None => {
                        profile_queue.worker = None;
                        return;
                    }
                }
            };
            tokio::time::sleep_until(deadline).await;

            let ready = lock(&self.profile_queue).queue.drain_ready(Instant::now());
            if !ready.is_empty() {
                self.save_profile(self.options.retry).await;
            }
        }
    }

    /// Save the stored progress record under its remote id.
    async fn save_profile(&self, retry: RetryPolicy) -> PushOutcome {
        let key = Collection::Profile;
        let (generation, record) =
            match self.read_for_save::<Option<ProgressRecord>>(key, StorageKey::Progress, None) {
                Ok(read) => read,
                Err(e) => {
                    tracing::warn!(error = %e, "could not read local progress for save");
                    return PushOutcome::LocalOnly(e.to_string());
                }
            };
        let Some(mut record) = record else {
            self.mark_saved(key, generation);
            return PushOutcome::Saved;
        };
        if record.remote_id.is_none() {
            record.remote_id.clone_from(&self.options.user_id);
        }

        let profile = Profile::from_progress(&record, Utc::now());
        match retry.run(|| self.gateway.save_profile(&profile)).await {
            Ok(()) => {
                self.mark_saved(key, generation);
                tracing::debug!(profile = %profile.id, xp = profile.xp, "profile saved remotely");
                PushOutcome::Saved
            }
            Err(e) => {
                tracing::warn!(profile = %profile.id, error = %e, "profile save failed, keeping local copy");
                PushOutcome::LocalOnly(e.to_string())
            }
        }
    }

    async fn sync_content(&self, collection: ContentCollection, started: DateTime<Utc>) -> CollectionOutcome {
        let key = Collection::Content(collection);
        let generation = self.generation(key);
        self.note_attempt(key, started);

        let items = match self
            .options
            .retry
            .run(|| self.gateway.fetch_collection(collection))
            .await
        {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!(collection = %key, error = %e, "fetch failed, keeping local copy");
                return CollectionOutcome::KeptLocal(KeepReason::FetchFailed(e.to_string()));
            }
        };
        self.note_success(key, &items);
        self.adopt(key, generation, items)
    }

    async fn sync_leaderboard(&self, started: DateTime<Utc>) -> CollectionOutcome {
        let key = Collection::Leaderboard;
        let generation = self.generation(key);
        self.note_attempt(key, started);
        match self.options.retry.run(|| self.gateway.fetch_leaderboard()).await {
            Ok(profiles) => {
                self.note_success(key, &profiles);
                self.adopt(key, generation, rank_leaderboard(profiles))
            }
            Err(e) => {
                tracing::warn!(error = %e, "leaderboard fetch failed, keeping local copy");
                CollectionOutcome::KeptLocal(KeepReason::FetchFailed(e.to_string()))
            }
        }
    }

    async fn sync_notifications(&self, started: DateTime<Utc>) -> CollectionOutcome {
        let key = Collection::Notifications;
        let generation = self.generation(key);
        self.note_attempt(key, started);
        match self.options.retry.run(|| self.gateway.fetch_notifications()).await {
            Ok(notifications) => {
                self.note_success(key, &notifications);
                self.adopt::<Notification>(key, generation, notifications)
            }
            Err(e) => {
                tracing::warn!(error = %e, "notification fetch failed, keeping local copy");
                CollectionOutcome::KeptLocal(KeepReason::FetchFailed(e.to_string()))
            }
        }
    }

    /// Write a fetched list locally unless it is empty, unchanged, or some
    /// tab wrote the collection since `generation`.
    fn adopt<T>(&self, collection: Collection, generation: u64, remote: Vec<T>) -> CollectionOutcome
    where
        T: serde::Serialize + serde::de::DeserializeOwned + PartialEq,
    {
        let result = self.store.atomically(|tx| {
            let ledger: SyncLedger = tx.get(StorageKey::SyncState, SyncLedger::default());
            if ledger.changed_since(collection, generation) {
                return Ok(CollectionOutcome::KeptLocal(KeepReason::LocalPending));
            }
            if remote.is_empty() {
                return Ok(CollectionOutcome::KeptLocal(KeepReason::EmptyRemote));
            }
            let local: Option<Vec<T>> = tx.get(collection.storage_key(), None);
            if local.as_ref() == Some(&remote) {
                return Ok(CollectionOutcome::Unchanged);
            }
            tx.set(collection.storage_key(), &remote)?;
            Ok(CollectionOutcome::Updated)
        });
        match result {
            Ok(outcome) => {
                if outcome == CollectionOutcome::Updated {
                    tracing::debug!(%collection, count = remote.len(), "adopted remote copy");
                }
                outcome
            }
            Err(e) => {
                tracing::warn!(%collection, error = %e, "could not store remote copy");
                CollectionOutcome::KeptLocal(KeepReason::StoreFailed(e.to_string()))
            }
        }
    }

    fn profile_id(&self) -> Option<String> {
        let local: Option<ProgressRecord> = self.store.get(StorageKey::Progress, None);
        local
            .as_ref()
            .and_then(|r| r.remote_id.clone())
            .or_else(|| self.options.user_id.clone())
            .or_else(|| local.map(|r| r.local_id))
    }

    async fn sync_profile(self: &Arc<Self>, started: DateTime<Utc>) -> CollectionOutcome {
        let key = Collection::Profile;
        let Some(id) = self.profile_id() else {
            return CollectionOutcome::KeptLocal(KeepReason::EmptyRemote);
        };
        let generation = self.generation(key);
        self.note_attempt(key, started);

        let fetched = match self.options.retry.run(|| self.gateway.fetch_profile(&id)).await {
            Ok(fetched) => fetched,
            Err(e) => {
                tracing::warn!(profile = %id, error = %e, "profile fetch failed, keeping local copy");
                return CollectionOutcome::KeptLocal(KeepReason::FetchFailed(e.to_string()));
            }
        };
        self.note_success(key, &fetched);

        let Some(profile) = fetched else {
            // Never saved remotely: link the local record to the id we
            // looked up and create it from there.
            if !self.store.contains(StorageKey::Progress) {
                return CollectionOutcome::KeptLocal(KeepReason::EmptyRemote);
            }
            let linked = self.commit_local(key, |tx| {
                let local: Option<ProgressRecord> = tx.get(StorageKey::Progress, None);
                match local {
                    Some(mut local) if local.remote_id.is_none() => {
                        local.remote_id = Some(id.clone());
                        tx.set(StorageKey::Progress, &local)
                    }
                    _ => Ok(()),
                }
            });
            if linked.is_some() {
                self.enqueue_profile();
            }
            return CollectionOutcome::KeptLocal(KeepReason::EmptyRemote);
        };
        let Some(mut remote) = profile.progress else {
            return CollectionOutcome::KeptLocal(KeepReason::EmptyRemote);
        };
        remote.remote_id = Some(profile.id);
        let mut remote = normalize_record(&remote, chrono::Local::now().date_naive());

        let result = self.store.atomically(|tx| {
            let ledger: SyncLedger = tx.get(StorageKey::SyncState, SyncLedger::default());
            if ledger.changed_since(key, generation) {
                return Ok(CollectionOutcome::KeptLocal(KeepReason::LocalPending));
            }
            let local: Option<ProgressRecord> = tx.get(StorageKey::Progress, None);
            if let Some(local) = &local {
                remote.last_sync_timestamp = local.last_sync_timestamp;
                if *local == remote {
                    return Ok(CollectionOutcome::Unchanged);
                }
            }
            remote.last_sync_timestamp = Some(Utc::now());
            tx.set(StorageKey::Progress, &remote)?;
            Ok(CollectionOutcome::Updated)
        });
        match result {
            Ok(outcome) => {
                if outcome == CollectionOutcome::Updated {
                    tracing::debug!(xp = remote.xp(), "adopted remote progress");
                }
                outcome
            }
            Err(e) => {
                tracing::warn!(error = %e, "could not store remote progress");
                CollectionOutcome::KeptLocal(KeepReason::StoreFailed(e.to_string()))
            }
        }
    }
}
