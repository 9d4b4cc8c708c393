// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Sync manager: queue replay, merge, retries, and connectivity.
//!
//! One [`SyncManager`] is built by the composition root and shared behind an
//! `Arc`. At most one pass runs at a time; a trigger that arrives while a
//! pass is in flight is dropped, not queued.
//!
//! Locks are plain `std::sync::Mutex` and are never held across an await.
//! Processes sharing one store also share a file lock (`<db>.sync.lock`)
//! held for the whole pass, so two processes never replay the same queue.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use fs2::FileExt;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use mm_core::id::generate_tentative_id;
use mm_core::{
    plan_merge, AnniversaryRecord, DataType, IdReplacement, LocalStore, MessageRecord, OpPayload,
    Operation, OperationType, PendingOperation, Record, StoredRecord, SyncMeta, SyncStatus,
};

use super::remote::{CreateReceipt, RemoteApi, RemoteError, RemoteFuture};
use super::state::{Begin, Listener, ListenerId, Listeners, SyncEvent, SyncPhase, SyncState};

/// Error type for manager operations.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Validation, lookup, or storage failure.
    #[error(transparent)]
    Core(#[from] mm_core::Error),

    /// The backend call behind a remote-only write failed.
    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// No local store to queue into and no network to write through.
    #[error("offline without a local store: write rejected\n  hint: retry once the network is back")]
    Offline,
}

/// Result type for manager operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncSettings {
    /// Delay before a failed pass is retried.
    pub retry_interval: Duration,
    /// Retries allowed before giving up until the next trigger.
    pub max_retries: u32,
}

impl Default for SyncSettings {
    fn default() -> Self {
        SyncSettings {
            retry_interval: Duration::from_secs(30),
            max_retries: 5,
        }
    }
}

/// Counts for one reconciled collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectionReport {
    pub upserted: usize,
    pub removed: usize,
    pub kept_unconfirmed: usize,
    pub duplicates_collapsed: usize,
}

/// What a completed pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassReport {
    pub replayed: usize,
    pub anniversaries: CollectionReport,
    pub messages: CollectionReport,
}

/// How a call to [`SyncManager::sync_all`] ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassOutcome {
    Completed(PassReport),
    /// Another pass was in flight; this trigger was dropped.
    AlreadySyncing,
    Offline,
    Failed {
        message: String,
        retry_scheduled: bool,
    },
}

enum PassError {
    Remote(RemoteError),
    Storage(mm_core::Error),
}

impl From<RemoteError> for PassError {
    fn from(e: RemoteError) -> Self {
        PassError::Remote(e)
    }
}

impl From<mm_core::Error> for PassError {
    fn from(e: mm_core::Error) -> Self {
        PassError::Storage(e)
    }
}

/// Result of replaying the queue.
#[derive(Default)]
struct Replay {
    replayed: usize,
    /// First remote failure; later operations were still attempted.
    failure: Option<PassError>,
    /// Collections with an operation still queued after a failure.
    blocked: HashSet<DataType>,
}

/// Cross-process pass lock. Released when dropped.
struct PassLock(fs::File);

impl PassLock {
    /// `Ok(None)` when another process holds the lock.
    fn try_acquire(path: &Path) -> io::Result<Option<PassLock>> {
        let file = fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
        match file.try_lock_exclusive() {
            Ok(()) => Ok(Some(PassLock(file))),
            Err(e) if e.raw_os_error() == fs2::lock_contended_error().raw_os_error() => Ok(None),
            Err(e) => Err(e),
        }
    }
}

impl Drop for PassLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.0);
    }
}

/// Path of the pass lock for the store at `db`.
pub fn sync_lock_path(db: &Path) -> PathBuf {
    db.with_extension("sync.lock")
}

/// Last fetched collections, used when there is no local store.
#[derive(Debug, Default)]
struct RemoteSnapshot {
    anniversaries: Vec<AnniversaryRecord>,
    messages: Vec<MessageRecord>,
}

/// A collection the manager keeps in sync.
trait Synced: StoredRecord + Send + Sync + 'static {
    fn fetch(remote: &dyn RemoteApi) -> RemoteFuture<'_, Vec<Self>>;
    fn create<'a>(remote: &'a dyn RemoteApi, record: &'a Self) -> RemoteFuture<'a, CreateReceipt>;
    fn slot(snapshot: &mut RemoteSnapshot) -> &mut Vec<Self>;
    fn create_op(record: Self) -> Operation;
    fn sort(records: &mut [Self]);
}

impl Synced for AnniversaryRecord {
    fn fetch(remote: &dyn RemoteApi) -> RemoteFuture<'_, Vec<Self>> {
        remote.fetch_anniversaries()
    }

    fn create<'a>(remote: &'a dyn RemoteApi, record: &'a Self) -> RemoteFuture<'a, CreateReceipt> {
        remote.create_anniversary(record)
    }

    fn slot(snapshot: &mut RemoteSnapshot) -> &mut Vec<Self> {
        &mut snapshot.anniversaries
    }

    fn create_op(record: Self) -> Operation {
        Operation::create_anniversary(record)
    }

    fn sort(records: &mut [Self]) {
        records.sort_by(|a, b| a.date.cmp(&b.date));
    }
}

impl Synced for MessageRecord {
    fn fetch(remote: &dyn RemoteApi) -> RemoteFuture<'_, Vec<Self>> {
        remote.fetch_messages()
    }

    fn create<'a>(remote: &'a dyn RemoteApi, record: &'a Self) -> RemoteFuture<'a, CreateReceipt> {
        remote.create_message(record)
    }

    fn slot(snapshot: &mut RemoteSnapshot) -> &mut Vec<Self> {
        &mut snapshot.messages
    }

    fn create_op(record: Self) -> Operation {
        Operation::create_message(record)
    }

    fn sort(records: &mut [Self]) {
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Client-side synchronization manager.
pub struct SyncManager {
    remote: Arc<dyn RemoteApi>,
    /// `None` once the store is unavailable: the manager runs remote-only.
    store: Mutex<Option<LocalStore>>,
    snapshot: Mutex<RemoteSnapshot>,
    state: Mutex<SyncState>,
    listeners: Mutex<Listeners>,
    settings: SyncSettings,
    retry: Mutex<Option<JoinHandle<()>>>,
    /// Set when storage fails mid-run; periodic scheduling stops.
    halted: AtomicBool,
    /// Tentative id -> confirmed id, for callers still holding the old id.
    renames: Mutex<HashMap<(DataType, String), String>>,
    /// `None` for in-memory and remote-only managers.
    pass_lock: Option<PathBuf>,
}

impl SyncManager {
    /// Create a manager. Pass `None` for `store` to run remote-only.
    pub fn new(
        remote: Arc<dyn RemoteApi>,
        store: Option<LocalStore>,
        settings: SyncSettings,
    ) -> Arc<Self> {
        let state = match store.as_ref().map(LocalStore::load_meta) {
            Some(Ok(meta)) => SyncState::restored(meta.last_sync_time),
            Some(Err(e)) => {
                warn!(error = %e, "could not load sync metadata");
                SyncState::default()
            }
            None => SyncState::default(),
        };
        if store.is_none() {
            info!("no local store; running remote-only");
        }
        let pass_lock = store
            .as_ref()
            .and_then(LocalStore::path)
            .map(sync_lock_path);

        Arc::new(SyncManager {
            remote,
            store: Mutex::new(store),
            snapshot: Mutex::new(RemoteSnapshot::default()),
            state: Mutex::new(state),
            listeners: Mutex::new(Listeners::default()),
            settings,
            retry: Mutex::new(None),
            halted: AtomicBool::new(false),
            renames: Mutex::new(HashMap::new()),
            pass_lock,
        })
    }

    pub fn settings(&self) -> SyncSettings {
        self.settings
    }

    /// Snapshot of the current sync state.
    pub fn state(&self) -> SyncState {
        lock(&self.state).clone()
    }

    pub fn is_online(&self) -> bool {
        lock(&self.state).online
    }

    pub fn is_syncing(&self) -> bool {
        lock(&self.state).is_syncing()
    }

    /// True once storage has failed and scheduling should stop.
    pub fn is_halted(&self) -> bool {
        self.halted.load(Ordering::SeqCst)
    }

    /// True while a local store backs the manager.
    pub fn has_store(&self) -> bool {
        lock(&self.store).is_some()
    }

    /// True while a retry pass is waiting to fire.
    pub fn retry_pending(&self) -> bool {
        lock(&self.retry)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    pub fn add_listener(&self, listener: impl Fn(&SyncEvent) + Send + Sync + 'static) -> ListenerId {
        let listener: Listener = Arc::new(listener);
        lock(&self.listeners).add(listener)
    }

    /// Returns false if the listener was not registered.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        lock(&self.listeners).remove(id)
    }

    fn notify(&self, event: &SyncEvent) {
        let listeners = lock(&self.listeners).snapshot();
        for listener in listeners {
            listener(event);
        }
    }

    /// Run `f` against the store. `None` when running remote-only.
    fn with_store<T>(
        &self,
        f: impl FnOnce(&mut LocalStore) -> mm_core::Result<T>,
    ) -> Option<mm_core::Result<T>> {
        lock(&self.store).as_mut().map(f)
    }

    /// Drop the store after a storage failure and continue remote-only.
    fn degrade(&self, cause: &mm_core::Error) {
        let dropped = lock(&self.store).take().is_some();
        self.halted.store(true, Ordering::SeqCst);
        if dropped {
            error!(error = %cause, "local store failed; continuing remote-only");
            self.notify(&SyncEvent::Error {
                message: cause.to_string(),
            });
        }
    }

    /// Map a store result, degrading on storage failures.
    fn checked<T>(&self, result: mm_core::Result<T>) -> SyncResult<T> {
        result.map_err(|e| {
            if e.is_storage() {
                self.degrade(&e);
            }
            SyncError::Core(e)
        })
    }

    /// Current id of a record, following tentative -> confirmed renames.
    pub fn resolve_id(&self, data_type: DataType, id: &str) -> String {
        lock(&self.renames)
            .get(&(data_type, id.to_string()))
            .cloned()
            .unwrap_or_else(|| id.to_string())
    }

    /// All anniversaries, ordered by date.
    pub fn anniversaries(&self) -> SyncResult<Vec<AnniversaryRecord>> {
        self.list()
    }

    /// All messages, newest first.
    pub fn messages(&self) -> SyncResult<Vec<MessageRecord>> {
        self.list()
    }

    fn list<R: Synced>(&self) -> SyncResult<Vec<R>> {
        match self.with_store(|store| store.get_all::<R>()) {
            Some(result) => self.checked(result),
            None => Ok(R::slot(&mut lock(&self.snapshot)).clone()),
        }
    }

    /// Sync bookkeeping as last persisted by any process using the store.
    pub fn stored_meta(&self) -> SyncResult<Option<SyncMeta>> {
        match self.with_store(|store| store.load_meta()) {
            Some(result) => self.checked(result).map(Some),
            None => Ok(None),
        }
    }

    /// Operations still waiting for the backend. Empty when remote-only.
    pub fn queue(&self) -> SyncResult<Vec<PendingOperation>> {
        match self.with_store(|store| store.peek_queue()) {
            Some(result) => self.checked(result),
            None => Ok(Vec::new()),
        }
    }

    /// Record a connectivity change.
    ///
    /// Going offline notifies listeners; coming back online runs a pass and
    /// returns its outcome.
    pub async fn set_online(self: &Arc<Self>, online: bool) -> Option<PassOutcome> {
        let changed = lock(&self.state).set_online(online);
        if !changed {
            return None;
        }
        if online {
            info!("network restored");
            Some(self.sync_all().await)
        } else {
            info!("network lost");
            self.notify(&SyncEvent::Offline);
            None
        }
    }

    /// Run one sync pass.
    ///
    /// Returns immediately with [`PassOutcome::AlreadySyncing`] if a pass is
    /// in flight. Failures are reported through listeners and the outcome,
    /// never as an error.
    pub fn sync_all(self: &Arc<Self>) -> Pin<Box<dyn Future<Output = PassOutcome> + Send + 'static>> {
        let manager = Arc::clone(self);
        Box::pin(async move { manager.run_pass().await })
    }

    async fn run_pass(self: Arc<Self>) -> PassOutcome {
        let (begin, previous) = {
            let mut state = lock(&self.state);
            let previous = state.phase;
            (state.try_begin(), previous)
        };
        match begin {
            Begin::AlreadySyncing => {
                warn!("sync already in progress; dropping trigger");
                return PassOutcome::AlreadySyncing;
            }
            Begin::Offline => {
                debug!("offline; skipping sync");
                return PassOutcome::Offline;
            }
            Begin::Started => {}
        }

        let pass_lock = match self.pass_lock.as_deref().map(PassLock::try_acquire) {
            Some(Ok(None)) => {
                lock(&self.state).cancel_begin(previous);
                warn!("another process is syncing this store; dropping trigger");
                return PassOutcome::AlreadySyncing;
            }
            Some(Ok(Some(held))) => Some(held),
            Some(Err(e)) => {
                warn!(error = %e, "could not open sync lock; syncing without it");
                None
            }
            None => None,
        };
        self.notify(&SyncEvent::Syncing);
        debug!("sync pass started");

        let outcome = match self.pass_body().await {
            Ok(report) => {
                let at = Utc::now();
                lock(&self.state).finish_success(at);
                info!(
                    replayed = report.replayed,
                    anniversaries = report.anniversaries.upserted,
                    messages = report.messages.upserted,
                    "sync pass succeeded"
                );
                self.notify(&SyncEvent::Success { at });
                PassOutcome::Completed(report)
            }
            Err(PassError::Remote(e)) => {
                let message = e.to_string();
                warn!(error = %message, "sync pass failed");
                lock(&self.state).finish_error(message.clone());
                self.notify(&SyncEvent::Error {
                    message: message.clone(),
                });
                let retry_scheduled = self.schedule_retry();
                PassOutcome::Failed {
                    message,
                    retry_scheduled,
                }
            }
            Err(PassError::Storage(e)) => {
                let message = e.to_string();
                lock(&self.state).finish_error(message.clone());
                // degrade() notifies listeners; storage failures are not retried.
                self.degrade(&e);
                PassOutcome::Failed {
                    message,
                    retry_scheduled: false,
                }
            }
        };

        self.persist_meta();
        drop(pass_lock);
        outcome
    }

    async fn pass_body(&self) -> Result<PassReport, PassError> {
        let replay = self.replay_queue().await?;
        // A collection with a failed operation is not merged: the merge would
        // bring back records whose delete is still queued.
        let anniversaries = if replay.blocked.contains(&DataType::Anniversary) {
            CollectionReport::default()
        } else {
            self.refresh::<AnniversaryRecord>().await?
        };
        let messages = if replay.blocked.contains(&DataType::Message) {
            CollectionReport::default()
        } else {
            self.refresh::<MessageRecord>().await?
        };
        match replay.failure {
            Some(e) => Err(e),
            None => Ok(PassReport {
                replayed: replay.replayed,
                anniversaries,
                messages,
            }),
        }
    }

    /// Fetch one collection and merge it into the local copy.
    async fn refresh<R: Synced>(&self) -> Result<CollectionReport, PassError> {
        let mut remote = R::fetch(self.remote.as_ref()).await?;

        let merged = self.with_store(|store| {
            let local = store.get_all::<R>()?;
            let plan = plan_merge(&local, &remote);
            store.apply_merge(&plan)?;
            Ok(CollectionReport {
                upserted: plan.upserts.len(),
                removed: plan.removals.len(),
                kept_unconfirmed: plan.kept_unconfirmed,
                duplicates_collapsed: plan.duplicates_collapsed,
            })
        });

        match merged {
            Some(result) => {
                let report = result?;
                debug!(
                    collection = R::DATA_TYPE.collection(),
                    upserted = report.upserted,
                    removed = report.removed,
                    kept = report.kept_unconfirmed,
                    "merged"
                );
                Ok(report)
            }
            None => {
                let plan = plan_merge::<R>(&[], &remote);
                remote = plan.upserts;
                R::sort(&mut remote);
                let report = CollectionReport {
                    upserted: remote.len(),
                    duplicates_collapsed: plan.duplicates_collapsed,
                    ..CollectionReport::default()
                };
                *R::slot(&mut lock(&self.snapshot)) = remote;
                Ok(report)
            }
        }
    }

    /// Replay queued operations: per collection, creates then updates then deletes.
    ///
    /// A remote failure keeps that operation queued and skips later
    /// operations on the same record; everything else is still attempted.
    /// Succeeded operations leave the queue once all batches have run.
    async fn replay_queue(&self) -> Result<Replay, PassError> {
        let queued = match self.with_store(|store| store.peek_queue()) {
            Some(result) => result?,
            None => return Ok(Replay::default()),
        };
        if queued.is_empty() {
            return Ok(Replay::default());
        }
        debug!(count = queued.len(), "replaying queue");

        let mut done = Vec::new();
        let mut replay = Replay::default();
        let mut failed_records = HashSet::new();
        let mut storage_failure = None;
        'replay: for data_type in DataType::ALL {
            for operation_type in OperationType::REPLAY_ORDER {
                let batch = queued
                    .iter()
                    .filter(|op| op.data_type == data_type && op.operation_type == operation_type);
                for op in batch {
                    let key = (op.data_type, op.record_id().to_string());
                    if failed_records.contains(&key) {
                        continue;
                    }
                    match self.replay_one(op).await {
                        Ok(()) => done.push(op.id),
                        Err(PassError::Remote(e)) => {
                            warn!(op = op.id, error = %e, "replay failed; operation stays queued");
                            failed_records.insert(key);
                            replay.blocked.insert(op.data_type);
                            replay.failure.get_or_insert(PassError::Remote(e));
                        }
                        Err(storage) => {
                            storage_failure = Some(storage);
                            break 'replay;
                        }
                    }
                }
            }
        }

        if !done.is_empty() {
            if let Some(result) = self.with_store(|store| store.remove_ops(&done)) {
                result?;
            }
        }
        if let Some(e) = storage_failure {
            return Err(e);
        }
        replay.replayed = done.len();
        Ok(replay)
    }

    async fn replay_one(&self, op: &PendingOperation) -> Result<(), PassError> {
        let id = self.resolve_id(op.data_type, op.record_id());
        debug!(op = op.id, kind = %op.operation_type, data_type = %op.data_type, id = %id, "replay");

        match (op.operation_type, &op.payload) {
            (OperationType::Create, OpPayload::Anniversary { record }) => {
                self.replay_create(record, &id).await
            }
            (OperationType::Create, OpPayload::Message { record }) => {
                self.replay_create(record, &id).await
            }
            (OperationType::Update, OpPayload::Anniversary { record }) => {
                self.remote.delete_record(op.data_type, &id).await?;
                self.replay_create(record, &id).await
            }
            (OperationType::Update, OpPayload::Message { record }) => {
                self.remote.delete_record(op.data_type, &id).await?;
                self.replay_create(record, &id).await
            }
            (OperationType::Delete, OpPayload::Remove { .. }) => {
                self.remote.delete_record(op.data_type, &id).await?;
                Ok(())
            }
            (operation_type, _) => {
                warn!(op = op.id, %operation_type, "dropping queued operation with mismatched payload");
                Ok(())
            }
        }
    }

    /// Push a record and adopt the id the backend confirmed.
    async fn replay_create<R: Synced>(&self, record: &R, local_id: &str) -> Result<(), PassError> {
        let mut outgoing = record.clone();
        outgoing.set_id(local_id.to_string());

        let receipt = match R::create(self.remote.as_ref(), &outgoing).await {
            Ok(receipt) => receipt,
            Err(e) => {
                warn!(id = local_id, error = %e, "replay failed");
                if let Some(result) =
                    self.with_store(|store| store.set_status::<R>(local_id, SyncStatus::Error))
                {
                    match result {
                        Ok(()) | Err(mm_core::Error::RecordNotFound(_)) => {}
                        Err(storage) => return Err(PassError::Storage(storage)),
                    }
                }
                return Err(PassError::Remote(e));
            }
        };

        self.confirm_create::<R>(local_id, receipt)
    }

    fn confirm_create<R: Synced>(&self, local_id: &str, receipt: CreateReceipt) -> Result<(), PassError> {
        let Some(confirmed) = receipt.id else {
            // No id returned: the merge swaps in the server copy.
            if let Some(result) =
                self.with_store(|store| store.set_status::<R>(local_id, SyncStatus::Synced))
            {
                match result {
                    Ok(()) | Err(mm_core::Error::RecordNotFound(_)) => {}
                    Err(storage) => return Err(PassError::Storage(storage)),
                }
            }
            return Ok(());
        };

        let replacement = self.with_store(|store| store.replace_id::<R>(local_id, &confirmed));
        if let Some(result) = replacement {
            let outcome = result?;
            debug!(tentative = local_id, %confirmed, ?outcome, "create confirmed");
            if outcome == IdReplacement::Missing {
                return Ok(());
            }
        }

        if confirmed != local_id {
            {
                let mut renames = lock(&self.renames);
                // Keep earlier aliases pointing at the newest id.
                for target in renames.values_mut() {
                    if target == local_id {
                        *target = confirmed.clone();
                    }
                }
                renames.insert((R::DATA_TYPE, local_id.to_string()), confirmed.clone());
            }
            self.notify(&SyncEvent::IdReassigned {
                data_type: R::DATA_TYPE,
                tentative: local_id.to_string(),
                confirmed,
            });
        }
        Ok(())
    }

    /// Arm a single delayed retry if the budget allows.
    fn schedule_retry(self: &Arc<Self>) -> bool {
        let attempt = lock(&self.state).next_retry(self.settings.max_retries);
        let Some(attempt) = attempt else {
            warn!(max = self.settings.max_retries, "retry budget exhausted");
            return false;
        };

        let delay = self.settings.retry_interval;
        info!(attempt, delay_secs = delay.as_secs(), "retry scheduled");
        let weak = Arc::downgrade(self);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(manager) = weak.upgrade() else {
                return;
            };
            // Release our own slot so a failing retry can arm the next one.
            drop(lock(&manager.retry).take());
            if !manager.is_online() {
                debug!("still offline; retry skipped");
                return;
            }
            manager.sync_all().await;
        });

        if let Some(previous) = lock(&self.retry).replace(handle) {
            previous.abort();
        }
        true
    }

    /// Cancel a pending retry, if any.
    pub fn cancel_retry(&self) {
        if let Some(handle) = lock(&self.retry).take() {
            handle.abort();
        }
    }

    fn persist_meta(&self) {
        let meta = {
            let state = lock(&self.state);
            SyncMeta {
                last_sync_time: state.last_sync_time,
                retry_count: state.retry_count,
            }
        };
        if let Some(Err(e)) = self.with_store(|store| store.save_meta(&meta)) {
            warn!(error = %e, "could not persist sync metadata");
        }
    }

    /// Add an anniversary. Validated before anything is stored or sent.
    pub async fn add_anniversary(self: &Arc<Self>, name: &str, date: NaiveDate) -> SyncResult<AnniversaryRecord> {
        let now = Utc::now();
        let id = self.tentative_id::<AnniversaryRecord>(name, &now);
        let record = AnniversaryRecord::pending(id, name, date)?;
        self.add(record).await
    }

    /// Add a guestbook message. Validated before anything is stored or sent.
    pub async fn add_message(self: &Arc<Self>, name: &str, content: &str) -> SyncResult<MessageRecord> {
        let now = Utc::now();
        let id = self.tentative_id::<MessageRecord>(name, &now);
        let record = MessageRecord::pending(id, name, content, now)?;
        self.add(record).await
    }

    fn tentative_id<R: Synced>(&self, seed: &str, now: &DateTime<Utc>) -> String {
        let from_store = self.with_store(|store| {
            Ok(generate_tentative_id(seed, now, |candidate| {
                store.exists::<R>(candidate).unwrap_or(false)
            }))
        });
        match from_store {
            Some(Ok(id)) => id,
            _ => {
                let mut snapshot = lock(&self.snapshot);
                let taken = R::slot(&mut snapshot);
                generate_tentative_id(seed, now, |candidate| {
                    taken.iter().any(|r| r.id() == candidate)
                })
            }
        }
    }

    async fn add<R: Synced>(self: &Arc<Self>, record: R) -> SyncResult<R> {
        let op = R::create_op(record.clone());
        let stored = self.with_store(|store| store.insert_with_op(&record, &op));
        match stored {
            None => return self.create_remote_only(record).await,
            Some(result) => {
                let pending = self.checked(result);
                match pending {
                    Ok(pending) => debug!(op = pending.id, id = record.id(), "queued create"),
                    Err(SyncError::Core(e)) if e.is_storage() => {
                        return self.create_remote_only(record).await;
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        if self.is_online() {
            // Failures surface through listeners; the record stays queued.
            self.sync_all().await;
        }
        Ok(self.current(record))
    }

    /// Re-read a record after a pass, following any id change.
    ///
    /// A create confirmed without an id has its tentative row replaced by
    /// the server copy during the merge; the caller gets the record as synced.
    fn current<R: Synced>(&self, mut record: R) -> R {
        let id = self.resolve_id(R::DATA_TYPE, record.id());
        match self.with_store(|store| store.get::<R>(&id)) {
            Some(Ok(Some(found))) => found,
            Some(Ok(None)) => {
                record.set_sync_status(SyncStatus::Synced);
                record
            }
            _ => record,
        }
    }

    async fn create_remote_only<R: Synced>(&self, mut record: R) -> SyncResult<R> {
        if !self.is_online() {
            return Err(SyncError::Offline);
        }
        let receipt = R::create(self.remote.as_ref(), &record).await?;
        if let Some(id) = receipt.id {
            record.set_id(id);
        }
        record.set_sync_status(SyncStatus::Synced);

        let mut snapshot = lock(&self.snapshot);
        let slot = R::slot(&mut snapshot);
        slot.retain(|r| r.id() != record.id());
        slot.push(record.clone());
        R::sort(slot);
        Ok(record)
    }

    /// Delete a record.
    ///
    /// A record the backend never confirmed is dropped locally together with
    /// its queued operations, with no remote call.
    pub async fn delete(self: &Arc<Self>, data_type: DataType, id: &str) -> SyncResult<()> {
        match data_type {
            DataType::Anniversary => self.delete_record::<AnniversaryRecord>(id).await,
            DataType::Message => self.delete_record::<MessageRecord>(id).await,
        }
    }

    async fn delete_record<R: Synced>(self: &Arc<Self>, id: &str) -> SyncResult<()> {
        let id = self.resolve_id(R::DATA_TYPE, id);
        let existing = match self.with_store(|store| store.get::<R>(&id)) {
            Some(result) => self.checked(result)?,
            None => return self.delete_remote_only::<R>(&id).await,
        };
        let record = existing.ok_or_else(|| mm_core::Error::RecordNotFound(id.clone()))?;

        if !record.sync_status().is_confirmed() {
            let dropped = match self.with_store(|store| store.discard_unconfirmed::<R>(&id)) {
                Some(result) => self.checked(result)?,
                None => 0,
            };
            debug!(%id, dropped, "discarded unconfirmed record");
            return Ok(());
        }

        let op = Operation::delete(R::DATA_TYPE, id.clone());
        if let Some(result) = self.with_store(|store| store.remove_with_op::<R>(&id, &op)) {
            self.checked(result)?;
        }
        if self.is_online() {
            self.sync_all().await;
        }
        Ok(())
    }

    async fn delete_remote_only<R: Synced>(&self, id: &str) -> SyncResult<()> {
        if !self.is_online() {
            return Err(SyncError::Offline);
        }
        self.remote.delete_record(R::DATA_TYPE, id).await?;
        R::slot(&mut lock(&self.snapshot)).retain(|r| r.id() != id);
        Ok(())
    }

    /// Human-readable one-liner for the current phase.
    pub fn describe(&self) -> String {
        let state = self.state();
        match (state.phase, state.last_error.as_deref()) {
            (SyncPhase::Error, Some(message)) => format!("error: {message}"),
            (phase, _) => phase.to_string(),
        }
    }
}

impl Drop for SyncManager {
    fn drop(&mut self) {
        if let Some(handle) = lock(&self.retry).take() {
            handle.abort();
        }
    }
}
