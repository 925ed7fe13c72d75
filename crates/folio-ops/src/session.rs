// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Identity-scoped in-memory document sessions
//!
//! The store maps session ids to [`Session`] records. The map itself sits
//! behind an async `RwLock` and is only held for short, non-blocking
//! sections. Each session additionally owns a fair mutex around its document
//! that is held for the whole of one operation, so calls against one session
//! run strictly one after another (in arrival order) while calls against
//! different sessions proceed in parallel.

use crate::error::{OperationError, OperationResult};
use crate::identity::Identity;
use chrono::{DateTime, Utc};
use folio_api_contract::SessionSummary;
use folio_document::Document;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::ops::{Deref, DerefMut};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

/// Session lifecycle and resource limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Idle time after which the sweeper evicts a session
    pub ttl_secs: u64,

    /// How often the sweeper runs
    pub sweep_interval_secs: u64,

    /// Upper bound on live sessions. At the cap the least recently used idle
    /// session is evicted to make room; `None` or `0` disables the cap.
    pub max_sessions: Option<usize>,

    /// How long the id of a closed session keeps answering session-not-found
    /// instead of being adoptable again
    pub retired_id_retention_secs: u64,

    /// Budget for one library call or handler execution
    pub operation_timeout_secs: u64,

    /// Create a session under a caller-supplied id that the store does not
    /// know instead of failing with session-not-found
    pub adopt_unknown_ids: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 30 * 60,
            sweep_interval_secs: 60,
            max_sessions: Some(256),
            retired_id_retention_secs: 24 * 60 * 60,
            operation_timeout_secs: 30,
            adopt_unknown_ids: false,
        }
    }
}

impl SessionConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }

    pub fn retired_id_retention(&self) -> Duration {
        Duration::from_secs(self.retired_id_retention_secs)
    }

    /// Effective session cap
    pub fn capacity(&self) -> Option<usize> {
        self.max_sessions.filter(|&limit| limit > 0)
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout_secs.max(1))
    }

    pub fn missing_session_policy(&self) -> MissingSessionPolicy {
        if self.adopt_unknown_ids {
            MissingSessionPolicy::Create
        } else {
            MissingSessionPolicy::Reject
        }
    }
}

/// What `get_or_create` does with a supplied id the store does not hold
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingSessionPolicy {
    /// First reference creates the session under that id
    Create,
    /// Fail with session-not-found; evicted ids are never resurrected
    Reject,
}

/// One server-held document, owned by a single identity
#[derive(Debug)]
pub struct Session {
    id: String,
    owner: Identity,
    created_at: DateTime<Utc>,
    source_path: Option<PathBuf>,
    /// Store clock origin; access times are millisecond offsets from it
    clock: Instant,
    created_ms: u64,
    last_accessed_ms: AtomicU64,
    revision: AtomicU64,
    closed: AtomicBool,
    document: Arc<Mutex<Document>>,
}

impl Session {
    fn new(
        id: String,
        owner: Identity,
        document: Document,
        source_path: Option<PathBuf>,
        clock: Instant,
    ) -> Self {
        let now = clock.elapsed().as_millis() as u64;
        Self {
            id,
            owner,
            created_at: Utc::now(),
            source_path,
            clock,
            created_ms: now,
            last_accessed_ms: AtomicU64::new(now),
            revision: AtomicU64::new(0),
            closed: AtomicBool::new(false),
            document: Arc::new(Mutex::new(document)),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn owner(&self) -> &Identity {
        &self.owner
    }

    pub fn source_path(&self) -> Option<&PathBuf> {
        self.source_path.as_ref()
    }

    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::Acquire)
    }

    pub fn touch(&self) {
        let now = self.clock.elapsed().as_millis() as u64;
        self.last_accessed_ms.fetch_max(now, Ordering::AcqRel);
    }

    pub fn idle_for(&self) -> Duration {
        let now = self.clock.elapsed().as_millis() as u64;
        Duration::from_millis(now.saturating_sub(self.last_accessed_ms.load(Ordering::Acquire)))
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    pub fn last_accessed_at(&self) -> DateTime<Utc> {
        let offset = self
            .last_accessed_ms
            .load(Ordering::Acquire)
            .saturating_sub(self.created_ms);
        self.created_at + chrono::Duration::milliseconds(offset as i64)
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            id: self.id.clone(),
            created_at: self.created_at,
            last_accessed_at: self.last_accessed_at(),
            source_path: self.source_path.as_ref().map(|p| p.display().to_string()),
            revision: self.revision(),
        }
    }

    /// Wait for exclusive access to the document.
    ///
    /// Fails with session-not-found when the session was closed while the
    /// caller was queued.
    pub async fn lock(self: &Arc<Self>) -> OperationResult<SessionLease> {
        let guard = Arc::clone(&self.document).lock_owned().await;
        if self.is_closed() {
            return Err(OperationError::SessionNotFound(self.id.clone()));
        }
        self.touch();
        Ok(SessionLease {
            session: Arc::clone(self),
            guard,
        })
    }

    fn try_lock(self: &Arc<Self>) -> Option<OwnedMutexGuard<Document>> {
        Arc::clone(&self.document).try_lock_owned().ok()
    }
}

/// Exclusive access to one session's document for the duration of an
/// operation. Dropping it releases the session lock and records the access.
pub struct SessionLease {
    session: Arc<Session>,
    guard: OwnedMutexGuard<Document>,
}

impl SessionLease {
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn id(&self) -> &str {
        self.session.id()
    }

    /// Record a completed modification and return the new revision
    pub fn commit(&self) -> u64 {
        self.session.touch();
        self.session.revision.fetch_add(1, Ordering::AcqRel) + 1
    }
}

impl Deref for SessionLease {
    type Target = Document;

    fn deref(&self) -> &Document {
        &self.guard
    }
}

impl DerefMut for SessionLease {
    fn deref_mut(&mut self) -> &mut Document {
        &mut self.guard
    }
}

impl Drop for SessionLease {
    fn drop(&mut self) {
        self.session.touch();
    }
}

impl std::fmt::Debug for SessionLease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionLease").field("id", &self.session.id).finish()
    }
}

/// Live sessions plus the ids of recently closed ones
#[derive(Debug, Default)]
struct SessionTable {
    live: HashMap<String, Arc<Session>>,
    /// Closed ids and when they were retired. A retired id is never reused.
    retired: HashMap<String, Instant>,
}

impl SessionTable {
    fn retire(&mut self, id: &str) {
        self.live.remove(id);
        self.retired.insert(id.to_string(), Instant::now());
    }

    fn is_retired(&self, id: &str) -> bool {
        self.retired.contains_key(id)
    }

    fn prune_retired(&mut self, retention: Duration) {
        self.retired.retain(|_, at| at.elapsed() < retention);
    }
}

/// Registry of live sessions
#[derive(Debug)]
pub struct SessionStore {
    sessions: RwLock<SessionTable>,
    config: SessionConfig,
    clock: Instant,
}

impl SessionStore {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            sessions: RwLock::new(SessionTable::default()),
            config,
            clock: Instant::now(),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.live.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.live.is_empty()
    }

    fn generate_id() -> String {
        // v4 UUIDs draw 122 bits from the OS RNG
        uuid::Uuid::new_v4().to_string()
    }

    /// Look up a session owned by `identity`
    pub async fn get(&self, session_id: &str, identity: &Identity) -> OperationResult<Arc<Session>> {
        let sessions = self.sessions.read().await;
        let session = sessions
            .live
            .get(session_id)
            .filter(|s| !s.is_closed())
            .ok_or_else(|| OperationError::SessionNotFound(session_id.to_string()))?;
        if session.owner() != identity {
            debug!(session_id, caller = %identity, "Rejected access to foreign session");
            return Err(OperationError::Forbidden(session_id.to_string()));
        }
        Ok(Arc::clone(session))
    }

    /// Return the session named by `session_id`, or create one.
    ///
    /// `loader` supplies the initial document and its source path and is only
    /// invoked when a session is actually created. Ids of closed, swept or
    /// evicted sessions stay not-found under every policy.
    pub async fn get_or_create<F, Fut>(
        &self,
        session_id: Option<&str>,
        identity: &Identity,
        policy: MissingSessionPolicy,
        loader: F,
    ) -> OperationResult<Arc<Session>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = OperationResult<(Document, Option<PathBuf>)>>,
    {
        let id = match session_id {
            Some(id) => match self.get(id, identity).await {
                Err(OperationError::SessionNotFound(_)) if policy == MissingSessionPolicy::Create => {
                    if self.sessions.read().await.is_retired(id) {
                        debug!(session_id = id, "Refused to adopt a retired session id");
                        return Err(OperationError::SessionNotFound(id.to_string()));
                    }
                    id.to_string()
                }
                other => return other,
            },
            None => Self::generate_id(),
        };

        let (document, source_path) = loader().await?;
        let session = Arc::new(Session::new(
            id.clone(),
            identity.clone(),
            document,
            source_path,
            self.clock,
        ));

        let mut sessions = self.sessions.write().await;
        if sessions.is_retired(&id) {
            // Closed while we were loading
            return Err(OperationError::SessionNotFound(id));
        }
        if let Some(existing) = sessions.live.get(&id).filter(|s| !s.is_closed()) {
            // Someone else created it while we were loading: first reference wins
            if existing.owner() != identity {
                return Err(OperationError::Forbidden(id));
            }
            return Ok(Arc::clone(existing));
        }
        self.make_room(&mut sessions)?;
        sessions.live.insert(id.clone(), Arc::clone(&session));
        info!(session_id = %id, owner = %identity, live = sessions.live.len(), "Session created");
        Ok(session)
    }

    /// Evict the least recently used idle session when at capacity
    fn make_room(&self, sessions: &mut SessionTable) -> OperationResult<()> {
        let Some(limit) = self.config.capacity() else {
            return Ok(());
        };
        let closed: Vec<String> = sessions
            .live
            .values()
            .filter(|s| s.is_closed())
            .map(|s| s.id().to_string())
            .collect();
        for id in closed {
            sessions.retire(&id);
        }
        while sessions.live.len() >= limit {
            let mut candidates: Vec<&Arc<Session>> = sessions.live.values().collect();
            candidates.sort_by_key(|s| std::cmp::Reverse(s.idle_for()));
            let victim = candidates
                .into_iter()
                .find_map(|s| s.try_lock().map(|guard| (Arc::clone(s), guard)));
            let Some((victim, _guard)) = victim else {
                return Err(OperationError::SessionLimitReached { limit });
            };
            victim.close();
            sessions.retire(victim.id());
            info!(session_id = %victim.id(), limit, "Evicted least recently used session");
        }
        Ok(())
    }

    /// Refresh a session's last access time. Returns false if it is unknown.
    pub async fn touch(&self, session_id: &str) -> bool {
        match self.sessions.read().await.live.get(session_id) {
            Some(session) if !session.is_closed() => {
                session.touch();
                true
            }
            _ => false,
        }
    }

    /// Close a session explicitly. Waits for an in-flight operation on it.
    pub async fn remove(&self, session_id: &str, identity: &Identity) -> OperationResult<()> {
        let session = self.get(session_id, identity).await?;
        let lease = session.lock().await?;
        session.close();
        self.unlink(&session).await;
        drop(lease);
        info!(session_id, "Session closed");
        Ok(())
    }

    /// Drop a session without waiting for its lock. Used when an operation
    /// on it timed out and its document state can no longer be trusted.
    pub async fn evict(&self, session_id: &str) {
        let session = self.sessions.read().await.live.get(session_id).cloned();
        if let Some(session) = session {
            session.close();
            self.unlink(&session).await;
            info!(session_id, "Session evicted");
        }
    }

    async fn unlink(&self, session: &Arc<Session>) {
        let mut sessions = self.sessions.write().await;
        if sessions
            .live
            .get(session.id())
            .is_some_and(|current| Arc::ptr_eq(current, session))
        {
            sessions.retire(session.id());
        }
    }

    /// Remove every idle session not accessed within `ttl`. Sessions with an
    /// operation in flight are never swept. Also forgets retired ids older
    /// than the configured retention.
    pub async fn sweep(&self, ttl: Duration) -> Vec<String> {
        let mut sessions = self.sessions.write().await;
        let mut removed = Vec::new();
        for (id, session) in &sessions.live {
            if session.is_closed() {
                removed.push(id.clone());
                continue;
            }
            if session.idle_for() < ttl {
                continue;
            }
            if let Some(_guard) = session.try_lock() {
                session.close();
                removed.push(id.clone());
            }
        }
        for id in &removed {
            sessions.retire(id);
        }
        sessions.prune_retired(self.config.retired_id_retention());
        if !removed.is_empty() {
            info!(count = removed.len(), remaining = sessions.live.len(), "Swept idle sessions");
        }
        removed
    }

    /// Sessions owned by `identity`, oldest first
    pub async fn list(&self, identity: &Identity) -> Vec<SessionSummary> {
        let sessions = self.sessions.read().await;
        let mut items: Vec<SessionSummary> = sessions
            .live
            .values()
            .filter(|s| s.owner() == identity && !s.is_closed())
            .map(|s| s.summary())
            .collect();
        items.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        items
    }

    /// Run [`SessionStore::sweep`] every `sweep_interval`. The task ends by
    /// itself once the store is dropped.
    pub fn spawn_sweeper(self: &Arc<Self>) -> JoinHandle<()> {
        let store: Weak<Self> = Arc::downgrade(self);
        let period = self.config.sweep_interval();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(store) = store.upgrade() else {
                    debug!("Session store dropped, sweeper exiting");
                    break;
                };
                let ttl = store.config.ttl();
                store.sweep(ttl).await;
            }
        })
    }
}
