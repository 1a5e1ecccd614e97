//! Bounded in-memory session store with optional one-file-per-session
//! durability.
//!
//! The store hands out `Arc<tokio::sync::Mutex<Session>>` handles; a turn
//! holds the session lock for its full duration, which serializes turns for
//! the same session id while letting independent sessions run in parallel.
//! The index map itself is only touched under a short-lived std mutex, never
//! across an await point. File I/O goes through `tokio::fs` so a slow disk
//! cannot stall the reactor.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, warn};

use crate::session::Session;

pub type SessionHandle = Arc<AsyncMutex<Session>>;

pub struct SessionStore {
    inner: Mutex<Inner>,
    capacity: usize,
    persist_dir: Option<PathBuf>,
}

struct Inner {
    sessions: HashMap<String, SessionHandle>,
    /// Access order, least recently used first.
    lru: Vec<String>,
}

impl SessionStore {
    /// `capacity` bounds the number of resident sessions; the least recently
    /// used one is dropped from memory when the bound is exceeded. With a
    /// `persist_dir` configured, evicted sessions survive on disk and are
    /// reloaded on the next reference.
    pub fn new(capacity: usize, persist_dir: Option<PathBuf>) -> Self {
        assert!(capacity > 0, "session store capacity must be nonzero");
        Self {
            inner: Mutex::new(Inner {
                sessions: HashMap::new(),
                lru: Vec::new(),
            }),
            capacity,
            persist_dir,
        }
    }

    /// Returns the session for `session_id`, creating an empty one on first
    /// reference. Never fails: a missing or unreadable persisted file just
    /// yields a fresh session.
    pub async fn get_or_create(&self, session_id: &str) -> SessionHandle {
        {
            let mut inner = self.inner.lock().expect("session index poisoned");
            if let Some(handle) = inner.sessions.get(session_id) {
                let handle = Arc::clone(handle);
                touch(&mut inner.lru, session_id);
                return handle;
            }
        }

        // Cache miss: seed from disk if a persisted history exists. The
        // index lock is not held across the read, so re-check afterwards in
        // case a concurrent miss for the same id won the race.
        let loaded = self.load(session_id).await.unwrap_or_default();

        let mut inner = self.inner.lock().expect("session index poisoned");
        if let Some(handle) = inner.sessions.get(session_id) {
            let handle = Arc::clone(handle);
            touch(&mut inner.lru, session_id);
            return handle;
        }

        let handle = Arc::new(AsyncMutex::new(loaded));
        inner
            .sessions
            .insert(session_id.to_string(), Arc::clone(&handle));
        touch(&mut inner.lru, session_id);
        self.trim(&mut inner);
        handle
    }

    /// Evicts least-recently-used sessions down to capacity. A session whose
    /// handle is checked out by an in-flight turn must not be evicted:
    /// dropping it from the index would let the next `get_or_create` mint a
    /// second live session for the same id, breaking per-session-id
    /// serialization. Such entries are skipped; the store may stay over
    /// capacity until the handles are released.
    fn trim(&self, inner: &mut Inner) {
        while inner.sessions.len() > self.capacity {
            let candidate = inner.lru.iter().position(|id| {
                inner
                    .sessions
                    .get(id)
                    .map_or(true, |handle| Arc::strong_count(handle) == 1)
            });
            let Some(pos) = candidate else {
                break;
            };
            let evicted = inner.lru.remove(pos);
            inner.sessions.remove(&evicted);
            debug!(session_id = %evicted, "evicted least recently used session");
        }
    }

    /// Resets the history for `session_id`, in memory and on disk.
    /// Idempotent: unknown ids are a no-op.
    pub async fn clear(&self, session_id: &str) {
        let handle = {
            let inner = self.inner.lock().expect("session index poisoned");
            inner.sessions.get(session_id).map(Arc::clone)
        };
        if let Some(handle) = handle {
            handle.lock().await.clear();
        }
        if let Some(path) = self.session_path(session_id) {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!(session_id, "failed to remove persisted session: {e}"),
            }
        }
    }

    /// Writes the session history to its file. Durability is best-effort:
    /// callers log the error and carry on with the in-memory state.
    pub async fn persist(&self, session_id: &str, session: &Session) -> std::io::Result<()> {
        let Some(path) = self.session_path(session_id) else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_vec_pretty(&session.messages)?;
        tokio::fs::write(&path, json).await
    }

    async fn load(&self, session_id: &str) -> Option<Session> {
        let path = self.session_path(session_id)?;
        let bytes = tokio::fs::read(&path).await.ok()?;
        match serde_json::from_slice(&bytes) {
            Ok(messages) => {
                debug!(session_id, "reloaded persisted session history");
                Some(Session { messages })
            }
            Err(e) => {
                warn!(session_id, "ignoring corrupt session file: {e}");
                None
            }
        }
    }

    fn session_path(&self, session_id: &str) -> Option<PathBuf> {
        let dir = self.persist_dir.as_deref()?;
        Some(dir.join(format!("{}.json", sanitize_id(session_id))))
    }
}

/// Maps an opaque session id onto a safe file name. Collisions are possible
/// for pathological ids but session ids in practice are UUIDs or short
/// alphanumeric tokens.
fn sanitize_id(session_id: &str) -> String {
    let cleaned: String = session_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '-'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "session".to_string()
    } else {
        cleaned
    }
}

fn touch(lru: &mut Vec<String>, session_id: &str) {
    if let Some(pos) = lru.iter().position(|id| id == session_id) {
        lru.remove(pos);
    }
    lru.push(session_id.to_string());
}
