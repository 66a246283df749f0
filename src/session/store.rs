//! Durable session store
//!
//! Live sessions are held in memory behind per-session async locks; every
//! completed exchange is mirrored to a sled database so histories survive a
//! restart. The map lock is a short-lived `std::sync` lock and is never held
//! across an await point.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, RwLock};

use tokio::sync::Mutex;

use crate::error::{ChatgateError, Result};
use crate::providers::base::{Role, Turn};

use super::Session;

/// In-memory session map with a sled mirror
///
/// Each session id maps to an `Arc<Mutex<Session>>`; callers lock the
/// session for the whole append-generate-append exchange so interleaved
/// messages for the same id serialize cleanly.
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Arc<Mutex<Session>>>>,
    db: sled::Db,
    system_prompt: String,
    max_history: usize,
}

impl SessionStore {
    /// Opens the store, creating the database directory if needed
    pub fn new(data_dir: &Path, system_prompt: &str, max_history: usize) -> Result<Self> {
        let db = sled::open(data_dir)
            .map_err(|e| ChatgateError::Storage(format!("failed to open {:?}: {}", data_dir, e)))?;
        Ok(Self {
            sessions: RwLock::new(HashMap::new()),
            db,
            system_prompt: system_prompt.to_string(),
            max_history,
        })
    }

    /// Maximum number of non-system turns a session retains
    pub fn max_history(&self) -> usize {
        self.max_history
    }

    /// Current system prompt applied to every session
    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Returns the session for `id`, creating it on first use
    pub fn session(&self, id: &str) -> Arc<Mutex<Session>> {
        {
            let sessions = self
                .sessions
                .read()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            if let Some(session) = sessions.get(id) {
                return Arc::clone(session);
            }
        }
        let mut sessions = self
            .sessions
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(
            sessions
                .entry(id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(Session::new(&self.system_prompt)))),
        )
    }

    /// Writes the session's turns to disk and flushes
    ///
    /// Called with the turn snapshot after a completed exchange; the caller
    /// still holds the session lock, so the mirror never lags a concurrent
    /// writer on the same id.
    pub fn persist_turns(&self, id: &str, turns: &[Turn]) -> Result<()> {
        let encoded = serde_json::to_vec(turns)?;
        self.db
            .insert(id.as_bytes(), encoded)
            .map_err(|e| ChatgateError::Storage(format!("failed to write session {}: {}", id, e)))?;
        self.db
            .flush()
            .map_err(|e| ChatgateError::Storage(format!("failed to flush: {}", e)))?;
        Ok(())
    }

    /// Clears a session's history in memory and on disk
    ///
    /// Returns whether the session existed in either layer. The emptied
    /// state is persisted before returning, so a crash right after a clear
    /// cannot resurrect the old history.
    pub async fn clear(&self, id: &str) -> Result<bool> {
        let existing = {
            let sessions = self
                .sessions
                .read()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            sessions.get(id).cloned()
        };

        // A known id counts as existing even when only the system turn is
        // left, so repeated clears still acknowledge "cleared".
        let in_memory = match existing {
            Some(session) => {
                let mut session = session.lock().await;
                session.reset(&self.system_prompt);
                self.persist_turns(id, session.turns())?;
                true
            }
            None => false,
        };

        let on_disk = self
            .db
            .contains_key(id.as_bytes())
            .map_err(|e| ChatgateError::Storage(format!("failed to read session {}: {}", id, e)))?;
        // A clear against an id never seen in memory still scrubs the mirror.
        if !in_memory && on_disk {
            self.db.remove(id.as_bytes()).map_err(|e| {
                ChatgateError::Storage(format!("failed to remove session {}: {}", id, e))
            })?;
            self.db
                .flush()
                .map_err(|e| ChatgateError::Storage(format!("failed to flush: {}", e)))?;
        }

        Ok(in_memory || on_disk)
    }

    /// Loads every persisted session into memory
    ///
    /// Records never reject a startup: a value that fails to parse, or one
    /// whose first turn is not the system turn, is repaired to a fresh
    /// single-system-turn session with a logged warning. Loaded sessions
    /// get the current system prompt and history window applied so stale
    /// records converge after a config change. Returns the number of
    /// sessions restored.
    pub fn load_all(&self) -> Result<usize> {
        let mut restored = 0;
        let mut repaired: Vec<String> = Vec::new();

        for entry in self.db.iter() {
            let (key, value) = entry
                .map_err(|e| ChatgateError::Storage(format!("failed to iterate: {}", e)))?;
            let id = match std::str::from_utf8(&key) {
                Ok(id) => id.to_string(),
                Err(_) => {
                    tracing::warn!("Removing session record with non-utf8 key");
                    self.db.remove(&key).map_err(|e| {
                        ChatgateError::Storage(format!("failed to remove record: {}", e))
                    })?;
                    continue;
                }
            };
            let session = match serde_json::from_slice::<Vec<Turn>>(&value) {
                Ok(turns) if turns.first().map_or(false, |t| t.role == Role::System) => {
                    let mut session = Session::from_turns(turns, &self.system_prompt);
                    session.trim(self.max_history);
                    session
                }
                Ok(_) => {
                    tracing::warn!(
                        "Repairing session record '{}' without a leading system turn",
                        id
                    );
                    repaired.push(id.clone());
                    Session::new(&self.system_prompt)
                }
                Err(e) => {
                    tracing::warn!("Repairing corrupt session record '{}': {}", id, e);
                    repaired.push(id.clone());
                    Session::new(&self.system_prompt)
                }
            };

            let mut sessions = self
                .sessions
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            sessions.insert(id, Arc::new(Mutex::new(session)));
            restored += 1;
        }

        for id in repaired {
            let fresh = Session::new(&self.system_prompt);
            self.persist_turns(&id, fresh.turns())?;
        }

        tracing::info!("Restored {} session(s) from disk", restored);
        Ok(restored)
    }
}
