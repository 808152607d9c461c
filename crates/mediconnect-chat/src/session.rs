//! Per-session storage of conversation turns.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use mediconnect_core::{ConversationTurn, SessionId};

use crate::error::ChatError;

/// Get/set access to the stored turns of a session.
pub trait SessionStore: Send + Sync {
    /// Stored turns, or `None` for an unknown session.
    fn get(&self, id: &SessionId) -> Result<Option<Vec<ConversationTurn>>, ChatError>;

    /// Replace the stored turns of a session.
    fn set(&self, id: &SessionId, turns: Vec<ConversationTurn>) -> Result<(), ChatError>;
}

#[derive(Debug)]
struct SessionEntry {
    turns: Vec<ConversationTurn>,
    last_active: DateTime<Utc>,
}

/// Process-local session store.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: Mutex<HashMap<SessionId, SessionEntry>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop sessions not written since `now - max_idle`. Returns how many
    /// were removed.
    pub fn prune_idle(&self, max_idle: Duration, now: DateTime<Utc>) -> Result<usize, ChatError> {
        let mut sessions = self.lock()?;
        let before = sessions.len();
        sessions.retain(|_, entry| now - entry.last_active <= max_idle);
        let removed = before - sessions.len();
        if removed > 0 {
            debug!(removed, "Pruned idle chat sessions");
        }
        Ok(removed)
    }

    fn lock(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<SessionId, SessionEntry>>, ChatError> {
        self.sessions
            .lock()
            .map_err(|e| ChatError::Session(format!("session lock poisoned: {}", e)))
    }
}

impl SessionStore for InMemorySessionStore {
    fn get(&self, id: &SessionId) -> Result<Option<Vec<ConversationTurn>>, ChatError> {
        Ok(self.lock()?.get(id).map(|entry| entry.turns.clone()))
    }

    fn set(&self, id: &SessionId, turns: Vec<ConversationTurn>) -> Result<(), ChatError> {
        self.lock()?.insert(
            *id,
            SessionEntry {
                turns,
                last_active: Utc::now(),
            },
        );
        Ok(())
    }
}
