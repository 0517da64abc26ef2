//! In-memory session store
//!
//! Two maps: sessions by id, plus a (organization, item) key index. Both are
//! always mutated together, so an index entry never outlives its session.

use std::collections::HashMap;

use tracing::debug;

use super::{Session, SessionKey, SessionUpdate};

#[derive(Default)]
pub struct SessionStore {
    sessions: HashMap<String, Session>,
    by_key: HashMap<SessionKey, String>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert unless the key is already bound; returns the live session for
    /// the key either way, making creation idempotent.
    pub fn insert(&mut self, session: Session) -> Session {
        if let Some(id) = self.by_key.get(&session.key)
            && let Some(existing) = self.sessions.get(id)
        {
            debug!(session_id = %existing.id, "insert: key already bound, returning existing session");
            return existing.clone();
        }
        self.by_key.insert(session.key.clone(), session.id.clone());
        self.sessions.insert(session.id.clone(), session.clone());
        session
    }

    pub fn get(&self, id: &str) -> Option<Session> {
        self.sessions.get(id).cloned()
    }

    pub fn get_by_key(&self, key: &SessionKey) -> Option<Session> {
        self.by_key.get(key).and_then(|id| self.sessions.get(id)).cloned()
    }

    /// All sessions, oldest first.
    pub fn list(&self) -> Vec<Session> {
        let mut sessions: Vec<Session> = self.sessions.values().cloned().collect();
        sessions.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        sessions
    }

    /// Merge partial changes and bump the updated timestamp. Returns `None`
    /// for an unknown id.
    pub fn update(&mut self, id: &str, update: SessionUpdate) -> Option<Session> {
        let session = self.sessions.get_mut(id)?;
        if let Some(stage) = update.stage {
            session.stage = stage;
        }
        for (key, value) in update.working_data {
            session.working_data.insert(key, value);
        }
        for key in &update.remove_keys {
            session.working_data.remove(key);
        }
        session.transcript.extend(update.transcript);
        session.updated_at = chrono::Utc::now();
        Some(session.clone())
    }

    /// Remove a session and its key-index entry as a pair.
    pub fn delete(&mut self, id: &str) -> bool {
        match self.sessions.remove(id) {
            Some(session) => {
                self.by_key.remove(&session.key);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
