//! Session collection ownership and persistence.
//!
//! The store is the sole mutator of the sessions collection. Every
//! mutation rewrites the whole collection under one versioned key, which
//! is safe here because all writers run on the same execution context.
//! Persistence failures are logged and never surfaced to the caller.

use std::sync::Arc;

use shared::chat::{ChatMessage, ChatSession, Feedback};
use shared::settings::SESSIONS_KEY;

use crate::storage::BlobStore;

pub struct SessionStore {
    store: Arc<dyn BlobStore>,
    sessions: Vec<ChatSession>,
    current_id: Option<String>,
}

impl SessionStore {
    /// Load the persisted collection; unparseable state starts fresh.
    pub fn new(store: Arc<dyn BlobStore>) -> Self {
        let sessions = match store.get(SESSIONS_KEY) {
            Ok(Some(json)) => serde_json::from_str::<Vec<ChatSession>>(&json).unwrap_or_else(|e| {
                tracing::warn!("discarding unparseable session history: {}", e);
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!(store = store.backend_name(), "session load failed: {}", e);
                Vec::new()
            }
        };
        let current_id = sessions.first().map(|s| s.id.clone());
        Self {
            store,
            sessions,
            current_id,
        }
    }

    /// Guarantee a current session exists, creating one when the
    /// collection is empty (app-start behavior).
    pub fn ensure_current(&mut self) -> String {
        if let Some(id) = &self.current_id {
            return id.clone();
        }
        self.create()
    }

    /// Create a session, front-insert it and make it current.
    pub fn create(&mut self) -> String {
        let session = ChatSession::new();
        let id = session.id.clone();
        self.sessions.insert(0, session);
        self.current_id = Some(id.clone());
        self.persist();
        id
    }

    pub fn select(&mut self, id: &str) -> bool {
        if self.sessions.iter().any(|s| s.id == id) {
            self.current_id = Some(id.to_string());
            true
        } else {
            false
        }
    }

    pub fn current_id(&self) -> Option<String> {
        self.current_id.clone()
    }

    pub fn current(&self) -> Option<&ChatSession> {
        let id = self.current_id.as_deref()?;
        self.sessions.iter().find(|s| s.id == id)
    }

    pub fn get(&self, id: &str) -> Option<&ChatSession> {
        self.sessions.iter().find(|s| s.id == id)
    }

    /// Delete a session. When the current session is deleted the most
    /// recently modified survivor becomes current; deleting the last
    /// session leaves no current session.
    pub fn delete(&mut self, id: &str) {
        let Some(pos) = self.sessions.iter().position(|s| s.id == id) else {
            return;
        };
        self.sessions.remove(pos);
        if self.current_id.as_deref() == Some(id) {
            self.current_id = self
                .sessions
                .iter()
                .max_by_key(|s| s.last_modified)
                .map(|s| s.id.clone());
        }
        self.persist();
    }

    /// Drop every session and the persisted blob.
    pub fn clear(&mut self) {
        self.sessions.clear();
        self.current_id = None;
        if let Err(e) = self.store.remove(SESSIONS_KEY) {
            tracing::warn!("failed to clear session history: {}", e);
        }
    }

    pub fn append_message(&mut self, session_id: &str, msg: ChatMessage) {
        if let Some(session) = self.sessions.iter_mut().find(|s| s.id == session_id) {
            session.push_message(msg);
            self.persist();
        }
    }

    /// Tri-state feedback toggle on one message; counts as a message
    /// mutation, so the session's last-modified timestamp moves.
    pub fn toggle_feedback(&mut self, session_id: &str, message_id: &str, feedback: Feedback) {
        let Some(session) = self.sessions.iter_mut().find(|s| s.id == session_id) else {
            return;
        };
        let Some(msg) = session.messages.iter_mut().find(|m| m.id == message_id) else {
            return;
        };
        msg.toggle_feedback(feedback);
        session.last_modified = shared::chat::now_millis();
        self.persist();
    }

    /// Display order: last-modified descending, computed at read time.
    pub fn list_recent(&self) -> Vec<&ChatSession> {
        let mut sessions: Vec<&ChatSession> = self.sessions.iter().collect();
        sessions.sort_by(|a, b| b.last_modified.cmp(&a.last_modified));
        sessions
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn persist(&self) {
        match serde_json::to_string(&self.sessions) {
            Ok(json) => {
                if let Err(e) = self.store.set(SESSIONS_KEY, &json) {
                    tracing::warn!(store = self.store.backend_name(), "session save failed: {}", e);
                }
            }
            Err(e) => tracing::warn!("session serialization failed: {}", e),
        }
    }
}
