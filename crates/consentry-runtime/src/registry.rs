//! Live consent sessions keyed by visitor.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::info;

use crate::session::ConsentSession;

/// Holds the current page session of each visitor, evicting the oldest
/// session once full.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Arc<ConsentSession>>>,
    max_sessions: usize,
}

impl SessionRegistry {
    pub fn new(max_sessions: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            max_sessions: max_sessions.max(1),
        }
    }

    /// Register a visitor's new page session, replacing any previous one.
    pub fn insert(&self, visitor_id: &str, session: ConsentSession) -> Arc<ConsentSession> {
        let session = Arc::new(session);
        let mut sessions = self.sessions.write();

        if !sessions.contains_key(visitor_id) && sessions.len() >= self.max_sessions {
            if let Some(oldest) = sessions
                .iter()
                .min_by_key(|(_, s)| s.created())
                .map(|(id, _)| id.clone())
            {
                sessions.remove(&oldest);
                info!("Evicted consent session for visitor {}", oldest);
            }
        }

        sessions.insert(visitor_id.to_string(), Arc::clone(&session));
        session
    }

    pub fn get(&self, visitor_id: &str) -> Option<Arc<ConsentSession>> {
        self.sessions.read().get(visitor_id).cloned()
    }

    pub fn remove(&self, visitor_id: &str) -> bool {
        self.sessions.write().remove(visitor_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(10_000)
    }
}
