//! Shared application state.

use std::sync::Arc;

use consentry_core::{Clock, ConsentConfig, SystemClock};
use consentry_protocol::{ConsentEngine, ConsentSignalSink, NoopSink, SyncBridge};
use consentry_runtime::{ConsentSession, SessionRegistry};
use consentry_store::{PreferenceStore, SqliteStorage};

use crate::sync_worker::WebhookQueue;

/// Shared application state accessible from all route handlers.
pub struct AppState {
    pub config: ConsentConfig,
    pub storage: SqliteStorage,
    pub sessions: SessionRegistry,
    pub clock: Arc<dyn Clock>,
    webhook: Option<WebhookQueue>,
}

impl AppState {
    pub fn new(config: ConsentConfig, storage: SqliteStorage, webhook: Option<WebhookQueue>) -> Self {
        Self {
            config,
            storage,
            sessions: SessionRegistry::default(),
            clock: Arc::new(SystemClock),
            webhook,
        }
    }

    pub fn sync_target(&self) -> &'static str {
        if self.webhook.is_some() {
            "webhook"
        } else {
            "none"
        }
    }

    /// The visitor's consent slot.
    pub fn preference_store(&self, visitor_id: &str) -> PreferenceStore {
        PreferenceStore::new(
            Arc::new(self.storage.scoped(visitor_id)),
            self.config.policy.storage_key.clone(),
        )
    }

    fn sink_for(&self, visitor_id: &str) -> Arc<dyn ConsentSignalSink> {
        match &self.webhook {
            Some(queue) => queue.sink_for(visitor_id),
            None => Arc::new(NoopSink),
        }
    }

    /// A fresh page session for `visitor_id`. Not yet loaded or registered.
    pub fn new_session(&self, visitor_id: &str) -> ConsentSession {
        let policy = &self.config.policy;
        let engine = ConsentEngine::new(
            self.preference_store(visitor_id),
            Arc::new(SyncBridge::new(self.sink_for(visitor_id))),
            Arc::clone(&self.clock),
            policy,
        );
        ConsentSession::new(engine, policy)
    }
}

/// Visitor IDs become storage key prefixes, so keep them plain.
pub fn is_valid_visitor_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= 128
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
