//! Consent engine — applies visitor choices and owns the effective preferences.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use tracing::{info, warn};

use crate::expiry::ExpirationPolicy;
use crate::sync::SyncBridge;
use consentry_core::{Category, Clock, ConsentPolicy, ConsentRecord, PreferenceSet};
use consentry_store::PreferenceStore;

/// Result of a visitor decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SaveOutcome {
    pub record: ConsentRecord,
    /// False when storage refused the write. The choice still holds for the
    /// current page view, but the banner will ask again on the next one.
    pub persisted: bool,
}

/// What the stored consent says on page load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Evaluation {
    pub preferences: PreferenceSet,
    pub has_valid_record: bool,
}

/// Computes effective preferences and records visitor decisions.
pub struct ConsentEngine {
    store: PreferenceStore,
    expiry: ExpirationPolicy,
    bridge: Arc<SyncBridge>,
    clock: Arc<dyn Clock>,
    purge_expired: bool,
    /// Decision made during this page view, persisted or not.
    session_choice: RwLock<Option<PreferenceSet>>,
}

impl ConsentEngine {
    pub fn new(
        store: PreferenceStore,
        bridge: Arc<SyncBridge>,
        clock: Arc<dyn Clock>,
        policy: &ConsentPolicy,
    ) -> Self {
        Self {
            store,
            expiry: ExpirationPolicy::new(policy.max_age_years),
            bridge,
            clock,
            purge_expired: policy.purge_expired,
            session_choice: RwLock::new(None),
        }
    }

    pub fn bridge(&self) -> &SyncBridge {
        &self.bridge
    }

    pub fn store(&self) -> &PreferenceStore {
        &self.store
    }

    pub fn expiration_policy(&self) -> ExpirationPolicy {
        self.expiry
    }

    /// The stored record, if present and not expired.
    pub fn stored_record(&self) -> Option<ConsentRecord> {
        let record = self.store.read()?;
        if self.expiry.is_expired(Some(&record), self.clock.now()) {
            None
        } else {
            Some(record)
        }
    }

    /// Inspect stored consent on page load. Expired records are deleted when
    /// the policy asks for it.
    pub fn evaluate(&self) -> Evaluation {
        let now = self.clock.now();
        match self.store.read() {
            Some(record) if !self.expiry.is_expired(Some(&record), now) => Evaluation {
                preferences: record.preferences,
                has_valid_record: true,
            },
            Some(record) => {
                info!(
                    "Stored consent from {} expired at {}",
                    record.timestamp,
                    self.expiry.expires_at(&record)
                );
                if self.purge_expired {
                    if let Err(e) = self.store.clear() {
                        warn!("Failed to purge expired consent: {}", e);
                    }
                }
                Evaluation {
                    preferences: PreferenceSet::default_deny(),
                    has_valid_record: false,
                }
            }
            None => Evaluation {
                preferences: PreferenceSet::default_deny(),
                has_valid_record: false,
            },
        }
    }

    /// Preferences in force right now: this page view's decision, else the
    /// valid stored record, else default-deny.
    pub fn effective_preferences(&self) -> PreferenceSet {
        if let Some(choice) = *self.session_choice.read() {
            return choice;
        }
        self.stored_record()
            .map(|r| r.preferences)
            .unwrap_or_else(PreferenceSet::default_deny)
    }

    pub fn has_consent(&self, category: Category) -> bool {
        self.effective_preferences().is_granted(category)
    }

    /// Grant every category.
    pub fn accept_all(&self) -> SaveOutcome {
        self.apply(PreferenceSet::all_granted())
    }

    /// Grant only the necessary category.
    pub fn decline_all(&self) -> SaveOutcome {
        self.apply(PreferenceSet::default_deny())
    }

    /// Save an explicit selection. `necessary` is granted whatever was asked.
    pub fn save_custom(&self, requested: impl Into<PreferenceSet>) -> SaveOutcome {
        self.apply(requested.into())
    }

    /// Withdraw consent: delete the record and fall back to default-deny.
    ///
    /// Returns whether the stored record was removed.
    pub fn reset(&self) -> bool {
        let cleared = match self.store.clear() {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to clear stored consent: {}", e);
                false
            }
        };
        *self.session_choice.write() = None;
        self.bridge.push_update(&PreferenceSet::default_deny());
        info!("Consent withdrawn (cleared={})", cleared);
        cleared
    }

    fn apply(&self, preferences: PreferenceSet) -> SaveOutcome {
        let record = ConsentRecord::new(preferences, self.clock.now());
        let persisted = match self.store.write(&record) {
            Ok(()) => true,
            Err(e) => {
                warn!("Consent not persisted, keeping it for this session only: {}", e);
                false
            }
        };

        *self.session_choice.write() = Some(preferences);
        self.bridge.push_update(&preferences);

        info!(
            "Consent saved: granted={:?} persisted={}",
            preferences.granted_categories(),
            persisted
        );
        SaveOutcome { record, persisted }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::{ConsentMode, ConsentSignals, RecordingSink, SignalValue};
    use chrono::{Duration, TimeZone, Utc};
    use consentry_core::{FixedClock, PreferenceFlags};
    use consentry_store::{KeyValueStorage, MemoryStorage};

    struct Harness {
        engine: ConsentEngine,
        storage: Arc<MemoryStorage>,
        sink: Arc<RecordingSink>,
        clock: Arc<FixedClock>,
    }

    fn harness() -> Harness {
        let storage = Arc::new(MemoryStorage::new());
        let sink = Arc::new(RecordingSink::new());
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2025, 9, 1, 12, 0, 0).unwrap(),
        ));
        let policy = ConsentPolicy::immediate();
        let engine = ConsentEngine::new(
            PreferenceStore::new(storage.clone(), policy.storage_key.clone()),
            Arc::new(SyncBridge::new(sink.clone())),
            clock.clone(),
            &policy,
        );
        Harness {
            engine,
            storage,
            sink,
            clock,
        }
    }

    #[test]
    fn test_fresh_session_is_default_deny() {
        let h = harness();
        let prefs = h.engine.effective_preferences();
        assert!(prefs.necessary());
        assert!(!prefs.analytics && !prefs.marketing && !prefs.functional);
        assert!(!h.engine.evaluate().has_valid_record);
        assert!(h.engine.has_consent(Category::Necessary));
        assert!(!h.engine.has_consent(Category::Analytics));
    }

    #[test]
    fn test_accept_all_persists_and_syncs() {
        let h = harness();
        let outcome = h.engine.accept_all();
        assert!(outcome.persisted);
        assert_eq!(outcome.record.preferences, PreferenceSet::all_granted());
        assert_eq!(outcome.record.timestamp, h.clock.now());
        assert_eq!(outcome.record.version, "1.0");
        assert_eq!(h.engine.store().read(), Some(outcome.record.clone()));

        let last = h.sink.last().unwrap();
        assert_eq!(last.mode, ConsentMode::Update);
        assert_eq!(last.signals.ad_storage, SignalValue::Granted);
        assert_eq!(last.signals.personalization_storage, SignalValue::Granted);
    }

    #[test]
    fn test_accept_all_twice_differs_only_in_timestamp() {
        let h = harness();
        let first = h.engine.accept_all();
        h.clock.advance(Duration::milliseconds(250));
        let second = h.engine.accept_all();

        assert!(first.record.same_choices(&second.record));
        assert_ne!(first.record.timestamp, second.record.timestamp);
        assert_eq!(second.record.preferences, PreferenceSet::all_granted());
        assert_eq!(h.engine.store().read(), Some(second.record));
        assert_eq!(h.storage.len(), 1);
    }

    #[test]
    fn test_save_custom_forces_necessary() {
        let h = harness();
        let outcome = h.engine.save_custom(PreferenceFlags {
            necessary: false,
            analytics: true,
            marketing: false,
            functional: true,
        });
        assert!(outcome.record.preferences.necessary());
        let raw = h.storage.get("cookie-consent").unwrap().unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json["preferences"]["necessary"], true);
        assert_eq!(json["preferences"]["analytics"], true);
        assert_eq!(json["preferences"]["marketing"], false);
    }

    #[test]
    fn test_decline_all_scenario_signals() {
        let h = harness();
        let outcome = h.engine.decline_all();
        assert_eq!(outcome.record.preferences, PreferenceSet::default_deny());
        assert_eq!(h.sink.last().unwrap().signals, ConsentSignals::all_denied());
        assert!(h.engine.evaluate().has_valid_record);
    }

    #[test]
    fn test_expired_record_falls_back_and_is_purged() {
        let h = harness();
        let old = ConsentRecord::new(PreferenceSet::all_granted(), h.clock.now() - Duration::days(400));
        h.engine.store().write(&old).unwrap();

        assert!(h.engine.stored_record().is_none());
        assert!(h.engine.effective_preferences().is_default_deny());

        let eval = h.engine.evaluate();
        assert!(!eval.has_valid_record);
        assert!(eval.preferences.is_default_deny());
        assert!(h.storage.is_empty());
    }

    #[test]
    fn test_expired_record_kept_without_purge() {
        let storage = Arc::new(MemoryStorage::new());
        let clock = Arc::new(FixedClock::new(Utc::now()));
        let policy = ConsentPolicy {
            purge_expired: false,
            ..ConsentPolicy::immediate()
        };
        let engine = ConsentEngine::new(
            PreferenceStore::new(storage.clone(), "cookie-consent"),
            Arc::new(SyncBridge::disconnected()),
            clock.clone(),
            &policy,
        );
        engine
            .store()
            .write(&ConsentRecord::new(PreferenceSet::all_granted(), clock.now() - Duration::days(400)))
            .unwrap();
        assert!(!engine.evaluate().has_valid_record);
        assert_eq!(storage.len(), 1);
    }

    #[test]
    fn test_valid_record_is_effective() {
        let h = harness();
        let prefs = PreferenceSet::default_deny().with(Category::Analytics, true);
        h.engine
            .store()
            .write(&ConsentRecord::new(prefs, h.clock.now() - Duration::days(364)))
            .unwrap();
        assert_eq!(h.engine.effective_preferences(), prefs);
        let eval = h.engine.evaluate();
        assert!(eval.has_valid_record);
        assert_eq!(eval.preferences, prefs);
    }

    #[test]
    fn test_write_failure_is_session_only() {
        let h = harness();
        h.storage.set_fail_writes(true);

        let outcome = h.engine.accept_all();
        assert!(!outcome.persisted);
        assert_eq!(h.engine.effective_preferences(), PreferenceSet::all_granted());
        assert!(h.engine.store().read().is_none());
        // Downstream still hears about the decision.
        assert_eq!(h.sink.last().unwrap().signals.analytics_storage, SignalValue::Granted);
    }

    #[test]
    fn test_reset_withdraws_consent() {
        let h = harness();
        h.engine.accept_all();
        assert!(h.engine.reset());
        assert!(h.engine.effective_preferences().is_default_deny());
        assert!(h.storage.is_empty());
        assert_eq!(h.sink.last().unwrap().signals, ConsentSignals::all_denied());
    }
}
