//! Consent signal bridge to a downstream tag manager.
//!
//! Translates a [`PreferenceSet`] into the tag manager's consent vocabulary:
//!
//! | category     | signals                                      |
//! |--------------|----------------------------------------------|
//! | `analytics`  | `analytics_storage`                          |
//! | `marketing`  | `ad_storage`, `personalization_storage`      |
//! | `functional` | `functionality_storage`                      |
//!
//! `necessary` has no signal. Delivery is best-effort: when the downstream is
//! not loaded the push is skipped, and nothing here returns an error.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use consentry_core::PreferenceSet;

/// Which consent call is being made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsentMode {
    /// Pre-consent state, asserted before any decision is known.
    Default,
    /// A visitor decision.
    Update,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalValue {
    Granted,
    Denied,
}

impl From<bool> for SignalValue {
    fn from(granted: bool) -> Self {
        if granted {
            Self::Granted
        } else {
            Self::Denied
        }
    }
}

/// Downstream consent signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentSignals {
    pub analytics_storage: SignalValue,
    pub ad_storage: SignalValue,
    pub functionality_storage: SignalValue,
    pub personalization_storage: SignalValue,
}

impl ConsentSignals {
    pub fn all_denied() -> Self {
        Self::from(&PreferenceSet::default_deny())
    }
}

impl From<&PreferenceSet> for ConsentSignals {
    fn from(prefs: &PreferenceSet) -> Self {
        Self {
            analytics_storage: prefs.analytics.into(),
            ad_storage: prefs.marketing.into(),
            functionality_storage: prefs.functional.into(),
            personalization_storage: prefs.marketing.into(),
        }
    }
}

/// One consent call: `consent <mode> <signals>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentCommand {
    pub command: String,
    #[serde(rename = "type")]
    pub mode: ConsentMode,
    pub signals: ConsentSignals,
}

impl ConsentCommand {
    pub fn new(mode: ConsentMode, signals: ConsentSignals) -> Self {
        Self {
            command: "consent".into(),
            mode,
            signals,
        }
    }
}

/// Receiver of consent commands, e.g. a tag manager's command queue.
///
/// `send` must return without waiting on the downstream.
pub trait ConsentSignalSink: Send + Sync {
    /// Whether the downstream API is loaded.
    fn is_available(&self) -> bool;

    /// Hand a command to the downstream.
    fn send(&self, command: &ConsentCommand);

    fn name(&self) -> &'static str;
}

/// Downstream that never loaded.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl ConsentSignalSink for NoopSink {
    fn is_available(&self) -> bool {
        false
    }

    fn send(&self, _command: &ConsentCommand) {}

    fn name(&self) -> &'static str {
        "none"
    }
}

/// Logs every command.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ConsentSignalSink for TracingSink {
    fn is_available(&self) -> bool {
        true
    }

    fn send(&self, command: &ConsentCommand) {
        info!(
            "consent {:?}: analytics_storage={:?} ad_storage={:?} functionality_storage={:?} personalization_storage={:?}",
            command.mode,
            command.signals.analytics_storage,
            command.signals.ad_storage,
            command.signals.functionality_storage,
            command.signals.personalization_storage,
        );
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

/// Keeps every command it receives. Availability can be toggled to model a
/// tag manager that loads late.
#[derive(Debug)]
pub struct RecordingSink {
    available: AtomicBool,
    commands: Mutex<Vec<ConsentCommand>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self {
            available: AtomicBool::new(true),
            commands: Mutex::new(Vec::new()),
        }
    }

    /// A sink whose downstream has not loaded yet.
    pub fn unavailable() -> Self {
        let sink = Self::new();
        sink.set_available(false);
        sink
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn commands(&self) -> Vec<ConsentCommand> {
        self.commands.lock().clone()
    }

    pub fn last(&self) -> Option<ConsentCommand> {
        self.commands.lock().last().cloned()
    }
}

impl Default for RecordingSink {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsentSignalSink for RecordingSink {
    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    fn send(&self, command: &ConsentCommand) {
        self.commands.lock().push(command.clone());
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

/// Pushes consent state to the downstream sink.
pub struct SyncBridge {
    sink: Arc<dyn ConsentSignalSink>,
    default_sent: AtomicBool,
}

impl SyncBridge {
    pub fn new(sink: Arc<dyn ConsentSignalSink>) -> Self {
        Self {
            sink,
            default_sent: AtomicBool::new(false),
        }
    }

    /// A bridge with no downstream.
    pub fn disconnected() -> Self {
        Self::new(Arc::new(NoopSink))
    }

    pub fn is_available(&self) -> bool {
        self.sink.is_available()
    }

    pub fn sink_name(&self) -> &'static str {
        self.sink.name()
    }

    /// Assert the deny-everything default. Only the first delivered call has
    /// any effect.
    pub fn push_default_denied(&self) {
        if !self.sink.is_available() {
            debug!("Consent default skipped: {} sink unavailable", self.sink.name());
            return;
        }
        if self.default_sent.swap(true, Ordering::SeqCst) {
            return;
        }
        self.sink.send(&ConsentCommand::new(
            ConsentMode::Default,
            ConsentSignals::all_denied(),
        ));
        debug!("Consent default (all denied) pushed to {}", self.sink.name());
    }

    /// Forward a visitor decision.
    pub fn push_update(&self, preferences: &PreferenceSet) {
        if !self.sink.is_available() {
            debug!("Consent update skipped: {} sink unavailable", self.sink.name());
            return;
        }
        self.sink
            .send(&ConsentCommand::new(ConsentMode::Update, preferences.into()));
        debug!("Consent update pushed to {}", self.sink.name());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use consentry_core::Category;

    #[test]
    fn test_signal_mapping() {
        let prefs = PreferenceSet::default_deny()
            .with(Category::Analytics, true)
            .with(Category::Marketing, true);
        let signals = ConsentSignals::from(&prefs);
        assert_eq!(signals.analytics_storage, SignalValue::Granted);
        assert_eq!(signals.ad_storage, SignalValue::Granted);
        assert_eq!(signals.personalization_storage, SignalValue::Granted);
        assert_eq!(signals.functionality_storage, SignalValue::Denied);
    }

    #[test]
    fn test_command_wire_shape() {
        let cmd = ConsentCommand::new(
            ConsentMode::Update,
            ConsentSignals::from(&PreferenceSet::default_deny().with(Category::Functional, true)),
        );
        assert_eq!(
            serde_json::to_value(&cmd).unwrap(),
            serde_json::json!({
                "command": "consent",
                "type": "update",
                "signals": {
                    "analytics_storage": "denied",
                    "ad_storage": "denied",
                    "functionality_storage": "granted",
                    "personalization_storage": "denied",
                },
            })
        );
    }

    #[test]
    fn test_default_pushed_once() {
        let sink = Arc::new(RecordingSink::new());
        let bridge = SyncBridge::new(sink.clone());
        bridge.push_default_denied();
        bridge.push_default_denied();

        let commands = sink.commands();
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].mode, ConsentMode::Default);
        assert_eq!(commands[0].signals, ConsentSignals::all_denied());
    }

    #[test]
    fn test_unavailable_downstream_is_noop() {
        let sink = Arc::new(RecordingSink::unavailable());
        let bridge = SyncBridge::new(sink.clone());
        bridge.push_default_denied();
        bridge.push_update(&PreferenceSet::all_granted());
        assert!(sink.commands().is_empty());

        // Loads later: the default has not been delivered yet, so it still goes out.
        sink.set_available(true);
        bridge.push_default_denied();
        assert_eq!(sink.commands().len(), 1);

        SyncBridge::disconnected().push_update(&PreferenceSet::all_granted());
    }
}
