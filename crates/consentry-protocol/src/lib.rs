//! Consent protocol — expiration policy, consent engine, consent signal sync.
//!
//! The engine turns visitor choices into persisted consent records, the
//! expiration policy decides when those records must be re-collected, and the
//! sync bridge mirrors every decision to a downstream tag manager in its own
//! consent vocabulary.

pub mod engine;
pub mod expiry;
pub mod sync;

pub use engine::{ConsentEngine, Evaluation, SaveOutcome};
pub use expiry::ExpirationPolicy;
pub use sync::{
    ConsentCommand, ConsentMode, ConsentSignalSink, ConsentSignals, NoopSink, RecordingSink,
    SignalValue, SyncBridge, TracingSink,
};
