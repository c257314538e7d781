//! Consentry Core — consent record model, preference categories, configuration.

pub mod clock;
pub mod config;
pub mod error;
pub mod preferences;
pub mod record;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{ConsentConfig, ConsentPolicy, DataPaths};
pub use error::{Error, Result};
pub use preferences::{Category, PreferenceFlags, PreferenceSet};
pub use record::{ConsentRecord, RECORD_VERSION};
