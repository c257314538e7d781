//! The single consent slot.
//!
//! All reads and writes of the consent record go through [`PreferenceStore`].
//! Reads never fail: anything that is not a valid current-version record is
//! reported as absent.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::storage::KeyValueStorage;
use consentry_core::{ConsentRecord, Result};

/// Reads and writes the consent record under one storage key.
#[derive(Clone)]
pub struct PreferenceStore {
    storage: Arc<dyn KeyValueStorage>,
    key: String,
}

impl PreferenceStore {
    pub fn new(storage: Arc<dyn KeyValueStorage>, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn backend_name(&self) -> &'static str {
        self.storage.backend_name()
    }

    /// Load the stored record, or `None` if there is no usable one.
    pub fn read(&self) -> Option<ConsentRecord> {
        let raw = match self.storage.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!("Failed to read consent slot {:?}: {}", self.key, e);
                return None;
            }
        };

        match ConsentRecord::parse(&raw) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Ignoring stored consent under {:?}: {}", self.key, e);
                None
            }
        }
    }

    /// Replace the stored record.
    pub fn write(&self, record: &ConsentRecord) -> Result<()> {
        let json = record.to_json()?;
        self.storage.set(&self.key, &json)?;
        debug!("Consent record written under {:?}", self.key);
        Ok(())
    }

    /// Remove the stored record.
    pub fn clear(&self) -> Result<()> {
        self.storage.remove(&self.key)
    }
}
