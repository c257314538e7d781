//! Versioned consent record and its strict on-disk format.
//!
//! Stored form:
//! `{"preferences":{"necessary":true,"analytics":b,"marketing":b,"functional":b},"timestamp":"<ISO-8601>","version":"1.0"}`

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Serialize, Serializer};

use crate::error::{Error, Result};
use crate::preferences::PreferenceSet;

/// Schema tag written with every record. Records carrying any other version
/// are treated as absent.
pub const RECORD_VERSION: &str = "1.0";

/// A visitor's category choices at the moment they were made.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsentRecord {
    pub preferences: PreferenceSet,
    #[serde(serialize_with = "serialize_timestamp")]
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

fn serialize_timestamp<S: Serializer>(ts: &DateTime<Utc>, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Exact shape accepted from storage. Anything else is rejected.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct StoredRecord {
    preferences: StoredPreferences,
    timestamp: String,
    version: String,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct StoredPreferences {
    necessary: bool,
    analytics: bool,
    marketing: bool,
    functional: bool,
}

impl ConsentRecord {
    /// Stamp a new record at `now` with the current schema version.
    ///
    /// The timestamp is truncated to milliseconds, the precision of the stored
    /// format, so a written record reads back unchanged.
    pub fn new(preferences: PreferenceSet, now: DateTime<Utc>) -> Self {
        Self {
            preferences,
            timestamp: now.trunc_subsecs(3),
            version: RECORD_VERSION.to_string(),
        }
    }

    /// Parse and validate a stored record.
    pub fn parse(raw: &str) -> Result<Self> {
        let stored: StoredRecord = serde_json::from_str(raw)
            .map_err(|e| Error::InvalidRecord(format!("malformed JSON: {}", e)))?;

        if stored.version != RECORD_VERSION {
            return Err(Error::InvalidRecord(format!(
                "unsupported version {:?}",
                stored.version
            )));
        }
        if !stored.preferences.necessary {
            return Err(Error::InvalidRecord(
                "necessary category stored as revoked".into(),
            ));
        }

        let timestamp = DateTime::parse_from_rfc3339(&stored.timestamp)
            .map_err(|e| Error::InvalidRecord(format!("bad timestamp {:?}: {}", stored.timestamp, e)))?
            .with_timezone(&Utc);

        Ok(Self {
            preferences: PreferenceSet {
                analytics: stored.preferences.analytics,
                marketing: stored.preferences.marketing,
                functional: stored.preferences.functional,
            },
            timestamp,
            version: stored.version,
        })
    }

    /// Serialize to the stored JSON form.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Same choices, ignoring when they were made.
    pub fn same_choices(&self, other: &ConsentRecord) -> bool {
        self.preferences == other.preferences && self.version == other.version
    }
}
