// ── Store wire types ──
//
// Shapes exchanged with a time-series store. Kept free of any
// cooling-domain knowledge so the core crate owns all naming rules.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One timestamped numeric observation returned by a query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

impl Sample {
    pub fn new(timestamp: DateTime<Utc>, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// A single point destined for a measurement.
///
/// Tags and fields are kept in `BTreeMap`s so the encoded line is stable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub measurement: String,
    pub tags: BTreeMap<String, String>,
    pub fields: BTreeMap<String, f64>,
    /// Unix timestamp in nanoseconds.
    pub timestamp_ns: i64,
}

impl Point {
    pub fn new(measurement: impl Into<String>, timestamp_ns: i64) -> Self {
        Self {
            measurement: measurement.into(),
            tags: BTreeMap::new(),
            fields: BTreeMap::new(),
            timestamp_ns,
        }
    }

    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn field(mut self, key: impl Into<String>, value: f64) -> Self {
        self.fields.insert(key.into(), value);
        self
    }
}

/// Where a batch of points lands.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WriteTarget {
    /// Database override, or `None` for the client's own database.
    pub database: Option<String>,
    /// Retention policy, or `None` for the database default.
    pub retention_policy: Option<String>,
}

impl WriteTarget {
    pub fn new(database: Option<String>, retention_policy: Option<String>) -> Self {
        Self {
            database,
            retention_policy,
        }
    }
}
