// ── Runtime read/write configuration ──
//
// These types describe *how* the engines talk to the store: read modes,
// batching, retry policy. They never touch disk; `coolant-config` builds
// them from settings files and hands them in.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// How far back a time-range read looks, or how many points a last-n
/// read returns.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
pub enum ReadMode {
    #[default]
    #[serde(rename = "time_range")]
    #[strum(serialize = "time_range")]
    TimeRange,
    #[serde(rename = "last_n_points", alias = "last_n")]
    #[strum(to_string = "last_n_points", serialize = "last_n")]
    LastN,
}

/// InfluxQL duration unit.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
pub enum TimeUnit {
    #[serde(rename = "s")]
    #[strum(serialize = "s")]
    Seconds,
    #[serde(rename = "m")]
    #[strum(serialize = "m")]
    Minutes,
    #[default]
    #[serde(rename = "h")]
    #[strum(serialize = "h")]
    Hours,
    #[serde(rename = "d")]
    #[strum(serialize = "d")]
    Days,
    #[serde(rename = "w")]
    #[strum(serialize = "w")]
    Weeks,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub duration: u32,
    pub unit: TimeUnit,
}

impl Default for TimeRange {
    fn default() -> Self {
        Self {
            duration: 1,
            unit: TimeUnit::Hours,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastN {
    pub count: u32,
}

impl Default for LastN {
    fn default() -> Self {
        Self { count: 100 }
    }
}

/// Fully resolved read settings for one uid.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadSpec {
    pub mode: ReadMode,
    pub time_range: TimeRange,
    pub last_n: LastN,
}

/// Partial read settings layered over a `ReadSpec`. Unset fields inherit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadOverrides {
    pub mode: Option<ReadMode>,
    pub time_range: Option<TimeRange>,
    #[serde(alias = "last_n_points")]
    pub last_n: Option<LastN>,
    pub field_key: Option<String>,
}

impl ReadOverrides {
    pub fn apply(&self, base: &ReadSpec) -> ReadSpec {
        ReadSpec {
            mode: self.mode.unwrap_or(base.mode),
            time_range: self.time_range.unwrap_or(base.time_range),
            last_n: self.last_n.unwrap_or(base.last_n),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// What a named read profile covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadTarget {
    /// Every observable uid in the facility.
    Facility,
    Rooms(Vec<String>),
    Devices(Vec<String>),
    Uids(Vec<String>),
}

/// A named, preconfigured read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadProfile {
    pub target: ReadTarget,
    pub overrides: ReadOverrides,
    /// Falls back to `ReadConfig::include_unavailable` when unset.
    pub include_unavailable: Option<bool>,
}

/// Settings for a `DataReader`.
#[derive(Debug, Clone)]
pub struct ReadConfig {
    pub default: ReadSpec,
    /// Field read when neither an override nor the model names one.
    pub default_field_key: String,
    /// Per-uid settings, taking precedence over everything else.
    pub uid_overrides: HashMap<String, ReadOverrides>,
    pub max_uids_per_query: usize,
    /// Concurrent queries within one batch.
    pub parallelism: usize,
    /// Bound on each store call.
    pub timeout: Duration,
    pub include_unavailable: bool,
    pub profiles: HashMap<String, ReadProfile>,
}

impl Default for ReadConfig {
    fn default() -> Self {
        Self {
            default: ReadSpec::default(),
            default_field_key: "value".into(),
            uid_overrides: HashMap::new(),
            max_uids_per_query: 100,
            parallelism: 4,
            timeout: Duration::from_secs(10),
            include_unavailable: false,
            profiles: HashMap::new(),
        }
    }
}

/// Settings for one write channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelConfig {
    pub enabled: bool,
    /// Target database, or `None` for the store client's own.
    pub database: Option<String>,
    pub retention_policy: Option<String>,
    pub batch_size: usize,
    /// Total attempts per batch, the first one included.
    pub retry_times: u32,
    pub retry_interval: Duration,
    /// Bound on each store call.
    pub timeout: Duration,
}

impl ChannelConfig {
    pub fn prediction() -> Self {
        Self {
            batch_size: 100,
            ..Self::base()
        }
    }

    pub fn control() -> Self {
        Self {
            batch_size: 50,
            ..Self::base()
        }
    }

    fn base() -> Self {
        Self {
            enabled: true,
            database: None,
            retention_policy: Some("autogen".into()),
            batch_size: 100,
            retry_times: 3,
            retry_interval: Duration::from_secs(2),
            timeout: Duration::from_secs(10),
        }
    }
}

/// Settings for a `DataWriter`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteConfig {
    pub prediction: ChannelConfig,
    pub control: ChannelConfig,
}

impl Default for WriteConfig {
    fn default() -> Self {
        Self {
            prediction: ChannelConfig::prediction(),
            control: ChannelConfig::control(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn overrides_layer_field_by_field() {
        let base = ReadSpec::default();
        let overrides = ReadOverrides {
            mode: Some(ReadMode::LastN),
            last_n: Some(LastN { count: 5 }),
            ..ReadOverrides::default()
        };

        let spec = overrides.apply(&base);
        assert_eq!(spec.mode, ReadMode::LastN);
        assert_eq!(spec.last_n.count, 5);
        assert_eq!(spec.time_range, base.time_range);
        assert!(!overrides.is_empty());
        assert!(ReadOverrides::default().is_empty());
    }

    #[test]
    fn read_modes_parse_both_spellings() {
        assert_eq!(ReadMode::from_str("last_n_points").unwrap(), ReadMode::LastN);
        assert_eq!(ReadMode::from_str("last_n").unwrap(), ReadMode::LastN);
        assert_eq!(ReadMode::from_str("time_range").unwrap(), ReadMode::TimeRange);
        assert_eq!(TimeUnit::Minutes.to_string(), "m");
    }

    #[test]
    fn channel_defaults_differ_only_in_batch_size() {
        let config = WriteConfig::default();
        assert_eq!(config.prediction.batch_size, 100);
        assert_eq!(config.control.batch_size, 50);
        assert_eq!(config.control.retry_times, 3);
        assert_eq!(config.control.retry_interval, Duration::from_secs(2));
        assert_eq!(config.prediction.retention_policy.as_deref(), Some("autogen"));
    }
}
