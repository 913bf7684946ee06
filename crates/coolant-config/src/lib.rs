//! Settings and architecture loading for coolant.
//!
//! TOML or YAML settings (store profiles, read/write policies, shutdown
//! timeout) merged with `COOLANT_` environment overrides, credential
//! resolution, and translation into `coolant_core` runtime config and
//! ready-to-use engines.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml, Yaml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use coolant_api::{Credentials, InfluxClient, TlsMode, TransportConfig};
use coolant_core::{
    BuildReport, ChannelConfig, DataReader, DataWriter, LastN, ReadConfig, ReadMode,
    ReadOverrides, ReadProfile, ReadSpec, ReadTarget, TimeRange, WriteConfig,
};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no credentials configured for store '{profile}'")]
    NoCredentials { profile: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("architecture document rejected: {0}")]
    Architecture(#[from] coolant_core::ConfigError),

    #[error("store client setup failed: {0}")]
    Store(#[from] coolant_api::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

fn invalid(field: impl Into<String>, reason: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}

// ── Settings file structs ───────────────────────────────────────────

/// Top-level settings document.
#[derive(Debug, Deserialize, Serialize)]
pub struct Settings {
    /// Store profile used when a section does not name one.
    pub default_store: Option<String>,

    /// Path to the architecture document, relative to the working directory.
    pub architecture: Option<PathBuf>,

    /// Seconds to wait for in-flight writes at shutdown. `0` waits forever.
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout: u64,

    /// Named store connections.
    #[serde(default)]
    pub stores: HashMap<String, StoreProfile>,

    #[serde(default)]
    pub read: ReadSection,

    #[serde(default)]
    pub write: WriteSection,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_store: Some("default".into()),
            architecture: None,
            shutdown_timeout: default_shutdown_timeout(),
            stores: HashMap::new(),
            read: ReadSection::default(),
            write: WriteSection::default(),
        }
    }
}

fn default_shutdown_timeout() -> u64 {
    30
}

/// One InfluxDB connection.
#[derive(Debug, Deserialize, Serialize)]
pub struct StoreProfile {
    /// Server root, e.g. "http://influx.plant.local:8086".
    pub url: String,

    pub database: String,

    pub username: Option<String>,

    /// Password in plaintext. Prefer `password_env`.
    pub password: Option<String>,

    /// Environment variable holding the password.
    pub password_env: Option<String>,

    /// Request timeout in seconds.
    pub timeout: Option<u64>,

    /// Path to a custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    #[serde(default)]
    pub insecure: bool,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct ReadSection {
    /// Store profile to read from.
    pub store: Option<String>,
    pub mode: ReadMode,
    pub time_range: TimeRange,
    #[serde(alias = "last_n_points")]
    pub last_n: LastN,
    pub default_field_key: String,
    pub max_uids_per_query: usize,
    pub parallelism: usize,
    /// Seconds per query.
    pub timeout: u64,
    pub include_unavailable: bool,
    pub uid_overrides: HashMap<String, ReadOverrides>,
    pub profiles: HashMap<String, ReadProfileSection>,
}

impl Default for ReadSection {
    fn default() -> Self {
        let defaults = ReadConfig::default();
        Self {
            store: None,
            mode: defaults.default.mode,
            time_range: defaults.default.time_range,
            last_n: defaults.default.last_n,
            default_field_key: defaults.default_field_key,
            max_uids_per_query: defaults.max_uids_per_query,
            parallelism: defaults.parallelism,
            timeout: defaults.timeout.as_secs(),
            include_unavailable: defaults.include_unavailable,
            uid_overrides: HashMap::new(),
            profiles: HashMap::new(),
        }
    }
}

/// Which uids a read profile covers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadMethod {
    #[default]
    #[serde(alias = "facility")]
    AllObservable,
    #[serde(alias = "rooms")]
    Room,
    #[serde(alias = "devices")]
    Device,
    #[serde(alias = "uids")]
    SpecificUids,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ReadProfileSection {
    pub method: ReadMethod,
    pub room_uids: Vec<String>,
    pub device_uids: Vec<String>,
    pub specific_uids: Vec<String>,
    pub include_unavailable: Option<bool>,
    pub mode: Option<ReadMode>,
    pub time_range: Option<TimeRange>,
    #[serde(alias = "last_n_points")]
    pub last_n: Option<LastN>,
    pub field_key: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct WriteSection {
    pub prediction: ChannelSection,
    pub control: ChannelSection,
}

/// Write channel settings. Unset fields keep the channel's defaults.
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ChannelSection {
    pub enabled: Option<bool>,
    /// Store profile to write to.
    pub store: Option<String>,
    /// Database override on that store.
    pub database: Option<String>,
    /// Retention policy. An empty string uses the database default.
    pub retention_policy: Option<String>,
    pub batch_size: Option<usize>,
    pub retry_times: Option<u32>,
    /// Seconds between attempts.
    pub retry_interval: Option<u64>,
    /// Seconds per store call.
    pub timeout: Option<u64>,
}

// ── Paths ───────────────────────────────────────────────────────────

/// Resolve the settings file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("io", "coolant", "coolant").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("coolant.toml");
            p
        },
        |dirs| dirs.config_dir().join("coolant.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("coolant");
    p
}

fn is_yaml(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"))
}

// ── Loading ─────────────────────────────────────────────────────────

/// Load settings from the canonical path plus environment.
pub fn load_settings() -> Result<Settings, ConfigError> {
    load_settings_from(&config_path())
}

/// Load settings from `path` (TOML, or YAML by extension) plus
/// `COOLANT_` environment variables. Nested keys use `__`, e.g.
/// `COOLANT_READ__PARALLELISM=8`. A missing file yields the defaults.
pub fn load_settings_from(path: &Path) -> Result<Settings, ConfigError> {
    let figment = Figment::new().merge(Serialized::defaults(Settings::default()));
    let figment = if is_yaml(path) {
        figment.merge(Yaml::file(path))
    } else {
        figment.merge(Toml::file(path))
    };
    let settings: Settings = figment
        .merge(Env::prefixed("COOLANT_").split("__"))
        .extract()?;
    debug!(path = %path.display(), stores = settings.stores.len(), "settings loaded");
    Ok(settings)
}

/// Serialize settings to TOML at `path`.
pub fn save_settings(settings: &Settings, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, toml::to_string_pretty(settings)?)?;
    Ok(())
}

/// Read an architecture document (YAML, or TOML by extension) into a
/// JSON tree for [`coolant_core::build`].
pub fn load_architecture(path: &Path) -> Result<serde_json::Value, ConfigError> {
    if !path.is_file() {
        return Err(ConfigError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("architecture document not found: {}", path.display()),
        )));
    }
    let figment = if is_yaml(path) {
        Figment::from(Yaml::file(path))
    } else {
        Figment::from(Toml::file(path))
    };
    Ok(figment.extract()?)
}

/// Load and build the facility described at `path`.
pub fn load_facility(path: &Path) -> Result<BuildReport, ConfigError> {
    let document = load_architecture(path)?;
    let report = coolant_core::build_with_report(&document)?;
    info!(
        path = %path.display(),
        warnings = report.warnings.len(),
        "architecture loaded"
    );
    Ok(report)
}

// ── Credential resolution ───────────────────────────────────────────

/// Resolve basic-auth credentials for a store profile.
///
/// No username means no auth. With a username, the password comes from
/// `password_env`, then `COOLANT_<PROFILE>_PASSWORD`, then plaintext.
pub fn resolve_credentials(
    profile: &StoreProfile,
    profile_name: &str,
) -> Result<Option<Credentials>, ConfigError> {
    let Some(username) = profile.username.clone() else {
        return Ok(None);
    };

    // 1. Profile's password_env
    if let Some(ref env_name) = profile.password_env {
        if let Ok(pw) = std::env::var(env_name) {
            return Ok(Some(credentials(username, pw)));
        }
    }

    // 2. Conventional env var
    let conventional = format!("COOLANT_{}_PASSWORD", profile_name.to_ascii_uppercase());
    if let Ok(pw) = std::env::var(&conventional) {
        return Ok(Some(credentials(username, pw)));
    }

    // 3. Plaintext in config
    if let Some(ref pw) = profile.password {
        return Ok(Some(credentials(username, pw.clone())));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

fn credentials(username: String, password: String) -> Credentials {
    Credentials {
        username,
        password: SecretString::from(password),
    }
}

// ── Translation to runtime config ───────────────────────────────────

impl Settings {
    /// Load from the canonical path. See [`load_settings_from`].
    pub fn load() -> Result<Self, ConfigError> {
        load_settings()
    }

    pub fn store(&self, name: &str) -> Result<&StoreProfile, ConfigError> {
        self.stores
            .get(name)
            .ok_or_else(|| invalid("store", format!("no store profile named '{name}'")))
    }

    fn store_name<'a>(&'a self, section: Option<&'a str>, field: &str) -> Result<&'a str, ConfigError> {
        section
            .or(self.default_store.as_deref())
            .ok_or_else(|| invalid(field, "no store named and no default_store set"))
    }

    /// Build a client for the named store profile.
    pub fn store_endpoint(&self, name: &str) -> Result<InfluxClient, ConfigError> {
        let profile = self.store(name)?;
        let url: url::Url = profile
            .url
            .parse()
            .map_err(|_| invalid("url", format!("invalid URL: {}", profile.url)))?;

        let tls = if profile.insecure {
            TlsMode::DangerAcceptInvalid
        } else if let Some(ref ca_path) = profile.ca_cert {
            TlsMode::CustomCa(ca_path.clone())
        } else {
            TlsMode::System
        };
        let transport = TransportConfig {
            tls,
            timeout: Duration::from_secs(profile.timeout.unwrap_or(10)),
        };

        let client = InfluxClient::new(url, &profile.database, &transport)?;
        Ok(match resolve_credentials(profile, name)? {
            Some(credentials) => client.with_credentials(credentials),
            None => client,
        })
    }

    pub fn read_config(&self) -> Result<ReadConfig, ConfigError> {
        let read = &self.read;
        if read.max_uids_per_query == 0 {
            return Err(invalid("read.max_uids_per_query", "must be at least 1"));
        }
        if read.parallelism == 0 {
            return Err(invalid("read.parallelism", "must be at least 1"));
        }

        let profiles = read
            .profiles
            .iter()
            .map(|(name, section)| Ok((name.clone(), read_profile(name, section)?)))
            .collect::<Result<HashMap<_, _>, ConfigError>>()?;

        Ok(ReadConfig {
            default: ReadSpec {
                mode: read.mode,
                time_range: read.time_range,
                last_n: read.last_n,
            },
            default_field_key: read.default_field_key.clone(),
            uid_overrides: read.uid_overrides.clone(),
            max_uids_per_query: read.max_uids_per_query,
            parallelism: read.parallelism,
            timeout: Duration::from_secs(read.timeout),
            include_unavailable: read.include_unavailable,
            profiles,
        })
    }

    pub fn write_config(&self) -> Result<WriteConfig, ConfigError> {
        Ok(WriteConfig {
            prediction: channel_config(
                "write.prediction",
                &self.write.prediction,
                ChannelConfig::prediction(),
            )?,
            control: channel_config("write.control", &self.write.control, ChannelConfig::control())?,
        })
    }

    /// `None` means wait for in-flight writes without a limit.
    pub fn shutdown_timeout(&self) -> Option<Duration> {
        (self.shutdown_timeout > 0).then(|| Duration::from_secs(self.shutdown_timeout))
    }

    /// A reader on the read section's store.
    pub fn reader(&self) -> Result<DataReader<InfluxClient>, ConfigError> {
        let store = self.store_name(self.read.store.as_deref(), "read.store")?;
        let client = self.store_endpoint(store)?;
        Ok(DataReader::new(Arc::new(client), self.read_config()?))
    }

    /// A writer with each channel on its own store.
    pub fn writer(&self) -> Result<DataWriter<InfluxClient>, ConfigError> {
        let prediction =
            self.store_name(self.write.prediction.store.as_deref(), "write.prediction.store")?;
        let control = self.store_name(self.write.control.store.as_deref(), "write.control.store")?;
        Ok(DataWriter::with_stores(
            Arc::new(self.store_endpoint(prediction)?),
            Arc::new(self.store_endpoint(control)?),
            self.write_config()?,
        ))
    }
}

fn read_profile(name: &str, section: &ReadProfileSection) -> Result<ReadProfile, ConfigError> {
    let (uids, key) = match section.method {
        ReadMethod::AllObservable => (None, ""),
        ReadMethod::Room => (Some(&section.room_uids), "room_uids"),
        ReadMethod::Device => (Some(&section.device_uids), "device_uids"),
        ReadMethod::SpecificUids => (Some(&section.specific_uids), "specific_uids"),
    };
    if uids.is_some_and(Vec::is_empty) {
        return Err(invalid(
            format!("read.profiles.{name}.{key}"),
            "must list at least one uid",
        ));
    }

    let target = match section.method {
        ReadMethod::AllObservable => ReadTarget::Facility,
        ReadMethod::Room => ReadTarget::Rooms(section.room_uids.clone()),
        ReadMethod::Device => ReadTarget::Devices(section.device_uids.clone()),
        ReadMethod::SpecificUids => ReadTarget::Uids(section.specific_uids.clone()),
    };

    Ok(ReadProfile {
        target,
        overrides: ReadOverrides {
            mode: section.mode,
            time_range: section.time_range,
            last_n: section.last_n,
            field_key: section.field_key.clone(),
        },
        include_unavailable: section.include_unavailable,
    })
}

fn channel_config(
    field: &str,
    section: &ChannelSection,
    defaults: ChannelConfig,
) -> Result<ChannelConfig, ConfigError> {
    let batch_size = section.batch_size.unwrap_or(defaults.batch_size);
    if batch_size == 0 {
        return Err(invalid(format!("{field}.batch_size"), "must be at least 1"));
    }

    let retention_policy = match section.retention_policy.as_deref() {
        Some("") => None,
        Some(rp) => Some(rp.to_owned()),
        None => defaults.retention_policy,
    };

    Ok(ChannelConfig {
        enabled: section.enabled.unwrap_or(defaults.enabled),
        database: section.database.clone().or(defaults.database),
        retention_policy,
        batch_size,
        retry_times: section.retry_times.unwrap_or(defaults.retry_times),
        retry_interval: section
            .retry_interval
            .map_or(defaults.retry_interval, Duration::from_secs),
        timeout: section.timeout.map_or(defaults.timeout, Duration::from_secs),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn empty_channel_section_keeps_defaults() {
        let config = channel_config("write.control", &ChannelSection::default(), ChannelConfig::control())
            .unwrap();
        assert_eq!(config, ChannelConfig::control());
    }

    #[test]
    fn empty_retention_policy_clears_default() {
        let section = ChannelSection {
            retention_policy: Some(String::new()),
            ..ChannelSection::default()
        };
        let config = channel_config("write.prediction", &section, ChannelConfig::prediction()).unwrap();
        assert_eq!(config.retention_policy, None);
    }

    #[test]
    fn profile_methods_need_their_uid_lists() {
        let section = ReadProfileSection {
            method: ReadMethod::Room,
            ..ReadProfileSection::default()
        };
        let err = read_profile("rooms", &section).unwrap_err();
        assert!(err.to_string().contains("read.profiles.rooms.room_uids"), "{err}");

        let facility = read_profile("all", &ReadProfileSection::default()).unwrap();
        assert_eq!(facility.target, ReadTarget::Facility);
    }

    #[test]
    fn yaml_is_chosen_by_extension() {
        assert!(is_yaml(Path::new("architecture.yaml")));
        assert!(is_yaml(Path::new("architecture.YML")));
        assert!(!is_yaml(Path::new("coolant.toml")));
    }
}
