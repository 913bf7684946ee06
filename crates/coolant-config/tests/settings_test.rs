// Integration tests for settings and architecture loading from disk.
#![allow(clippy::unwrap_used)]

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use pretty_assertions::assert_eq;
use secrecy::ExposeSecret;
use tempfile::TempDir;

use coolant_config::{
    ConfigError, Settings, StoreProfile, load_architecture, load_facility, load_settings_from,
    resolve_credentials, save_settings,
};
use coolant_core::{ReadMode, ReadTarget, TimeUnit};

// ── Helpers ─────────────────────────────────────────────────────────

fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).unwrap();
    path
}

const SETTINGS: &str = r#"
default_store = "status"
shutdown_timeout = 45

[stores.status]
url = "http://influx.plant.local:8086"
database = "dc_status"

[stores.control]
url = "http://influx.plant.local:8086"
database = "dc_control"
username = "optimizer"
password = "hunter2"
password_env = "COOLANT_TEST_PASSWORD_THAT_IS_NEVER_SET"

[read]
mode = "last_n_points"
last_n = { count = 12 }
time_range = { duration = 30, unit = "m" }
max_uids_per_query = 50

[read.uid_overrides.ch_1_supply]
field_key = "raw"

[read.profiles.chillers]
method = "device"
device_uids = ["CH_1", "CH_2"]
include_unavailable = true
mode = "time_range"

[write.prediction]
database = "dc_prediction"
batch_size = 200

[write.control]
store = "control"
retry_times = 5
retry_interval = 1
retention_policy = ""
"#;

const ARCHITECTURE: &str = r"
facility:
  name: DC-1
  uid: DC_1
  rooms:
    - name: Room A1
      uid: CR_A1
      room_tag: computer_room
      air_systems:
        - name: Air loop A1
          uid: AS_A1
          air_conditioners:
            - name: AC A1-001
              uid: AC_A1_001
              attributes:
                - { name: supply_temp, uid: ac_a1_001_supply, kind: telemetry, field_key: value }
            - name: broken
";

// ── Settings ────────────────────────────────────────────────────────

#[test]
fn test_settings_translate_into_runtime_config() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "coolant.toml", SETTINGS);

    let settings = load_settings_from(&path).unwrap();
    let read = settings.read_config().unwrap();

    assert_eq!(read.default.mode, ReadMode::LastN);
    assert_eq!(read.default.last_n.count, 12);
    assert_eq!(read.default.time_range.unit, TimeUnit::Minutes);
    assert_eq!(read.max_uids_per_query, 50);
    assert_eq!(read.parallelism, 4);
    assert_eq!(read.uid_overrides["ch_1_supply"].field_key.as_deref(), Some("raw"));

    let chillers = &read.profiles["chillers"];
    assert_eq!(
        chillers.target,
        ReadTarget::Devices(vec!["CH_1".into(), "CH_2".into()])
    );
    assert_eq!(chillers.overrides.mode, Some(ReadMode::TimeRange));
    assert_eq!(chillers.include_unavailable, Some(true));

    let write = settings.write_config().unwrap();
    assert_eq!(write.prediction.batch_size, 200);
    assert_eq!(write.prediction.database.as_deref(), Some("dc_prediction"));
    assert_eq!(write.prediction.retry_times, 3);
    assert_eq!(write.control.batch_size, 50);
    assert_eq!(write.control.retry_times, 5);
    assert_eq!(write.control.retry_interval, Duration::from_secs(1));
    assert_eq!(write.control.retention_policy, None);

    assert_eq!(settings.shutdown_timeout(), Some(Duration::from_secs(45)));
}

#[test]
fn test_missing_settings_file_yields_defaults() {
    let dir = TempDir::new().unwrap();
    let settings = load_settings_from(&dir.path().join("absent.toml")).unwrap();

    assert_eq!(settings.default_store.as_deref(), Some("default"));
    assert_eq!(settings.read_config().unwrap().max_uids_per_query, 100);
    assert_eq!(settings.write_config().unwrap().prediction.batch_size, 100);
}

#[test]
fn test_invalid_values_are_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "coolant.toml", "[read]\nparallelism = 0\n[write.control]\nbatch_size = 0\n");
    let settings = load_settings_from(&path).unwrap();

    assert!(matches!(settings.read_config(), Err(ConfigError::Validation { .. })));
    assert!(matches!(settings.write_config(), Err(ConfigError::Validation { .. })));
}

#[test]
fn test_settings_round_trip_through_save() {
    let dir = TempDir::new().unwrap();
    let source = load_settings_from(&write(&dir, "coolant.toml", SETTINGS)).unwrap();
    let saved = dir.path().join("nested").join("saved.toml");

    save_settings(&source, &saved).unwrap();
    let reloaded = load_settings_from(&saved).unwrap();

    assert_eq!(reloaded.stores.len(), 2);
    assert_eq!(reloaded.write.control.retry_times, Some(5));
}

#[test]
fn test_store_endpoints() {
    let dir = TempDir::new().unwrap();
    let settings = load_settings_from(&write(&dir, "coolant.toml", SETTINGS)).unwrap();

    let status = settings.store_endpoint("status").unwrap();
    assert_eq!(status.database(), "dc_status");
    assert!(matches!(
        settings.store_endpoint("nowhere"),
        Err(ConfigError::Validation { .. })
    ));

    let reader = settings.reader().unwrap();
    assert_eq!(reader.config().default.last_n.count, 12);
    let writer = settings.writer().unwrap();
    assert_eq!(writer.config().control.retry_times, 5);
}

// ── Credentials ─────────────────────────────────────────────────────

fn profile(username: Option<&str>, password: Option<&str>) -> StoreProfile {
    StoreProfile {
        url: "http://localhost:8086".into(),
        database: "dc_status".into(),
        username: username.map(Into::into),
        password: password.map(Into::into),
        password_env: None,
        timeout: None,
        ca_cert: None,
        insecure: false,
    }
}

#[test]
fn test_credentials_resolution() {
    assert!(resolve_credentials(&profile(None, None), "anon").unwrap().is_none());

    let creds = resolve_credentials(&profile(Some("reader"), Some("secret")), "status_test")
        .unwrap()
        .unwrap();
    assert_eq!(creds.username, "reader");
    assert_eq!(creds.password.expose_secret(), "secret");

    let missing = resolve_credentials(&profile(Some("reader"), None), "status_test");
    assert!(matches!(missing, Err(ConfigError::NoCredentials { .. })));
}

// ── Architecture ────────────────────────────────────────────────────

#[test]
fn test_yaml_architecture_builds_with_warnings() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "architecture.yaml", ARCHITECTURE);

    let report = load_facility(&path).unwrap();

    assert_eq!(report.facility.uid(), "DC_1");
    assert_eq!(report.facility.observable_uids(), vec!["ac_a1_001_supply"]);
    assert_eq!(report.warnings.len(), 1);
    assert_eq!(
        report.warnings[0].path,
        "facility.rooms[0].air_systems[0].air_conditioners[1]"
    );
}

#[test]
fn test_toml_architecture_is_accepted() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        "architecture.toml",
        "[facility]\nname = \"DC-1\"\nuid = \"DC_1\"\n",
    );

    let document = load_architecture(&path).unwrap();
    assert_eq!(document["facility"]["uid"], "DC_1");
}

#[test]
fn test_missing_architecture_is_an_io_error() {
    let dir = TempDir::new().unwrap();
    let err = load_architecture(&dir.path().join("absent.yaml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io(_)));
}

#[test]
fn test_architecture_without_facility_is_fatal() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "architecture.yaml", "rooms: []\n");
    assert!(matches!(load_facility(&path), Err(ConfigError::Architecture(_))));
}
