// ── Model builder ──
//
// Turns an architecture document (any serde-readable tree) into a
// `Facility`. Only the facility block itself is fatal. Every collection
// below it is walked entry by entry: each child build returns a `Result`,
// failures become `BuildWarning`s and the parent is still produced.
//
// Both the current key names and the older document vocabulary are
// accepted (`rooms` / `computer_rooms`, `name` / `room_name`, ...).

use std::str::FromStr;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::error::ConfigError;
use crate::model::{
    Attribute, AttributeKind, AttributeMap, CoolingSystem, Device, Facility, Room, Sensor,
    SystemKind,
};

/// A skipped entry: where it was, what it called itself, and why it failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildWarning {
    /// Location in the document, e.g. `facility.rooms[0].air_systems[1]`.
    pub path: String,
    /// Declared uid or name of the entry, when it had one.
    pub entry: Option<String>,
    #[serde(serialize_with = "serialize_display")]
    pub reason: ConfigError,
}

/// A built facility plus everything that was skipped on the way.
#[derive(Debug)]
pub struct BuildReport {
    pub facility: Facility,
    pub warnings: Vec<BuildWarning>,
}

/// Build a facility, logging and discarding per-entry warnings.
pub fn build(document: &Value) -> Result<Facility, ConfigError> {
    build_with_report(document).map(|report| report.facility)
}

/// Build a facility and return the warnings alongside it.
pub fn build_with_report(document: &Value) -> Result<BuildReport, ConfigError> {
    let mut builder = Builder::default();
    let facility = builder.facility(document)?;

    for uid in facility.duplicate_uids() {
        builder.warnings.push(BuildWarning {
            path: "facility".into(),
            entry: Some(uid.clone()),
            reason: ConfigError::DuplicateUid { uid: uid.clone() },
        });
    }

    let stats = facility.statistics();
    info!(
        facility = facility.name(),
        rooms = stats.rooms,
        air_systems = stats.air_systems,
        water_systems = stats.water_systems,
        devices = stats.devices,
        observable_points = stats.observable_points,
        controllable_points = stats.controllable_points,
        skipped = builder.warnings.len(),
        "facility built"
    );

    Ok(BuildReport {
        facility,
        warnings: builder.warnings,
    })
}

// ── Key vocabulary ──────────────────────────────────────────────────

const FACILITY: &[&str] = &["facility", "datacenter"];
const NAME: &str = "name";
const UID: &str = "uid";

const ROOMS: &[&str] = &["rooms", "computer_rooms"];
const SENSORS: &[&str] = &["sensors", "environment_sensors"];
const ATTRIBUTES: &[&str] = &["attributes"];
const FACILITY_ATTRIBUTES: &[&str] = &["attributes", "datacenter_attributes"];
const ROOM_ATTRIBUTES: &[&str] = &["attributes", "room_attributes"];
const AIR_SYSTEMS: &[&str] = &["air_systems", "air_cooled_systems"];
const WATER_SYSTEMS: &[&str] = &["water_systems", "water_cooled_systems"];
const GENERIC_DEVICES: &[&str] = &["devices"];

/// Keys tried, in order, to label an entry in a warning.
const LABEL_KEYS: &[&str] = &[
    "uid",
    "room_uid",
    "system_uid",
    "device_uid",
    "sensor_uid",
    "name",
    "room_name",
    "system_name",
    "device_name",
    "sensor_name",
];

// ── Builder ─────────────────────────────────────────────────────────

#[derive(Default)]
struct Builder {
    warnings: Vec<BuildWarning>,
}

impl Builder {
    fn facility(&mut self, document: &Value) -> Result<Facility, ConfigError> {
        let block = FACILITY
            .iter()
            .find_map(|key| document.get(*key))
            .filter(|v| !v.is_null())
            .ok_or(ConfigError::MissingFacility)?;
        let fields = Fields::new("facility", block)?;

        let name = fields.required_str(NAME, &["name"])?;
        let uid = fields.required_str(UID, &["uid"])?;
        let path = "facility";
        let location = match fields.optional_str("location", &["location"]) {
            Ok(location) => location,
            Err(reason) => {
                warn!(path, error = %reason, "ignoring malformed facility field");
                self.warnings.push(BuildWarning {
                    path: path.into(),
                    entry: Some(uid.clone()),
                    reason,
                });
                None
            }
        };
        debug!(facility = %name, uid = %uid, "building facility");

        let sensors = self.collect(&fields, SENSORS, path, |b, entry, at| b.sensor(entry, at));
        let attributes = self.attributes(&fields, FACILITY_ATTRIBUTES, path);
        let rooms = self.collect(&fields, ROOMS, path, |b, entry, at| b.room(entry, at));

        Ok(Facility::new(name, uid, location, rooms, sensors, attributes))
    }

    fn room(&mut self, entry: &Value, path: &str) -> Result<Room, ConfigError> {
        let fields = Fields::new("room", entry)?;
        let mut room = Room::new(
            fields.required_str(NAME, &["name", "room_name"])?,
            fields.required_str(UID, &["uid", "room_uid"])?,
            fields.required_str("room_tag", &["room_tag", "room_type"])?,
        );
        room.location = fields.optional_str("location", &["location"])?;
        room.is_available = fields.optional_bool("is_available", true)?;

        room.sensors = self.collect(&fields, SENSORS, path, |b, entry, at| b.sensor(entry, at));
        room.attributes = self.attributes(&fields, ROOM_ATTRIBUTES, path);

        for (keys, kind) in [
            (AIR_SYSTEMS, SystemKind::AirCooled),
            (WATER_SYSTEMS, SystemKind::WaterCooled),
        ] {
            for system in self.collect(&fields, keys, path, |b, entry, at| b.system(entry, at, kind))
            {
                room.add_system(system);
            }
        }

        debug!(room = %room.name, uid = %room.uid, "room built");
        Ok(room)
    }

    fn system(
        &mut self,
        entry: &Value,
        path: &str,
        kind: SystemKind,
    ) -> Result<CoolingSystem, ConfigError> {
        let fields = Fields::new("cooling system", entry)?;
        let mut system = CoolingSystem::new(
            fields.required_str(NAME, &["name", "system_name"])?,
            fields.required_str(UID, &["uid", "system_uid"])?,
            kind,
        );

        for (key, type_tag) in kind.device_groups() {
            let devices = self.collect(&fields, &[*key], path, |b, entry, at| {
                b.device(entry, at, Some(*type_tag))
            });
            for device in devices {
                system.add_device(device);
            }
        }

        let devices = self.collect(&fields, GENERIC_DEVICES, path, |b, entry, at| {
            b.device(entry, at, None)
        });
        for device in devices {
            system.add_device(device);
        }

        Ok(system)
    }

    /// One builder for every device subtype. `type_tag` comes from the
    /// collection the entry sits in, or from the entry itself.
    fn device(
        &mut self,
        entry: &Value,
        path: &str,
        type_tag: Option<&str>,
    ) -> Result<Device, ConfigError> {
        let fields = Fields::new("device", entry)?;
        let name = fields.required_str(NAME, &["name", "device_name"])?;
        let uid = fields.required_str(UID, &["uid", "device_uid"])?;
        let type_tag = match type_tag {
            Some(tag) => tag.to_owned(),
            None => fields.required_str("type_tag", &["type_tag", "device_type"])?,
        };

        let mut device = Device::new(name, uid, type_tag);
        device.location = fields.optional_str("location", &["location"])?;
        device.is_available = fields.optional_bool("is_available", true)?;
        device.attributes = self.attributes(&fields, ATTRIBUTES, path);
        Ok(device)
    }

    fn sensor(&mut self, entry: &Value, path: &str) -> Result<Sensor, ConfigError> {
        let fields = Fields::new("sensor", entry)?;
        let mut sensor = Sensor::new(
            fields.required_str(NAME, &["name", "sensor_name"])?,
            fields.required_str(UID, &["uid", "sensor_uid"])?,
        );
        sensor.location = fields.optional_str("location", &["location"])?;
        sensor.attributes = self.attributes(&fields, ATTRIBUTES, path);
        Ok(sensor)
    }

    fn attributes(&mut self, fields: &Fields<'_>, keys: &[&str], path: &str) -> AttributeMap {
        let mut map = AttributeMap::new();
        for attr in self.collect(fields, keys, path, |_, entry, _| attribute(entry)) {
            map.insert(attr.name.clone(), attr);
        }
        map
    }

    /// Build every entry of the first collection found under `keys`,
    /// turning failures into warnings.
    fn collect<T>(
        &mut self,
        fields: &Fields<'_>,
        keys: &[&str],
        path: &str,
        mut build: impl FnMut(&mut Self, &Value, &str) -> Result<T, ConfigError>,
    ) -> Vec<T> {
        let Some((key, value)) = fields.get(keys) else {
            return Vec::new();
        };
        let collection_path = format!("{path}.{key}");

        let items = match value {
            Value::Null => return Vec::new(),
            Value::Array(items) => items,
            other => {
                self.skip(
                    collection_path,
                    None,
                    ConfigError::InvalidField {
                        node: fields.node,
                        field: "collection",
                        reason: format!("`{key}` must be a sequence, got {}", type_name(other)),
                    },
                );
                return Vec::new();
            }
        };

        let mut built = Vec::with_capacity(items.len());
        for (i, entry) in items.iter().enumerate() {
            let entry_path = format!("{collection_path}[{i}]");
            match build(self, entry, &entry_path) {
                Ok(item) => built.push(item),
                Err(reason) => self.skip(entry_path, entry_label(entry), reason),
            }
        }
        built
    }

    fn skip(&mut self, path: String, entry: Option<String>, reason: ConfigError) {
        warn!(
            path = %path,
            entry = entry.as_deref().unwrap_or("<unnamed>"),
            error = %reason,
            "skipping malformed entry"
        );
        self.warnings.push(BuildWarning {
            path,
            entry,
            reason,
        });
    }
}

fn attribute(entry: &Value) -> Result<Attribute, ConfigError> {
    let fields = Fields::new("attribute", entry)?;
    let name = fields.required_str(NAME, &["name"])?;
    let uid = fields.required_str(UID, &["uid"])?;
    let raw_kind = fields.required_str("kind", &["kind", "attr_type"])?;
    let kind = AttributeKind::from_str(&raw_kind).map_err(|_| ConfigError::InvalidField {
        node: "attribute",
        field: "kind",
        reason: format!("unknown attribute kind `{raw_kind}`"),
    })?;
    let field_key = fields.required_str("field_key", &["field_key"])?;

    let mut attr = Attribute::new(name, uid, kind, field_key);
    attr.unit = fields.optional_str("unit", &["unit"])?;
    attr.description = fields.optional_str("description", &["description"])?;
    Ok(attr)
}

// ── Field access ────────────────────────────────────────────────────

/// A mapping entry with typed, alias-aware accessors.
struct Fields<'a> {
    node: &'static str,
    map: &'a Map<String, Value>,
}

impl<'a> Fields<'a> {
    fn new(node: &'static str, value: &'a Value) -> Result<Self, ConfigError> {
        match value {
            Value::Object(map) => Ok(Self { node, map }),
            other => Err(ConfigError::InvalidField {
                node,
                field: "entry",
                reason: format!("expected a mapping, got {}", type_name(other)),
            }),
        }
    }

    /// First present, non-null key among `keys`.
    fn get<'k>(&self, keys: &[&'k str]) -> Option<(&'k str, &'a Value)> {
        keys.iter()
            .find_map(|key| self.map.get(*key).map(|v| (*key, v)))
            .filter(|(_, v)| !v.is_null())
    }

    fn required_str(&self, field: &'static str, keys: &[&str]) -> Result<String, ConfigError> {
        let missing = ConfigError::MissingField {
            node: self.node,
            field,
        };
        let (_, value) = self.get(keys).ok_or_else(|| missing.clone())?;
        let text = self.scalar_str(field, value)?;
        if text.trim().is_empty() {
            return Err(missing);
        }
        Ok(text)
    }

    fn optional_str(
        &self,
        field: &'static str,
        keys: &[&str],
    ) -> Result<Option<String>, ConfigError> {
        self.get(keys)
            .map(|(_, value)| self.scalar_str(field, value))
            .transpose()
    }

    fn optional_bool(&self, field: &'static str, default: bool) -> Result<bool, ConfigError> {
        match self.map.get(field) {
            None | Some(Value::Null) => Ok(default),
            Some(Value::Bool(b)) => Ok(*b),
            Some(other) => Err(ConfigError::InvalidField {
                node: self.node,
                field,
                reason: format!("expected a boolean, got {}", type_name(other)),
            }),
        }
    }

    /// Strings pass through; numbers are accepted for identifiers written
    /// without quotes.
    fn scalar_str(&self, field: &'static str, value: &Value) -> Result<String, ConfigError> {
        match value {
            Value::String(s) => Ok(s.clone()),
            Value::Number(n) => Ok(n.to_string()),
            other => Err(ConfigError::InvalidField {
                node: self.node,
                field,
                reason: format!("expected a string, got {}", type_name(other)),
            }),
        }
    }
}

fn entry_label(entry: &Value) -> Option<String> {
    LABEL_KEYS
        .iter()
        .find_map(|key| entry.get(*key))
        .and_then(|v| match v {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a mapping",
    }
}

fn serialize_display<S: serde::Serializer>(
    value: &ConfigError,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}
