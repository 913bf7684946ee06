// ── Facility: the root of the entity tree ──
//
// The facility owns every node. Per-kind uid indexes map each uid to the
// positional path of its node, so lookups never hold references into the
// tree and availability toggles or value updates can go through `&mut self`
// without invalidating anything. Structure is fixed after construction.

use std::collections::{BTreeMap, HashMap};
use std::collections::hash_map::Entry;

use serde::Serialize;
use tracing::{debug, warn};

use super::attribute::Attribute;
use super::device::{AttributeMap, Device, Sensor};
use super::room::Room;
use super::series::TimeSeries;
use super::system::{CoolingSystem, SystemKind};

// ── Positional paths ────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SystemSlot {
    room: usize,
    kind: SystemKind,
    index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DeviceSlot {
    system: SystemSlot,
    group: usize,
    position: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttributeOwner {
    Facility,
    FacilitySensor(usize),
    Room(usize),
    RoomSensor { room: usize, sensor: usize },
    Device(DeviceSlot),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SensorSlot {
    room: Option<usize>,
    index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct AttributeSlot {
    owner: AttributeOwner,
    index: usize,
}

/// One uid map per node kind. A uid shared across kinds resolves in each.
#[derive(Debug, Clone, Default)]
struct UidIndex {
    rooms: HashMap<String, usize>,
    systems: HashMap<String, SystemSlot>,
    devices: HashMap<String, DeviceSlot>,
    sensors: HashMap<String, SensorSlot>,
    attributes: HashMap<String, AttributeSlot>,
}

impl UidIndex {
    fn len(&self) -> usize {
        self.rooms.len()
            + self.systems.len()
            + self.devices.len()
            + self.sensors.len()
            + self.attributes.len()
    }

    fn contains(&self, uid: &str) -> bool {
        self.rooms.contains_key(uid)
            || self.systems.contains_key(uid)
            || self.devices.contains_key(uid)
            || self.sensors.contains_key(uid)
            || self.attributes.contains_key(uid)
    }
}

// ── Facility ────────────────────────────────────────────────────────

/// A whole data center: rooms, facility-level sensors and attributes,
/// and a uid index over all of them.
#[derive(Debug, Clone)]
pub struct Facility {
    name: String,
    uid: String,
    location: Option<String>,
    rooms: Vec<Room>,
    sensors: Vec<Sensor>,
    attributes: AttributeMap,
    index: UidIndex,
    duplicate_uids: Vec<String>,
}

impl Facility {
    /// Assemble a facility and index every uid in it.
    ///
    /// Each node kind has its own index, claimed in traversal order (facility
    /// attributes and sensors, then each room with its attributes, sensors,
    /// air systems and water systems). A uid seen again on a node of the same
    /// kind keeps pointing at the first one and is reported by
    /// [`Facility::duplicate_uids`]. The same uid on nodes of different kinds
    /// is not a collision.
    pub fn new(
        name: impl Into<String>,
        uid: impl Into<String>,
        location: Option<String>,
        rooms: Vec<Room>,
        sensors: Vec<Sensor>,
        attributes: AttributeMap,
    ) -> Self {
        let mut facility = Self {
            name: name.into(),
            uid: uid.into(),
            location,
            rooms,
            sensors,
            attributes,
            index: UidIndex::default(),
            duplicate_uids: Vec::new(),
        };
        let (index, duplicate_uids) = index_nodes(&facility);
        for uid in &duplicate_uids {
            warn!(uid = %uid, "duplicate uid, lookups resolve to the first declaration");
        }
        debug!(entries = index.len(), "uid index built");
        facility.index = index;
        facility.duplicate_uids = duplicate_uids;
        facility
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    pub fn sensors(&self) -> &[Sensor] {
        &self.sensors
    }

    pub fn attributes(&self) -> &AttributeMap {
        &self.attributes
    }

    /// Uids declared more than once within one node kind, in the order the
    /// repeats were found.
    pub fn duplicate_uids(&self) -> &[String] {
        &self.duplicate_uids
    }

    // ── Object enumeration ───────────────────────────────────────────

    /// Every room, available or not.
    pub fn rooms(&self) -> &[Room] {
        &self.rooms
    }

    pub fn available_rooms(&self) -> impl Iterator<Item = &Room> {
        self.rooms.iter().filter(|r| r.is_available)
    }

    pub fn unavailable_rooms(&self) -> impl Iterator<Item = &Room> {
        self.rooms.iter().filter(|r| !r.is_available)
    }

    /// Every device in every room, available or not.
    pub fn devices(&self) -> impl Iterator<Item = &Device> {
        self.rooms.iter().flat_map(|r| r.devices())
    }

    pub fn available_devices(&self) -> impl Iterator<Item = &Device> {
        self.devices().filter(|d| d.is_available)
    }

    pub fn unavailable_devices(&self) -> impl Iterator<Item = &Device> {
        self.devices().filter(|d| !d.is_available)
    }

    // ── Identifier enumeration ───────────────────────────────────────

    /// Attributes to read across the facility.
    ///
    /// Unless `include_unavailable` is set, rooms flagged unavailable are
    /// skipped whole and each remaining room drops its unavailable devices.
    pub fn observable_attributes(
        &self,
        include_unavailable: bool,
    ) -> impl Iterator<Item = &Attribute> {
        let rooms = self
            .rooms
            .iter()
            .filter(move |r| include_unavailable || r.is_available)
            .flat_map(move |r| r.observable_attributes(include_unavailable));
        let sensors = self.sensors.iter().flat_map(|s| s.attributes.values());
        let own = self.attributes.values().filter(|a| a.is_observable());
        rooms.chain(sensors).chain(own)
    }

    /// Attributes to write across the facility, filtered like
    /// [`Facility::observable_attributes`].
    pub fn controllable_attributes(
        &self,
        include_unavailable: bool,
    ) -> impl Iterator<Item = &Attribute> {
        let rooms = self
            .rooms
            .iter()
            .filter(move |r| include_unavailable || r.is_available)
            .flat_map(move |r| r.controllable_attributes(include_unavailable));
        let own = self.attributes.values().filter(|a| a.is_controllable());
        rooms.chain(own)
    }

    pub fn observable_uids(&self) -> Vec<&str> {
        self.observable_attributes(false)
            .map(|a| a.uid.as_str())
            .collect()
    }

    pub fn controllable_uids(&self) -> Vec<&str> {
        self.controllable_attributes(false)
            .map(|a| a.uid.as_str())
            .collect()
    }

    // ── Lookup by uid (availability is not checked) ──────────────────

    pub fn room(&self, uid: &str) -> Option<&Room> {
        self.rooms.get(*self.index.rooms.get(uid)?)
    }

    pub fn system(&self, uid: &str) -> Option<&CoolingSystem> {
        self.system_at(*self.index.systems.get(uid)?)
    }

    pub fn device(&self, uid: &str) -> Option<&Device> {
        self.device_at(*self.index.devices.get(uid)?)
    }

    pub fn sensor(&self, uid: &str) -> Option<&Sensor> {
        let slot = self.index.sensors.get(uid)?;
        match slot.room {
            None => self.sensors.get(slot.index),
            Some(room) => self.rooms.get(room)?.sensors.get(slot.index),
        }
    }

    pub fn attribute(&self, uid: &str) -> Option<&Attribute> {
        let slot = self.index.attributes.get(uid)?;
        self.attributes_of(slot.owner)?
            .get_index(slot.index)
            .map(|(_, a)| a)
    }

    /// Device owning the attribute with this uid, if the owner is a device.
    pub fn attribute_device(&self, uid: &str) -> Option<&Device> {
        match self.index.attributes.get(uid)?.owner {
            AttributeOwner::Device(slot) => self.device_at(slot),
            _ => None,
        }
    }

    /// Whether any node in the facility carries this uid.
    pub fn contains(&self, uid: &str) -> bool {
        uid == self.uid || self.index.contains(uid)
    }

    // ── Mutation ─────────────────────────────────────────────────────

    /// Flip a device's availability. Returns `false` if no device has this uid.
    pub fn set_device_available(&mut self, uid: &str, available: bool) -> bool {
        let Some(slot) = self.index.devices.get(uid).copied() else {
            return false;
        };
        match self.device_at_mut(slot) {
            Some(device) => {
                device.is_available = available;
                debug!(uid, available, "device availability changed");
                true
            }
            None => false,
        }
    }

    /// Flip a room's availability. Returns `false` if no room has this uid.
    pub fn set_room_available(&mut self, uid: &str, available: bool) -> bool {
        let Some(i) = self.index.rooms.get(uid).copied() else {
            return false;
        };
        match self.rooms.get_mut(i) {
            Some(room) => {
                room.is_available = available;
                debug!(uid, available, "room availability changed");
                true
            }
            None => false,
        }
    }

    /// Store the latest value of each series on the attribute with that uid.
    ///
    /// Returns how many attributes were updated. Unknown uids are ignored.
    pub fn apply_readings(&mut self, readings: &BTreeMap<String, TimeSeries>) -> usize {
        let mut updated = 0;
        for (uid, series) in readings {
            let Some(latest) = series.latest() else {
                continue;
            };
            let Some(slot) = self.index.attributes.get(uid).copied() else {
                continue;
            };
            if let Some((_, attr)) = self
                .attributes_of_mut(slot.owner)
                .and_then(|attrs| attrs.get_index_mut(slot.index))
            {
                attr.value = Some(latest.value);
                updated += 1;
            }
        }
        updated
    }

    // ── Statistics ───────────────────────────────────────────────────

    pub fn statistics(&self) -> FacilityStats {
        let mut stats = FacilityStats {
            rooms: self.rooms.len(),
            observable_points: self.observable_attributes(false).count(),
            controllable_points: self.controllable_attributes(false).count(),
            ..FacilityStats::default()
        };

        for room in &self.rooms {
            if room.is_available {
                stats.available_rooms += 1;
            } else {
                stats.unavailable_rooms += 1;
            }
            stats.air_systems += room.air_systems.len();
            stats.water_systems += room.water_systems.len();
            for device in room.devices() {
                stats.devices += 1;
                if device.is_available {
                    stats.available_devices += 1;
                } else {
                    stats.unavailable_devices += 1;
                }
            }
        }

        stats
    }

    // ── Path resolution ──────────────────────────────────────────────

    fn system_at(&self, slot: SystemSlot) -> Option<&CoolingSystem> {
        self.rooms
            .get(slot.room)?
            .systems_of(slot.kind)
            .get(slot.index)
    }

    fn device_at(&self, slot: DeviceSlot) -> Option<&Device> {
        self.system_at(slot.system)?
            .devices
            .get_index(slot.group)?
            .1
            .get(slot.position)
    }

    fn device_at_mut(&mut self, slot: DeviceSlot) -> Option<&mut Device> {
        self.rooms
            .get_mut(slot.system.room)?
            .systems_of_mut(slot.system.kind)
            .get_mut(slot.system.index)?
            .devices
            .get_index_mut(slot.group)?
            .1
            .get_mut(slot.position)
    }

    fn attributes_of(&self, owner: AttributeOwner) -> Option<&AttributeMap> {
        match owner {
            AttributeOwner::Facility => Some(&self.attributes),
            AttributeOwner::FacilitySensor(i) => self.sensors.get(i).map(|s| &s.attributes),
            AttributeOwner::Room(i) => self.rooms.get(i).map(|r| &r.attributes),
            AttributeOwner::RoomSensor { room, sensor } => self
                .rooms
                .get(room)?
                .sensors
                .get(sensor)
                .map(|s| &s.attributes),
            AttributeOwner::Device(slot) => self.device_at(slot).map(|d| &d.attributes),
        }
    }

    fn attributes_of_mut(&mut self, owner: AttributeOwner) -> Option<&mut AttributeMap> {
        match owner {
            AttributeOwner::Facility => Some(&mut self.attributes),
            AttributeOwner::FacilitySensor(i) => {
                self.sensors.get_mut(i).map(|s| &mut s.attributes)
            }
            AttributeOwner::Room(i) => self.rooms.get_mut(i).map(|r| &mut r.attributes),
            AttributeOwner::RoomSensor { room, sensor } => self
                .rooms
                .get_mut(room)?
                .sensors
                .get_mut(sensor)
                .map(|s| &mut s.attributes),
            AttributeOwner::Device(slot) => self.device_at_mut(slot).map(|d| &mut d.attributes),
        }
    }
}

#[derive(Default)]
struct IndexBuilder {
    index: UidIndex,
    duplicates: Vec<String>,
}

impl IndexBuilder {
    fn claim<T>(
        map: &mut HashMap<String, T>,
        duplicates: &mut Vec<String>,
        uid: &str,
        slot: T,
    ) {
        match map.entry(uid.to_owned()) {
            Entry::Vacant(entry) => {
                entry.insert(slot);
            }
            Entry::Occupied(_) => duplicates.push(uid.to_owned()),
        }
    }

    fn room(&mut self, uid: &str, index: usize) {
        Self::claim(&mut self.index.rooms, &mut self.duplicates, uid, index);
    }

    fn system(&mut self, uid: &str, slot: SystemSlot) {
        Self::claim(&mut self.index.systems, &mut self.duplicates, uid, slot);
    }

    fn device(&mut self, device: &Device, slot: DeviceSlot) {
        Self::claim(&mut self.index.devices, &mut self.duplicates, &device.uid, slot);
        self.attributes(&device.attributes, AttributeOwner::Device(slot));
    }

    fn attributes(&mut self, attrs: &AttributeMap, owner: AttributeOwner) {
        for (index, attr) in attrs.values().enumerate() {
            let slot = AttributeSlot { owner, index };
            Self::claim(&mut self.index.attributes, &mut self.duplicates, &attr.uid, slot);
        }
    }

    fn sensor(&mut self, sensor: &Sensor, room: Option<usize>, index: usize) {
        let slot = SensorSlot { room, index };
        Self::claim(&mut self.index.sensors, &mut self.duplicates, &sensor.uid, slot);
        let owner = match room {
            Some(room) => AttributeOwner::RoomSensor {
                room,
                sensor: index,
            },
            None => AttributeOwner::FacilitySensor(index),
        };
        self.attributes(&sensor.attributes, owner);
    }
}

/// Walk the tree in declaration order and claim each uid for the first
/// node of its kind.
fn index_nodes(facility: &Facility) -> (UidIndex, Vec<String>) {
    let mut builder = IndexBuilder::default();

    builder.attributes(&facility.attributes, AttributeOwner::Facility);
    for (i, sensor) in facility.sensors.iter().enumerate() {
        builder.sensor(sensor, None, i);
    }

    for (r, room) in facility.rooms.iter().enumerate() {
        builder.room(&room.uid, r);
        builder.attributes(&room.attributes, AttributeOwner::Room(r));
        for (i, sensor) in room.sensors.iter().enumerate() {
            builder.sensor(sensor, Some(r), i);
        }

        for kind in [SystemKind::AirCooled, SystemKind::WaterCooled] {
            for (index, system) in room.systems_of(kind).iter().enumerate() {
                let system_slot = SystemSlot {
                    room: r,
                    kind,
                    index,
                };
                builder.system(&system.uid, system_slot);
                for (group, devices) in system.devices.values().enumerate() {
                    for (position, device) in devices.iter().enumerate() {
                        let slot = DeviceSlot {
                            system: system_slot,
                            group,
                            position,
                        };
                        builder.device(device, slot);
                    }
                }
            }
        }
    }

    (builder.index, builder.duplicates)
}

/// Inventory counts. Point counts follow identifier enumeration and so
/// exclude unavailable rooms and devices; the rest count everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FacilityStats {
    pub rooms: usize,
    pub available_rooms: usize,
    pub unavailable_rooms: usize,
    pub air_systems: usize,
    pub water_systems: usize,
    pub devices: usize,
    pub available_devices: usize,
    pub unavailable_devices: usize,
    pub observable_points: usize,
    pub controllable_points: usize,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::model::AttributeKind;
    use chrono::DateTime;
    use coolant_api::Sample;

    fn attr(uid: &str, kind: AttributeKind) -> Attribute {
        Attribute::new(uid, uid, kind, "value")
    }

    fn facility() -> Facility {
        let mut room = Room::new("Room A1", "CR_A1", "computer_room");
        let mut air = CoolingSystem::new("Air loop", "AS_A1", SystemKind::AirCooled);
        let mut ac = Device::new("AC-1", "AC_A1_001", "AC_AirCooled");
        ac.add_attribute(attr("ac_a1_001_supply_temp", AttributeKind::ObservableNumeric));
        ac.add_attribute(attr("ac_a1_001_set_temp", AttributeKind::ControllableNumeric));
        air.add_device(ac);
        room.add_system(air);

        let mut closed = Room::new("Room B1", "CR_B1", "computer_room");
        closed.is_available = false;
        closed.add_attribute(attr("cr_b1_load", AttributeKind::ObservableNumeric));

        let mut outdoor = Sensor::new("Outdoor", "TH_OUT");
        outdoor.add_attribute(attr("th_out_temp", AttributeKind::ObservableNumeric));

        let mut attrs = AttributeMap::new();
        let pue = attr("dc_pue", AttributeKind::ObservableNumeric);
        attrs.insert(pue.name.clone(), pue);

        Facility::new(
            "DC-1",
            "DC_1",
            None,
            vec![room, closed],
            vec![outdoor],
            attrs,
        )
    }

    #[test]
    fn lookups_resolve_every_node_kind() {
        let dc = facility();
        assert_eq!(dc.room("CR_A1").unwrap().name, "Room A1");
        assert_eq!(dc.system("AS_A1").unwrap().kind, SystemKind::AirCooled);
        assert_eq!(dc.device("AC_A1_001").unwrap().type_tag, "AC_AirCooled");
        assert_eq!(dc.sensor("TH_OUT").unwrap().name, "Outdoor");
        assert_eq!(
            dc.attribute("ac_a1_001_set_temp").unwrap().kind,
            AttributeKind::ControllableNumeric
        );
        assert_eq!(
            dc.attribute_device("ac_a1_001_set_temp").unwrap().uid,
            "AC_A1_001"
        );
        assert!(dc.room("AC_A1_001").is_none());
        assert!(dc.device("nope").is_none());
    }

    #[test]
    fn facility_enumeration_skips_unavailable_rooms() {
        let dc = facility();
        assert_eq!(
            dc.observable_uids(),
            vec!["ac_a1_001_supply_temp", "th_out_temp", "dc_pue"]
        );
        let all: Vec<&str> = dc
            .observable_attributes(true)
            .map(|a| a.uid.as_str())
            .collect();
        assert!(all.contains(&"cr_b1_load"));
        assert_eq!(dc.rooms().len(), 2);
    }

    #[test]
    fn availability_toggle_changes_enumeration_not_lookup() {
        let mut dc = facility();
        assert!(dc.set_device_available("AC_A1_001", false));
        assert!(dc.controllable_uids().is_empty());
        assert!(dc.device("AC_A1_001").is_some());
        assert_eq!(dc.devices().count(), 1);
        assert!(!dc.set_device_available("CR_A1", false));
        assert!(dc.set_room_available("CR_B1", true));
        assert!(dc.observable_uids().contains(&"cr_b1_load"));
    }

    #[test]
    fn apply_readings_sets_latest_value() {
        let mut dc = facility();
        let series = TimeSeries::from_samples(vec![
            Sample::new(DateTime::from_timestamp(20, 0).unwrap(), 19.0),
            Sample::new(DateTime::from_timestamp(10, 0).unwrap(), 18.0),
        ]);
        let mut readings = BTreeMap::new();
        readings.insert("ac_a1_001_supply_temp".to_string(), series);
        readings.insert("unknown".to_string(), TimeSeries::default());

        assert_eq!(dc.apply_readings(&readings), 1);
        assert_eq!(
            dc.attribute("ac_a1_001_supply_temp").unwrap().value,
            Some(19.0)
        );
    }

    #[test]
    fn statistics_count_everything_but_points_follow_filters() {
        let dc = facility();
        let stats = dc.statistics();
        assert_eq!(stats.rooms, 2);
        assert_eq!(stats.available_rooms, 1);
        assert_eq!(stats.unavailable_rooms, 1);
        assert_eq!(stats.air_systems, 1);
        assert_eq!(stats.devices, 1);
        assert_eq!(stats.observable_points, 3);
        assert_eq!(stats.controllable_points, 1);
    }

    #[test]
    fn duplicate_uid_keeps_first_declaration() {
        let mut room = Room::new("Room A1", "CR_A1", "computer_room");
        let mut air = CoolingSystem::new("Air loop", "AS_A1", SystemKind::AirCooled);
        air.add_device(Device::new("First", "AC_DUP", "AC_AirCooled"));
        air.add_device(Device::new("Second", "AC_DUP", "AC_AirCooled"));
        room.add_system(air);

        let dc = Facility::new("DC", "DC", None, vec![room], vec![], AttributeMap::new());
        assert_eq!(dc.device("AC_DUP").unwrap().name, "First");
        assert_eq!(dc.duplicate_uids(), ["AC_DUP".to_string()]);
    }

    #[test]
    fn uid_shared_across_node_kinds_resolves_in_each() {
        let mut room = Room::new("Room A1", "CR_A1", "computer_room");
        room.add_attribute(attr("AC_1", AttributeKind::ObservableNumeric));
        let mut air = CoolingSystem::new("Air loop", "AS_A1", SystemKind::AirCooled);
        let mut ac = Device::new("AC-1", "AC_1", "AC_AirCooled");
        ac.add_attribute(attr("ac_1_set", AttributeKind::ControllableNumeric));
        air.add_device(ac);
        room.add_system(air);

        let dc = Facility::new("DC", "DC", None, vec![room], vec![], AttributeMap::new());

        assert_eq!(dc.devices().count(), 1);
        assert_eq!(dc.device("AC_1").unwrap().name, "AC-1");
        assert_eq!(dc.attribute("AC_1").unwrap().kind, AttributeKind::ObservableNumeric);
        assert_eq!(dc.attribute_device("ac_1_set").unwrap().uid, "AC_1");
        assert!(dc.attribute_device("AC_1").is_none());
        assert!(dc.duplicate_uids().is_empty());
        assert!(dc.contains("AC_1"));
        assert!(dc.contains("DC"));
    }
}
