// ── Room domain types ──
//
// Two kinds of enumeration live here and they deliberately disagree:
// object enumeration (`devices`, `systems`) sees every node, while
// identifier enumeration (`observable_uids`, `controllable_uids`) drops
// the attributes of devices flagged unavailable. Room- and sensor-level
// attributes are never filtered.

use serde::{Deserialize, Serialize};

use super::attribute::Attribute;
use super::device::{AttributeMap, Device, Sensor};
use super::system::{CoolingSystem, SystemKind};

/// A computer room and the cooling equipment serving it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub name: String,
    pub uid: String,
    pub room_tag: String,
    pub location: Option<String>,
    pub air_systems: Vec<CoolingSystem>,
    pub water_systems: Vec<CoolingSystem>,
    pub sensors: Vec<Sensor>,
    pub attributes: AttributeMap,
    pub is_available: bool,
}

impl Room {
    pub fn new(name: impl Into<String>, uid: impl Into<String>, room_tag: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            uid: uid.into(),
            room_tag: room_tag.into(),
            location: None,
            air_systems: Vec::new(),
            water_systems: Vec::new(),
            sensors: Vec::new(),
            attributes: AttributeMap::new(),
            is_available: true,
        }
    }

    /// Attach a system to the collection matching its kind.
    pub fn add_system(&mut self, system: CoolingSystem) {
        match system.kind {
            SystemKind::AirCooled => self.air_systems.push(system),
            SystemKind::WaterCooled => self.water_systems.push(system),
        }
    }

    pub fn add_attribute(&mut self, attr: Attribute) {
        self.attributes.insert(attr.name.clone(), attr);
    }

    pub(crate) fn systems_of(&self, kind: SystemKind) -> &[CoolingSystem] {
        match kind {
            SystemKind::AirCooled => &self.air_systems,
            SystemKind::WaterCooled => &self.water_systems,
        }
    }

    pub(crate) fn systems_of_mut(&mut self, kind: SystemKind) -> &mut Vec<CoolingSystem> {
        match kind {
            SystemKind::AirCooled => &mut self.air_systems,
            SystemKind::WaterCooled => &mut self.water_systems,
        }
    }

    // ── Object enumeration ───────────────────────────────────────────

    /// Air-cooled systems first, then water-cooled.
    pub fn systems(&self) -> impl Iterator<Item = &CoolingSystem> {
        self.air_systems.iter().chain(self.water_systems.iter())
    }

    /// Every device in the room, available or not.
    pub fn devices(&self) -> impl Iterator<Item = &Device> {
        self.systems().flat_map(|s| s.devices())
    }

    pub fn available_devices(&self) -> impl Iterator<Item = &Device> {
        self.devices().filter(|d| d.is_available)
    }

    pub fn unavailable_devices(&self) -> impl Iterator<Item = &Device> {
        self.devices().filter(|d| !d.is_available)
    }

    pub fn device(&self, uid: &str) -> Option<&Device> {
        self.devices().find(|d| d.uid == uid)
    }

    pub fn system(&self, uid: &str) -> Option<&CoolingSystem> {
        self.systems().find(|s| s.uid == uid)
    }

    // ── Identifier enumeration ───────────────────────────────────────

    /// Attributes to read: device telemetry, then sensors, then the room's own.
    pub fn observable_attributes(
        &self,
        include_unavailable: bool,
    ) -> impl Iterator<Item = &Attribute> {
        let devices = self
            .devices()
            .filter(move |d| include_unavailable || d.is_available)
            .flat_map(|d| d.observable_attributes());
        let sensors = self.sensors.iter().flat_map(|s| s.attributes.values());
        let own = self.attributes.values().filter(|a| a.is_observable());
        devices.chain(sensors).chain(own)
    }

    /// Attributes to write: device control points, then the room's own.
    pub fn controllable_attributes(
        &self,
        include_unavailable: bool,
    ) -> impl Iterator<Item = &Attribute> {
        let devices = self
            .devices()
            .filter(move |d| include_unavailable || d.is_available)
            .flat_map(|d| d.controllable_attributes());
        let own = self.attributes.values().filter(|a| a.is_controllable());
        devices.chain(own)
    }

    /// Observable uids, skipping devices that are flagged unavailable.
    pub fn observable_uids(&self) -> Vec<&str> {
        self.observable_attributes(false)
            .map(|a| a.uid.as_str())
            .collect()
    }

    /// Controllable uids, skipping devices that are flagged unavailable.
    pub fn controllable_uids(&self) -> Vec<&str> {
        self.controllable_attributes(false)
            .map(|a| a.uid.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AttributeKind;

    fn attr(uid: &str, kind: AttributeKind) -> Attribute {
        Attribute::new(uid, uid, kind, "value")
    }

    fn room() -> Room {
        let mut room = Room::new("Room A1", "CR_A1", "computer_room");

        let mut air = CoolingSystem::new("Air loop", "AS_A1", SystemKind::AirCooled);
        let mut up = Device::new("AC-1", "AC_1", "AC_AirCooled");
        up.add_attribute(attr("ac_1_temp", AttributeKind::ObservableNumeric));
        up.add_attribute(attr("ac_1_set", AttributeKind::ControllableNumeric));
        let mut down = Device::new("AC-2", "AC_2", "AC_AirCooled");
        down.is_available = false;
        down.add_attribute(attr("ac_2_temp", AttributeKind::ObservableNumeric));
        down.add_attribute(attr("ac_2_set", AttributeKind::ControllableNumeric));
        air.add_device(up);
        air.add_device(down);
        room.add_system(air);

        let mut water = CoolingSystem::new("Water loop", "WS_A1", SystemKind::WaterCooled);
        water.add_device(Device::new("CH-1", "CH_1", "CH"));
        room.add_system(water);

        let mut sensor = Sensor::new("TH-1", "TH_1");
        sensor.add_attribute(attr("th_1_temp", AttributeKind::ObservableNumeric));
        sensor.add_attribute(attr("th_1_mode", AttributeKind::Other));
        room.sensors.push(sensor);

        room.add_attribute(attr("cr_a1_load", AttributeKind::ObservableNumeric));
        room.add_attribute(attr("cr_a1_target", AttributeKind::ControllableNumeric));
        room
    }

    #[test]
    fn object_enumeration_ignores_availability() {
        let room = room();
        let uids: Vec<&str> = room.devices().map(|d| d.uid.as_str()).collect();
        assert_eq!(uids, vec!["AC_1", "AC_2", "CH_1"]);
        assert_eq!(room.available_devices().count(), 2);
        assert_eq!(room.unavailable_devices().count(), 1);
        assert_eq!(room.systems().count(), 2);
    }

    #[test]
    fn identifier_enumeration_drops_unavailable_devices_only() {
        let room = room();
        assert_eq!(
            room.observable_uids(),
            vec!["ac_1_temp", "th_1_temp", "th_1_mode", "cr_a1_load"]
        );
        assert_eq!(room.controllable_uids(), vec!["ac_1_set", "cr_a1_target"]);
    }

    #[test]
    fn include_unavailable_restores_filtered_devices() {
        let room = room();
        let uids: Vec<&str> = room
            .observable_attributes(true)
            .map(|a| a.uid.as_str())
            .collect();
        assert!(uids.contains(&"ac_2_temp"));
    }

    #[test]
    fn lookups_do_not_check_availability() {
        let room = room();
        assert!(room.device("AC_2").is_some_and(|d| !d.is_available));
        assert!(room.system("WS_A1").is_some());
    }
}
