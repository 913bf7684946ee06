// ── Cooling system domain types ──

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::device::Device;

/// Which loop a system belongs to. Fixed by the collection it was declared in.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
pub enum SystemKind {
    AirCooled,
    WaterCooled,
}

impl SystemKind {
    /// Per-subtype device collections a system of this kind may declare,
    /// as `(document key, device type tag)`.
    pub fn device_groups(self) -> &'static [(&'static str, &'static str)] {
        match self {
            Self::AirCooled => &[
                ("air_conditioners", "AC_AirCooled"),
                ("compressors", "COMP"),
                ("condensers", "COND"),
                ("expansion_valves", "EV"),
            ],
            Self::WaterCooled => &[
                ("air_conditioners", "AC_WaterCooled"),
                ("chillers", "CH"),
                ("chilled_water_pumps", "CHWP"),
                ("cooling_water_pumps", "CWP"),
                ("cooling_towers", "CT"),
            ],
        }
    }
}

/// An air- or water-cooled loop and the equipment on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoolingSystem {
    pub name: String,
    pub uid: String,
    pub kind: SystemKind,
    /// Devices grouped by type tag, each group in declaration order.
    pub devices: IndexMap<String, Vec<Device>>,
}

impl CoolingSystem {
    pub fn new(name: impl Into<String>, uid: impl Into<String>, kind: SystemKind) -> Self {
        Self {
            name: name.into(),
            uid: uid.into(),
            kind,
            devices: IndexMap::new(),
        }
    }

    pub fn add_device(&mut self, device: Device) {
        self.devices
            .entry(device.type_tag.clone())
            .or_default()
            .push(device);
    }

    /// All devices, group by group, regardless of availability.
    pub fn devices(&self) -> impl Iterator<Item = &Device> {
        self.devices.values().flatten()
    }

    pub fn devices_by_type(&self, type_tag: &str) -> &[Device] {
        self.devices.get(type_tag).map_or(&[], Vec::as_slice)
    }

    pub fn device_count(&self) -> usize {
        self.devices.values().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_devices_by_type_tag_in_first_seen_order() {
        let mut sys = CoolingSystem::new("Water loop", "WS_1", SystemKind::WaterCooled);
        sys.add_device(Device::new("CH-1", "CH_1", "CH"));
        sys.add_device(Device::new("P-1", "CHWP_1", "CHWP"));
        sys.add_device(Device::new("CH-2", "CH_2", "CH"));

        let order: Vec<&str> = sys.devices().map(|d| d.uid.as_str()).collect();
        assert_eq!(order, vec!["CH_1", "CH_2", "CHWP_1"]);
        assert_eq!(sys.devices_by_type("CH").len(), 2);
        assert!(sys.devices_by_type("CT").is_empty());
        assert_eq!(sys.device_count(), 3);
    }

    #[test]
    fn same_document_key_maps_to_different_tags_per_loop() {
        let air = SystemKind::AirCooled.device_groups();
        let water = SystemKind::WaterCooled.device_groups();
        assert!(air.contains(&("air_conditioners", "AC_AirCooled")));
        assert!(water.contains(&("air_conditioners", "AC_WaterCooled")));
    }
}
