// ── Device and sensor domain types ──

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::attribute::Attribute;

/// Attribute map keyed by display name, in declaration order.
pub type AttributeMap = IndexMap<String, Attribute>;

/// A piece of cooling equipment.
///
/// Every subtype (indoor unit, chiller, pump, tower...) shares this shape;
/// `type_tag` says which one it is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub name: String,
    pub uid: String,
    pub type_tag: String,
    pub location: Option<String>,
    pub attributes: AttributeMap,
    pub is_available: bool,
}

impl Device {
    pub fn new(name: impl Into<String>, uid: impl Into<String>, type_tag: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            uid: uid.into(),
            type_tag: type_tag.into(),
            location: None,
            attributes: AttributeMap::new(),
            is_available: true,
        }
    }

    /// Insert an attribute; a repeated name replaces the earlier one in place.
    pub fn add_attribute(&mut self, attr: Attribute) {
        self.attributes.insert(attr.name.clone(), attr);
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    pub fn observable_attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.values().filter(|a| a.is_observable())
    }

    pub fn controllable_attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.values().filter(|a| a.is_controllable())
    }

    /// Observable uids of this device. Does not look at `is_available`.
    pub fn observable_uids(&self) -> Vec<&str> {
        self.observable_attributes().map(|a| a.uid.as_str()).collect()
    }

    /// Controllable uids of this device. Does not look at `is_available`.
    pub fn controllable_uids(&self) -> Vec<&str> {
        self.controllable_attributes().map(|a| a.uid.as_str()).collect()
    }

    /// The controllable attribute with this uid, if the device owns one.
    pub fn control_point(&self, uid: &str) -> Option<&Attribute> {
        self.controllable_attributes().find(|a| a.uid == uid)
    }
}

/// An environment sensor. Every attribute on it is telemetry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sensor {
    pub name: String,
    pub uid: String,
    pub location: Option<String>,
    pub attributes: AttributeMap,
}

impl Sensor {
    pub fn new(name: impl Into<String>, uid: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            uid: uid.into(),
            location: None,
            attributes: AttributeMap::new(),
        }
    }

    pub fn add_attribute(&mut self, attr: Attribute) {
        self.attributes.insert(attr.name.clone(), attr);
    }

    pub fn uids(&self) -> Vec<&str> {
        self.attributes.values().map(|a| a.uid.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AttributeKind;

    fn device() -> Device {
        let mut d = Device::new("AC-1", "AC_A1_001", "AC_AirCooled");
        d.add_attribute(Attribute::new(
            "supply_temp",
            "ac_a1_001_supply_temp",
            AttributeKind::ObservableNumeric,
            "value",
        ));
        d.add_attribute(Attribute::new(
            "set_temp",
            "ac_a1_001_set_temp",
            AttributeKind::ControllableNumeric,
            "value",
        ));
        d.add_attribute(Attribute::new(
            "model",
            "ac_a1_001_model",
            AttributeKind::Other,
            "value",
        ));
        d
    }

    #[test]
    fn splits_attributes_by_kind() {
        let d = device();
        assert_eq!(d.observable_uids(), vec!["ac_a1_001_supply_temp"]);
        assert_eq!(d.controllable_uids(), vec!["ac_a1_001_set_temp"]);
        assert!(d.control_point("ac_a1_001_set_temp").is_some());
        assert!(d.control_point("ac_a1_001_supply_temp").is_none());
    }

    #[test]
    fn duplicate_attribute_name_replaces_in_place() {
        let mut d = device();
        d.add_attribute(Attribute::new(
            "supply_temp",
            "ac_a1_001_supply_temp_v2",
            AttributeKind::ObservableNumeric,
            "value",
        ));

        assert_eq!(d.attributes.len(), 3);
        let first = d.attributes.values().next().map(|a| a.uid.as_str());
        assert_eq!(first, Some("ac_a1_001_supply_temp_v2"));
    }

    #[test]
    fn unavailable_device_still_reports_its_own_uids() {
        let mut d = device();
        d.is_available = false;
        assert_eq!(d.observable_uids().len(), 1);
    }
}
