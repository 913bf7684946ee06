// ── Query and control planning ──
//
// Turns "read this room" or "command this device" into the concrete list of
// store identifiers, applying the same availability rules as the model's
// enumeration methods.

use std::collections::BTreeMap;

use tracing::debug;

use crate::model::{Attribute, Facility};

/// Part of the facility a plan covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope<'a> {
    Facility,
    Room(&'a str),
    Device(&'a str),
}

/// One uid to query, with the field the model says to read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryTarget {
    pub uid: String,
    /// `None` for bare uids that are not in the model.
    pub field_key: Option<String>,
}

impl QueryTarget {
    pub fn bare(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            field_key: None,
        }
    }
}

impl From<&Attribute> for QueryTarget {
    fn from(attr: &Attribute) -> Self {
        Self {
            uid: attr.uid.clone(),
            field_key: Some(attr.field_key.clone()),
        }
    }
}

/// Where a controllable uid lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlTarget {
    /// Owning device, or `None` for room- and facility-level attributes.
    pub device_uid: Option<String>,
    /// Attribute name on its owner.
    pub attribute: String,
}

impl Facility {
    /// Observable uids under `scope`.
    ///
    /// A room or device flagged unavailable yields nothing unless
    /// `include_unavailable` is set. Unknown uids yield nothing.
    pub fn read_targets(&self, scope: Scope<'_>, include_unavailable: bool) -> Vec<QueryTarget> {
        match scope {
            Scope::Facility => self
                .observable_attributes(include_unavailable)
                .map(QueryTarget::from)
                .collect(),
            Scope::Room(uid) => match self.room(uid) {
                Some(room) if include_unavailable || room.is_available => room
                    .observable_attributes(include_unavailable)
                    .map(QueryTarget::from)
                    .collect(),
                Some(_) => {
                    debug!(room = uid, "room unavailable, nothing to read");
                    Vec::new()
                }
                None => Vec::new(),
            },
            Scope::Device(uid) => match self.device(uid) {
                Some(device) if include_unavailable || device.is_available => device
                    .observable_attributes()
                    .map(QueryTarget::from)
                    .collect(),
                Some(_) => {
                    debug!(device = uid, "device unavailable, nothing to read");
                    Vec::new()
                }
                None => Vec::new(),
            },
        }
    }

    /// Controllable uids under `scope`, keyed by uid.
    ///
    /// Filtered like [`Facility::read_targets`].
    pub fn control_targets(
        &self,
        scope: Scope<'_>,
        include_unavailable: bool,
    ) -> BTreeMap<String, ControlTarget> {
        let attrs: Vec<&Attribute> = match scope {
            Scope::Facility => self.controllable_attributes(include_unavailable).collect(),
            Scope::Room(uid) => self
                .room(uid)
                .filter(|r| include_unavailable || r.is_available)
                .map(|r| r.controllable_attributes(include_unavailable).collect())
                .unwrap_or_default(),
            Scope::Device(uid) => self
                .device(uid)
                .filter(|d| include_unavailable || d.is_available)
                .map(|d| d.controllable_attributes().collect())
                .unwrap_or_default(),
        };

        attrs
            .into_iter()
            .map(|attr| {
                let target = ControlTarget {
                    device_uid: self.attribute_device(&attr.uid).map(|d| d.uid.clone()),
                    attribute: attr.name.clone(),
                };
                (attr.uid.clone(), target)
            })
            .collect()
    }
}
