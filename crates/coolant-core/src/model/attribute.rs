// ── Attribute domain types ──

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// What an attribute is for, which decides whether it is read or written.
///
/// Parses both the canonical names and the older telemetry vocabulary
/// (`telemetry`, `telesignaling`, `teleadjusting`, `telecontrol`, `others`).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(ascii_case_insensitive)]
pub enum AttributeKind {
    #[strum(to_string = "observable-numeric", serialize = "telemetry")]
    ObservableNumeric,
    #[strum(to_string = "observable-discrete", serialize = "telesignaling")]
    ObservableDiscrete,
    #[strum(to_string = "controllable-numeric", serialize = "teleadjusting")]
    ControllableNumeric,
    #[strum(to_string = "controllable-discrete", serialize = "telecontrol")]
    ControllableDiscrete,
    #[strum(to_string = "other", serialize = "others")]
    Other,
}

impl AttributeKind {
    pub fn is_observable(self) -> bool {
        matches!(self, Self::ObservableNumeric | Self::ObservableDiscrete)
    }

    pub fn is_controllable(self) -> bool {
        matches!(self, Self::ControllableNumeric | Self::ControllableDiscrete)
    }
}

/// A single data point on a node, keyed in the store by its `uid`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub uid: String,
    pub kind: AttributeKind,
    /// Column read from the measurement.
    pub field_key: String,
    pub unit: Option<String>,
    pub description: Option<String>,
    /// Last value seen by a read. `None` until the first one.
    pub value: Option<f64>,
}

impl Attribute {
    pub fn new(
        name: impl Into<String>,
        uid: impl Into<String>,
        kind: AttributeKind,
        field_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            uid: uid.into(),
            kind,
            field_key: field_key.into(),
            unit: None,
            description: None,
            value: None,
        }
    }

    pub fn is_observable(&self) -> bool {
        self.kind.is_observable()
    }

    pub fn is_controllable(&self) -> bool {
        self.kind.is_controllable()
    }
}
