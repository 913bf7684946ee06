// ── Domain model ──
//
// Facility → Room → CoolingSystem → Device → Attribute, with Sensors and
// Attributes also hanging off Room and Facility directly.

pub mod attribute;
pub mod device;
pub mod facility;
pub mod room;
pub mod series;
pub mod system;

pub use attribute::{Attribute, AttributeKind};
pub use device::{AttributeMap, Device, Sensor};
pub use facility::{Facility, FacilityStats};
pub use room::Room;
pub use series::TimeSeries;
pub use system::{CoolingSystem, SystemKind};
