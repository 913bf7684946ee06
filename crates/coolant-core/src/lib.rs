//! Entity model and batched telemetry engines for data-center cooling plants.
//!
//! - **Model** ([`model`]): [`Facility`] owns rooms, cooling systems,
//!   devices, sensors and attributes, with a uid index for lookups and
//!   availability-aware enumeration of the uids to read or command.
//!
//! - **[`build()`]**: turns a parsed architecture document into a
//!   [`Facility`]. Broken entries below the facility are skipped and
//!   reported as [`BuildWarning`]s instead of failing the whole load.
//!
//! - **Planner** ([`planner`]): scopes a read or a control write to the
//!   facility, a room, or a device.
//!
//! - **[`DataReader`]** / **[`DataWriter`]**: batched reads with bounded
//!   concurrency, and batched writes with fixed-interval retry, against
//!   any [`coolant_api::TimeSeriesStore`].
//!
//! - **[`ShutdownCoordinator`]**: counts in-flight writes so shutdown can
//!   wait for them.

pub mod builder;
pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod planner;
pub mod shutdown;

// ── Primary re-exports ──────────────────────────────────────────────
pub use builder::{BuildReport, BuildWarning, build, build_with_report};
pub use config::{
    ChannelConfig, LastN, ReadConfig, ReadMode, ReadOverrides, ReadProfile, ReadSpec, ReadTarget,
    TimeRange, TimeUnit, WriteConfig,
};
pub use engine::reader::Readings;
pub use engine::{ControlCommand, DataReader, DataWriter, PredictionKind, WriteSummary};
pub use error::{ConfigError, CoreError};
pub use model::{
    Attribute, AttributeKind, CoolingSystem, Device, Facility, FacilityStats, Room, Sensor,
    SystemKind, TimeSeries,
};
pub use planner::{ControlTarget, QueryTarget, Scope};
pub use shutdown::{CriticalGuard, ShutdownCoordinator};
