// coolant-api: Async client for the time-series store behind the cooling plant (InfluxDB 1.x HTTP)

pub mod error;
pub mod influx;
pub mod line_protocol;
pub mod store;
pub mod transport;
pub mod types;

pub use error::Error;
pub use influx::{Credentials, InfluxClient};
pub use store::TimeSeriesStore;
pub use transport::{TlsMode, TransportConfig};
pub use types::{Point, Sample, WriteTarget};
