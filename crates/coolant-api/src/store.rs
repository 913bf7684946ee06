// ── Store abstraction ──
//
// The seam between the read/write engines and a concrete backend.
// `InfluxClient` is the production implementation; tests substitute
// scripted in-memory stores.

use std::future::Future;

use crate::error::Error;
use crate::types::{Point, Sample, WriteTarget};

/// A time-series store that can answer InfluxQL-style queries and accept
/// batches of points.
///
/// Implementations must be safe to share across tasks: the engines hold
/// one instance behind an `Arc` and issue concurrent calls against it.
pub trait TimeSeriesStore: Send + Sync {
    /// Execute `query` and return every numeric sample of the first series,
    /// in the order the store produced them.
    fn query(&self, query: &str) -> impl Future<Output = Result<Vec<Sample>, Error>> + Send;

    /// Write one batch of points. A batch either lands as a whole or fails.
    fn write(
        &self,
        points: &[Point],
        target: &WriteTarget,
    ) -> impl Future<Output = Result<(), Error>> + Send;
}
