// ── Batch read/write engines ──

pub mod query;
pub mod reader;
pub mod writer;

pub use reader::{DataReader, split_batches};
pub use writer::{ControlCommand, DataWriter, PredictionKind, WriteSummary};
