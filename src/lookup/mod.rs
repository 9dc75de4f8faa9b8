//! Point lookup for batches of coordinate records.

mod coordinates;
mod engine;

pub use coordinates::{PointQuery, COORDINATE_MARKER};
pub use engine::{lookup_batch, resolve_batch, BatchLookup, RecordOutcome};
