//! Data models for batch lookups and region exports.

pub mod feature;
pub mod record;

pub use feature::FeaturePage;
pub use record::{BatchEnvelope, BatchRequest, CoordinateRecord, GeoResult, GEODATA_KEY, UNRESOLVED};
