//! Geodata connector - enriches coordinate records with municipality and
//! property identifiers from a geodata REST service.
//!
//! This library provides the lookup, export and HTTP modules used by the
//! `connector` binary.

pub mod api;
pub mod config;
pub mod error;
pub mod export;
pub mod lookup;
pub mod models;
pub mod stream;
pub mod upstream;

pub use config::ConnectorConfig;
pub use error::{ConnectorError, Result};
pub use models::{BatchEnvelope, BatchRequest, CoordinateRecord, GeoResult};
pub use upstream::{GeodataClient, Token, TokenManager};
