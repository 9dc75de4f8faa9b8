//! Access to the upstream geodata REST service.

mod client;
mod token;

pub use client::{
    decode_json, GeodataClient, POINT_QUERY_PATH, REGION_QUERY_PATH, TOKEN_PATH,
};
pub use token::{Token, TokenManager, REFRESH_THRESHOLD_SECS};
