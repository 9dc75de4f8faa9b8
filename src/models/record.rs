//! Inbound batch records and the geodata merged into them.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::{ConnectorError, Result};

/// Key the resolved attributes are stored under in a merged record
pub const GEODATA_KEY: &str = "geodata";

/// Key the upstream uses for feature attributes
pub const ATTRIBUTES_KEY: &str = "attributes";

/// Placeholder for identifiers the upstream could not resolve
pub const UNRESOLVED: &str = "NaN";

/// An inbound record. All fields are passed through to the output.
pub type CoordinateRecord = Map<String, Value>;

/// The first element of an inbound `/geo_data` body
#[derive(Debug, Clone, Deserialize)]
pub struct BatchRequest {
    #[serde(rename = "_id", default)]
    pub id: Option<Value>,
    /// Records are kept as raw values so a malformed one only fails itself
    pub payload: Vec<Value>,
}

impl BatchRequest {
    /// Parse a request body: a JSON array whose first element holds the batch
    pub fn from_slice(body: &[u8]) -> Result<Self> {
        let mut batches: Vec<Value> = serde_json::from_slice(body)
            .map_err(|e| ConnectorError::InvalidRequest(format!("body is not a JSON array: {e}")))?;

        if batches.is_empty() {
            return Err(ConnectorError::InvalidRequest("batch array is empty".into()));
        }

        serde_json::from_value(batches.swap_remove(0))
            .map_err(|e| ConnectorError::InvalidRequest(format!("malformed batch: {e}")))
    }

    /// The `_id` to echo back, stringified. Empty and null ids are treated as absent.
    pub fn envelope_id(&self) -> Option<String> {
        match self.id.as_ref()? {
            Value::Null => None,
            Value::String(s) if s.is_empty() => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

/// Response wrapper around the merged records of one batch
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchEnvelope {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub geo_response: Vec<CoordinateRecord>,
}

/// Geodata resolved for one record
#[derive(Debug, Clone, PartialEq)]
pub struct GeoResult {
    pub geodata: Value,
}

impl GeoResult {
    /// Sentinel result for records without a matching feature
    pub fn unresolved() -> Self {
        Self {
            geodata: json!({
                "kommunenr": UNRESOLVED,
                "gardsnr": UNRESOLVED,
                "bruksnr": UNRESOLVED,
            }),
        }
    }

    /// Take the attributes of the first feature of a point query response.
    ///
    /// Returns `Ok(None)` when `features` is missing or empty, or the first
    /// feature has no attributes. A body of any other shape is an error.
    pub fn from_query_response(response: &Value) -> Result<Option<Self>> {
        let body = response.as_object().ok_or_else(|| {
            ConnectorError::RecordProcessing(format!("query response is not an object: {response}"))
        })?;

        let features = match body.get("features") {
            None => return Ok(None),
            Some(Value::Array(features)) => features,
            Some(other) => {
                return Err(ConnectorError::RecordProcessing(format!(
                    "`features` is not an array: {other}"
                )))
            }
        };

        let first = match features.first() {
            None => return Ok(None),
            Some(Value::Object(first)) => first,
            Some(other) => {
                return Err(ConnectorError::RecordProcessing(format!(
                    "feature is not an object: {other}"
                )))
            }
        };

        Ok(first.get(ATTRIBUTES_KEY).map(|attributes| Self {
            geodata: attributes.clone(),
        }))
    }

    /// Add the `geodata` key to `record`, replacing any existing value
    pub fn merge_into(self, mut record: CoordinateRecord) -> CoordinateRecord {
        record.insert(GEODATA_KEY.to_string(), self.geodata);
        record
    }
}
