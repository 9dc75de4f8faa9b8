//! Coordinate extraction from inbound records.

use serde_json::Value;

use crate::models::CoordinateRecord;

/// Suffix some sources append to coordinate values
pub const COORDINATE_MARKER: &str = "~f";

/// Parameters of one point query, as strings ready for the upstream URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointQuery {
    pub wkid: String,
    pub x: String,
    pub y: String,
}

impl PointQuery {
    /// Read `wkid`, `x_coordinate` and `y_coordinate` from a record.
    ///
    /// Both coordinates have the marker characters trimmed when either one
    /// contains the marker or `y` is non-empty.
    pub fn from_record(record: &CoordinateRecord) -> Self {
        let wkid = field_as_string(record, "wkid");
        let mut x = field_as_string(record, "x_coordinate");
        let mut y = field_as_string(record, "y_coordinate");

        if x.contains(COORDINATE_MARKER) || y.contains(COORDINATE_MARKER) || !y.is_empty() {
            x = strip_marker(&x);
            y = strip_marker(&y);
        }

        Self { wkid, x, y }
    }

    pub fn has_both_coordinates(&self) -> bool {
        !self.x.is_empty() && !self.y.is_empty()
    }
}

/// Strings are taken as-is, other values in their JSON form, absent or null as empty
fn field_as_string(record: &CoordinateRecord, key: &str) -> String {
    match record.get(key) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn strip_marker(value: &str) -> String {
    value
        .trim_matches(|c: char| COORDINATE_MARKER.contains(c))
        .to_string()
}
