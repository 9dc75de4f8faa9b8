//! Batch point lookup.
//!
//! Records are resolved one at a time, in order. A non-success status from the
//! point query aborts the whole batch; any other problem with a single record
//! drops that record and processing moves on to the next one.

use serde_json::Value;
use tracing::{error, info, warn};

use super::coordinates::PointQuery;
use crate::error::{ConnectorError, Result};
use crate::models::{BatchEnvelope, BatchRequest, CoordinateRecord, GeoResult};
use crate::upstream::{GeodataClient, TokenManager};

/// What happened to one inbound record
#[derive(Debug, Clone, PartialEq)]
pub enum RecordOutcome {
    /// Upstream returned attributes for the point
    Resolved(CoordinateRecord),
    /// No matching feature; the record carries the `NaN` sentinels
    Defaulted(CoordinateRecord),
    /// The record could not be processed and is left out of the response
    Dropped { index: usize, reason: String },
}

impl RecordOutcome {
    pub fn into_record(self) -> Option<CoordinateRecord> {
        match self {
            RecordOutcome::Resolved(record) | RecordOutcome::Defaulted(record) => Some(record),
            RecordOutcome::Dropped { .. } => None,
        }
    }

    pub fn is_dropped(&self) -> bool {
        matches!(self, RecordOutcome::Dropped { .. })
    }
}

/// Per-record outcomes of one batch, in input order
#[derive(Debug, Clone, PartialEq)]
pub struct BatchLookup {
    pub id: Option<String>,
    pub outcomes: Vec<RecordOutcome>,
}

impl BatchLookup {
    pub fn dropped(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_dropped()).count()
    }

    pub fn defaulted(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, RecordOutcome::Defaulted(_)))
            .count()
    }

    /// Keep the merged records; dropped ones are left out
    pub fn into_envelope(self) -> BatchEnvelope {
        BatchEnvelope {
            id: self.id,
            geo_response: self
                .outcomes
                .into_iter()
                .filter_map(RecordOutcome::into_record)
                .collect(),
        }
    }
}

/// Resolve every record of `batch` and wrap the merged records in an envelope
pub async fn lookup_batch(
    client: &GeodataClient,
    tokens: &mut TokenManager,
    batch: BatchRequest,
) -> Result<BatchEnvelope> {
    Ok(resolve_batch(client, tokens, batch).await?.into_envelope())
}

/// Like [`lookup_batch`] but keeps the outcome of each record
pub async fn resolve_batch(
    client: &GeodataClient,
    tokens: &mut TokenManager,
    batch: BatchRequest,
) -> Result<BatchLookup> {
    let id = batch.envelope_id();
    if id.is_none() {
        info!("No _id provided in payload...");
    }

    let mut outcomes = Vec::with_capacity(batch.payload.len());
    for (index, element) in batch.payload.into_iter().enumerate() {
        outcomes.push(resolve_record(client, tokens, index, element).await?);
    }

    let lookup = BatchLookup { id, outcomes };
    info!(
        "Resolved batch of {} records ({} defaulted, {} dropped)",
        lookup.outcomes.len(),
        lookup.defaulted(),
        lookup.dropped()
    );
    Ok(lookup)
}

async fn resolve_record(
    client: &GeodataClient,
    tokens: &mut TokenManager,
    index: usize,
    element: Value,
) -> Result<RecordOutcome> {
    let token = tokens.ensure(client).await?;

    let record = match element {
        Value::Object(record) => record,
        other => {
            return Ok(dropped(
                index,
                ConnectorError::RecordProcessing(format!("record is not an object: {other}")),
            ))
        }
    };

    let query = PointQuery::from_record(&record);
    info!(
        "The x, y and wkid respectively '{}', '{}', '{}'",
        query.x, query.y, query.wkid
    );
    if !query.has_both_coordinates() {
        warn!(
            "The x or y coordinates '{}', '{}' are not provided in the right format",
            query.x, query.y
        );
    }

    match client.point_query(token, &query).await {
        Ok(response) => Ok(match GeoResult::from_query_response(&response) {
            Ok(Some(geo)) => RecordOutcome::Resolved(geo.merge_into(record)),
            Ok(None) => {
                error!("No matching feature for record {}, using default geodata", index);
                RecordOutcome::Defaulted(GeoResult::unresolved().merge_into(record))
            }
            Err(err) => dropped(index, err),
        }),
        Err(err) if err.is_fatal() => Err(err),
        Err(err) => Ok(dropped(index, err)),
    }
}

fn dropped(index: usize, err: ConnectorError) -> RecordOutcome {
    warn!("Service not working correctly. Failing with error : {}", err);
    RecordOutcome::Dropped {
        index,
        reason: err.to_string(),
    }
}
