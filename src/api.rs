//! HTTP routes of the connector.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::{Body, Bytes},
    extract::{ConnectInfo, Request, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::Serialize;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::error::ConnectorError;
use crate::export::export_region;
use crate::lookup::lookup_batch;
use crate::models::BatchRequest;
use crate::stream::json_array;
use crate::upstream::{GeodataClient, TokenManager};

pub const SERVICE_NAME: &str = "Geodata.no Connector";

/// Application state shared across handlers
pub struct AppState {
    client: GeodataClient,
}

/// Build the router for `/`, `/geo_data` and `/fylke`
pub fn router(client: GeodataClient) -> Router {
    let state = Arc::new(AppState { client });

    Router::new()
        .route("/", get(index_handler))
        .route("/geo_data", get(geo_data_handler).post(geo_data_handler))
        .route("/fylke", get(fylke_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct IndexResponse {
    service: &'static str,
    remote_addr: Option<String>,
}

/// Service identification, echoing the caller address when known
async fn index_handler(request: Request) -> Json<IndexResponse> {
    let remote_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string());

    Json(IndexResponse {
        service: SERVICE_NAME,
        remote_addr,
    })
}

/// Enrich a batch of coordinate records with geodata
async fn geo_data_handler(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Response, (StatusCode, String)> {
    info!("The geodata-connector is running");

    let batch = BatchRequest::from_slice(&body).map_err(http_error)?;

    // Token state lives only as long as this request
    let mut tokens = TokenManager::new();
    let envelope = lookup_batch(&state.client, &mut tokens, batch)
        .await
        .map_err(http_error)?;

    Ok(json_stream(vec![envelope]))
}

/// Export every feature in the configured region
async fn fylke_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Response, (StatusCode, String)> {
    info!("The geodata-connector is running");

    let mut tokens = TokenManager::new();
    let features = export_region(&state.client, &mut tokens)
        .await
        .map_err(http_error)?;

    Ok(json_stream(features))
}

fn json_stream<T>(items: Vec<T>) -> Response
where
    T: Serialize + Send + 'static,
{
    (
        [(header::CONTENT_TYPE, "application/json")],
        Body::from_stream(json_array(items)),
    )
        .into_response()
}

fn http_error(err: ConnectorError) -> (StatusCode, String) {
    match err {
        ConnectorError::InvalidRequest(reason) => {
            error!("Rejected request: {}", reason);
            (StatusCode::BAD_REQUEST, reason)
        }
        other => {
            error!("Request failed: {}", other);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Unexpected error : {}", other.client_message()),
            )
        }
    }
}
