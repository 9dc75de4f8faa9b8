//! Shared fixtures for tests that run against a mocked geodata service.

#![allow(dead_code)]

use std::time::Duration;

use geodata_connector::upstream::TOKEN_PATH;
use geodata_connector::{ConnectorConfig, GeodataClient};
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

pub const TOKEN: &str = "test-token";

/// Configuration pointing at `server`, with export settings for region `03`
pub fn config_for(server: &MockServer) -> ConnectorConfig {
    config_with(server, true)
}

pub fn config_with(server: &MockServer, export: bool) -> ConnectorConfig {
    build_config(server, export, 5)
}

fn build_config(server: &MockServer, export: bool, timeout_secs: u64) -> ConnectorConfig {
    let base_url = server.uri();
    ConnectorConfig::from_vars(move |key| match key {
        "username" => Some("svc".to_string()),
        "password" => Some("secret".to_string()),
        "referrer" => Some("connector.test".to_string()),
        "base_url" => Some(base_url.clone()),
        "fylke_id" if export => Some("03".to_string()),
        "attributes" if export => Some("kommunenr,gardsnr,bruksnr".to_string()),
        "timeout_secs" => Some(timeout_secs.to_string()),
        _ => None,
    })
    .unwrap()
}

/// Client whose outbound calls give up after one second
pub fn impatient_client_for(server: &MockServer) -> GeodataClient {
    GeodataClient::new(build_config(server, true, 1)).unwrap()
}

/// Longer than the timeout of [`impatient_client_for`]
pub const SLOW_RESPONSE: Duration = Duration::from_secs(3);

pub fn client_for(server: &MockServer) -> GeodataClient {
    GeodataClient::new(config_for(server)).unwrap()
}

/// Token endpoint returning a token valid for `expires` seconds
pub fn token_mock(expires: i64) -> Mock {
    Mock::given(method("GET"))
        .and(path(TOKEN_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "token": TOKEN, "expires": expires })),
        )
}

/// Point query response with one feature carrying `attributes`
pub fn feature_response(attributes: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "displayFieldName": "kommunenr",
        "features": [{ "attributes": attributes }]
    }))
}

/// First query parameter named `key` of a received request
pub fn query_param(request: &Request, key: &str) -> Option<String> {
    request
        .url
        .query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

/// The decoded `geometry` parameter of a point query
pub fn geometry(request: &Request) -> Value {
    serde_json::from_str(&query_param(request, "geometry").unwrap()).unwrap()
}

/// Requests received by `server` whose path is `request_path`
pub async fn requests_to(server: &MockServer, request_path: &str) -> Vec<Request> {
    server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.url.path() == request_path)
        .collect()
}
