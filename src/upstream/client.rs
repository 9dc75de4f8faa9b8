//! HTTP client for the geodata REST service.

use std::time::Duration;

use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, error};
use url::Url;

use super::token::Token;
use crate::config::{ConnectorConfig, ExportSettings};
use crate::error::{ConnectorError, Result};
use crate::lookup::PointQuery;
use crate::models::FeaturePage;

pub const TOKEN_PATH: &str = "/tokens/generateToken/query";
pub const POINT_QUERY_PATH: &str =
    "/rest/services/Geomap_UTM33_EUREF89/GeomapMatrikkel/MapServer/5/query";
pub const REGION_QUERY_PATH: &str =
    "/rest/services/Geomap_UTM33_EUREF89/GeomapMatrikkel/FeatureServer/4/query";

/// Fields requested from the point query
const POINT_OUT_FIELDS: &str = "kommunenr,gardsnr,bruksnr";

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Client wrapper holding the connection pool and the connector configuration
#[derive(Clone)]
pub struct GeodataClient {
    http: Client,
    config: ConnectorConfig,
}

impl GeodataClient {
    /// Create a client; outbound calls time out after `config.timeout_secs`
    pub fn new(config: ConnectorConfig) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("geodata-connector/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ConnectorConfig {
        &self.config
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Url::parse(&format!("{}{}", self.config.base_url, path)).map_err(|e| {
            ConnectorError::ConfigInvalid {
                key: "base_url",
                reason: e.to_string(),
            }
        })
    }

    pub fn token_url(&self) -> Result<Url> {
        let mut url = self.endpoint(TOKEN_PATH)?;
        url.query_pairs_mut()
            .append_pair("username", &self.config.username)
            .append_pair("password", &self.config.password)
            .append_pair("referer", &self.config.referrer)
            .append_pair("f", "pjson");
        Ok(url)
    }

    pub fn point_query_url(&self, query: &PointQuery) -> Result<Url> {
        let geometry = json!({
            "x": query.x,
            "y": query.y,
            "spatialReference": { "wkid": query.wkid },
        });

        let mut url = self.endpoint(POINT_QUERY_PATH)?;
        url.query_pairs_mut()
            .append_pair("geometry", &geometry.to_string())
            .append_pair("geometryType", "esriGeometryPoint")
            .append_pair("inSR", &query.wkid)
            .append_pair("spatialRel", "esriSpatialRelIntersects")
            .append_pair("relationParam", "")
            .append_pair("outFields", POINT_OUT_FIELDS)
            .append_pair("returnGeometry", "false")
            .append_pair("returnTrueCurves", "false")
            .append_pair("returnIdsOnly", "false")
            .append_pair("returnCountOnly", "false")
            .append_pair("returnZ", "false")
            .append_pair("returnM", "false")
            .append_pair("returnDistinctValues", "false")
            .append_pair("f", "pjson");
        Ok(url)
    }

    pub fn region_query_url(
        &self,
        settings: ExportSettings<'_>,
        offset: u64,
        page_size: u64,
    ) -> Result<Url> {
        let mut url = self.endpoint(REGION_QUERY_PATH)?;
        url.query_pairs_mut()
            .append_pair("where", &format!("fylkeid={}", settings.fylke_id))
            .append_pair("f", "pjson")
            .append_pair("outFields", settings.attributes)
            .append_pair("returnExceededLimitFeatures", "true")
            .append_pair("resultOffset", &offset.to_string())
            .append_pair("resultRecordCount", &page_size.to_string());
        Ok(url)
    }

    /// Request a fresh token. Every failure here is fatal for the caller.
    pub async fn generate_token(&self) -> Result<Token> {
        let url = self.token_url()?;

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| ConnectorError::UpstreamAuth(format!("token request failed: {e}")))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| ConnectorError::UpstreamAuth(format!("token response unreadable: {e}")))?;

        if !status.is_success() {
            let text = String::from_utf8_lossy(&body).into_owned();
            error!("Access token request failed. Error: {}", text);
            return Err(ConnectorError::UpstreamAuth(text));
        }

        decode_json(&body).map_err(|e| {
            let text = String::from_utf8_lossy(&body);
            error!("Access token response could not be decoded: {}", e);
            ConnectorError::UpstreamAuth(format!("malformed token response ({e}): {text}"))
        })
    }

    /// Run the point-in-polygon attribute query for one record.
    ///
    /// A non-success status is an `UpstreamQuery` error; transport and decoding
    /// failures are `RecordProcessing` errors.
    pub async fn point_query(&self, token: &Token, query: &PointQuery) -> Result<Value> {
        let url = self.point_query_url(query)?;
        debug!("Point query: {}", url);

        let response = self
            .send_authorized(url, token)
            .await
            .map_err(|e| ConnectorError::RecordProcessing(e.to_string()))?;

        let body = check_status(response)
            .await?
            .bytes()
            .await
            .map_err(|e| ConnectorError::RecordProcessing(e.to_string()))?;
        decode_json(&body).map_err(|e| ConnectorError::RecordProcessing(e.to_string()))
    }

    /// Fetch one page of the region export.
    ///
    /// A non-success status is an `UpstreamQuery` error; transport and decoding
    /// failures are `PageProcessing` errors.
    pub async fn region_page(
        &self,
        token: &Token,
        settings: ExportSettings<'_>,
        offset: u64,
        page_size: u64,
    ) -> Result<FeaturePage> {
        let url = self.region_query_url(settings, offset, page_size)?;
        debug!("Region query: {}", url);

        let response = self
            .send_authorized(url, token)
            .await
            .map_err(|e| ConnectorError::PageProcessing(e.to_string()))?;

        let body = check_status(response)
            .await?
            .bytes()
            .await
            .map_err(|e| ConnectorError::PageProcessing(e.to_string()))?;
        decode_json(&body).map_err(|e| ConnectorError::PageProcessing(e.to_string()))
    }

    async fn send_authorized(&self, url: Url, token: &Token) -> reqwest::Result<Response> {
        self.http
            .get(url)
            .bearer_auth(&token.value)
            .send()
            .await
    }
}

/// Turn a non-success status into `UpstreamQuery`, carrying the upstream body
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        error!("Unexpected response status code {}: {}", status, body);
        return Err(ConnectorError::UpstreamQuery { status, body });
    }

    Ok(response)
}

/// Decode a JSON body that may start with a UTF-8 byte-order mark
pub fn decode_json<T: DeserializeOwned>(body: &[u8]) -> serde_json::Result<T> {
    serde_json::from_slice(body.strip_prefix(UTF8_BOM).unwrap_or(body))
}
