//! Error taxonomy shared by the token manager, lookup engine and exporter.

use reqwest::StatusCode;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConnectorError>;

#[derive(Debug, Error)]
pub enum ConnectorError {
    /// A configuration value required by this operation is absent
    #[error("missing required configuration value `{0}`")]
    ConfigMissing(&'static str),

    /// Configuration value present but unusable
    #[error("invalid configuration value `{key}`: {reason}")]
    ConfigInvalid { key: &'static str, reason: String },

    /// Token endpoint failed; fatal for the whole request
    #[error("access token request failed: {0}")]
    UpstreamAuth(String),

    /// Geodata or export query returned a non-success status
    #[error("upstream query failed with status {status}: {body}")]
    UpstreamQuery { status: StatusCode, body: String },

    /// Failure confined to one coordinate record
    #[error("record processing failed: {0}")]
    RecordProcessing(String),

    /// Failure while fetching or decoding one export page
    #[error("page processing failed: {0}")]
    PageProcessing(String),

    /// Inbound request body is not a usable batch
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("http client error: {0}")]
    Http(#[from] reqwest::Error),
}

impl ConnectorError {
    /// Whether this error aborts the request instead of being recovered locally.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            ConnectorError::RecordProcessing(_) | ConnectorError::PageProcessing(_)
        )
    }

    /// Text returned to the client in a 500 response. Upstream failures carry the
    /// raw upstream body.
    pub fn client_message(&self) -> String {
        match self {
            ConnectorError::UpstreamAuth(body) => body.clone(),
            ConnectorError::UpstreamQuery { body, .. } => body.clone(),
            other => other.to_string(),
        }
    }
}
