//! Bearer token handling for the geodata service.
//!
//! A [`TokenManager`] belongs to one request. It fetches a token on first use
//! and fetches a new one whenever the held token has 10 seconds or less of
//! validity left. Nothing is shared between requests.

use std::time::Instant;

use serde::{Deserialize, Deserializer};
use tracing::info;

use super::client::GeodataClient;
use crate::error::{ConnectorError, Result};

/// Remaining validity, in seconds, at or below which a token is replaced
pub const REFRESH_THRESHOLD_SECS: i64 = 10;

/// Token as returned by the token endpoint
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Token {
    #[serde(rename = "token")]
    pub value: String,
    /// Accepts integer or floating point JSON numbers; fractions are truncated
    #[serde(rename = "expires", deserialize_with = "deserialize_expires")]
    pub expires_in_seconds: i64,
}

fn deserialize_expires<'de, D>(deserializer: D) -> std::result::Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let expires = f64::deserialize(deserializer)?;
    // `as` saturates at the i64 bounds
    Ok(expires.trunc() as i64)
}

#[derive(Debug)]
struct HeldToken {
    token: Token,
    acquired_at: Instant,
}

impl HeldToken {
    fn remaining_secs(&self) -> i64 {
        let elapsed = i64::try_from(self.acquired_at.elapsed().as_secs()).unwrap_or(i64::MAX);
        self.token.expires_in_seconds.saturating_sub(elapsed)
    }
}

/// Request-scoped token state
#[derive(Debug, Default)]
pub struct TokenManager {
    current: Option<HeldToken>,
    acquisitions: usize,
}

impl TokenManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an already obtained token
    pub fn with_token(token: Token) -> Self {
        Self {
            current: Some(HeldToken {
                token,
                acquired_at: Instant::now(),
            }),
            acquisitions: 0,
        }
    }

    /// Seconds of validity left on the held token
    pub fn remaining_secs(&self) -> Option<i64> {
        self.current.as_ref().map(HeldToken::remaining_secs)
    }

    /// True when no token is held or the held one is about to expire
    pub fn needs_refresh(&self) -> bool {
        self.remaining_secs()
            .map_or(true, |remaining| remaining <= REFRESH_THRESHOLD_SECS)
    }

    /// Number of tokens fetched by this manager
    pub fn acquisitions(&self) -> usize {
        self.acquisitions
    }

    /// Return a usable token, fetching one first if [`Self::needs_refresh`].
    /// At most one upstream call is made per invocation.
    pub async fn ensure(&mut self, client: &GeodataClient) -> Result<&Token> {
        if self.needs_refresh() {
            if self.current.is_none() {
                info!("Requesting access token...");
            } else {
                info!("Refreshing access token...");
            }
            let token = client.generate_token().await?;
            self.acquisitions += 1;
            let held = self.current.insert(HeldToken {
                token,
                acquired_at: Instant::now(),
            });
            return Ok(&held.token);
        }

        self.current
            .as_ref()
            .map(|held| &held.token)
            .ok_or_else(|| ConnectorError::UpstreamAuth("no access token held".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(expires: i64) -> Token {
        Token {
            value: "abc".into(),
            expires_in_seconds: expires,
        }
    }

    #[test]
    fn test_empty_manager_needs_token() {
        let manager = TokenManager::new();
        assert!(manager.needs_refresh());
        assert_eq!(manager.remaining_secs(), None);
    }

    #[test]
    fn test_refresh_threshold() {
        assert!(TokenManager::with_token(token(10)).needs_refresh());
        assert!(TokenManager::with_token(token(0)).needs_refresh());
        assert!(TokenManager::with_token(token(-5)).needs_refresh());
        assert!(!TokenManager::with_token(token(3600)).needs_refresh());
    }

    #[test]
    fn test_decode_upstream_shape() {
        let token: Token = serde_json::from_str(r#"{"token":"xyz","expires":60,"ssl":true}"#).unwrap();
        assert_eq!(token.value, "xyz");
        assert_eq!(token.expires_in_seconds, 60);
    }

    #[test]
    fn test_decode_float_expiry() {
        let token: Token = serde_json::from_str(r#"{"token":"xyz","expires":1.7e12}"#).unwrap();
        assert_eq!(token.expires_in_seconds, 1_700_000_000_000);

        let token: Token = serde_json::from_str(r#"{"token":"xyz","expires":9.75}"#).unwrap();
        assert_eq!(token.expires_in_seconds, 9);
        assert!(TokenManager::with_token(token).needs_refresh());
    }
}
