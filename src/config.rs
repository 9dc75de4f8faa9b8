//! Connector configuration.
//!
//! Values come from the process environment. A TOML file may supply the same
//! keys for local development; environment variables take precedence over it.

use std::fmt;
use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::Deserialize;
use url::Url;

use crate::error::{ConnectorError, Result};

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Validated configuration for one connector process
#[derive(Clone)]
pub struct ConnectorConfig {
    pub username: String,
    pub password: String,
    pub referrer: String,
    /// Base URL of the geodata service, without a trailing slash
    pub base_url: String,
    /// Region (`fylke`) id, only needed by the export endpoint
    pub fylke_id: Option<String>,
    /// Comma-separated `outFields` for the export endpoint
    pub attributes: Option<String>,
    /// Per-call timeout for outbound requests
    pub timeout_secs: u64,
}

/// Region export settings, present only when both optional values are configured
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportSettings<'a> {
    pub fylke_id: &'a str,
    pub attributes: &'a str,
}

/// Unvalidated values as read from a file or the environment
#[derive(Debug, Deserialize, Default, Clone)]
struct RawConfig {
    username: Option<String>,
    password: Option<String>,
    referrer: Option<String>,
    base_url: Option<String>,
    fylke_id: Option<String>,
    attributes: Option<String>,
    timeout_secs: Option<u64>,
}

impl RawConfig {
    fn from_vars<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let timeout_secs = match non_empty("timeout_secs") {
            Some(raw) => Some(raw.trim().parse().map_err(|e| ConnectorError::ConfigInvalid {
                key: "timeout_secs",
                reason: format!("{e}"),
            })?),
            None => None,
        };

        Ok(Self {
            username: non_empty("username"),
            password: non_empty("password"),
            referrer: non_empty("referrer"),
            base_url: non_empty("base_url"),
            fylke_id: non_empty("fylke_id"),
            attributes: non_empty("attributes"),
            timeout_secs,
        })
    }

    /// Values set in `overrides` replace ours
    fn overlay(self, overrides: RawConfig) -> Self {
        Self {
            username: overrides.username.or(self.username),
            password: overrides.password.or(self.password),
            referrer: overrides.referrer.or(self.referrer),
            base_url: overrides.base_url.or(self.base_url),
            fylke_id: overrides.fylke_id.or(self.fylke_id),
            attributes: overrides.attributes.or(self.attributes),
            timeout_secs: overrides.timeout_secs.or(self.timeout_secs),
        }
    }

    fn validate(self) -> Result<ConnectorConfig> {
        let username = self.username.ok_or(ConnectorError::ConfigMissing("username"))?;
        let password = self.password.ok_or(ConnectorError::ConfigMissing("password"))?;
        let referrer = self.referrer.ok_or(ConnectorError::ConfigMissing("referrer"))?;
        let base_url = self.base_url.ok_or(ConnectorError::ConfigMissing("base_url"))?;

        Url::parse(&base_url).map_err(|e| ConnectorError::ConfigInvalid {
            key: "base_url",
            reason: e.to_string(),
        })?;

        let timeout_secs = self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(ConnectorError::ConfigInvalid {
                key: "timeout_secs",
                reason: "must be at least 1 second".into(),
            });
        }

        Ok(ConnectorConfig {
            username,
            password,
            referrer,
            base_url: base_url.trim_end_matches('/').to_string(),
            fylke_id: self.fylke_id,
            attributes: self.attributes,
            timeout_secs,
        })
    }
}

impl ConnectorConfig {
    /// Read configuration from environment variables
    /// (`username`, `password`, `referrer`, `base_url`, `fylke_id`, `attributes`, `timeout_secs`).
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Same as [`ConnectorConfig::from_env`] with an arbitrary variable source
    pub fn from_vars<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        RawConfig::from_vars(lookup)?.validate()
    }

    /// Load a TOML file, then apply environment overrides
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path).context("Failed to read config file")?;
        Self::from_toml_with_vars(&content, |key| std::env::var(key).ok())
    }

    fn from_toml_with_vars<F>(content: &str, lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file: RawConfig = toml::from_str(content).context("Failed to parse config file")?;
        let config = file.overlay(RawConfig::from_vars(lookup)?).validate()?;
        Ok(config)
    }

    /// Settings for the region export, or `ConfigMissing` naming the first absent key
    pub fn export_settings(&self) -> Result<ExportSettings<'_>> {
        let fylke_id = self
            .fylke_id
            .as_deref()
            .ok_or(ConnectorError::ConfigMissing("fylke_id"))?;
        let attributes = self
            .attributes
            .as_deref()
            .ok_or(ConnectorError::ConfigMissing("attributes"))?;
        Ok(ExportSettings {
            fylke_id,
            attributes,
        })
    }
}

impl fmt::Debug for ConnectorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectorConfig")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("referrer", &self.referrer)
            .field("base_url", &self.base_url)
            .field("fylke_id", &self.fylke_id)
            .field("attributes", &self.attributes)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const REQUIRED: &[(&str, &str)] = &[
        ("username", "svc"),
        ("password", "hunter2"),
        ("referrer", "connector.example"),
        ("base_url", "https://geodata.example/arcgis/"),
    ];

    #[test]
    fn test_required_values() {
        let config = ConnectorConfig::from_vars(vars(REQUIRED)).unwrap();
        assert_eq!(config.username, "svc");
        assert_eq!(config.base_url, "https://geodata.example/arcgis");
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert!(config.fylke_id.is_none());
    }

    #[test]
    fn test_missing_required_value() {
        let err = ConnectorConfig::from_vars(vars(&REQUIRED[..3])).unwrap_err();
        assert!(matches!(err, ConnectorError::ConfigMissing("base_url")));
    }

    #[test]
    fn test_blank_value_counts_as_missing() {
        let mut pairs = REQUIRED.to_vec();
        pairs[0] = ("username", "  ");
        let err = ConnectorConfig::from_vars(vars(&pairs)).unwrap_err();
        assert!(matches!(err, ConnectorError::ConfigMissing("username")));
    }

    #[test]
    fn test_invalid_base_url() {
        let mut pairs = REQUIRED.to_vec();
        pairs[3] = ("base_url", "not a url");
        let err = ConnectorConfig::from_vars(vars(&pairs)).unwrap_err();
        assert!(matches!(err, ConnectorError::ConfigInvalid { key: "base_url", .. }));
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("timeout_secs", "0"));
        let err = ConnectorConfig::from_vars(vars(&pairs)).unwrap_err();
        assert!(matches!(err, ConnectorError::ConfigInvalid { key: "timeout_secs", .. }));

        let toml = "username = \"u\"\npassword = \"p\"\nreferrer = \"r\"\n\
                    base_url = \"http://localhost\"\ntimeout_secs = 0";
        assert!(ConnectorConfig::from_toml_with_vars(toml, vars(&[])).is_err());
    }

    #[test]
    fn test_export_settings_require_both_values() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("fylke_id", "03"));
        let config = ConnectorConfig::from_vars(vars(&pairs)).unwrap();
        assert!(matches!(
            config.export_settings(),
            Err(ConnectorError::ConfigMissing("attributes"))
        ));

        pairs.push(("attributes", "kommunenr,gardsnr,bruksnr"));
        let config = ConnectorConfig::from_vars(vars(&pairs)).unwrap();
        let settings = config.export_settings().unwrap();
        assert_eq!(settings.fylke_id, "03");
        assert_eq!(settings.attributes, "kommunenr,gardsnr,bruksnr");
    }

    #[test]
    fn test_env_overrides_file() {
        let toml = r#"
            username = "file-user"
            password = "file-pass"
            referrer = "file-ref"
            base_url = "https://file.example"
            timeout_secs = 5
        "#;
        let config =
            ConnectorConfig::from_toml_with_vars(toml, vars(&[("username", "env-user")])).unwrap();
        assert_eq!(config.username, "env-user");
        assert_eq!(config.password, "file-pass");
        assert_eq!(config.timeout_secs, 5);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "username = \"u\"\npassword = \"p\"\nreferrer = \"r\"\nbase_url = \"http://localhost:9000\"\n\
             fylke_id = \"46\"\nattributes = \"*\""
        )
        .unwrap();

        let config = ConnectorConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.base_url, "http://localhost:9000");
        assert_eq!(config.fylke_id.as_deref(), Some("46"));
    }

    #[test]
    fn test_debug_redacts_password() {
        let config = ConnectorConfig::from_vars(vars(REQUIRED)).unwrap();
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("[REDACTED]"));
    }
}
