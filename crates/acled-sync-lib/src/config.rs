//! Environment-driven settings for one sync run.
//!
//! Everything has a built-in default except the service credentials, which
//! are read separately by [`crate::session::Credentials::from_env`].

use std::env;
use std::time::Duration;

use tracing::debug;

use crate::error::{Error, Result};

pub const ACLED_API_URL_ENV: &str = "ACLED_API_URL";
pub const ACLED_API_KEY_ENV: &str = "ACLED_API_KEY";
pub const ACLED_EMAIL_ENV: &str = "ACLED_EMAIL";
pub const FEATURE_LAYER_URL_ENV: &str = "FEATURE_LAYER_URL";
pub const PORTAL_URL_ENV: &str = "ARCGIS_PORTAL_URL";
pub const LOOKBACK_DAYS_ENV: &str = "ACLED_LOOKBACK_DAYS";
pub const HTTP_TIMEOUT_ENV: &str = "HTTP_TIMEOUT_SECS";

pub const DEFAULT_ACLED_API_URL: &str = "https://api.acleddata.com";
pub const DEFAULT_FEATURE_LAYER_URL: &str = "https://services.arcgis.com/LG9Yn2oFqZi5PnO5/arcgis/rest/services/Armed_Conflict_Location_Event_Data_ACLED/FeatureServer/0";
pub const DEFAULT_PORTAL_URL: &str = "https://www.arcgis.com/sharing/rest";
pub const DEFAULT_LOOKBACK_DAYS: i64 = 14;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Optional access key for the ACLED API, sent as `key` and `email`.
#[derive(Clone, PartialEq, Eq)]
pub struct AcledAccess {
    pub key: String,
    pub email: String,
}

impl std::fmt::Debug for AcledAccess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AcledAccess")
            .field("key", &"<redacted>")
            .field("email", &self.email)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub acled_api_url: String,
    pub acled_access: Option<AcledAccess>,
    pub feature_layer_url: String,
    pub portal_url: String,
    pub lookback_days: i64,
    pub http_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            acled_api_url: DEFAULT_ACLED_API_URL.to_string(),
            acled_access: None,
            feature_layer_url: DEFAULT_FEATURE_LAYER_URL.to_string(),
            portal_url: DEFAULT_PORTAL_URL.to_string(),
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        }
    }
}

impl Config {
    /// Build the configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary lookup, so tests do not
    /// need to touch the global environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Config::default();

        let acled_access = match (value(ACLED_API_KEY_ENV), value(ACLED_EMAIL_ENV)) {
            (Some(key), Some(email)) => Some(AcledAccess { key, email }),
            (None, None) => None,
            (Some(_), None) => {
                return Err(Error::Config {
                    key: ACLED_EMAIL_ENV,
                    message: format!("required when {} is set", ACLED_API_KEY_ENV),
                })
            }
            (None, Some(_)) => {
                return Err(Error::Config {
                    key: ACLED_API_KEY_ENV,
                    message: format!("required when {} is set", ACLED_EMAIL_ENV),
                })
            }
        };

        let lookback_days = match value(LOOKBACK_DAYS_ENV) {
            Some(raw) => parse_positive(LOOKBACK_DAYS_ENV, &raw)?,
            None => defaults.lookback_days,
        };
        let http_timeout = match value(HTTP_TIMEOUT_ENV) {
            Some(raw) => Duration::from_secs(parse_positive(HTTP_TIMEOUT_ENV, &raw)? as u64),
            None => defaults.http_timeout,
        };

        let config = Config {
            acled_api_url: value(ACLED_API_URL_ENV)
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.acled_api_url),
            acled_access,
            feature_layer_url: value(FEATURE_LAYER_URL_ENV)
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.feature_layer_url),
            portal_url: value(PORTAL_URL_ENV)
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.portal_url),
            lookback_days,
            http_timeout,
        };
        debug!(?config, "configuration loaded");
        Ok(config)
    }
}

fn parse_positive(key: &'static str, raw: &str) -> Result<i64> {
    match raw.parse::<i64>() {
        Ok(value) if value > 0 => Ok(value),
        Ok(_) => Err(Error::Config {
            key,
            message: format!("expected a positive number, got {}", raw),
        }),
        Err(err) => Err(Error::Config {
            key,
            message: format!("'{}' is not a number: {}", raw, err),
        }),
    }
}
