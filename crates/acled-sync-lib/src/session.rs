//! Authenticated sessions against the ArcGIS portal.
//!
//! A [`Session`] is created once per run from the `SERVICE_USER` and
//! `SERVICE_PASS` credentials and dropped when the run ends.

use std::env;
use std::fmt;

use chrono::{DateTime, Utc};
use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::{debug, info};

use crate::arcgis;
use crate::error::{Error, Result};
use crate::http::{post_form, TOKEN_REFERER};

pub const SERVICE_USER_ENV: &str = "SERVICE_USER";
pub const SERVICE_PASS_ENV: &str = "SERVICE_PASS";

/// Requested token lifetime, in minutes.
const TOKEN_EXPIRATION_MINUTES: u32 = 60;

/// Username and password for the feature service owner.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Read credentials from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| Error::authentication(format!("{} is not set", key)))
        };
        Ok(Self::new(read(SERVICE_USER_ENV)?, read(SERVICE_PASS_ENV)?))
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Token handed out by a [`TokenIssuer`].
#[derive(Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub token: String,
    pub expires: Option<DateTime<Utc>>,
}

/// Source of access tokens for write operations on the feature layer.
pub trait TokenIssuer {
    fn generate_token(&self, credentials: &Credentials) -> Result<IssuedToken>;
}

/// Authenticated credential bound to a single run.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    username: String,
    token: String,
    expires: Option<DateTime<Utc>>,
}

impl Session {
    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn expires(&self) -> Option<DateTime<Utc>> {
        self.expires
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("username", &self.username)
            .field("token", &"<redacted>")
            .field("expires", &self.expires)
            .finish()
    }
}

/// Establish a session for `credentials`.
///
/// Every failure, whatever its cause, is reported as
/// [`Error::Authentication`].
pub fn create_session<I>(issuer: &I, credentials: &Credentials) -> Result<Session>
where
    I: TokenIssuer + ?Sized,
{
    let issued = issuer.generate_token(credentials).map_err(|err| match err {
        Error::Authentication { .. } => err,
        other => Error::authentication(other),
    })?;

    if issued.token.trim().is_empty() {
        return Err(Error::authentication("portal returned an empty token"));
    }

    info!(
        username = %credentials.username,
        expires = ?issued.expires,
        "authentication session established"
    );
    Ok(Session {
        username: credentials.username.clone(),
        token: issued.token,
        expires: issued.expires,
    })
}

/// Token issuer backed by the portal's `generateToken` endpoint.
pub struct PortalTokenIssuer {
    client: Client,
    url: String,
}

impl PortalTokenIssuer {
    pub fn new(client: Client, portal_url: &str) -> Self {
        Self {
            client,
            url: format!("{}/generateToken", portal_url.trim_end_matches('/')),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    token: String,
    /// Expiry as milliseconds since the Unix epoch.
    #[serde(default)]
    expires: Option<i64>,
}

impl TokenIssuer for PortalTokenIssuer {
    fn generate_token(&self, credentials: &Credentials) -> Result<IssuedToken> {
        debug!(url = %self.url, username = %credentials.username, "requesting portal token");
        let expiration = TOKEN_EXPIRATION_MINUTES.to_string();
        let form = [
            ("username", credentials.username.as_str()),
            ("password", credentials.password.as_str()),
            ("client", "referer"),
            ("referer", TOKEN_REFERER),
            ("expiration", expiration.as_str()),
            ("f", "json"),
        ];
        let body = post_form(&self.client, &self.url, &form)?;
        let response: TokenResponse = arcgis::decode(&body)?;
        Ok(IssuedToken {
            token: response.token,
            expires: response.expires.and_then(DateTime::<Utc>::from_timestamp_millis),
        })
    }
}
