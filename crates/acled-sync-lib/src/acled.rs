//! Client for the ACLED `read` endpoint.
//!
//! [`fetch_recent_events`] requests every event dated on or after
//! `now - lookback_days`, with no result cap, and maps each record through
//! [`crate::mapper::map_events`]. An empty result set is a normal outcome and
//! yields an empty list; only a `null` body is treated as
//! [`Error::EmptyResponse`].

use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, Utc};
use reqwest::blocking::Client;
use reqwest::header::ACCEPT;
use reqwest::Url;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::AcledAccess;
use crate::error::{Error, Result};
use crate::mapper::{map_events, MappedFeature, RawEvent, Scalar};

const READ_PATH: &str = "/acled/read";

/// Anything able to answer an ACLED `read` query with a raw JSON body.
pub trait EventSource {
    fn fetch_since(&self, since: NaiveDate) -> Result<String>;
}

/// Blocking HTTP implementation of [`EventSource`].
pub struct AcledClient {
    client: Client,
    base_url: String,
    access: Option<AcledAccess>,
}

impl AcledClient {
    pub fn new(client: Client, base_url: &str, access: Option<AcledAccess>) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            access,
        }
    }
}

impl EventSource for AcledClient {
    fn fetch_since(&self, since: NaiveDate) -> Result<String> {
        let url = events_url(&self.base_url, since, self.access.as_ref())?;
        // The query may carry the API key, so only the path is logged.
        info!(path = %url.path(), since = %since, "requesting data from ACLED API");

        let response = self
            .client
            .get(url)
            .header(ACCEPT, "application/json")
            .send()?
            .error_for_status()?;
        Ok(response.text()?)
    }
}

/// Build the `read` URL for events dated on or after `since`.
pub fn events_url(base_url: &str, since: NaiveDate, access: Option<&AcledAccess>) -> Result<Url> {
    let date = since.format("%Y-%m-%d").to_string();
    let mut params = vec![
        ("event_date", date.as_str()),
        ("event_date_where", ">="),
        ("limit", "0"),
        ("terms", "accept"),
    ];
    if let Some(access) = access {
        params.push(("key", access.key.as_str()));
        params.push(("email", access.email.as_str()));
    }
    let endpoint = format!("{}{}", base_url.trim_end_matches('/'), READ_PATH);
    Url::parse_with_params(&endpoint, &params).map_err(Error::fetch)
}

/// First day of the fetch window.
pub fn window_start(now: DateTime<Utc>, lookback_days: i64) -> NaiveDate {
    (now - ChronoDuration::days(lookback_days)).date_naive()
}

#[derive(Debug, Deserialize)]
struct ReadResponse {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    count: Option<Scalar>,
    #[serde(default)]
    data: Option<Vec<RawEvent>>,
    #[serde(default)]
    error: Option<Value>,
}

/// Fetch and map every event from the last `lookback_days` days.
pub fn fetch_recent_events<S>(
    source: &S,
    now: DateTime<Utc>,
    lookback_days: i64,
) -> Result<Vec<MappedFeature>>
where
    S: EventSource + ?Sized,
{
    let since = window_start(now, lookback_days);
    let body = source.fetch_since(since).map_err(Error::fetch)?;
    debug!(bytes = body.len(), "ACLED response received");
    let events = parse_read_response(&body)?;
    if events.is_empty() {
        return Ok(Vec::new());
    }

    let features = map_events(&events)?;
    info!(
        since = %since,
        feature_count = features.len(),
        "translated ACLED events to features"
    );
    Ok(features)
}

fn parse_read_response(body: &str) -> Result<Vec<RawEvent>> {
    let parsed: Option<ReadResponse> = serde_json::from_str(body).map_err(Error::fetch)?;
    let response = parsed.ok_or(Error::EmptyResponse)?;

    if response.success == Some(false) || response.error.is_some() {
        let message = response
            .error
            .as_ref()
            .map(describe_api_error)
            .unwrap_or_else(|| "API reported an unsuccessful request".to_string());
        return Err(Error::fetch(message));
    }

    if is_zero(response.count.as_ref()) {
        info!("no features returned from ACLED API");
        return Ok(Vec::new());
    }

    let events = response.data.unwrap_or_default();
    if events.is_empty() {
        warn!(count = ?response.count, "ACLED API returned no data records");
    }
    Ok(events)
}

fn is_zero(count: Option<&Scalar>) -> bool {
    match count {
        Some(Scalar::Number(n)) => n.as_u64() == Some(0),
        Some(Scalar::Text(s)) => s.trim() == "0",
        _ => false,
    }
}

fn describe_api_error(error: &Value) -> String {
    match error {
        Value::String(message) => message.clone(),
        Value::Object(fields) => fields
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string()),
        other => other.to_string(),
    }
}
