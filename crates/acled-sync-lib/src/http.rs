use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, REFERER};

use crate::error::{Error, Result};

/// Referer the portal token is bound to. Every request made with that token
/// must carry the same `Referer` header or ArcGIS rejects it as invalid.
pub const TOKEN_REFERER: &str = "https://www.arcgis.com";

/// Build the blocking client shared by every stage of one run.
pub fn build_client(timeout: Duration) -> Result<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(REFERER, HeaderValue::from_static(TOKEN_REFERER));
    Client::builder()
        .timeout(timeout)
        .default_headers(headers)
        .user_agent(user_agent())
        .build()
        .map_err(Error::Http)
}

fn user_agent() -> String {
    format!("acled-sync-lib/{}", env!("CARGO_PKG_VERSION"))
}

/// POST a urlencoded form and return the body of a 2xx response.
pub(crate) fn post_form(client: &Client, url: &str, form: &[(&str, &str)]) -> Result<String> {
    let response = client.post(url).form(form).send()?.error_for_status()?;
    Ok(response.text()?)
}
