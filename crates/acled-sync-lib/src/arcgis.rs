//! Response handling shared by the ArcGIS REST endpoints.
//!
//! ArcGIS reports most failures as HTTP 200 with an `error` object in the
//! body, so every response is checked for one before it is decoded.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{Error, Result};

/// Error object returned by ArcGIS REST operations.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServiceError {
    pub code: i64,
    pub message: String,
    pub description: Option<String>,
    pub details: Vec<String>,
}

impl From<ServiceError> for Error {
    fn from(err: ServiceError) -> Self {
        let message = if err.message.is_empty() {
            err.description.unwrap_or_default()
        } else {
            err.message
        };
        Error::Service {
            code: err.code,
            message,
            details: err.details,
        }
    }
}

/// Decode an ArcGIS JSON body, surfacing an embedded `error` object.
pub(crate) fn decode<T: DeserializeOwned>(body: &str) -> Result<T> {
    let mut value: Value = serde_json::from_str(body)?;
    if let Some(error) = value.get_mut("error").map(Value::take) {
        if !error.is_null() {
            let service_error: ServiceError = serde_json::from_value(error)?;
            return Err(service_error.into());
        }
    }
    Ok(serde_json::from_value(value)?)
}
