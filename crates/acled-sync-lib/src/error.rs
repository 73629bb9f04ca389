use std::fmt;

use thiserror::Error;

/// Convenient result alias for the sync library.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level library error type.
#[derive(Debug, Error)]
pub enum Error {
    /// No usable session could be established with the feature service portal.
    #[error("unable to set up authentication: {message}")]
    Authentication { message: String },

    /// The upstream event request failed or returned an unreadable body.
    #[error("failed to fetch events from ACLED API: {message}")]
    Fetch { message: String },

    /// The upstream API answered with a `null` body.
    #[error("no response data returned from ACLED API")]
    EmptyResponse,

    /// Removing the existing rows from the feature layer failed.
    #[error("failed to delete features: {message}")]
    Delete { message: String },

    /// Adding the new rows to the feature layer failed.
    #[error("failed to insert features: {message}")]
    Insert { message: String },

    /// A present field value could not be coerced to the attribute type.
    #[error("cannot coerce {field} value '{value}' to {expected}")]
    Coercion {
        field: &'static str,
        value: String,
        expected: &'static str,
    },

    /// A field required to build the feature geometry was absent.
    #[error("event is missing required field {field}")]
    MissingField { field: &'static str },

    /// An environment setting held a value that could not be used.
    #[error("invalid configuration for {key}: {message}")]
    Config { key: &'static str, message: String },

    /// The ArcGIS REST API reported an error inside a successful HTTP response.
    #[error("service error {code}: {message}{}", format_details(.details))]
    Service {
        code: i64,
        message: String,
        details: Vec<String>,
    },

    /// Wrapper for HTTP client errors.
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// Wrapper for JSON encoding and decoding errors.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Stable discriminant for [`Error`], handy in logs and assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Authentication,
    Fetch,
    EmptyResponse,
    Delete,
    Insert,
    Coercion,
    Config,
    Transport,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Authentication { .. } => ErrorKind::Authentication,
            Error::Fetch { .. } => ErrorKind::Fetch,
            Error::EmptyResponse => ErrorKind::EmptyResponse,
            Error::Delete { .. } => ErrorKind::Delete,
            Error::Insert { .. } => ErrorKind::Insert,
            Error::Coercion { .. } | Error::MissingField { .. } => ErrorKind::Coercion,
            Error::Config { .. } => ErrorKind::Config,
            Error::Service { .. } | Error::Http(_) | Error::Json(_) => ErrorKind::Transport,
        }
    }

    pub(crate) fn authentication(err: impl fmt::Display) -> Self {
        Error::Authentication {
            message: err.to_string(),
        }
    }

    pub(crate) fn fetch(err: impl fmt::Display) -> Self {
        Error::Fetch {
            message: err.to_string(),
        }
    }

    pub(crate) fn delete(err: impl fmt::Display) -> Self {
        Error::Delete {
            message: err.to_string(),
        }
    }

    pub(crate) fn insert(err: impl fmt::Display) -> Self {
        Error::Insert {
            message: err.to_string(),
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Authentication => "AuthenticationError",
            ErrorKind::Fetch => "FetchError",
            ErrorKind::EmptyResponse => "EmptyResponseError",
            ErrorKind::Delete => "DeleteError",
            ErrorKind::Insert => "InsertError",
            ErrorKind::Coercion => "CoercionError",
            ErrorKind::Config => "ConfigError",
            ErrorKind::Transport => "TransportError",
        };
        f.write_str(name)
    }
}

fn format_details(details: &[String]) -> String {
    if details.is_empty() {
        String::new()
    } else {
        format!(" ({})", details.join("; "))
    }
}
