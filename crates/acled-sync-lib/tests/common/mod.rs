//! Common test utilities and in-memory stage fakes.
//!
//! The fakes implement the stage traits and record every call so tests can
//! assert on ordering and payloads without touching the network.

pub mod http_stub;

use std::cell::RefCell;
use std::fs;
use std::path::PathBuf;

use acled_sync_lib::arcgis::ServiceError;
use acled_sync_lib::feature_service::{AddResponse, DeleteResponse, EditResult};
use acled_sync_lib::session::IssuedToken;
use acled_sync_lib::{
    Credentials, Error, EventSource, FeatureLayer, MappedFeature, Result, Session, TokenIssuer,
};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};

/// Path to fixtures directory used by tests.
pub fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../docs/fixtures")
}

#[allow(dead_code)]
pub fn fixture(name: &str) -> String {
    fs::read_to_string(fixtures_dir().join(name)).expect("fixture readable")
}

#[allow(dead_code)]
pub fn invocation_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2020, 1, 15, 6, 0, 0).unwrap()
}

#[allow(dead_code)]
pub fn credentials() -> Credentials {
    Credentials::new("publisher", "hunter2")
}

/// Issues a fixed token, or fails when `reject` is set.
#[allow(dead_code)]
pub struct FakeIssuer {
    pub reject: bool,
}

impl TokenIssuer for FakeIssuer {
    fn generate_token(&self, _credentials: &Credentials) -> Result<IssuedToken> {
        if self.reject {
            return Err(Error::Service {
                code: 400,
                message: "Invalid username or password.".to_string(),
                details: Vec::new(),
            });
        }
        Ok(IssuedToken {
            token: "fake-token".to_string(),
            expires: None,
        })
    }
}

/// Answers every query with a canned body, or a transport failure.
#[allow(dead_code)]
pub struct ScriptedEvents {
    body: std::result::Result<String, String>,
    pub requested: RefCell<Vec<NaiveDate>>,
}

#[allow(dead_code)]
impl ScriptedEvents {
    pub fn body(body: impl Into<String>) -> Self {
        Self {
            body: Ok(body.into()),
            requested: RefCell::new(Vec::new()),
        }
    }

    pub fn unreachable(message: &str) -> Self {
        Self {
            body: Err(message.to_string()),
            requested: RefCell::new(Vec::new()),
        }
    }
}

impl EventSource for ScriptedEvents {
    fn fetch_since(&self, since: NaiveDate) -> Result<String> {
        self.requested.borrow_mut().push(since);
        self.body.clone().map_err(|message| Error::Service {
            code: 0,
            message,
            details: Vec::new(),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
#[allow(dead_code)]
pub enum LayerCall {
    Delete { where_clause: String, token: String },
    Add { features: Vec<MappedFeature>, token: String },
}

/// Feature layer that records calls and can be told to fail either step.
///
/// `locked_rows` of the existing rows report `success: false` on delete, and
/// `drop_add_results` answers the add with an empty `addResults` list.
#[derive(Default)]
#[allow(dead_code)]
pub struct RecordingLayer {
    pub fail_delete: bool,
    pub fail_insert: bool,
    pub existing_rows: usize,
    pub locked_rows: usize,
    pub drop_add_results: bool,
    pub calls: RefCell<Vec<LayerCall>>,
}

#[allow(dead_code)]
impl RecordingLayer {
    pub fn with_rows(existing_rows: usize) -> Self {
        Self {
            existing_rows,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<LayerCall> {
        self.calls.borrow().clone()
    }
}

impl FeatureLayer for RecordingLayer {
    fn delete_where(&self, session: &Session, where_clause: &str) -> Result<DeleteResponse> {
        self.calls.borrow_mut().push(LayerCall::Delete {
            where_clause: where_clause.to_string(),
            token: session.token().to_string(),
        });
        if self.fail_delete {
            return Err(Error::Service {
                code: 0,
                message: "connection reset by peer".to_string(),
                details: Vec::new(),
            });
        }
        Ok(DeleteResponse {
            delete_results: (0..self.existing_rows)
                .map(|i| {
                    let locked = i < self.locked_rows;
                    EditResult {
                        object_id: Some(i as i64 + 1),
                        success: !locked,
                        error: locked.then(|| ServiceError {
                            code: 1019,
                            message: "Row is locked by another editor".to_string(),
                            ..ServiceError::default()
                        }),
                    }
                })
                .collect(),
        })
    }

    fn add_features(&self, session: &Session, features: &[MappedFeature]) -> Result<AddResponse> {
        self.calls.borrow_mut().push(LayerCall::Add {
            features: features.to_vec(),
            token: session.token().to_string(),
        });
        if self.fail_insert {
            return Err(Error::Service {
                code: 503,
                message: "Service unavailable".to_string(),
                details: Vec::new(),
            });
        }
        if self.drop_add_results {
            return Ok(AddResponse::default());
        }
        Ok(AddResponse {
            add_results: (0..features.len())
                .map(|i| EditResult {
                    object_id: Some(1000 + i as i64),
                    success: true,
                    error: None,
                })
                .collect(),
        })
    }
}
