//! ACLED feature layer sync library.
//!
//! This crate fetches recent conflict events from the ACLED API, maps them to
//! ArcGIS feature JSON, and replaces the contents of a hosted feature layer.
//! The scheduler-facing binary should only call [`job::run_from_env`] (or
//! [`job::run`] with its own stages) instead of driving the stages itself.
//!

#![deny(warnings)]

pub mod acled;
pub mod arcgis;
pub mod config;
pub mod error;
pub mod feature_service;
pub mod http;
pub mod job;
pub mod mapper;
pub mod session;

pub use acled::{fetch_recent_events, AcledClient, EventSource};
pub use config::Config;
pub use error::{Error, ErrorKind, Result};
pub use feature_service::{replace_all, FeatureLayer, FeatureServiceClient, ReplaceResult};
pub use job::{run, run_from_env, HttpStages, RunOutcome, Stage, Stages, Trigger};
pub use mapper::{map_event, map_events, MappedFeature, RawEvent, Scalar};
pub use session::{create_session, Credentials, PortalTokenIssuer, Session, TokenIssuer};
