//! One synchronization run: authenticate, fetch, delete, insert.
//!
//! [`run`] never returns an error. Every stage failure ends the run and is
//! reported as [`RunOutcome::Failed`] after being logged, so the scheduler
//! always observes a normal completion.

use std::fmt;
use std::time::Instant;

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use crate::acled::{fetch_recent_events, AcledClient, EventSource};
use crate::config::Config;
use crate::error::{Error, ErrorKind};
use crate::feature_service::{replace_all, FeatureLayer, FeatureServiceClient, ReplaceResult};
use crate::http::build_client;
use crate::session::{create_session, Credentials, PortalTokenIssuer, TokenIssuer};

/// Pipeline stage a run was in when it stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Setup,
    Auth,
    Fetch,
    Delete,
    Insert,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Setup => "setup",
            Stage::Auth => "auth",
            Stage::Fetch => "fetch",
            Stage::Delete => "delete",
            Stage::Insert => "insert",
        };
        f.write_str(name)
    }
}

/// How a run ended.
#[derive(Debug)]
pub enum RunOutcome {
    /// The layer now holds exactly the fetched features.
    Replaced(ReplaceResult),
    /// Upstream had no events in the window; the layer was left untouched.
    NoData,
    Failed { stage: Stage, error: Error },
}

impl RunOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, RunOutcome::Failed { .. })
    }
}

/// Trigger metadata for one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trigger {
    pub now: DateTime<Utc>,
    pub overdue: bool,
}

/// The three external collaborators a run talks to.
pub struct Stages<'a> {
    pub issuer: &'a dyn TokenIssuer,
    pub events: &'a dyn EventSource,
    pub layer: &'a dyn FeatureLayer,
}

/// Reqwest-backed stages sharing one HTTP client.
pub struct HttpStages {
    issuer: PortalTokenIssuer,
    events: AcledClient,
    layer: FeatureServiceClient,
}

impl HttpStages {
    pub fn from_config(config: &Config) -> crate::Result<Self> {
        let client = build_client(config.http_timeout)?;
        Ok(Self {
            issuer: PortalTokenIssuer::new(client.clone(), &config.portal_url),
            events: AcledClient::new(
                client.clone(),
                &config.acled_api_url,
                config.acled_access.clone(),
            ),
            layer: FeatureServiceClient::new(client, &config.feature_layer_url),
        })
    }

    pub fn stages(&self) -> Stages<'_> {
        Stages {
            issuer: &self.issuer,
            events: &self.events,
            layer: &self.layer,
        }
    }
}

/// Execute one run against the given stages.
pub fn run(
    stages: &Stages<'_>,
    config: &Config,
    credentials: &Credentials,
    trigger: Trigger,
) -> RunOutcome {
    let started = Instant::now();
    if trigger.overdue {
        warn!("timer trigger is running late");
    }
    info!(
        started_at = %trigger.now.to_rfc3339(),
        overdue = trigger.overdue,
        "ACLED update initiated"
    );

    let outcome = match run_stages(stages, config, credentials, trigger.now) {
        Ok(Some(result)) => RunOutcome::Replaced(result),
        Ok(None) => RunOutcome::NoData,
        Err((stage, error)) => RunOutcome::Failed { stage, error },
    };
    log_outcome(&outcome, started.elapsed().as_millis());
    outcome
}

/// Execute one run with settings and credentials read through `lookup`.
///
/// Configuration problems end the run in [`Stage::Setup`], missing
/// credentials in [`Stage::Auth`].
pub fn run_from_lookup<F>(lookup: F, trigger: Trigger) -> RunOutcome
where
    F: Fn(&str) -> Option<String>,
{
    let config = match Config::from_lookup(&lookup) {
        Ok(config) => config,
        Err(error) => return fail_before_start(Stage::Setup, error, trigger),
    };
    let credentials = match Credentials::from_lookup(&lookup) {
        Ok(credentials) => credentials,
        Err(error) => return fail_before_start(Stage::Auth, error, trigger),
    };
    let http = match HttpStages::from_config(&config) {
        Ok(http) => http,
        Err(error) => return fail_before_start(Stage::Setup, error, trigger),
    };
    run(&http.stages(), &config, &credentials, trigger)
}

/// [`run_from_lookup`] over the process environment.
pub fn run_from_env(trigger: Trigger) -> RunOutcome {
    run_from_lookup(|key| std::env::var(key).ok(), trigger)
}

fn run_stages(
    stages: &Stages<'_>,
    config: &Config,
    credentials: &Credentials,
    now: DateTime<Utc>,
) -> Result<Option<ReplaceResult>, (Stage, Error)> {
    let session = create_session(stages.issuer, credentials).map_err(|e| (Stage::Auth, e))?;

    let features = fetch_recent_events(stages.events, now, config.lookback_days)
        .map_err(|e| (Stage::Fetch, e))?;
    if features.is_empty() {
        return Ok(None);
    }

    replace_all(stages.layer, &session, &features)
        .map(Some)
        .map_err(|e| {
            let stage = match e.kind() {
                ErrorKind::Delete => Stage::Delete,
                _ => Stage::Insert,
            };
            (stage, e)
        })
}

fn fail_before_start(stage: Stage, error: Error, trigger: Trigger) -> RunOutcome {
    info!(
        started_at = %trigger.now.to_rfc3339(),
        overdue = trigger.overdue,
        "ACLED update initiated"
    );
    let outcome = RunOutcome::Failed { stage, error };
    log_outcome(&outcome, 0);
    outcome
}

fn log_outcome(outcome: &RunOutcome, elapsed_ms: u128) {
    match outcome {
        RunOutcome::Replaced(result) => info!(
            deleted = result.deleted,
            inserted = result.inserted,
            rejected = result.rejected,
            elapsed_ms = elapsed_ms as u64,
            "ACLED live update completed"
        ),
        RunOutcome::NoData => info!(
            elapsed_ms = elapsed_ms as u64,
            "no data from ACLED API; feature layer left unchanged"
        ),
        RunOutcome::Failed { stage, error } => error!(
            stage = %stage,
            kind = %error.kind(),
            error = %error,
            elapsed_ms = elapsed_ms as u64,
            "ACLED live update failed"
        ),
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn trigger() -> Trigger {
        Trigger {
            now: Utc.with_ymd_and_hms(2020, 1, 15, 0, 0, 0).unwrap(),
            overdue: false,
        }
    }

    #[test]
    fn missing_credentials_fail_in_auth_stage() {
        let outcome = run_from_lookup(|_| None, trigger());
        match outcome {
            RunOutcome::Failed { stage, error } => {
                assert_eq!(stage, Stage::Auth);
                assert_eq!(error.kind(), ErrorKind::Authentication);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn invalid_config_fails_in_setup_stage() {
        let outcome = run_from_lookup(
            |key| (key == crate::config::LOOKBACK_DAYS_ENV).then(|| "-1".to_string()),
            trigger(),
        );
        assert!(matches!(
            outcome,
            RunOutcome::Failed {
                stage: Stage::Setup,
                ..
            }
        ));
    }

    #[test]
    fn stage_names_are_lowercase() {
        assert_eq!(Stage::Delete.to_string(), "delete");
        assert_eq!(Stage::Setup.to_string(), "setup");
    }
}
