//! Scheduler entry point for the ACLED feature layer sync.
//!
//! - [`handle_event`]: runs one sync for a scheduled invocation
//! - [`init_tracing`]: JSON-formatted tracing for CloudWatch Logs
//! - [`TimerEvent`]: the timer descriptor, including its overdue flag
//! - [`SyncSummary`]: the JSON body returned to the scheduler
//!
//! The handler always completes successfully. Stage failures are logged and
//! reported in the summary, so the scheduler sees a normal completion even
//! when the run failed.

#![deny(warnings)]

mod response;
mod timer;
mod tracing_init;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{error, info};

use acled_sync_lib::job::{run_from_lookup, Trigger};

pub use response::{LambdaResponse, SyncStatus, SyncSummary};
pub use timer::{TimerEvent, OVERDUE_GRACE_MINUTES};
pub use tracing_init::init_tracing;

/// Run one sync for `payload`, reading settings from the environment.
pub async fn handle_event(payload: Value, request_id: &str) -> LambdaResponse<SyncSummary> {
    handle_event_with(payload, request_id, Utc::now(), |key| std::env::var(key).ok()).await
}

/// Run one sync with an explicit clock and settings lookup.
pub async fn handle_event_with<F>(
    payload: Value,
    request_id: &str,
    now: DateTime<Utc>,
    lookup: F,
) -> LambdaResponse<SyncSummary>
where
    F: Fn(&str) -> Option<String> + Send + 'static,
{
    let timer = TimerEvent::from_payload(payload);
    let overdue = timer.is_overdue(now);
    info!(
        request_id = %request_id,
        scheduled_time = ?timer.time,
        overdue,
        "timer trigger received"
    );

    let trigger = Trigger { now, overdue };
    // The library uses blocking HTTP, which must stay off the async workers.
    let summary = match tokio::task::spawn_blocking(move || run_from_lookup(lookup, trigger)).await
    {
        Ok(outcome) => SyncSummary::from_outcome(&outcome, overdue),
        Err(err) => {
            error!(request_id = %request_id, error = %err, "sync worker did not complete");
            SyncSummary::aborted(format!("sync worker did not complete: {}", err), overdue)
        }
    };

    LambdaResponse::new(summary)
}
