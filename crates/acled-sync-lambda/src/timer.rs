//! Timer descriptor delivered by the scheduler.
//!
//! EventBridge scheduled events carry the scheduled `time`; other schedulers
//! may pass an explicit `IsPastDue` flag. Both are optional.

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

/// A trigger fired more than this long after its scheduled time is overdue.
pub const OVERDUE_GRACE_MINUTES: i64 = 5;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TimerEvent {
    #[serde(default, alias = "IsPastDue", alias = "isPastDue")]
    pub is_past_due: bool,
    #[serde(default)]
    pub time: Option<DateTime<Utc>>,
}

impl TimerEvent {
    /// Read the timer from an invocation payload.
    ///
    /// Unrecognised payloads are logged and treated as an on-time trigger;
    /// the run itself must still happen.
    pub fn from_payload(payload: Value) -> Self {
        if payload.is_null() {
            return Self::default();
        }
        serde_json::from_value(payload).unwrap_or_else(|err| {
            warn!(error = %err, "unrecognised timer payload");
            Self::default()
        })
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.is_past_due
            || self
                .time
                .map(|scheduled| now - scheduled > Duration::minutes(OVERDUE_GRACE_MINUTES))
                .unwrap_or(false)
    }
}
