//! Response body returned to the scheduler after each run.

use serde::{Deserialize, Serialize};

use acled_sync_lib::RunOutcome;

/// Wrapper for Lambda responses with content type metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LambdaResponse<T> {
    /// The actual response payload.
    #[serde(flatten)]
    pub data: T,

    /// Content type for this response.
    pub content_type: String,
}

impl<T> LambdaResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            content_type: "application/json".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Replaced,
    NoData,
    Failed,
}

/// Summary of one run. Failures are reported here, never as a Lambda error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSummary {
    pub status: SyncStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inserted: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejected: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub overdue: bool,
}

impl SyncSummary {
    pub fn from_outcome(outcome: &RunOutcome, overdue: bool) -> Self {
        let mut summary = Self {
            status: SyncStatus::NoData,
            deleted: None,
            inserted: None,
            rejected: None,
            stage: None,
            error: None,
            overdue,
        };
        match outcome {
            RunOutcome::Replaced(result) => {
                summary.status = SyncStatus::Replaced;
                summary.deleted = Some(result.deleted);
                summary.inserted = Some(result.inserted);
                summary.rejected = Some(result.rejected);
            }
            RunOutcome::NoData => {}
            RunOutcome::Failed { stage, error } => {
                summary.status = SyncStatus::Failed;
                summary.stage = Some(stage.to_string());
                summary.error = Some(format!("{}: {}", error.kind(), error));
            }
        }
        summary
    }

    /// Summary for a run whose worker thread did not finish.
    pub fn aborted(message: impl Into<String>, overdue: bool) -> Self {
        Self {
            status: SyncStatus::Failed,
            deleted: None,
            inserted: None,
            rejected: None,
            stage: None,
            error: Some(message.into()),
            overdue,
        }
    }
}

#[cfg(test)]
mod tests {
    use acled_sync_lib::{Error, ReplaceResult, Stage};

    use super::*;

    #[test]
    fn replaced_summary_serialization() {
        let outcome = RunOutcome::Replaced(ReplaceResult {
            deleted: 12,
            inserted: 10,
            rejected: 0,
        });
        let response = LambdaResponse::new(SyncSummary::from_outcome(&outcome, false));
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["content_type"], "application/json");
        assert_eq!(json["status"], "replaced");
        assert_eq!(json["deleted"], 12);
        assert_eq!(json["inserted"], 10);
        assert!(json.get("error").is_none());
    }

    #[test]
    fn failed_summary_names_stage_and_kind() {
        let outcome = RunOutcome::Failed {
            stage: Stage::Delete,
            error: Error::Delete {
                message: "timed out".to_string(),
            },
        };
        let summary = SyncSummary::from_outcome(&outcome, true);
        assert_eq!(summary.status, SyncStatus::Failed);
        assert_eq!(summary.stage.as_deref(), Some("delete"));
        assert_eq!(
            summary.error.as_deref(),
            Some("DeleteError: failed to delete features: timed out")
        );
        assert!(summary.overdue);
    }

    #[test]
    fn no_data_summary_has_no_counts() {
        let json = serde_json::to_value(SyncSummary::from_outcome(&RunOutcome::NoData, false))
            .unwrap();
        assert_eq!(json["status"], "no_data");
        assert!(json.get("deleted").is_none());
    }
}
