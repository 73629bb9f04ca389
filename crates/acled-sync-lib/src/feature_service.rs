//! Replacement of the hosted feature layer contents.
//!
//! [`replace_all`] deletes every row (`where=1=1`) and then adds the new
//! features in a single request. The two calls are not transactional: when
//! the delete succeeds and the insert fails, the layer stays empty until the
//! next successful run.

use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::arcgis::{self, ServiceError};
use crate::error::{Error, Result};
use crate::http::post_form;
use crate::mapper::MappedFeature;
use crate::session::Session;

/// Filter matching every row in the layer.
pub const DELETE_ALL_WHERE: &str = "1=1";

/// Outcome of a single row edit reported by the feature service.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EditResult {
    pub object_id: Option<i64>,
    pub success: bool,
    pub error: Option<ServiceError>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DeleteResponse {
    pub delete_results: Vec<EditResult>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AddResponse {
    pub add_results: Vec<EditResult>,
}

/// Row counts from one replacement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaceResult {
    pub deleted: usize,
    pub inserted: usize,
    /// Features the service refused individually.
    pub rejected: usize,
}

/// Write operations on one hosted feature layer.
pub trait FeatureLayer {
    fn delete_where(&self, session: &Session, where_clause: &str) -> Result<DeleteResponse>;

    fn add_features(&self, session: &Session, features: &[MappedFeature]) -> Result<AddResponse>;
}

/// Feature layer reached through the ArcGIS REST API.
pub struct FeatureServiceClient {
    client: Client,
    layer_url: String,
}

impl FeatureServiceClient {
    pub fn new(client: Client, layer_url: &str) -> Self {
        Self {
            client,
            layer_url: layer_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn layer_url(&self) -> &str {
        &self.layer_url
    }

    fn operation_url(&self, operation: &str) -> String {
        format!("{}/{}", self.layer_url, operation)
    }
}

impl FeatureLayer for FeatureServiceClient {
    fn delete_where(&self, session: &Session, where_clause: &str) -> Result<DeleteResponse> {
        let url = self.operation_url("deleteFeatures");
        debug!(url = %url, where_clause, "posting deleteFeatures");
        let form = [
            ("where", where_clause),
            ("f", "json"),
            ("token", session.token()),
        ];
        let body = post_form(&self.client, &url, &form)?;
        arcgis::decode(&body)
    }

    fn add_features(&self, session: &Session, features: &[MappedFeature]) -> Result<AddResponse> {
        let url = self.operation_url("addFeatures");
        let payload = serde_json::to_string(features)?;
        debug!(url = %url, payload_bytes = payload.len(), "posting addFeatures");
        let form = [
            ("features", payload.as_str()),
            ("f", "json"),
            ("token", session.token()),
        ];
        let body = post_form(&self.client, &url, &form)?;
        arcgis::decode(&body)
    }
}

/// Replace every row of `layer` with `features`.
///
/// A failed delete is returned as [`Error::Delete`] and the insert is never
/// attempted. That includes a delete the service accepted but reported failing
/// rows for, since inserting on top of them would leave duplicates behind.
/// A failed insert is returned as [`Error::Insert`], as is an `addResults`
/// list that comes back empty for a non-empty batch.
pub fn replace_all<L>(
    layer: &L,
    session: &Session,
    features: &[MappedFeature],
) -> Result<ReplaceResult>
where
    L: FeatureLayer + ?Sized,
{
    info!("deleting features");
    let deleted = layer
        .delete_where(session, DELETE_ALL_WHERE)
        .map_err(Error::delete)?;
    check_deletes(&deleted.delete_results)?;

    info!(feature_count = features.len(), "inserting features");
    let added = layer
        .add_features(session, features)
        .map_err(Error::insert)?;
    if !features.is_empty() && added.add_results.is_empty() {
        return Err(Error::insert(format!(
            "feature service returned no addResults for {} features",
            features.len()
        )));
    }

    let inserted = added.add_results.iter().filter(|r| r.success).count();
    let rejected = added.add_results.len() - inserted;
    if let Some(first) = added.add_results.iter().find_map(|r| r.error.as_ref()) {
        warn!(
            rejected,
            code = first.code,
            message = %first.message,
            "feature service rejected some features"
        );
    }

    Ok(ReplaceResult {
        deleted: deleted.delete_results.len(),
        inserted,
        rejected,
    })
}

fn check_deletes(results: &[EditResult]) -> Result<()> {
    let failed: Vec<&EditResult> = results.iter().filter(|r| !r.success).collect();
    let Some(first) = failed.first() else {
        return Ok(());
    };
    let reason = first
        .error
        .as_ref()
        .map(|e| Error::from(e.clone()).to_string())
        .unwrap_or_else(|| "no error reported".to_string());
    Err(Error::delete(format!(
        "{} of {} rows could not be deleted (object {}: {})",
        failed.len(),
        results.len(),
        first
            .object_id
            .map_or_else(|| "unknown".to_string(), |id| id.to_string()),
        reason
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_add_results() {
        let body = r#"{"addResults":[
            {"objectId":1,"success":true},
            {"objectId":-1,"success":false,"error":{"code":1000,"description":"bad geometry"}}
        ]}"#;
        let response: AddResponse = arcgis::decode(body).unwrap();
        assert_eq!(response.add_results.len(), 2);
        assert_eq!(response.add_results[0].object_id, Some(1));
        assert!(!response.add_results[1].success);
        assert_eq!(
            response.add_results[1].error.as_ref().map(|e| e.code),
            Some(1000)
        );
    }

    #[test]
    fn missing_results_decode_as_empty() {
        let response: DeleteResponse = arcgis::decode(r#"{"success":true}"#).unwrap();
        assert!(response.delete_results.is_empty());
    }

    #[test]
    fn failed_delete_rows_name_first_object() {
        let results = [
            EditResult {
                object_id: Some(4),
                success: true,
                error: None,
            },
            EditResult {
                object_id: Some(5),
                success: false,
                error: Some(ServiceError {
                    code: 1019,
                    message: "Row is locked".to_string(),
                    ..ServiceError::default()
                }),
            },
        ];
        let err = check_deletes(&results).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("1 of 2 rows"), "{message}");
        assert!(message.contains("object 5"), "{message}");
        assert!(message.contains("Row is locked"), "{message}");
        assert!(check_deletes(&results[..1]).is_ok());
    }

    #[test]
    fn operation_urls_share_layer_base() {
        let client = Client::new();
        let layer = FeatureServiceClient::new(client, "https://example.test/FeatureServer/0/");
        assert_eq!(layer.layer_url(), "https://example.test/FeatureServer/0");
        assert_eq!(
            layer.operation_url("addFeatures"),
            "https://example.test/FeatureServer/0/addFeatures"
        );
    }
}
