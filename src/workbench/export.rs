//! Result export
//!
//! Asks the service to render rows as CSV or Excel and writes the returned
//! bytes to disk.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use super::classifier::{Failure, Operation};
use super::navigation::Navigator;
use crate::error::{InsightHubError, Result};
use crate::service::{ExportFormat, InsightService, Row};

/// A rendered export ready to be saved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    /// Suggested file name, e.g. `query_results_1718000000000.csv`
    pub filename: String,
    /// Format the bytes are in
    pub format: ExportFormat,
    /// File contents
    pub bytes: Vec<u8>,
}

/// Builds the timestamped file name for an export.
///
/// # Examples
///
/// ```
/// use insighthub::service::ExportFormat;
/// use insighthub::workbench::export_filename;
///
/// assert_eq!(export_filename(ExportFormat::Excel, 42), "query_results_42.xlsx");
/// ```
pub fn export_filename(format: ExportFormat, timestamp_millis: i64) -> String {
    format!("query_results_{}.{}", timestamp_millis, format.extension())
}

/// Requests rendered exports from the service.
pub struct ExportPipeline {
    service: Arc<dyn InsightService>,
    navigator: Arc<dyn Navigator>,
}

impl ExportPipeline {
    /// Creates a pipeline that reports plan restrictions to `navigator`.
    pub fn new(service: Arc<dyn InsightService>, navigator: Arc<dyn Navigator>) -> Self {
        Self { service, navigator }
    }

    /// Renders `rows` as `format`.
    ///
    /// Always asks the service, whatever the local plan says; the service
    /// decides entitlement. An entitlement failure also sends the user to
    /// pricing.
    ///
    /// # Errors
    ///
    /// Validation failure for empty `rows` (nothing is sent); otherwise the
    /// classified service failure.
    pub async fn export(
        &self,
        rows: &[Row],
        format: ExportFormat,
    ) -> std::result::Result<ExportArtifact, Failure> {
        if rows.is_empty() {
            return Err(Failure::validation(Operation::Export, "No data to export"));
        }

        let filename = export_filename(format, Utc::now().timestamp_millis());
        match self.service.export(rows, format, &filename).await {
            Ok(bytes) => {
                info!(format = %format, rows = rows.len(), bytes = bytes.len(), "Export rendered");
                Ok(ExportArtifact {
                    filename,
                    format,
                    bytes,
                })
            }
            Err(e) => {
                let failure = Failure::from_service(Operation::Export, &e);
                warn!(kind = %failure.kind, error = %e, "Export failed");
                if failure.is_entitlement() {
                    self.navigator.to_pricing(&failure);
                }
                Err(failure)
            }
        }
    }
}

/// Writes `artifact` into `dir`, creating the directory if needed.
///
/// Returns the path written.
///
/// # Errors
///
/// Returns [`InsightHubError::Delivery`] if the directory or file cannot be
/// written.
pub fn deliver(artifact: &ExportArtifact, dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(dir).map_err(|e| {
        InsightHubError::Delivery(format!("cannot create {}: {}", dir.display(), e))
    })?;

    let path = dir.join(&artifact.filename);
    std::fs::write(&path, &artifact.bytes).map_err(|e| {
        InsightHubError::Delivery(format!("cannot write {}: {}", path.display(), e))
    })?;

    info!(path = %path.display(), "Export saved");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{sample_result, MockService, RecordingNavigator};
    use crate::workbench::FailureKind;
    use tempfile::TempDir;

    fn pipeline(service: &Arc<MockService>) -> (ExportPipeline, Arc<RecordingNavigator>) {
        let navigator = Arc::new(RecordingNavigator::default());
        (
            ExportPipeline::new(service.clone(), navigator.clone()),
            navigator,
        )
    }

    #[test]
    fn test_export_filename_uses_extension() {
        assert_eq!(
            export_filename(ExportFormat::Csv, 1_700_000_000_000),
            "query_results_1700000000000.csv"
        );
    }

    #[tokio::test]
    async fn test_export_empty_rows_makes_no_call() {
        let service = Arc::new(MockService::new());
        let (pipeline, navigator) = pipeline(&service);

        let failure = pipeline.export(&[], ExportFormat::Csv).await.unwrap_err();
        assert_eq!(failure.kind, FailureKind::Validation);
        assert_eq!(failure.message, "No data to export");
        assert_eq!(service.total_calls(), 0);
        assert_eq!(navigator.visits(), 0);
    }

    #[tokio::test]
    async fn test_export_success_returns_artifact() {
        let service = Arc::new(MockService::new());
        service.set_export(Ok(b"name,marks\nA,90\n".to_vec()));
        let (pipeline, navigator) = pipeline(&service);
        let rows = sample_result(3).results;

        let artifact = pipeline.export(&rows, ExportFormat::Csv).await.unwrap();
        assert_eq!(artifact.format, ExportFormat::Csv);
        assert_eq!(artifact.bytes, b"name,marks\nA,90\n".to_vec());
        assert!(artifact.filename.starts_with("query_results_"));
        assert!(artifact.filename.ends_with(".csv"));

        let (format, filename, row_count) = service.last_export().unwrap();
        assert_eq!(format, ExportFormat::Csv);
        assert_eq!(filename, artifact.filename);
        assert_eq!(row_count, 3);
        assert_eq!(navigator.visits(), 0);
    }

    #[tokio::test]
    async fn test_export_entitlement_failure_navigates() {
        let service = Arc::new(MockService::new());
        service.set_export(Err((
            403,
            "'export' is only available for Pro and Business plans. Upgrade to access this feature."
                .to_string(),
        )));
        let (pipeline, navigator) = pipeline(&service);
        let rows = sample_result(2).results;

        let failure = pipeline.export(&rows, ExportFormat::Csv).await.unwrap_err();
        assert_eq!(failure.kind, FailureKind::Entitlement);
        assert_eq!(navigator.visits(), 1);
        assert_eq!(service.call_count("export"), 1);
    }

    #[tokio::test]
    async fn test_export_generic_failure_does_not_navigate() {
        let service = Arc::new(MockService::new());
        service.set_export(Err((500, "Error exporting to Excel: boom".to_string())));
        let (pipeline, navigator) = pipeline(&service);
        let rows = sample_result(1).results;

        let failure = pipeline.export(&rows, ExportFormat::Excel).await.unwrap_err();
        assert_eq!(failure.kind, FailureKind::Generic);
        assert_eq!(
            failure.user_message(),
            "Export failed: Error exporting to Excel: boom"
        );
        assert_eq!(navigator.visits(), 0);
    }

    #[test]
    fn test_deliver_writes_file() {
        let dir = TempDir::new().unwrap();
        let artifact = ExportArtifact {
            filename: "query_results_1.csv".to_string(),
            format: ExportFormat::Csv,
            bytes: b"a,b\n1,2\n".to_vec(),
        };

        let path = deliver(&artifact, &dir.path().join("exports")).unwrap();
        assert_eq!(path, dir.path().join("exports").join("query_results_1.csv"));
        assert_eq!(std::fs::read(&path).unwrap(), b"a,b\n1,2\n".to_vec());
    }

    #[test]
    fn test_deliver_into_a_file_path_fails() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "x").unwrap();

        let artifact = ExportArtifact {
            filename: "f.csv".to_string(),
            format: ExportFormat::Csv,
            bytes: vec![],
        };
        let err = deliver(&artifact, &blocker).unwrap_err();
        assert!(err.to_string().contains("Export delivery error"));
    }
}
