//! Result Processor
//!
//! Receives validated submissions. The default implementation files each
//! submission as a JSON record under `<results_dir>/<job_id>/`, with any
//! uploaded attachment stored alongside it.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::{Attachment, DocumentDescriptor, Submission};

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("submission data has an unexpected shape: {0}")]
    InvalidShape(String),

    #[error("failed to store result: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize result record: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Downstream consumer of validated submissions
#[async_trait]
pub trait ResultProcessor: Send + Sync {
    /// Handle a batch submission from `/return_docs`
    async fn process_docs(&self, submission: &Submission) -> Result<(), ProcessError>;

    /// Handle a submission carrying one uploaded file from `/return_doc`
    async fn process_doc(
        &self,
        submission: &Submission,
        attachment: &Attachment,
    ) -> Result<(), ProcessError>;
}

/// Read the `data` field as groups of document descriptors.
/// A missing (`null`) field counts as no groups.
pub fn document_groups(
    submission: &Submission,
) -> Result<Vec<Vec<DocumentDescriptor>>, ProcessError> {
    if submission.data.is_null() {
        return Ok(Vec::new());
    }
    serde_json::from_value(submission.data.clone())
        .map_err(|e| ProcessError::InvalidShape(e.to_string()))
}

/// Files submissions on local disk
pub struct FileResultProcessor {
    results_dir: PathBuf,
}

impl FileResultProcessor {
    pub fn new(results_dir: impl Into<PathBuf>) -> Self {
        Self {
            results_dir: results_dir.into(),
        }
    }

    pub fn results_dir(&self) -> &Path {
        &self.results_dir
    }

    async fn job_dir(&self, submission: &Submission) -> Result<PathBuf, ProcessError> {
        let dir = self
            .results_dir
            .join(sanitize_file_name(&submission.job_id.to_string()));
        fs::create_dir_all(&dir).await?;
        Ok(dir)
    }

    async fn write_record(
        &self,
        dir: &Path,
        id: Uuid,
        submission: &Submission,
        attachment: Option<&str>,
    ) -> Result<PathBuf, ProcessError> {
        let record = serde_json::json!({
            "received_at": chrono::Utc::now().to_rfc3339(),
            "submission": submission,
            "attachment": attachment,
        });
        let path = dir.join(format!("submission-{}.json", id));
        fs::write(&path, serde_json::to_vec_pretty(&record)?).await?;
        Ok(path)
    }
}

#[async_trait]
impl ResultProcessor for FileResultProcessor {
    async fn process_docs(&self, submission: &Submission) -> Result<(), ProcessError> {
        let groups = document_groups(submission)?;
        let documents: usize = groups.iter().map(Vec::len).sum();
        let attachments: u32 = groups.iter().flatten().map(|d| d.attachment_count).sum();

        let dir = self.job_dir(submission).await?;
        let path = self.write_record(&dir, Uuid::new_v4(), submission, None).await?;

        info!(
            job_id = %submission.job_id,
            client_id = %submission.client_id,
            groups = groups.len(),
            documents,
            attachments,
            path = %path.display(),
            "Stored batch submission"
        );
        Ok(())
    }

    async fn process_doc(
        &self,
        submission: &Submission,
        attachment: &Attachment,
    ) -> Result<(), ProcessError> {
        document_groups(submission)?;

        let dir = self.job_dir(submission).await?;
        let id = Uuid::new_v4();
        let file_name = format!(
            "{}-{}",
            id,
            sanitize_file_name(attachment.file_name.as_deref().unwrap_or("attachment"))
        );
        let file_path = dir.join(&file_name);
        fs::write(&file_path, &attachment.bytes).await?;
        debug!(path = %file_path.display(), size = attachment.bytes.len(), "Wrote attachment");

        self.write_record(&dir, id, submission, Some(&file_name)).await?;

        info!(
            job_id = %submission.job_id,
            client_id = %submission.client_id,
            file = %file_name,
            content_type = attachment.content_type.as_deref().unwrap_or("unknown"),
            "Stored single-file submission"
        );
        Ok(())
    }
}

/// Keep only characters that are safe in a single path component
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "unnamed".to_string()
    } else {
        cleaned.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Identifier;
    use tempfile::TempDir;

    fn submission(data: serde_json::Value) -> Submission {
        Submission {
            job_id: Identifier::Text("job-1".to_string()),
            client_id: Identifier::Number(2),
            data,
            version: Some("v1".to_string()),
        }
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("report.pdf"), "report.pdf");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("a b?.txt"), "a_b_.txt");
        assert_eq!(sanitize_file_name(".."), "unnamed");
    }

    #[test]
    fn test_document_groups() {
        let s = submission(serde_json::json!([[{"id": 1, "attachment_count": 1}], [{"id": "x"}]]));
        let groups = document_groups(&s).unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[1][0].attachment_count, 0);

        assert!(document_groups(&submission(serde_json::Value::Null)).unwrap().is_empty());
        assert!(matches!(
            document_groups(&submission(serde_json::json!({"id": 1}))),
            Err(ProcessError::InvalidShape(_))
        ));
    }

    #[tokio::test]
    async fn test_process_docs_writes_record() {
        let temp_dir = TempDir::new().unwrap();
        let processor = FileResultProcessor::new(temp_dir.path());

        let s = submission(serde_json::json!([[{"id": 1, "attachment_count": 3}]]));
        processor.process_docs(&s).await.unwrap();

        let mut entries = fs::read_dir(temp_dir.path().join("job-1")).await.unwrap();
        let entry = entries.next_entry().await.unwrap().unwrap();
        let record: serde_json::Value =
            serde_json::from_slice(&fs::read(entry.path()).await.unwrap()).unwrap();
        assert_eq!(record["submission"]["client_id"], 2);
        assert!(record["attachment"].is_null());
    }

    #[tokio::test]
    async fn test_process_doc_stores_attachment() {
        let temp_dir = TempDir::new().unwrap();
        let processor = FileResultProcessor::new(temp_dir.path());
        let attachment = Attachment {
            file_name: Some("scan.txt".to_string()),
            content_type: Some("text/plain".to_string()),
            bytes: bytes::Bytes::from_static(b"page one"),
        };

        processor
            .process_doc(&submission(serde_json::Value::Null), &attachment)
            .await
            .unwrap();

        let mut entries = fs::read_dir(temp_dir.path().join("job-1")).await.unwrap();
        let mut found = false;
        while let Some(entry) = entries.next_entry().await.unwrap() {
            let name = entry.file_name().to_string_lossy().to_string();
            if name.ends_with("-scan.txt") {
                assert_eq!(fs::read(entry.path()).await.unwrap(), b"page one");
                found = true;
            }
        }
        assert!(found);
    }

    #[tokio::test]
    async fn test_process_docs_rejects_bad_shape() {
        let temp_dir = TempDir::new().unwrap();
        let processor = FileResultProcessor::new(temp_dir.path());
        let err = processor
            .process_docs(&submission(serde_json::json!("not groups")))
            .await
            .unwrap_err();
        assert!(matches!(err, ProcessError::InvalidShape(_)));
    }
}
