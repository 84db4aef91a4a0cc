//! Gate in front of the result processor. Checks that a submission carries
//! what processing needs and nothing more; the nested `data` shape is left
//! to the processor.

use thiserror::Error;

use crate::models::{Attachment, Submission};

/// Form field carrying the submission record on `/return_doc`
pub const JSON_INFO_FIELD: &str = "json_info";
/// Form field carrying the uploaded file on `/return_doc`
pub const FILE_FIELD: &str = "file";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("missing request body")]
    MissingBody,

    #[error("missing required file: file")]
    MissingFile,

    #[error("missing required field: json_info")]
    MissingJsonInfo,

    #[error("expected exactly one file attachment, found {0}")]
    MultipleFiles(usize),

    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("malformed submission: {0}")]
    MalformedJson(String),

    #[error("malformed form: {0}")]
    MalformedForm(String),
}

/// Parts collected from a `/return_doc` form
#[derive(Debug, Default)]
pub struct SingleFileForm {
    pub files: Vec<Attachment>,
    pub json_info: Option<String>,
}

/// A single-file submission that passed validation
#[derive(Debug)]
pub struct ValidSingleSubmission {
    pub submission: Submission,
    pub attachment: Attachment,
}

/// Validate a `/return_docs` body. A blank body or an empty JSON object
/// counts as no body at all.
pub fn validate_batch(body: &[u8]) -> Result<Submission, ValidationError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(ValidationError::MissingBody);
    }
    if let Ok(serde_json::Value::Object(map)) = serde_json::from_slice::<serde_json::Value>(body) {
        if map.is_empty() {
            return Err(ValidationError::MissingBody);
        }
    }
    parse_submission(body)
}

/// Validate a `/return_doc` form: one file plus a `json_info` record
pub fn validate_single(form: SingleFileForm) -> Result<ValidSingleSubmission, ValidationError> {
    let SingleFileForm { mut files, json_info } = form;

    if files.is_empty() {
        return Err(ValidationError::MissingFile);
    }
    let json_info = json_info.ok_or(ValidationError::MissingJsonInfo)?;
    if files.len() > 1 {
        return Err(ValidationError::MultipleFiles(files.len()));
    }

    let submission = parse_submission(json_info.as_bytes())?;
    let attachment = files.remove(0);
    Ok(ValidSingleSubmission { submission, attachment })
}

fn parse_submission(raw: &[u8]) -> Result<Submission, ValidationError> {
    let value: serde_json::Value = serde_json::from_slice(raw)
        .map_err(|e| ValidationError::MalformedJson(e.to_string()))?;

    let object = value
        .as_object()
        .ok_or_else(|| ValidationError::MalformedJson("expected a JSON object".to_string()))?;

    for field in ["job_id", "client_id"] {
        if object.get(field).map_or(true, serde_json::Value::is_null) {
            return Err(ValidationError::MissingField(field));
        }
    }

    serde_json::from_value(value).map_err(|e| ValidationError::MalformedJson(e.to_string()))
}
