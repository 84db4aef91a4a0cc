use std::sync::Arc;

use crate::config::Config;
use crate::queue::{WorkDispatcher, WorkValue};
use crate::submissions::ResultProcessor;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub dispatcher: WorkDispatcher,
    pub processor: Arc<dyn ResultProcessor>,
}

/// Job handed to a client by `/get_work`
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Job {
    pub job_id: String,
    #[serde(rename = "type")]
    pub job_type: String,
    pub data: WorkValue,
    pub version: String,
}

impl Job {
    /// Compact JSON body: `{"job_id":..,"type":..,"data":..,"version":..}`
    pub fn to_json(&self) -> String {
        // Job holds only strings and sequences; serialization cannot fail
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Job or client identifier as sent by workers: a string or an integer
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum Identifier {
    Number(i64),
    Text(String),
}

impl std::fmt::Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Identifier::Number(n) => write!(f, "{}", n),
            Identifier::Text(s) => write!(f, "{}", s),
        }
    }
}

/// Completed work sent back by a client
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Submission {
    pub job_id: Identifier,
    pub client_id: Identifier,
    /// Groups of document descriptors; the shape is checked by the processor
    #[serde(default)]
    pub data: serde_json::Value,
    #[serde(default)]
    pub version: Option<String>,
}

/// One returned document inside a submission group
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DocumentDescriptor {
    pub id: Identifier,
    #[serde(default)]
    pub attachment_count: u32,
}

/// Binary file uploaded with `/return_doc`
#[derive(Debug, Clone)]
pub struct Attachment {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: bytes::Bytes,
}

#[derive(Debug, serde::Serialize)]
pub struct SubmissionAccepted {
    pub status: String,
    pub job_id: Identifier,
}

#[derive(Debug, serde::Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub queue_backend: String,
    pub queue_depth: Option<usize>,
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}
