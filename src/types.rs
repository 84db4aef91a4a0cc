// Error taxonomy and its HTTP mapping

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::{error, warn};

use crate::models::ErrorBody;
use crate::queue::DispatchError;
use crate::submissions::{ProcessError, ValidationError};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A required parameter, field or file is absent or malformed
    #[error("Bad parameter: {0}")]
    BadParameter(String),

    /// A POST body was required but none was sent
    #[error("Missing POST body: {0}")]
    Post(String),

    /// Work retrieval failed
    #[error("Get failed: {0}")]
    Get(#[source] DispatchError),

    #[error("Processing failed: {0}")]
    Processing(#[from] ProcessError),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl AppError {
    /// Stable machine-readable kind, sent as `error` in the response body
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::BadParameter(_) => "bad_parameter",
            AppError::Post(_) => "post",
            AppError::Get(_) => "get",
            AppError::Processing(_) => "processing_failed",
            AppError::NotFound(_) => "not_found",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadParameter(_) | AppError::Post(_) => StatusCode::BAD_REQUEST,
            AppError::Get(DispatchError::NoWork) => StatusCode::NOT_FOUND,
            AppError::Get(DispatchError::Malformed(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Get(DispatchError::Store(_)) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Get(DispatchError::MissingClientId) => StatusCode::BAD_REQUEST,
            AppError::Processing(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }

    fn message(&self) -> String {
        match self {
            AppError::BadParameter(m) | AppError::Post(m) | AppError::NotFound(m) => m.clone(),
            AppError::Get(e) => e.to_string(),
            AppError::Processing(e) => e.to_string(),
        }
    }
}

impl From<DispatchError> for AppError {
    fn from(e: DispatchError) -> Self {
        match e {
            DispatchError::MissingClientId => AppError::BadParameter(e.to_string()),
            other => AppError::Get(other),
        }
    }
}

impl From<ValidationError> for AppError {
    fn from(e: ValidationError) -> Self {
        match e {
            ValidationError::MissingBody => AppError::Post(e.to_string()),
            other => AppError::BadParameter(other.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(kind = self.kind(), "{}", self);
        } else {
            warn!(kind = self.kind(), "{}", self);
        }

        let body = ErrorBody {
            error: self.kind().to_string(),
            message: self.message(),
        };
        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = std::result::Result<T, AppError>;
