use std::collections::HashMap;

use axum::{
    body::Bytes,
    extract::{FromRequest, Multipart, Request, State},
    http::{header, HeaderMap},
    routing::post,
    Form, Json, Router,
};
use tracing::{debug, info};

use crate::models::{AppState, Attachment, SubmissionAccepted};
use crate::submissions::validator::{FILE_FIELD, JSON_INFO_FIELD};
use crate::submissions::{validate_batch, validate_single, SingleFileForm, ValidationError};
use crate::types::AppResult;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/return_docs", post(return_docs))
        .route("/return_doc", post(return_doc))
}

/// POST /return_docs - JSON submission of returned documents
async fn return_docs(
    State(state): State<AppState>,
    body: Bytes,
) -> AppResult<Json<SubmissionAccepted>> {
    let submission = validate_batch(&body)?;
    info!(job_id = %submission.job_id, client_id = %submission.client_id, "Batch submission received");

    state.processor.process_docs(&submission).await?;

    Ok(Json(SubmissionAccepted {
        status: "accepted".to_string(),
        job_id: submission.job_id,
    }))
}

/// POST /return_doc - multipart form with `file` and `json_info`.
/// A url-encoded form is read too, so a missing file is reported by name.
async fn return_doc(
    State(state): State<AppState>,
    request: Request,
) -> AppResult<Json<SubmissionAccepted>> {
    let form = if is_urlencoded(request.headers()) {
        let Form(fields) = Form::<HashMap<String, String>>::from_request(request, &state)
            .await
            .map_err(|e| ValidationError::MalformedForm(e.body_text()))?;
        // url-encoded fields are text only, never file uploads
        SingleFileForm {
            files: Vec::new(),
            json_info: fields.get(JSON_INFO_FIELD).cloned(),
        }
    } else {
        let multipart = Multipart::from_request(request, &state)
            .await
            .map_err(|e| ValidationError::MalformedForm(e.body_text()))?;
        collect_form(multipart).await?
    };
    let valid = validate_single(form)?;
    info!(
        job_id = %valid.submission.job_id,
        client_id = %valid.submission.client_id,
        size = valid.attachment.bytes.len(),
        "Single-file submission received"
    );

    state
        .processor
        .process_doc(&valid.submission, &valid.attachment)
        .await?;

    Ok(Json(SubmissionAccepted {
        status: "accepted".to_string(),
        job_id: valid.submission.job_id,
    }))
}

fn is_urlencoded(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<mime::Mime>().ok())
        .is_some_and(|m| m.essence_str() == mime::APPLICATION_WWW_FORM_URLENCODED.essence_str())
}

async fn collect_form(mut multipart: Multipart) -> Result<SingleFileForm, ValidationError> {
    let mut form = SingleFileForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ValidationError::MalformedForm(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == FILE_FIELD {
            let file_name = field.file_name().map(str::to_string);
            let content_type = field.content_type().map(str::to_string);
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ValidationError::MalformedForm(e.body_text()))?;
            form.files.push(Attachment { file_name, content_type, bytes });
        } else if name == JSON_INFO_FIELD {
            let text = field
                .text()
                .await
                .map_err(|e| ValidationError::MalformedForm(e.body_text()))?;
            form.json_info.get_or_insert(text);
        } else {
            debug!(field = %name, "Ignoring unexpected form field");
        }
    }

    Ok(form)
}
