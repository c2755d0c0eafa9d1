use std::collections::HashMap;

use axum::{
    extract::{multipart::MultipartError, Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use chrono::{DateTime, NaiveDate};
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::analysis::authenticity::AuthenticityAssessment;
use crate::analysis::certificate::{AnalysisResult, UserSuppliedMetadata};
use crate::analysis::preprocess::RawDocument;
use crate::certifications::pipeline::{
    assess, propose_skills, submit_certificate, Submission, SubmissionOutcome,
};
use crate::errors::AppError;
use crate::models::certification::CertificationRow;
use crate::routes::UserIdQuery;
use crate::skills::ProposedSkill;
use crate::state::AppState;

const FILE_FIELD: &str = "certificate";

/// Text fields and the uploaded file of a certificate form.
#[derive(Default)]
struct CertificateForm {
    fields: HashMap<String, String>,
    file: Option<(Bytes, String)>,
}

impl CertificateForm {
    async fn read(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = CertificateForm::default();

        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            if name == FILE_FIELD {
                let content_type = field.content_type().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(multipart_error)?;
                form.file = Some((bytes, content_type));
            } else {
                let value = field.text().await.map_err(multipart_error)?;
                form.fields.insert(name, value);
            }
        }

        Ok(form)
    }

    fn optional(&self, key: &str) -> Option<String> {
        self.fields
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(String::from)
    }

    fn required(&self, key: &str) -> Result<String, AppError> {
        self.optional(key)
            .ok_or_else(|| AppError::Validation(format!("Missing required field '{key}'")))
    }

    fn document(&mut self, max_bytes: usize) -> Result<RawDocument, AppError> {
        let (bytes, content_type) = self
            .file
            .take()
            .ok_or_else(|| AppError::Validation(format!("Missing file field '{FILE_FIELD}'")))?;
        if bytes.is_empty() {
            return Err(AppError::Validation("Uploaded file is empty".to_string()));
        }
        if bytes.len() > max_bytes {
            return Err(AppError::PayloadTooLarge(format!(
                "Certificate file is {} bytes; the limit is {max_bytes} bytes",
                bytes.len()
            )));
        }
        RawDocument::from_upload(bytes, &content_type).map_err(AppError::Validation)
    }

    fn metadata(&self) -> Result<(UserSuppliedMetadata, NaiveDate), AppError> {
        let raw_date = self.required("issueDate")?;
        let issue_date = parse_issue_date(&raw_date)?;
        let metadata = UserSuppliedMetadata {
            title: self.required("title")?,
            issuer: self.required("issuer")?,
            issue_date: raw_date,
            credential_id: self.optional("credentialId"),
        };
        Ok((metadata, issue_date))
    }

    fn user_id(&self) -> Result<Uuid, AppError> {
        let raw = self.required("user_id")?;
        Uuid::parse_str(&raw).map_err(|_| AppError::Validation(format!("Invalid user_id '{raw}'")))
    }

    fn reviewed_skills(&self) -> Result<Option<Vec<ProposedSkill>>, AppError> {
        self.optional("skills")
            .map(|raw| {
                serde_json::from_str(&raw)
                    .map_err(|e| AppError::Validation(format!("Invalid skills list: {e}")))
            })
            .transpose()
    }
}

fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(e.body_text())
    } else {
        AppError::Validation(format!("Invalid multipart body: {}", e.body_text()))
    }
}

/// Accepts `YYYY-MM-DD` or a full RFC 3339 timestamp.
fn parse_issue_date(raw: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| DateTime::parse_from_rfc3339(raw).map(|dt| dt.date_naive()))
        .map_err(|_| AppError::Validation(format!("Invalid issueDate '{raw}'")))
}

#[derive(Serialize)]
pub struct AnalyzePreviewResponse {
    pub analysis: AnalysisResult,
    pub authenticity: AuthenticityAssessment,
    pub passed: bool,
    pub proposed_skills: Vec<ProposedSkill>,
}

/// POST /api/certifications/analyze
pub async fn handle_analyze(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<AnalyzePreviewResponse>, AppError> {
    let mut form = CertificateForm::read(multipart).await?;
    let document = form.document(state.config.max_upload_bytes)?;
    let (metadata, _) = form.metadata()?;
    let description = form.optional("description");
    let policy = &state.config.policy;

    let assessed = assess(state.llm.as_ref(), &document, &metadata, policy).await?;
    let proposed_skills = if assessed.passed {
        propose_skills(
            state.llm.as_ref(),
            &metadata,
            description.as_deref(),
            &assessed.analysis,
            policy,
        )
        .await
    } else {
        Vec::new()
    };

    Ok(Json(AnalyzePreviewResponse {
        analysis: assessed.analysis,
        authenticity: assessed.authenticity,
        passed: assessed.passed,
        proposed_skills,
    }))
}

/// POST /api/certifications
pub async fn handle_submit(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let mut form = CertificateForm::read(multipart).await?;
    let document = form.document(state.config.max_upload_bytes)?;
    let (metadata, issue_date) = form.metadata()?;
    let submission = Submission {
        user_id: form.user_id()?,
        metadata,
        issue_date,
        description: form.optional("description"),
        document,
        reviewed_skills: form.reviewed_skills()?,
    };

    let outcome = submit_certificate(state.pipeline(), submission, &state.config.policy).await?;

    Ok(match outcome {
        SubmissionOutcome::Accepted {
            certification,
            skills,
        } => (
            StatusCode::CREATED,
            Json(json!({
                "status": "accepted",
                "certification": certification,
                "skills": skills,
            })),
        )
            .into_response(),
        SubmissionOutcome::Rejected {
            analysis,
            authenticity,
        } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({
                "status": "rejected",
                "analysis": analysis,
                "authenticity": authenticity,
            })),
        )
            .into_response(),
    })
}

/// GET /api/certifications
pub async fn handle_list(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<Vec<CertificationRow>>, AppError> {
    let rows = state.certifications.list_for_user(params.user_id).await?;
    Ok(Json(rows))
}

async fn owned_certification(
    state: &AppState,
    id: Uuid,
    user_id: Uuid,
) -> Result<CertificationRow, AppError> {
    let row = state
        .certifications
        .find(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Certification {id} not found")))?;
    if row.user_id != user_id {
        return Err(AppError::Forbidden);
    }
    Ok(row)
}

/// GET /api/certifications/:id
pub async fn handle_get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<CertificationRow>, AppError> {
    let row = owned_certification(&state, id, params.user_id).await?;
    Ok(Json(row))
}

/// DELETE /api/certifications/:id
pub async fn handle_delete(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<UserIdQuery>,
) -> Result<StatusCode, AppError> {
    let row = owned_certification(&state, id, params.user_id).await?;
    if !state.certifications.delete(id).await? {
        return Err(AppError::NotFound(format!("Certification {id} not found")));
    }

    if let Some(key) = row.certificate_key.as_deref() {
        if let Err(e) = state.files.delete(key).await {
            warn!("Certification {id} deleted but its file {key} was not: {e}");
        }
    }

    info!("Certification {id} deleted for user {}", params.user_id);
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_issue_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert_eq!(parse_issue_date("2024-01-01").unwrap(), expected);
        assert_eq!(
            parse_issue_date("2024-01-01T09:30:00Z").unwrap(),
            expected
        );
        assert!(parse_issue_date("01/01/2024").is_err());
    }
}
