use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use crate::analysis::authenticity::AuthenticityAssessment;
use crate::analysis::certificate::AnalysisResult;

pub const STATUS_PENDING: &str = "pending";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CertificationRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub issuer: String,
    pub issue_date: NaiveDate,
    pub credential_id: Option<String>,
    pub description: Option<String>,
    pub certificate_key: Option<String>,
    pub status: String,
    pub ai_analysis: Json<AnalysisResult>,
    pub authenticity: Json<AuthenticityAssessment>,
    pub skill_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Fields for a new `certifications` row; id, status and timestamp are assigned on insert.
#[derive(Debug, Clone)]
pub struct NewCertification {
    pub user_id: Uuid,
    pub title: String,
    pub issuer: String,
    pub issue_date: NaiveDate,
    pub credential_id: Option<String>,
    pub description: Option<String>,
    pub certificate_key: Option<String>,
    pub ai_analysis: AnalysisResult,
    pub authenticity: AuthenticityAssessment,
    pub skill_ids: Vec<Uuid>,
}
