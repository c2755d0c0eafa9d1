//! Certification persistence.

use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::StoreError;
use crate::models::certification::{CertificationRow, NewCertification, STATUS_PENDING};

#[async_trait]
pub trait CertificationStore: Send + Sync {
    async fn create(&self, new: NewCertification) -> Result<CertificationRow, StoreError>;

    /// Newest first.
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<CertificationRow>, StoreError>;

    async fn find(&self, id: Uuid) -> Result<Option<CertificationRow>, StoreError>;

    /// Returns false when no row matched.
    async fn delete(&self, id: Uuid) -> Result<bool, StoreError>;
}

pub struct PgCertificationStore {
    pool: PgPool,
}

impl PgCertificationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CertificationStore for PgCertificationStore {
    async fn create(&self, new: NewCertification) -> Result<CertificationRow, StoreError> {
        let row: CertificationRow = sqlx::query_as(
            r#"
            INSERT INTO certifications
                (id, user_id, title, issuer, issue_date, credential_id, description,
                 certificate_key, status, ai_analysis, authenticity, skill_ids)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new.user_id)
        .bind(&new.title)
        .bind(&new.issuer)
        .bind(new.issue_date)
        .bind(&new.credential_id)
        .bind(&new.description)
        .bind(&new.certificate_key)
        .bind(STATUS_PENDING)
        .bind(Json(&new.ai_analysis))
        .bind(Json(&new.authenticity))
        .bind(&new.skill_ids)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<CertificationRow>, StoreError> {
        let rows = sqlx::query_as(
            "SELECT * FROM certifications WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn find(&self, id: Uuid) -> Result<Option<CertificationRow>, StoreError> {
        let row = sqlx::query_as("SELECT * FROM certifications WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM certifications WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
