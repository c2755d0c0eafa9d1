//! Skill catalog persistence.
//!
//! The catalog is global and keyed by normalized name. `skill_holders` is the single
//! source of truth for both "who holds this skill" and "which skills does this user
//! have". Find-or-create is one atomic upsert, and removing the last holder deletes
//! the skill in the same transaction.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use crate::db::StoreError;
use crate::models::skill::SkillRow;
use crate::skills::{SkillLevel, SkillRecord};

/// Catalog fields used only when the skill does not exist yet.
#[derive(Debug, Clone, Copy)]
pub struct NewSkill<'a> {
    /// Already normalized.
    pub name: &'a str,
    pub category: &'a str,
    pub level: SkillLevel,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttachOutcome {
    pub record: SkillRecord,
    /// False when the user already held the skill.
    pub newly_held: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DetachOutcome {
    /// The skill does not exist or the user does not hold it.
    NotHeld,
    /// Membership removed; other users still hold the skill.
    Detached(SkillRecord),
    /// The user was the last holder, so the skill was deleted.
    Deleted,
}

#[async_trait]
pub trait SkillStore: Send + Sync {
    async fn user_exists(&self, user_id: Uuid) -> Result<bool, StoreError>;

    /// `name` must already be normalized.
    async fn find_by_name(&self, name: &str) -> Result<Option<SkillRecord>, StoreError>;

    /// Finds the skill by `skill.name` or creates it, then adds `user_id` as a holder.
    async fn attach_holder(
        &self,
        skill: NewSkill<'_>,
        user_id: Uuid,
    ) -> Result<AttachOutcome, StoreError>;

    async fn detach_holder(&self, skill_id: Uuid, user_id: Uuid)
        -> Result<DetachOutcome, StoreError>;

    async fn skills_for_user(&self, user_id: Uuid) -> Result<Vec<SkillRecord>, StoreError>;
}

const SELECT_SKILL_BY_ID: &str = r#"
    SELECT s.id, s.name, s.category, s.level,
           COALESCE(array_agg(h.user_id) FILTER (WHERE h.user_id IS NOT NULL), '{}') AS users_holding
    FROM skills s
    LEFT JOIN skill_holders h ON h.skill_id = s.id
    WHERE s.id = $1
    GROUP BY s.id
"#;

const SELECT_SKILL_BY_NAME: &str = r#"
    SELECT s.id, s.name, s.category, s.level,
           COALESCE(array_agg(h.user_id) FILTER (WHERE h.user_id IS NOT NULL), '{}') AS users_holding
    FROM skills s
    LEFT JOIN skill_holders h ON h.skill_id = s.id
    WHERE s.name = $1
    GROUP BY s.id
"#;

pub struct PgSkillStore {
    pool: PgPool,
}

impl PgSkillStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SkillStore for PgSkillStore {
    async fn user_exists(&self, user_id: Uuid) -> Result<bool, StoreError> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<SkillRecord>, StoreError> {
        let row: Option<SkillRow> = sqlx::query_as(SELECT_SKILL_BY_NAME)
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(SkillRecord::from))
    }

    async fn attach_holder(
        &self,
        skill: NewSkill<'_>,
        user_id: Uuid,
    ) -> Result<AttachOutcome, StoreError> {
        let mut tx = self.pool.begin().await?;

        // The no-op DO UPDATE locks the existing row and makes RETURNING yield it.
        let skill_id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO skills (id, name, category, level)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(skill.name)
        .bind(skill.category)
        .bind(skill.level.as_str())
        .fetch_one(&mut *tx)
        .await?;

        let newly_held = sqlx::query(
            "INSERT INTO skill_holders (skill_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(skill_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?
        .rows_affected()
            == 1;

        let row: SkillRow = sqlx::query_as(SELECT_SKILL_BY_ID)
            .bind(skill_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        debug!(
            "Skill '{}' ({skill_id}) attached to {user_id}: newly_held={newly_held}",
            skill.name
        );
        Ok(AttachOutcome {
            record: row.into(),
            newly_held,
        })
    }

    async fn detach_holder(
        &self,
        skill_id: Uuid,
        user_id: Uuid,
    ) -> Result<DetachOutcome, StoreError> {
        let mut tx = self.pool.begin().await?;

        // Serializes with concurrent attach_holder upserts on the same skill.
        let locked: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM skills WHERE id = $1 FOR UPDATE")
                .bind(skill_id)
                .fetch_optional(&mut *tx)
                .await?;
        if locked.is_none() {
            return Ok(DetachOutcome::NotHeld);
        }

        let removed = sqlx::query("DELETE FROM skill_holders WHERE skill_id = $1 AND user_id = $2")
            .bind(skill_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if removed == 0 {
            return Ok(DetachOutcome::NotHeld);
        }

        let remaining: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM skill_holders WHERE skill_id = $1")
                .bind(skill_id)
                .fetch_one(&mut *tx)
                .await?;

        let outcome = if remaining == 0 {
            sqlx::query("DELETE FROM skills WHERE id = $1")
                .bind(skill_id)
                .execute(&mut *tx)
                .await?;
            DetachOutcome::Deleted
        } else {
            let row: SkillRow = sqlx::query_as(SELECT_SKILL_BY_ID)
                .bind(skill_id)
                .fetch_one(&mut *tx)
                .await?;
            DetachOutcome::Detached(row.into())
        };

        tx.commit().await?;
        Ok(outcome)
    }

    async fn skills_for_user(&self, user_id: Uuid) -> Result<Vec<SkillRecord>, StoreError> {
        let rows: Vec<SkillRow> = sqlx::query_as(
            r#"
            SELECT s.id, s.name, s.category, s.level,
                   array_agg(others.user_id) AS users_holding
            FROM skills s
            JOIN skill_holders mine ON mine.skill_id = s.id AND mine.user_id = $1
            JOIN skill_holders others ON others.skill_id = s.id
            GROUP BY s.id
            ORDER BY s.name
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(SkillRecord::from).collect())
    }
}
