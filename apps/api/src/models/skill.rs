use sqlx::FromRow;
use uuid::Uuid;

use crate::skills::{SkillLevel, SkillRecord};

/// A `skills` row joined with its holders from `skill_holders`.
#[derive(Debug, Clone, FromRow)]
pub struct SkillRow {
    pub id: Uuid,
    pub name: String,
    pub category: String,
    pub level: String,
    pub users_holding: Vec<Uuid>,
}

impl From<SkillRow> for SkillRecord {
    fn from(row: SkillRow) -> Self {
        SkillRecord {
            id: row.id,
            name: row.name,
            category: row.category,
            level: SkillLevel::parse_lenient(Some(&row.level)),
            users_holding: row.users_holding.into_iter().collect(),
        }
    }
}
