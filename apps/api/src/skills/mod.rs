//! Skill Extractor & Reconciler: proposes skills for a certificate and attaches them
//! to a user through the global, deduplicated skill catalog.

pub mod extractor;
pub mod handlers;
pub mod prompts;
pub mod reconcile;
pub mod store;

use std::collections::BTreeSet;

use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillLevel {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
    Expert,
}

impl SkillLevel {
    /// Unknown or missing levels fall back to `Beginner`.
    pub fn parse_lenient(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("intermediate") => SkillLevel::Intermediate,
            Some("advanced") => SkillLevel::Advanced,
            Some("expert") => SkillLevel::Expert,
            _ => SkillLevel::Beginner,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SkillLevel::Beginner => "beginner",
            SkillLevel::Intermediate => "intermediate",
            SkillLevel::Advanced => "advanced",
            SkillLevel::Expert => "expert",
        }
    }
}

/// Accepts any casing; unknown or null levels become `Beginner`.
impl<'de> Deserialize<'de> for SkillLevel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(SkillLevel::parse_lenient(raw.as_deref()))
    }
}

fn full_confidence() -> f64 {
    1.0
}

/// A skill suggested for a user, either by the model or by the user's own review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposedSkill {
    pub name: String,
    #[serde(default)]
    pub level: Option<SkillLevel>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default = "full_confidence")]
    pub confidence: f64,
}

/// A catalog entry. `name` is normalized and globally unique; `users_holding` is never empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillRecord {
    pub id: Uuid,
    pub name: String,
    pub category: String,
    pub level: SkillLevel,
    pub users_holding: BTreeSet<Uuid>,
}

/// Lowercase, trimmed dedup key for the catalog.
pub fn normalize_skill_name(name: &str) -> String {
    name.trim().to_lowercase()
}
