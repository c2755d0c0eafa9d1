use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::StoreError;
use crate::errors::AppError;
use crate::routes::UserIdQuery;
use crate::skills::reconcile::{reconcile_skills_to_user, remove_skill_from_user};
use crate::skills::store::DetachOutcome;
use crate::skills::{ProposedSkill, SkillRecord};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct ReconcileRequest {
    pub user_id: Uuid,
    pub skills: Vec<ProposedSkill>,
}

#[derive(Serialize)]
pub struct RemoveSkillResponse {
    pub skill_id: Uuid,
    /// True when the user was the last holder and the catalog entry is gone.
    pub deleted: bool,
}

/// GET /api/skills
pub async fn handle_list_skills(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<Vec<SkillRecord>>, AppError> {
    if !state.skills.user_exists(params.user_id).await? {
        return Err(StoreError::UserNotFound(params.user_id).into());
    }
    let skills = state.skills.skills_for_user(params.user_id).await?;
    Ok(Json(skills))
}

/// POST /api/skills/reconcile
pub async fn handle_reconcile(
    State(state): State<AppState>,
    Json(req): Json<ReconcileRequest>,
) -> Result<Json<Vec<SkillRecord>>, AppError> {
    let added = reconcile_skills_to_user(state.skills.as_ref(), req.user_id, &req.skills).await?;
    Ok(Json(added))
}

/// DELETE /api/skills/:id
pub async fn handle_remove_skill(
    State(state): State<AppState>,
    Path(skill_id): Path<Uuid>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<RemoveSkillResponse>, AppError> {
    match remove_skill_from_user(state.skills.as_ref(), params.user_id, skill_id).await? {
        DetachOutcome::NotHeld => Err(AppError::NotFound(format!(
            "Skill {skill_id} not found for user {}",
            params.user_id
        ))),
        DetachOutcome::Detached(_) => Ok(Json(RemoveSkillResponse {
            skill_id,
            deleted: false,
        })),
        DetachOutcome::Deleted => Ok(Json(RemoveSkillResponse {
            skill_id,
            deleted: true,
        })),
    }
}
