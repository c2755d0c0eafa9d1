//! Skill reconciliation: attaches proposed skills to a user without duplicates.
//!
//! Each proposal is processed independently: a failure is logged and the batch
//! continues. Re-submitting the same proposals is a no-op.

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::analysis::certificate::DEFAULT_CATEGORY;
use crate::db::StoreError;
use crate::skills::store::{DetachOutcome, NewSkill, SkillStore};
use crate::skills::{normalize_skill_name, ProposedSkill, SkillRecord};

/// Returns the records newly attached to the user by this call.
pub async fn reconcile_skills_to_user(
    store: &dyn SkillStore,
    user_id: Uuid,
    proposed: &[ProposedSkill],
) -> Result<Vec<SkillRecord>, StoreError> {
    if !store.user_exists(user_id).await? {
        return Err(StoreError::UserNotFound(user_id));
    }

    let mut added = Vec::new();

    for skill in proposed {
        let name = normalize_skill_name(&skill.name);
        if name.is_empty() {
            debug!("Skipping empty skill name");
            continue;
        }

        match store.find_by_name(&name).await {
            Ok(Some(existing)) if existing.users_holding.contains(&user_id) => {
                debug!("User {user_id} already has skill '{name}'");
                continue;
            }
            Ok(_) => {}
            Err(e) => {
                warn!("Failed to look up skill '{name}' for user {user_id}: {e}");
                continue;
            }
        }

        let category = skill
            .category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(DEFAULT_CATEGORY);
        let new_skill = NewSkill {
            name: &name,
            category,
            level: skill.level.unwrap_or_default(),
        };

        match store.attach_holder(new_skill, user_id).await {
            Ok(outcome) if outcome.newly_held => {
                info!("Added skill '{}' to user {user_id}", outcome.record.name);
                added.push(outcome.record);
            }
            Ok(_) => debug!("User {user_id} already has skill '{name}'"),
            Err(e) => warn!("Failed to reconcile skill '{name}' for user {user_id}: {e}"),
        }
    }

    verify_user_skills(store, user_id, &added).await;
    Ok(added)
}

/// Reads the user's skills back and logs any newly added skill that is missing.
async fn verify_user_skills(store: &dyn SkillStore, user_id: Uuid, added: &[SkillRecord]) {
    match store.skills_for_user(user_id).await {
        Ok(current) => {
            let missing: Vec<&str> = added
                .iter()
                .filter(|a| !current.iter().any(|c| c.id == a.id))
                .map(|a| a.name.as_str())
                .collect();
            if missing.is_empty() {
                info!(
                    "User {user_id} now holds {} skill(s) ({} added)",
                    current.len(),
                    added.len()
                );
            } else {
                warn!("User {user_id} is missing reconciled skills after write: {missing:?}");
            }
        }
        Err(e) => warn!("Could not verify skills for user {user_id}: {e}"),
    }
}

/// Removes the user from the skill; the skill is deleted when nobody holds it anymore.
pub async fn remove_skill_from_user(
    store: &dyn SkillStore,
    user_id: Uuid,
    skill_id: Uuid,
) -> Result<DetachOutcome, StoreError> {
    let outcome = store.detach_holder(skill_id, user_id).await?;
    match &outcome {
        DetachOutcome::Deleted => info!("Skill {skill_id} removed from {user_id} and deleted"),
        DetachOutcome::Detached(_) => info!("Skill {skill_id} removed from {user_id}"),
        DetachOutcome::NotHeld => debug!("User {user_id} does not hold skill {skill_id}"),
    }
    Ok(outcome)
}
