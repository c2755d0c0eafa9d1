pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::certifications::handlers as certifications;
use crate::skills::handlers as skills;
use crate::state::AppState;

/// Room for the text fields sent alongside the certificate file.
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

#[derive(Deserialize)]
pub struct UserIdQuery {
    pub user_id: Uuid,
}

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes + FORM_OVERHEAD_BYTES;

    Router::new()
        .route("/health", get(health::health_handler))
        // Certifications
        .route(
            "/api/certifications/analyze",
            post(certifications::handle_analyze),
        )
        .route(
            "/api/certifications",
            get(certifications::handle_list).post(certifications::handle_submit),
        )
        .route(
            "/api/certifications/:id",
            get(certifications::handle_get).delete(certifications::handle_delete),
        )
        // Skills
        .route("/api/skills", get(skills::handle_list_skills))
        .route("/api/skills/reconcile", post(skills::handle_reconcile))
        .route("/api/skills/:id", delete(skills::handle_remove_skill))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
