mod analysis;
mod certifications;
mod config;
mod db;
mod errors;
mod llm_client;
mod models;
mod routes;
mod skills;
mod state;
#[cfg(test)]
mod testing;

use anyhow::Result;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::certifications::files::S3FileStore;
use crate::certifications::store::PgCertificationStore;
use crate::config::Config;
use crate::db::create_pool;
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::skills::store::PgSkillStore;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting CertTrack API v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Pipeline policy: authenticity >= {}, skill confidence > {}, {} attempt(s)",
        config.policy.authenticity_threshold,
        config.policy.skill_confidence_cutoff,
        config.policy.max_attempts
    );

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;

    // Initialize S3 / MinIO
    let s3 = build_s3_client(&config).await;
    info!("S3 client initialized (bucket: {})", config.s3_bucket);

    // Initialize LLM client
    let llm = LlmClient::new(
        config.anthropic_api_key.clone(),
        Duration::from_secs(config.llm_timeout_secs),
    )?;
    info!(
        "LLM client initialized (model: {}, timeout: {}s)",
        llm_client::MODEL,
        config.llm_timeout_secs
    );

    // Build app state
    let state = AppState {
        skills: Arc::new(PgSkillStore::new(db.clone())),
        certifications: Arc::new(PgCertificationStore::new(db)),
        files: Arc::new(S3FileStore::new(s3, config.s3_bucket.clone())),
        llm: Arc::new(llm),
        config: config.clone(),
    };

    // Build router
    let app = build_router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()), // TODO: tighten CORS in production
    );

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Constructs an S3 client configured for MinIO (local) or AWS (production).
async fn build_s3_client(config: &Config) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &config.aws_access_key_id,
        &config.aws_secret_access_key,
        None,
        None,
        "certtrack-static",
    );

    let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(credentials)
        .endpoint_url(&config.s3_endpoint)
        .load()
        .await;

    aws_sdk_s3::Client::new(&s3_config)
}
