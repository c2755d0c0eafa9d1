use anyhow::{bail, Context, Result};

use crate::certifications::pipeline::PipelinePolicy;

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub s3_bucket: String,
    pub s3_endpoint: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub anthropic_api_key: String,
    pub port: u16,
    pub rust_log: String,
    pub llm_timeout_secs: u64,
    pub max_upload_bytes: usize,
    pub policy: PipelinePolicy,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let policy = PipelinePolicy {
            authenticity_threshold: parse_env("AUTHENTICITY_THRESHOLD", 0.5)?,
            skill_confidence_cutoff: parse_env("SKILL_CONFIDENCE_CUTOFF", 0.7)?,
            max_attempts: parse_env("STRUCTURED_MAX_ATTEMPTS", 2)?,
        };
        validate_policy(&policy)?;

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            s3_bucket: require_env("S3_BUCKET")?,
            s3_endpoint: require_env("S3_ENDPOINT")?,
            aws_access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            port: parse_env("PORT", 3001)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            llm_timeout_secs: parse_env("LLM_TIMEOUT_SECS", 30)?,
            max_upload_bytes: parse_env("MAX_UPLOAD_BYTES", 5 * 1024 * 1024)?,
            policy,
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

/// Reads an optional variable, falling back to `default` when unset.
fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value '{raw}'")),
        Err(_) => Ok(default),
    }
}

fn validate_policy(policy: &PipelinePolicy) -> Result<()> {
    for (name, value) in [
        ("AUTHENTICITY_THRESHOLD", policy.authenticity_threshold),
        ("SKILL_CONFIDENCE_CUTOFF", policy.skill_confidence_cutoff),
    ] {
        if !(0.0..=1.0).contains(&value) {
            bail!("{name} must be between 0 and 1, got {value}");
        }
    }
    if policy.max_attempts == 0 {
        bail!("STRUCTURED_MAX_ATTEMPTS must be at least 1");
    }
    Ok(())
}
