use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

/// Creates and returns a PostgreSQL connection pool.
pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    info!("Connecting to PostgreSQL...");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;

    info!("PostgreSQL connection pool established");
    Ok(pool)
}

/// Errors shared by the persistence traits.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("User {0} not found")]
    UserNotFound(Uuid),
}

#[cfg(test)]
mod tests {
    const SCHEMA: &str = include_str!("../schema.sql");

    #[test]
    fn test_deleting_holders_collects_orphaned_skills() {
        assert!(SCHEMA.contains("REFERENCES users (id) ON DELETE CASCADE"));
        assert!(SCHEMA.contains("AFTER DELETE ON skill_holders"));
        assert!(SCHEMA.contains("FOR EACH ROW EXECUTE FUNCTION collect_orphaned_skill()"));
        assert!(SCHEMA.contains("NOT EXISTS (SELECT 1 FROM skill_holders WHERE skill_id = OLD.skill_id)"));
    }
}
