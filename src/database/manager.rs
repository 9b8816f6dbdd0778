use sqlx::{postgres::PgPoolOptions, PgPool};
use thiserror::Error;
use tracing::info;

/// Errors from DatabaseManager
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Invalid database URL")]
    InvalidDatabaseUrl,

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Tables backing the account, role and secret services.
const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS accounts (
        id          TEXT PRIMARY KEY,
        created_at  TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS roles (
        role_id     TEXT PRIMARY KEY,
        account     TEXT NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
        api_key     TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS secrets (
        resource_id TEXT NOT NULL,
        account     TEXT NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
        version     INTEGER NOT NULL,
        value       TEXT NOT NULL,
        created_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
        PRIMARY KEY (resource_id, version)
    )
    "#,
];

/// Owns the connection pool for the identity database
#[derive(Clone)]
pub struct DatabaseManager {
    pool: PgPool,
}

impl DatabaseManager {
    /// Connect and make sure the schema exists
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, DatabaseError> {
        let url = url::Url::parse(database_url).map_err(|_| DatabaseError::InvalidDatabaseUrl)?;

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url.as_str())
            .await?;

        info!("Created database pool for: {}", url.path().trim_start_matches('/'));

        let manager = Self { pool };
        manager.ensure_schema().await?;
        Ok(manager)
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn ensure_schema(&self) -> Result<(), DatabaseError> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    /// Pings the pool to ensure connectivity
    pub async fn health_check(&self) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rejects_unparseable_urls() {
        let err = DatabaseManager::connect("not a url", 1).await.err().unwrap();
        assert!(matches!(err, DatabaseError::InvalidDatabaseUrl));
    }
}
