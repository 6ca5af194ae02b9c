use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::PathBuf;

use crate::config::DatabaseConfig;
use crate::error::Result;
use crate::migrations::{register_migrations, MigrationRunner};

pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(db_path: PathBuf, max_connections: u32) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(
                SqliteConnectOptions::new()
                    .filename(&db_path)
                    .create_if_missing(true),
            )
            .await?;

        Ok(Self { pool })
    }

    pub async fn from_config(config: &DatabaseConfig) -> Result<Self> {
        Self::new(config.path.clone(), config.max_connections).await
    }

    /// Single-connection in-memory database, mostly for tests.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;

        Ok(Self { pool })
    }

    /// Apply every pending schema migration.
    pub async fn migrate(&self) -> Result<()> {
        self.migration_runner().migrate_up(None).await?;
        Ok(())
    }

    /// A runner loaded with the gateway schema migrations.
    pub fn migration_runner(&self) -> MigrationRunner {
        let mut runner = MigrationRunner::new(self.pool.clone());
        register_migrations(&mut runner);
        runner
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
