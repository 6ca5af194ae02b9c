/// Database migration system

pub mod runner;

pub use runner::{Migration, MigrationError, MigrationFn, MigrationRunner};

/// Register all migrations
pub fn register_migrations(runner: &mut MigrationRunner) {
    use migrations::*;

    runner.add_migration(Migration {
        version: 1,
        name: "create_sources".to_string(),
        up: m001_create_sources::up,
        down: m001_create_sources::down,
    });

    runner.add_migration(Migration {
        version: 2,
        name: "create_responses".to_string(),
        up: m002_create_responses::up,
        down: m002_create_responses::down,
    });
}

mod migrations {
    pub mod m001_create_sources {
        use futures::future::BoxFuture;
        use sqlx::sqlite::SqlitePool;

        pub fn up(pool: &SqlitePool) -> BoxFuture<'_, Result<(), sqlx::Error>> {
            Box::pin(async move {
                sqlx::query(
                    r#"
                    CREATE TABLE IF NOT EXISTS sources (
                        id TEXT PRIMARY KEY,
                        name TEXT NOT NULL,
                        serial INTEGER NOT NULL DEFAULT 0,
                        response_id TEXT,
                        mapping TEXT NOT NULL,
                        created_at INTEGER NOT NULL
                    )
                    "#,
                )
                .execute(pool)
                .await?;

                sqlx::query("CREATE UNIQUE INDEX IF NOT EXISTS idx_sources_name ON sources(name)")
                    .execute(pool)
                    .await?;

                Ok(())
            })
        }

        pub fn down(pool: &SqlitePool) -> BoxFuture<'_, Result<(), sqlx::Error>> {
            Box::pin(async move {
                sqlx::query("DROP INDEX IF EXISTS idx_sources_name")
                    .execute(pool)
                    .await?;

                sqlx::query("DROP TABLE IF EXISTS sources")
                    .execute(pool)
                    .await?;

                Ok(())
            })
        }
    }

    pub mod m002_create_responses {
        use futures::future::BoxFuture;
        use sqlx::sqlite::SqlitePool;

        pub fn up(pool: &SqlitePool) -> BoxFuture<'_, Result<(), sqlx::Error>> {
            Box::pin(async move {
                sqlx::query(
                    r#"
                    CREATE TABLE IF NOT EXISTS responses (
                        id TEXT PRIMARY KEY,
                        name TEXT NOT NULL,
                        template TEXT NOT NULL,
                        created_at INTEGER NOT NULL
                    )
                    "#,
                )
                .execute(pool)
                .await?;

                sqlx::query(
                    "CREATE UNIQUE INDEX IF NOT EXISTS idx_responses_name ON responses(name)",
                )
                .execute(pool)
                .await?;

                Ok(())
            })
        }

        pub fn down(pool: &SqlitePool) -> BoxFuture<'_, Result<(), sqlx::Error>> {
            Box::pin(async move {
                sqlx::query("DROP INDEX IF EXISTS idx_responses_name")
                    .execute(pool)
                    .await?;

                sqlx::query("DROP TABLE IF EXISTS responses")
                    .execute(pool)
                    .await?;

                Ok(())
            })
        }
    }
}
