/// Tests for database migrations

#[cfg(test)]
mod tests {
    use futures::future::BoxFuture;
    use gateway_core::migrations::{register_migrations, Migration, MigrationRunner};
    use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
    use std::time::Duration;

    async fn create_test_pool() -> SqlitePool {
        SqlitePoolOptions::new()
            .max_connections(1)
            .acquire_timeout(Duration::from_secs(5))
            .connect("sqlite::memory:")
            .await
            .expect("Failed to create test pool")
    }

    async fn table_exists(pool: &SqlitePool, name: &str) -> bool {
        let row: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?")
                .bind(name)
                .fetch_one(pool)
                .await
                .expect("Should query sqlite_master");
        row.0 == 1
    }

    fn broken_up(pool: &SqlitePool) -> BoxFuture<'_, Result<(), sqlx::Error>> {
        Box::pin(async move {
            sqlx::query("INVALID SQL SYNTAX!!!").execute(pool).await?;
            Ok(())
        })
    }

    fn noop(_pool: &SqlitePool) -> BoxFuture<'_, Result<(), sqlx::Error>> {
        Box::pin(async move { Ok(()) })
    }

    #[tokio::test]
    async fn test_migration_runner_initialization() {
        let pool = create_test_pool().await;
        let mut runner = MigrationRunner::new(pool);

        register_migrations(&mut runner);

        assert_eq!(runner.len(), 2);
    }

    #[tokio::test]
    async fn test_migration_up() {
        let pool = create_test_pool().await;
        let mut runner = MigrationRunner::new(pool);

        register_migrations(&mut runner);

        runner.migrate_up(None).await.expect("Migration should succeed");

        let current_version = runner.get_current_version().await.expect("Should get version");
        assert_eq!(current_version, Some(2));
        assert!(table_exists(runner.pool(), "sources").await);
        assert!(table_exists(runner.pool(), "responses").await);
    }

    #[tokio::test]
    async fn test_migration_target_version() {
        let pool = create_test_pool().await;
        let mut runner = MigrationRunner::new(pool);

        register_migrations(&mut runner);

        runner.migrate_up(Some(1)).await.expect("Migration should succeed");

        let current_version = runner.get_current_version().await.expect("Should get version");
        assert_eq!(current_version, Some(1));
        assert!(table_exists(runner.pool(), "sources").await);
        assert!(!table_exists(runner.pool(), "responses").await);
    }

    #[tokio::test]
    async fn test_migration_rollback() {
        let pool = create_test_pool().await;
        let mut runner = MigrationRunner::new(pool);

        register_migrations(&mut runner);

        runner.migrate_up(None).await.expect("Migration should succeed");

        runner.migrate_down(1).await.expect("Rollback should succeed");
        let current_version = runner.get_current_version().await.expect("Should get version");
        assert_eq!(current_version, Some(1));
        assert!(!table_exists(runner.pool(), "responses").await);

        runner.migrate_down(0).await.expect("Rollback should succeed");
        let current_version = runner.get_current_version().await.expect("Should get version");
        assert_eq!(current_version, None);
        assert!(!table_exists(runner.pool(), "sources").await);
    }

    #[tokio::test]
    async fn test_migration_status() {
        let pool = create_test_pool().await;
        let mut runner = MigrationRunner::new(pool);

        register_migrations(&mut runner);
        runner.migrate_up(Some(1)).await.expect("Migration should succeed");

        let status = runner.status().await.expect("Should get status");
        assert_eq!(
            status,
            vec![
                (1, "create_sources".to_string(), true),
                (2, "create_responses".to_string(), false),
            ]
        );
    }

    #[tokio::test]
    async fn test_migration_idempotency() {
        let pool = create_test_pool().await;
        let mut runner = MigrationRunner::new(pool);

        register_migrations(&mut runner);

        runner.migrate_up(None).await.expect("First migration should succeed");
        let version_after_first = runner.get_current_version().await.expect("Should get version");

        runner.migrate_up(None).await.expect("Second migration should succeed");
        let version_after_second = runner.get_current_version().await.expect("Should get version");

        assert_eq!(version_after_first, version_after_second);
        let applied = runner.get_applied_migrations().await.expect("Should get applied migrations");
        assert_eq!(applied.len(), 2);
    }

    #[tokio::test]
    async fn test_migration_error_handling() {
        let pool = create_test_pool().await;
        let mut runner = MigrationRunner::new(pool);

        runner.add_migration(Migration {
            version: 1,
            name: "invalid".to_string(),
            up: broken_up,
            down: noop,
        });

        let result = runner.migrate_up(None).await;
        assert!(result.is_err());
        assert_eq!(runner.get_current_version().await.expect("Should get version"), None);
    }

    #[tokio::test]
    async fn test_migration_gap_rejected() {
        let pool = create_test_pool().await;
        let mut runner = MigrationRunner::new(pool);

        runner.add_migration(Migration {
            version: 1,
            name: "first".to_string(),
            up: noop,
            down: noop,
        });
        runner.add_migration(Migration {
            version: 3,
            name: "third".to_string(),
            up: noop,
            down: noop,
        });

        assert!(runner.migrate_up(None).await.is_err());
        assert_eq!(runner.get_current_version().await.expect("Should get version"), Some(1));
    }

    #[tokio::test]
    async fn test_migration_ensures_table() {
        let pool = create_test_pool().await;
        let runner = MigrationRunner::new(pool);

        runner.ensure_migrations_table().await.expect("Should create table");

        let result = sqlx::query("SELECT COUNT(*) FROM schema_migrations")
            .fetch_one(runner.pool())
            .await;
        assert!(result.is_ok());
    }
}
