use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use gateway_core::config::GatewayConfig;
use gateway_core::dispatch::HttpDispatcher;
use gateway_core::observability::{setup_logging, MetricsCollector};
use gateway_core::server::{self, AppState};
use gateway_core::storage::{Database, SqliteResponseStore, SqliteSourceStore};
use tracing::info;

#[derive(Parser)]
#[command(name = "gateway", version, about = "Configurable HTTP mapping gateway")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, short, global = true, default_value = "gateway.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply migrations and serve HTTP
    Serve {
        /// Override the configured port
        #[arg(long)]
        port: Option<u16>,
    },
    /// Manage the database schema
    Migrate {
        #[command(subcommand)]
        action: MigrateAction,
    },
}

#[derive(Subcommand)]
enum MigrateAction {
    /// Apply pending migrations
    Up {
        #[arg(long)]
        target: Option<u32>,
    },
    /// Roll back to the given version
    Down { target: u32 },
    /// Show applied and pending migrations
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = GatewayConfig::load(Some(cli.config.as_path()))?;
    setup_logging(&config.logging);

    let database = Database::from_config(&config.database).await?;

    match cli.command {
        Commands::Serve { port } => {
            if let Some(port) = port {
                config.server.port = port;
                config.validate()?;
            }
            database.migrate().await?;

            let pool = database.pool().clone();
            let state = AppState::new(
                Arc::new(SqliteSourceStore::new(pool.clone())),
                Arc::new(SqliteResponseStore::new(pool)),
                Arc::new(HttpDispatcher::new(&config.dispatch)?),
                MetricsCollector::new()?,
            );

            server::serve(&config.bind_address(), state).await?;
        }
        Commands::Migrate { action } => {
            let runner = database.migration_runner();
            match action {
                MigrateAction::Up { target } => {
                    runner.migrate_up(target).await?;
                    info!(version = ?runner.get_current_version().await?, "migrations applied");
                }
                MigrateAction::Down { target } => {
                    runner.migrate_down(target).await?;
                    info!(version = target, "migrations rolled back");
                }
                MigrateAction::Status => {
                    for (version, name, applied) in runner.status().await? {
                        let mark = if applied { "applied" } else { "pending" };
                        println!("{:>4}  {:<24} {}", version, name, mark);
                    }
                }
            }
        }
    }

    Ok(())
}
