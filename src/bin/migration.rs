use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use order_desk::{config, db, migrator::Migrator};
use sea_orm_migration::MigratorTrait;
use tracing::info;

/// Applies or rolls back the order-desk schema.
#[derive(Parser)]
#[command(name = "migration", version)]
struct Cli {
    /// Database URL; defaults to the configured `database_url`
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Clone, Copy)]
enum Command {
    /// Apply all pending migrations
    Up,
    /// Roll back the most recent migration
    Down,
    /// Print applied and pending migrations
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut cfg = config::load_config().context("failed to load configuration")?;
    config::init_tracing(cfg.log_level(), cfg.log_json, cfg.otel_enabled);

    if let Some(url) = cli.database_url {
        cfg.database_url = url;
    }

    let pool = db::establish_connection_from_app_config(&cfg)
        .await
        .context("failed to connect to database")?;

    match cli.command.unwrap_or(Command::Up) {
        Command::Up => {
            db::run_migrations(&pool).await?;
        }
        Command::Down => {
            Migrator::down(&pool, Some(1)).await?;
            info!("Rolled back one migration");
        }
        Command::Status => {
            Migrator::status(&pool).await?;
        }
    }

    Ok(())
}
