//! dbfront - Main entry point.
//!
//! Opens the configured database, caches the named SQL files and runs one
//! operational command against it.

use clap::Parser;
use dbfront::config::{Command, Config};
use dbfront::{DatabaseContext, DatabaseManager, SqlRepository};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber.with(fmt::layer().json()).init();
    } else {
        subscriber
            .with(fmt::layer().with_target(true).with_thread_ids(false))
            .init();
    }
}

async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let ctx = DatabaseContext::new(&config.dsn, &config.driver, &config.sql_log_level)?;
    let manager = DatabaseManager::new(
        ctx,
        SqlRepository::new,
        config.seeds.clone(),
        config.query_paths()?,
        Some(config.connection_options()),
    )
    .await?;

    let result = match &config.command {
        Command::Seed => manager
            .seed()
            .await
            .map(|()| info!(files = manager.seed_paths().len(), "Seeding complete")),
        Command::Queries => {
            for name in manager.queries().names() {
                println!("{}", name);
            }
            Ok(())
        }
        Command::Query { name } => manager.get_query(name).map(|sql| println!("{}", sql)),
        Command::Ping => {
            match manager.server_version().await {
                Some(version) => println!("{} {}", manager.driver().display_name(), version),
                None => println!("{} (version unknown)", manager.driver().display_name()),
            }
            Ok(())
        }
    };

    manager.close().await;
    Ok(result?)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse configuration from command line and environment
    let config = Config::parse();

    // Initialize logging
    init_tracing(&config);

    info!(
        driver = %config.driver,
        "Starting dbfront v{}",
        env!("CARGO_PKG_VERSION")
    );

    if let Err(e) = run(config).await {
        error!(error = %e, "Command failed");
        return Err(e);
    }

    Ok(())
}
