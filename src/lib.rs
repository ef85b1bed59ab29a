pub mod balance;
pub mod cli;
pub mod core;
pub mod export;
pub mod loader;
pub mod pipeline;
pub mod providers;
pub mod store;

use crate::core::config::{AppConfig, ConversionStrategy};
use anyhow::Result;
use std::path::PathBuf;
use tracing::{debug, info};

pub enum AppCommand {
    Init,
    Rates {
        export: Option<PathBuf>,
        dry_run: bool,
    },
    Users {
        file: Option<PathBuf>,
        dry_run: bool,
    },
    Convert {
        strategy: Option<ConversionStrategy>,
    },
    Show,
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("ratesync starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!(rates_url = %config.rates.url, loader = ?config.loader, "Loaded config");

    match command {
        AppCommand::Init => {
            let store = store::open(&config.database, false).await?;
            cli::sync::init(store.as_ref()).await
        }
        AppCommand::Rates { export, dry_run } => {
            let store = store::open(&config.database, dry_run).await?;
            cli::sync::rates(&config, store, export).await
        }
        AppCommand::Users { file, dry_run } => {
            let store = store::open(&config.database, dry_run).await?;
            cli::sync::users(&config, store, file).await
        }
        AppCommand::Convert { strategy } => {
            let store = store::open(&config.database, false).await?;
            cli::sync::convert(&config, store.as_ref(), strategy).await
        }
        AppCommand::Show => {
            let store = store::open(&config.database, false).await?;
            cli::show::show(store.as_ref(), &config.conversion.base_currency).await
        }
    }
}
