use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use ratesync::core::config::ConversionStrategy;
use ratesync::core::log::init_logging;
use std::path::PathBuf;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Clone, Copy, ValueEnum)]
enum StrategyArg {
    /// One UPDATE per currency
    PerCurrency,
    /// A single UPDATE with an embedded rate lookup
    SingleStatement,
}

impl From<StrategyArg> for ConversionStrategy {
    fn from(arg: StrategyArg) -> ConversionStrategy {
        match arg {
            StrategyArg::PerCurrency => ConversionStrategy::PerCurrency,
            StrategyArg::SingleStatement => ConversionStrategy::SingleStatement,
        }
    }
}

impl From<Commands> for ratesync::AppCommand {
    fn from(cmd: Commands) -> ratesync::AppCommand {
        match cmd {
            Commands::Init => ratesync::AppCommand::Init,
            Commands::Rates { export, dry_run } => ratesync::AppCommand::Rates { export, dry_run },
            Commands::Users { file, dry_run } => ratesync::AppCommand::Users { file, dry_run },
            Commands::Convert { strategy } => ratesync::AppCommand::Convert {
                strategy: strategy.map(Into::into),
            },
            Commands::Show => ratesync::AppCommand::Show,
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Create the rates and users tables
    Init,
    /// Fetch the exchange-rate feed and load it
    Rates {
        /// Also write the fetched rates to this .xlsx workbook
        #[arg(long)]
        export: Option<PathBuf>,
        /// Load into memory instead of the database
        #[arg(long)]
        dry_run: bool,
    },
    /// Load users from a CSV file
    Users {
        /// CSV file to read, overrides users.csv_path
        #[arg(short, long)]
        file: Option<PathBuf>,
        /// Load into memory instead of the database
        #[arg(long)]
        dry_run: bool,
    },
    /// Recompute converted balances from the stored rates
    Convert {
        #[arg(long, value_enum)]
        strategy: Option<StrategyArg>,
    },
    /// Display stored users and balances
    Show,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => ratesync::cli::setup::setup(),
        Some(cmd) => ratesync::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!("Application failed: {e:#}");
    }
    result
}
