//! frpkit - Android FRP diagnostics and bypass research CLI

use anyhow::Result;
use clap::{Parser, Subcommand};
use frp_common::Config;
use frpkit::commands;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "frpkit", version, about = "Android FRP diagnostics and bypass research toolkit")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List connected devices and their FRP status
    Scan,
    /// List the bypass methods enabled in the configuration
    Methods,
    /// Analyze one device and print its profile
    Analyze {
        /// Device serial from `scan`
        serial: String,
    },
    /// Rank applicable bypass methods for one device
    Recommend {
        /// Device serial from `scan`
        serial: String,
    },
    /// Run one bypass attempt
    Bypass {
        /// Device serial from `scan`
        serial: String,
        /// Method name from `methods`
        method: String,
        /// Print the plan without executing any step
        #[arg(long)]
        dry_run: bool,
    },
    /// Watch for devices until Ctrl-C
    Watch,
    /// Print the audit trail
    Audit {
        /// Decrypt encrypted records with the local key
        #[arg(long)]
        decrypt: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load();

    let default_level = if config.app.debug_mode { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    match cli.command {
        Commands::Scan => commands::scan(&config).await,
        Commands::Methods => commands::methods(&config).await,
        Commands::Analyze { serial } => commands::analyze(&config, &serial).await,
        Commands::Recommend { serial } => commands::recommend(&config, &serial).await,
        Commands::Bypass {
            serial,
            method,
            dry_run,
        } => commands::bypass(&config, &serial, &method, dry_run).await,
        Commands::Watch => commands::watch(&config).await,
        Commands::Audit { decrypt } => commands::audit(&config, decrypt).await,
    }
}
