//! frostcon CLI
//!
//! Remote console for Frostbite game servers:
//! - Raw commands (`exec`)
//! - Named operations from the loaded game family (`call`)
//! - Live event stream (`watch`)

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use frostcon::commands::{self, ConnectionOverrides};
use frostcon::output::print_error;

#[derive(Parser)]
#[command(name = "frostcon")]
#[command(author, version, about = "Remote console for Frostbite game servers")]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Server address, host:port (overrides config)
    #[arg(short, long, global = true)]
    address: Option<String>,

    /// RCON password (overrides config)
    #[arg(short, long, global = true, env = "FROSTCON_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Game family: core, bf, bf3 or bf4 (overrides config)
    #[arg(short, long, global = true)]
    game: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send a raw command and print the result words
    Exec {
        /// Command words, e.g. `admin.say hello all`
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        words: Vec<String>,
    },

    /// Invoke a named operation and print its result
    Call {
        /// Operation name, e.g. `serverInfo` or `listPlayers`
        operation: String,
        /// Operation arguments
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Print connection notifications and server events until Ctrl+C
    Watch,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Show config file path
    Path,
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    let log_level = match (cli.quiet, cli.verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        (false, _) => "trace",
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.into()),
        ))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    if let Err(e) = run(cli).await {
        print_error(&format!("{:#}", e));
        std::process::exit(1);
    }

    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let overrides = ConnectionOverrides {
        address: cli.address,
        password: cli.password,
        game: cli.game,
    };
    let config_path = cli.config.as_ref();

    match cli.command {
        Commands::Exec { words } => {
            let config = commands::load_client_config(config_path, &overrides)?;
            commands::exec_command(config, &words).await
        }
        Commands::Call { operation, args } => {
            let config = commands::load_client_config(config_path, &overrides)?;
            commands::call_command(config, &operation, &args).await
        }
        Commands::Watch => {
            let config = commands::load_client_config(config_path, &overrides)?;
            commands::watch_command(config).await
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config_show(config_path),
            ConfigAction::Path => commands::config_path(config_path),
            ConfigAction::Init { force } => commands::config_init(config_path, force),
        },
    }
}
