//! RecipeChat CLI - Command-line client for the recipechat support chat.
//!
//! Signs in against the recipechat backend, lists chat history, and runs an
//! interactive chat session over the real-time connection.

mod commands;

use clap::{Parser, Subcommand};
use tracing::info;

use rc_core::config::{AppConfig, ConfigHandle};
use rc_core::error::RcResult;
use rc_core::logging;

/// RecipeChat - support chat client for the recipe assistant.
#[derive(Parser)]
#[command(
    name = "recipechat",
    version,
    about = "RecipeChat support chat CLI",
    long_about = "A command-line client for the recipechat support chat.\n\
                   Sign in once, then chat with support and other cooks from the terminal."
)]
struct Cli {
    /// Path to the configuration file.
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Backend address (overrides config).
    #[arg(short, long, global = true)]
    address: Option<String>,

    /// Enable verbose logging (debug level).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (text, json).
    #[arg(short = 'f', long, global = true, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// JSON output for scripting.
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and store the access token.
    Login {
        /// Account email (prompted if omitted).
        #[arg(short, long)]
        email: Option<String>,
    },
    /// Create an account.
    Register {
        /// Account email (prompted if omitted).
        #[arg(short, long)]
        email: Option<String>,
        /// Role id for the new account.
        #[arg(long)]
        role: Option<i64>,
    },
    /// Forget the stored access token.
    Logout,
    /// Show the signed-in account.
    Whoami,
    /// List chat history.
    History {
        /// Only show the most recent messages.
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Join the support chat interactively.
    Chat {
        /// Skip loading history on join.
        #[arg(long)]
        no_history: bool,
    },
    /// Show configuration and account status.
    Status,
}

#[tokio::main]
async fn main() -> RcResult<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = match cli.config.as_deref() {
        Some(path) => AppConfig::load_from_file(std::path::Path::new(path))?,
        None => AppConfig::load_default()?,
    };
    if let Some(address) = cli.address.as_deref() {
        config.server.address = AppConfig::sanitize_server_address(address);
    }

    // Initialize logging
    let log_dir = config
        .effective_log_dir()
        .unwrap_or_else(|_| std::path::PathBuf::from("logs"));
    let _guard = logging::init_from_config(&config.logging, &log_dir, cli.verbose)?;

    let config_handle = ConfigHandle::new(config);

    info!("RecipeChat CLI v{}", rc_core::constants::APP_VERSION);

    // Dispatch to command handlers
    match cli.command {
        Commands::Login { email } => commands::login::run(config_handle, email).await,
        Commands::Register { email, role } => {
            commands::login::register(config_handle, email, role).await
        }
        Commands::Logout => commands::login::logout().await,
        Commands::Whoami => commands::login::whoami(config_handle, cli.format).await,
        Commands::History { limit } => {
            commands::history::run(config_handle, limit, cli.format).await
        }
        Commands::Chat { no_history } => commands::chat::run(config_handle, !no_history).await,
        Commands::Status => commands::status::run(config_handle, cli.format).await,
    }
}
