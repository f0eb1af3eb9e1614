//! gauthkit CLI entry point.

use std::process::ExitCode;

use clap::Parser;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use gauthkit_client::cli::{Cli, Command, ConfigAction};
use gauthkit_client::commands::auth::AuthOptions;
use gauthkit_client::config::ClientConfig;
use gauthkit_client::error::{ClientError, ClientResult};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.debug {
        EnvFilter::new(Level::DEBUG.to_string())
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(Level::WARN.to_string()))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    // Run the command
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> ClientResult<()> {
    // Load configuration
    let config = if let Some(ref path) = cli.config {
        ClientConfig::load_from(path).map_err(ClientError::Config)?
    } else {
        ClientConfig::load().unwrap_or_default()
    };

    let opts = AuthOptions {
        credentials: cli.credentials,
        token_store: cli.token_store,
        scopes: cli.scope,
        user: cli.user,
    };

    match cli.command {
        Command::Login {
            force,
            open_browser,
        } => gauthkit_client::commands::auth::login(opts, force, open_browser, &config).await,
        Command::Token => gauthkit_client::commands::auth::token(opts, &config).await,
        Command::Status => gauthkit_client::commands::auth::status(opts, &config).await,
        Command::Logout => gauthkit_client::commands::auth::logout(opts, &config).await,
        Command::Config { action } => match action {
            ConfigAction::Dump => gauthkit_client::commands::config::dump(&config),
            ConfigAction::Validate => gauthkit_client::commands::config::validate(&config),
            ConfigAction::Path => gauthkit_client::commands::config::path(),
        },
    }
}
