//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// gauthkit - bootstrap OAuth2 credentials for Google APIs
#[derive(Debug, Parser)]
#[command(name = "gauthkit")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "GAUTHKIT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v')]
    pub debug: bool,

    /// Path to the client secret JSON from the provider console
    #[arg(long, env = "GAUTHKIT_CREDENTIALS")]
    pub credentials: Option<PathBuf>,

    /// Path to the token store file
    #[arg(long, env = "GAUTHKIT_TOKEN_STORE")]
    pub token_store: Option<PathBuf>,

    /// OAuth scope to request (can be repeated)
    #[arg(long, action = clap::ArgAction::Append)]
    pub scope: Vec<String>,

    /// User key inside the token store
    #[arg(long)]
    pub user: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the interactive authorization flow
    Login {
        /// Re-run the flow even when a stored credential exists
        #[arg(long, short)]
        force: bool,

        /// Also open the authorization URL in the default browser
        #[arg(long)]
        open_browser: bool,
    },

    /// Print a fresh access token, refreshing it when lapsed
    Token,

    /// Show the state of the stored credential
    Status,

    /// Remove the stored credential
    Logout,

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Dump current configuration
    Dump,

    /// Validate configuration
    Validate,

    /// Show configuration file path
    Path,
}
