//! Client configuration.
//!
//! All settings live in a single `config.toml` file at
//! `~/.config/gauthkit/config.toml` by default:
//!
//! ```toml
//! [auth]
//! credentials_file = "/home/me/client_secret.json"
//! scopes = ["https://www.googleapis.com/auth/calendar.readonly"]
//! user = "default"
//! ```
//!
//! CLI flags override file settings; the file only supplies defaults.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Configuration for the gauthkit client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Authorization settings.
    pub auth: AuthSettings,

    /// Debug mode.
    pub debug: bool,
}

/// Settings for the bootstrap flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    /// Path to the client secret JSON.
    pub credentials_file: Option<PathBuf>,

    /// Path to the token store file.
    pub token_store: Option<PathBuf>,

    /// Scopes requested during login.
    #[serde(default)]
    pub scopes: Vec<String>,

    /// User key inside the token store.
    pub user: String,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            credentials_file: None,
            token_store: None,
            scopes: Vec::new(),
            user: gauthkit_core::DEFAULT_USER.to_string(),
        }
    }
}

impl ClientConfig {
    /// Loads configuration from the default path.
    pub fn load() -> Result<Self, String> {
        let path = Self::default_path();
        if path.exists() {
            let content = std::fs::read_to_string(&path)
                .map_err(|e| format!("failed to read config: {}", e))?;
            toml::from_str(&content).map_err(|e| format!("failed to parse config: {}", e))
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &PathBuf) -> Result<Self, String> {
        let content =
            std::fs::read_to_string(path).map_err(|e| format!("failed to read config: {}", e))?;
        toml::from_str(&content).map_err(|e| format!("failed to parse config: {}", e))
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    /// Returns the default configuration directory.
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("gauthkit")
    }
}
