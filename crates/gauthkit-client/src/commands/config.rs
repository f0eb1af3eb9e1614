//! Configuration commands.

use gauthkit_core::ClientSecret;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// Dump the current configuration to stdout.
pub fn dump(config: &ClientConfig) -> ClientResult<()> {
    let toml_str = toml::to_string_pretty(config)
        .map_err(|e| ClientError::Config(format!("failed to serialize config: {}", e)))?;
    println!("# config.toml ({})", ClientConfig::default_path().display());
    println!("{}", toml_str);

    Ok(())
}

/// Validate the configuration.
pub fn validate(config: &ClientConfig) -> ClientResult<()> {
    if let Some(ref path) = config.auth.credentials_file {
        let secret = ClientSecret::from_file(path)?;
        secret
            .validate()
            .map_err(|e| ClientError::Config(format!("invalid client secret: {}", e)))?;
        println!("Client secret at {} is valid.", path.display());
    }

    if config.auth.credentials_file.is_some() && config.auth.scopes.is_empty() {
        return Err(ClientError::Config(
            "auth.scopes must not be empty when a client secret is configured".to_string(),
        ));
    }

    println!("Configuration is valid.");
    Ok(())
}

/// Show the configuration file path.
pub fn path() -> ClientResult<()> {
    println!("config: {}", ClientConfig::default_path().display());
    Ok(())
}
