//! Authorization commands.

use std::path::PathBuf;

use tracing::info;

use gauthkit_core::{AuthConfig, Authorizer, ClientSecret, ConsolePrompt};

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// Flow inputs gathered from global CLI flags.
///
/// Each field overrides the corresponding `config.toml` setting.
#[derive(Debug, Default)]
pub struct AuthOptions {
    pub credentials: Option<PathBuf>,
    pub token_store: Option<PathBuf>,
    pub scopes: Vec<String>,
    pub user: Option<String>,
}

/// Resolves CLI flags against config.toml into an [`AuthConfig`].
pub fn build_auth_config(opts: &AuthOptions, config: &ClientConfig) -> ClientResult<AuthConfig> {
    let credentials_path = opts
        .credentials
        .clone()
        .or_else(|| config.auth.credentials_file.clone())
        .ok_or_else(|| {
            ClientError::Config(
                "no client secret file configured; pass --credentials \
                 or set auth.credentials_file in config.toml"
                    .to_string(),
            )
        })?;

    let scopes = if !opts.scopes.is_empty() {
        opts.scopes.clone()
    } else {
        config.auth.scopes.clone()
    };
    if scopes.is_empty() {
        return Err(ClientError::Config(
            "no scopes configured; pass --scope or set auth.scopes in config.toml".to_string(),
        ));
    }

    let user = opts
        .user
        .clone()
        .unwrap_or_else(|| config.auth.user.clone());

    let secret = ClientSecret::from_file(&credentials_path)?;
    let mut auth_config = AuthConfig::new(secret, scopes).with_user_id(&user);

    if let Some(path) = opts.token_store.clone().or_else(|| config.auth.token_store.clone()) {
        auth_config = auth_config.with_token_path(path);
    }

    Ok(auth_config)
}

/// Runs the interactive authorization flow.
pub async fn login(
    opts: AuthOptions,
    force: bool,
    open_browser: bool,
    config: &ClientConfig,
) -> ClientResult<()> {
    let auth_config = build_auth_config(&opts, config)?;
    let user = auth_config.user_id.clone();

    let mut prompt = ConsolePrompt::new();
    if open_browser {
        prompt = prompt.with_browser();
    }
    let authorizer = Authorizer::new(auth_config)?.with_prompt(prompt);

    if authorizer.is_authorized() && !force {
        println!("Already authorized for user {:?}.", user);
        println!("Use --force to re-run the authorization flow.");
        return Ok(());
    }

    if force {
        authorizer.logout()?;
    }

    authorizer.authorize().await?;

    info!("authorization flow completed for {:?}", user);
    println!();
    println!("Authorization successful.");
    println!("Credential stored in {}", authorizer.store_path().display());

    Ok(())
}

/// Prints a fresh access token, refreshing it when lapsed.
pub async fn token(opts: AuthOptions, config: &ClientConfig) -> ClientResult<()> {
    let authorizer = Authorizer::new(build_auth_config(&opts, config)?)?;
    let access_token = authorizer.fresh_access_token().await?;
    println!("{}", access_token);
    Ok(())
}

/// Shows the state of the stored credential. No network calls.
pub async fn status(opts: AuthOptions, config: &ClientConfig) -> ClientResult<()> {
    let auth_config = build_auth_config(&opts, config)?;
    let scopes = auth_config.scopes.clone();
    let user = auth_config.user_id.clone();
    let authorizer = Authorizer::new(auth_config)?;

    let Some(credential) = authorizer.stored_credential() else {
        println!("Not authorized (no credential stored for user {:?}).", user);
        println!("Run 'gauthkit login' to authorize.");
        return Ok(());
    };

    println!("user:          {}", user);
    println!("token store:   {}", authorizer.store_path().display());
    println!("granted scopes:");
    for scope in &credential.scopes {
        println!("  - {}", scope);
    }
    if !credential.covers(&scopes) {
        println!("note: the stored credential does not cover the requested scopes;");
        println!("      the next login will re-run the authorization flow.");
    }

    match credential.time_until_expiry() {
        Some(remaining) if remaining > chrono::Duration::zero() => {
            println!("access token:  valid for {} more minute(s)", remaining.num_minutes());
        }
        Some(_) => match credential.refresh_token {
            Some(_) => println!("access token:  lapsed (a refresh token is available)"),
            None => println!("access token:  lapsed (no refresh token; re-run login)"),
        },
        None => println!("access token:  no advertised expiry"),
    }
    println!("last refresh:  {}", credential.last_refresh.to_rfc3339());

    Ok(())
}

/// Removes the stored credential.
pub async fn logout(opts: AuthOptions, config: &ClientConfig) -> ClientResult<()> {
    let auth_config = build_auth_config(&opts, config)?;
    let user = auth_config.user_id.clone();
    let authorizer = Authorizer::new(auth_config)?;

    if authorizer.logout()? {
        println!("Removed stored credential for user {:?}.", user);
    } else {
        println!("No stored credential for user {:?}.", user);
    }

    Ok(())
}
