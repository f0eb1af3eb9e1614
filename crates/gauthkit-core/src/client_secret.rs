//! Client-identity configuration loading.
//!
//! Google distributes the registered application identity as a "client
//! secret" JSON downloaded from the Cloud Console. This module reads that
//! file into a [`ClientSecret`], the immutable identity used for every
//! subsequent request in the flow.

use std::path::Path;

use serde::Deserialize;

use crate::error::{AuthError, AuthResult};

/// The registered application identity.
///
/// Loaded once from the client-secret JSON and never written back.
#[derive(Debug, Clone)]
pub struct ClientSecret {
    /// The OAuth 2.0 client ID.
    pub client_id: String,
    /// The OAuth 2.0 client secret.
    pub client_secret: String,
    /// Authorization endpoint carried in the secret file, when present.
    pub auth_uri: Option<String>,
    /// Token endpoint carried in the secret file, when present.
    pub token_uri: Option<String>,
}

/// On-disk structure of the client-secret JSON.
///
/// Two layouts exist in the wild:
/// 1. Cloud Console format with an "installed" (desktop) or "web" section
/// 2. Flat format with client_id/client_secret at the root (e.g. gcloud)
#[derive(Debug, Deserialize)]
struct SecretFile {
    installed: Option<SecretSection>,
    web: Option<SecretSection>,
    client_id: Option<String>,
    client_secret: Option<String>,
}

/// The "installed"/"web" section of the client-secret JSON.
#[derive(Debug, Deserialize)]
struct SecretSection {
    client_id: String,
    client_secret: String,
    #[serde(default)]
    auth_uri: Option<String>,
    #[serde(default)]
    token_uri: Option<String>,
}

impl ClientSecret {
    /// Creates a client secret from bare id/secret values.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            auth_uri: None,
            token_uri: None,
        }
    }

    /// Loads the client secret from a JSON file.
    ///
    /// Fails with a configuration error if the file is missing or does not
    /// parse as one of the known layouts.
    pub fn from_file(path: impl AsRef<Path>) -> AuthResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            AuthError::configuration(format!(
                "failed to read client secret file {}",
                path.display()
            ))
            .with_source(e)
        })?;
        Self::from_json(&content)
    }

    /// Parses the client secret from a JSON string.
    pub fn from_json(json: &str) -> AuthResult<Self> {
        let file: SecretFile = serde_json::from_str(json).map_err(|e| {
            AuthError::configuration("failed to parse client secret JSON").with_source(e)
        })?;

        if let Some(section) = file.installed.or(file.web) {
            return Ok(Self {
                client_id: section.client_id,
                client_secret: section.client_secret,
                auth_uri: section.auth_uri,
                token_uri: section.token_uri,
            });
        }

        if let (Some(client_id), Some(client_secret)) = (file.client_id, file.client_secret) {
            return Ok(Self::new(client_id, client_secret));
        }

        Err(AuthError::configuration(
            "client secret must contain an 'installed'/'web' section \
             or 'client_id'/'client_secret' at the root",
        ))
    }

    /// Checks that the identity is usable for an authorization request.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.client_id.is_empty() {
            return Err("client_id is required");
        }
        if self.client_secret.is_empty() {
            return Err("client_secret is required");
        }
        Ok(())
    }
}
