//! OAuth 2.0 out-of-band authorization for Google APIs.
//!
//! This module implements the Authorization Code flow with the PKCE
//! (Proof Key for Code Exchange) extension, using the out-of-band redirect
//! target: no local callback server is started. The provider displays the
//! authorization code to the user, who pastes it back into the process.
//!
//! # Flow Overview
//!
//! 1. Generate a cryptographic code verifier and its SHA-256 challenge
//! 2. Build the authorization URL with the challenge and the out-of-band
//!    redirect target
//! 3. The user visits the URL, grants access, and copies the displayed code
//! 4. Exchange the code (with verifier) for access and refresh tokens
//!
//! With no redirect back into the process there is no channel to round-trip
//! a CSRF state parameter; the PKCE verifier is what binds the exchange to
//! this invocation.

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng as _;
use sha2::{Digest, Sha256};
use tracing::info;

use crate::client_secret::ClientSecret;
use crate::credential::Credential;
use crate::error::{AuthError, AuthResult};

/// Google OAuth endpoints, used when the client secret file carries none.
const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// The out-of-band redirect target: the provider shows the code to the
/// user instead of delivering it to a callback.
pub const OOB_REDIRECT_URI: &str = "urn:ietf:wg:oauth:2.0:oob";

/// The PKCE code verifier length in bytes, before base64 encoding.
const CODE_VERIFIER_LENGTH: usize = 32;

/// OAuth client for the token endpoint.
///
/// Builds authorization URLs and performs the two network operations of
/// the flow: code exchange and token refresh.
#[derive(Debug)]
pub struct OAuthClient {
    secret: ClientSecret,
    http_client: reqwest::Client,
    auth_url: String,
    token_url: String,
}

impl OAuthClient {
    /// Creates a new OAuth client for the given identity.
    ///
    /// Endpoints come from the client secret file when it names them,
    /// falling back to the Google defaults.
    pub fn new(secret: ClientSecret, timeout: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("failed to create HTTP client");

        let auth_url = secret
            .auth_uri
            .clone()
            .unwrap_or_else(|| GOOGLE_AUTH_URL.to_string());
        let token_url = secret
            .token_uri
            .clone()
            .unwrap_or_else(|| GOOGLE_TOKEN_URL.to_string());

        Self {
            secret,
            http_client,
            auth_url,
            token_url,
        }
    }

    /// Overrides both endpoints, for non-Google deployments and tests.
    pub fn with_endpoints(
        mut self,
        auth_url: impl Into<String>,
        token_url: impl Into<String>,
    ) -> Self {
        self.auth_url = auth_url.into();
        self.token_url = token_url.into();
        self
    }

    /// Builds the human-facing authorization URL for the given scopes.
    pub fn authorization_url(&self, pkce: &Pkce, scopes: &[String]) -> String {
        let scope = scopes.join(" ");

        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&\
            code_challenge={}&code_challenge_method=S256&\
            access_type=offline&prompt=consent",
            self.auth_url,
            urlencoding::encode(&self.secret.client_id),
            urlencoding::encode(OOB_REDIRECT_URI),
            urlencoding::encode(&scope),
            urlencoding::encode(&pkce.challenge),
        )
    }

    /// Exchanges a pasted authorization code for a credential.
    ///
    /// One-shot: any failure here, including transport failures, is an
    /// authorization error and the human must re-run with a fresh code.
    pub async fn exchange_code(
        &self,
        code: &str,
        verifier: &str,
        scopes: &[String],
    ) -> AuthResult<Credential> {
        let params = [
            ("client_id", self.secret.client_id.as_str()),
            ("client_secret", self.secret.client_secret.as_str()),
            ("code", code),
            ("code_verifier", verifier),
            ("grant_type", "authorization_code"),
            ("redirect_uri", OOB_REDIRECT_URI),
        ];

        let body = self.post_token_endpoint(&params, "token exchange").await?;

        let response: TokenResponse = serde_json::from_str(&body).map_err(|e| {
            AuthError::authorization("invalid token exchange response").with_source(e)
        })?;

        info!("obtained credential from authorization code");
        Ok(Credential::new(
            response.access_token,
            response.refresh_token,
            response.expires_in,
            scopes.to_vec(),
        ))
    }

    /// Obtains a replacement access token from a refresh token.
    ///
    /// Returns the new access token and its advertised lifetime in seconds.
    pub async fn refresh(&self, refresh_token: &str) -> AuthResult<(String, Option<i64>)> {
        let params = [
            ("client_id", self.secret.client_id.as_str()),
            ("client_secret", self.secret.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];

        let body = self.post_token_endpoint(&params, "token refresh").await?;

        let response: TokenResponse = serde_json::from_str(&body).map_err(|e| {
            AuthError::authorization("invalid token refresh response").with_source(e)
        })?;

        info!("refreshed access token");
        Ok((response.access_token, response.expires_in))
    }

    /// Posts a form to the token endpoint and returns the success body.
    async fn post_token_endpoint(
        &self,
        params: &[(&str, &str)],
        operation: &str,
    ) -> AuthResult<String> {
        let response = self
            .http_client
            .post(&self.token_url)
            .form(params)
            .send()
            .await
            .map_err(|e| {
                AuthError::authorization(format!("{} request failed", operation)).with_source(e)
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            AuthError::authorization(format!("failed to read {} response", operation))
                .with_source(e)
        })?;

        if !status.is_success() {
            return Err(AuthError::authorization(format!(
                "{} rejected ({}): {}",
                operation, status, body
            )));
        }

        Ok(body)
    }
}

/// PKCE verifier/challenge pair (RFC 7636).
#[derive(Debug)]
pub struct Pkce {
    /// The code verifier, a high-entropy random string sent at exchange.
    pub verifier: String,
    /// The code challenge: SHA-256 of the verifier, base64url encoded.
    pub challenge: String,
}

impl Pkce {
    /// Creates a fresh pair with a random verifier.
    pub fn new() -> Self {
        let verifier = Self::generate_verifier();
        let challenge = Self::compute_challenge(&verifier);
        Self {
            verifier,
            challenge,
        }
    }

    fn generate_verifier() -> String {
        let mut rng = rand::rng();
        let bytes: Vec<u8> = (0..CODE_VERIFIER_LENGTH).map(|_| rng.random()).collect();
        URL_SAFE_NO_PAD.encode(&bytes)
    }

    fn compute_challenge(verifier: &str) -> String {
        let digest = Sha256::digest(verifier.as_bytes());
        URL_SAFE_NO_PAD.encode(digest)
    }
}

impl Default for Pkce {
    fn default() -> Self {
        Self::new()
    }
}

/// Response from the provider's token endpoint.
#[derive(Debug, serde::Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}
