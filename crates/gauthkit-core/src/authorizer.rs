//! The credential bootstrap flow.
//!
//! [`Authorizer`] ties the pieces together: look up the token store,
//! return a cached credential when it covers the requested scopes, and
//! otherwise run the interactive out-of-band exchange and persist the
//! result. The [`authorize`] free function is the one-call form.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info};

use crate::client_secret::ClientSecret;
use crate::credential::Credential;
use crate::error::{AuthError, AuthResult};
use crate::oauth::{OAuthClient, Pkce};
use crate::prompt::{AuthPrompt, ConsolePrompt};
use crate::store::{DEFAULT_USER, TokenStore};

/// Configuration for the bootstrap flow.
///
/// Everything the flow needs travels in this struct; there is no
/// process-wide state.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// The registered application identity.
    pub secret: ClientSecret,

    /// Scopes to request. Must be non-empty.
    pub scopes: Vec<String>,

    /// Key under which the credential is stored. Defaults to `"default"`.
    pub user_id: String,

    /// Path of the token store file.
    pub token_path: PathBuf,

    /// Timeout applied to token-endpoint requests.
    pub timeout: Duration,
}

impl AuthConfig {
    /// Default token-endpoint request timeout in seconds.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    /// Creates a configuration for the given identity and scopes.
    pub fn new(secret: ClientSecret, scopes: Vec<String>) -> Self {
        Self {
            secret,
            scopes,
            user_id: DEFAULT_USER.to_string(),
            token_path: Self::default_token_path(DEFAULT_USER),
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Returns the default token store path for a user key.
    pub fn default_token_path(user_id: &str) -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("gauthkit")
            .join(format!("tokens-{}.json", user_id))
    }

    /// Sets the user key, moving the token path with it when the path is
    /// still the default for the previous key.
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        let user_id = user_id.into();
        if self.token_path == Self::default_token_path(&self.user_id) {
            self.token_path = Self::default_token_path(&user_id);
        }
        self.user_id = user_id;
        self
    }

    /// Sets the token store path.
    pub fn with_token_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.token_path = path.into();
        self
    }

    /// Sets the token-endpoint request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), String> {
        self.secret
            .validate()
            .map_err(|e| format!("invalid client secret: {}", e))?;

        if self.scopes.is_empty() {
            return Err("at least one scope is required".to_string());
        }

        if self.user_id.is_empty() {
            return Err("user id must not be empty".to_string());
        }

        Ok(())
    }
}

/// Orchestrates the credential bootstrap flow.
pub struct Authorizer {
    config: AuthConfig,
    store: TokenStore,
    oauth: OAuthClient,
    prompt: Box<dyn AuthPrompt + Send + Sync>,
}

impl std::fmt::Debug for Authorizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authorizer")
            .field("config", &self.config)
            .field("store", &self.store)
            .field("oauth", &self.oauth)
            .field("prompt", &"<dyn AuthPrompt>")
            .finish()
    }
}

impl Authorizer {
    /// Creates an authorizer, opening the token store at the configured
    /// path. Does not touch the network.
    pub fn new(config: AuthConfig) -> AuthResult<Self> {
        config.validate().map_err(AuthError::configuration)?;

        let store = TokenStore::open(&config.token_path)?;
        let oauth = OAuthClient::new(config.secret.clone(), config.timeout);

        Ok(Self {
            config,
            store,
            oauth,
            prompt: Box::new(ConsolePrompt::new()),
        })
    }

    /// Replaces the prompt implementation.
    pub fn with_prompt(mut self, prompt: impl AuthPrompt + Send + Sync + 'static) -> Self {
        self.prompt = Box::new(prompt);
        self
    }

    /// Overrides the OAuth endpoints, for non-Google deployments and tests.
    pub fn with_endpoints(
        mut self,
        auth_url: impl Into<String>,
        token_url: impl Into<String>,
    ) -> Self {
        self.oauth = self.oauth.with_endpoints(auth_url, token_url);
        self
    }

    /// Obtains a credential covering the configured scopes.
    ///
    /// A stored credential whose granted scopes cover the request is
    /// returned as-is, with no prompt and no network round trip. A lapsed
    /// access token is still a hit, since the refresh token restores it
    /// (see [`fresh_access_token`](Self::fresh_access_token)). Anything
    /// else runs the interactive exchange and persists the result.
    pub async fn authorize(&self) -> AuthResult<Credential> {
        if let Some(credential) = self.cached_credential() {
            debug!("using stored credential for {:?}", self.config.user_id);
            return Ok(credential);
        }

        info!("no usable stored credential, starting authorization flow");

        let pkce = Pkce::new();
        let auth_url = self.oauth.authorization_url(&pkce, &self.config.scopes);
        let code = self.prompt.obtain_code(&auth_url)?;

        let credential = self
            .oauth
            .exchange_code(&code, &pkce.verifier, &self.config.scopes)
            .await?;

        self.store.put(&self.config.user_id, credential.clone())?;
        info!("stored credential for {:?}", self.config.user_id);

        Ok(credential)
    }

    /// Returns a non-expired access token, refreshing through the stored
    /// refresh token when the current one has lapsed.
    ///
    /// Fails with an authorization error when nothing usable is stored or
    /// the lapsed credential carries no refresh token; either way the
    /// remedy is to re-run [`authorize`](Self::authorize).
    pub async fn fresh_access_token(&self) -> AuthResult<String> {
        let credential = self.cached_credential().ok_or_else(|| {
            AuthError::authorization("not authorized for the requested scopes - run the login flow")
        })?;

        if !credential.is_expired() {
            return Ok(credential.access_token);
        }

        Ok(self.refresh().await?.access_token)
    }

    /// Refreshes the stored credential's access token and persists it.
    pub async fn refresh(&self) -> AuthResult<Credential> {
        let mut credential = self.cached_credential().ok_or_else(|| {
            AuthError::authorization("no stored credential to refresh - run the login flow")
        })?;

        let refresh_token = credential.refresh_token.clone().ok_or_else(|| {
            AuthError::authorization("stored credential has no refresh token - re-run the login flow")
        })?;

        debug!("refreshing access token for {:?}", self.config.user_id);
        let (access_token, expires_in) = self.oauth.refresh(&refresh_token).await?;

        credential.update_access_token(access_token, expires_in);
        self.store.put(&self.config.user_id, credential.clone())?;

        Ok(credential)
    }

    /// Returns true if a stored credential can serve the configured
    /// scopes, directly or after a refresh.
    pub fn is_authorized(&self) -> bool {
        self.cached_credential()
            .is_some_and(|c| !c.is_expired() || c.refresh_token.is_some())
    }

    /// Returns whatever is stored for the user key, without scope checks.
    /// Inspection only; [`authorize`](Self::authorize) applies the checks.
    pub fn stored_credential(&self) -> Option<Credential> {
        self.store.get(&self.config.user_id)
    }

    /// Removes the stored credential for the user key.
    ///
    /// Returns true if one was present.
    pub fn logout(&self) -> AuthResult<bool> {
        self.store.remove(&self.config.user_id)
    }

    /// Returns the configuration.
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Returns the token store path.
    pub fn store_path(&self) -> &Path {
        self.store.path()
    }

    /// The cache-hit rule: present and covering the requested scopes.
    /// A scope mismatch is a miss, never a silent match.
    fn cached_credential(&self) -> Option<Credential> {
        self.store
            .get(&self.config.user_id)
            .filter(|c| c.covers(&self.config.scopes))
    }
}

/// One-call form of the flow: load the client secret, open the token
/// store, and return a credential for `scopes`, cached when possible and
/// interactively authorized otherwise.
pub async fn authorize(
    client_secret_path: impl AsRef<Path>,
    token_store_path: impl Into<PathBuf>,
    scopes: Vec<String>,
) -> AuthResult<Credential> {
    let secret = ClientSecret::from_file(client_secret_path)?;
    let config = AuthConfig::new(secret, scopes).with_token_path(token_store_path);
    Authorizer::new(config)?.authorize().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AuthErrorCode;

    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    /// Prompt that returns a fixed code and counts invocations.
    #[derive(Clone)]
    struct ScriptedPrompt {
        code: &'static str,
        calls: Arc<AtomicUsize>,
    }

    impl ScriptedPrompt {
        fn new(code: &'static str) -> Self {
            Self {
                code,
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl AuthPrompt for ScriptedPrompt {
        fn obtain_code(&self, auth_url: &str) -> AuthResult<String> {
            assert!(auth_url.contains("response_type=code"));
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.code.to_string())
        }
    }

    /// Serves one canned HTTP response on a loopback port and returns the
    /// endpoint URL. Accepts a single connection.
    fn spawn_token_endpoint(status_line: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        thread::spawn(move || {
            let Ok((mut stream, _)) = listener.accept() else {
                return;
            };

            // Drain the request so the client sees a clean exchange.
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut content_length = 0usize;
            loop {
                let mut line = String::new();
                if reader.read_line(&mut line).unwrap_or(0) == 0 {
                    break;
                }
                let line = line.trim().to_ascii_lowercase();
                if let Some(value) = line.strip_prefix("content-length:") {
                    content_length = value.trim().parse().unwrap_or(0);
                }
                if line.is_empty() {
                    break;
                }
            }
            let mut request_body = vec![0u8; content_length];
            let _ = reader.read_exact(&mut request_body);

            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            let _ = stream.write_all(response.as_bytes());
            let _ = stream.flush();
        });

        format!("http://{}/token", addr)
    }

    const TOKEN_OK: &str = r#"{
        "access_token": "fresh-access-token",
        "refresh_token": "fresh-refresh-token",
        "expires_in": 3600,
        "token_type": "Bearer"
    }"#;

    const REFRESH_OK: &str = r#"{
        "access_token": "renewed-access-token",
        "expires_in": 3600,
        "token_type": "Bearer"
    }"#;

    fn test_secret() -> ClientSecret {
        ClientSecret::new("test-client.apps.googleusercontent.com", "test-secret")
    }

    fn test_config(token_path: &Path, scopes: &[&str]) -> AuthConfig {
        AuthConfig::new(test_secret(), scopes.iter().map(|s| s.to_string()).collect())
            .with_token_path(token_path)
            .with_timeout(Duration::from_secs(5))
    }

    fn stored(token: &str, refresh: Option<&str>, scopes: &[&str]) -> Credential {
        Credential::new(
            token,
            refresh.map(String::from),
            Some(3600),
            scopes.iter().map(|s| s.to_string()).collect(),
        )
    }

    #[tokio::test]
    async fn missing_client_secret_is_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = authorize(
            "/nonexistent/client_secret.json",
            dir.path().join("tokens.json"),
            vec!["scope-a".to_string()],
        )
        .await;

        assert!(result.is_err());
        assert_eq!(result.unwrap_err().code(), AuthErrorCode::Configuration);
    }

    #[test]
    fn empty_scopes_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir.path().join("tokens.json"), &[]);
        let result = Authorizer::new(config);
        assert!(result.is_err());
        assert_eq!(result.unwrap_err().code(), AuthErrorCode::Configuration);
    }

    #[tokio::test]
    async fn cache_hit_skips_prompt_and_network() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.json");

        let seed = TokenStore::open(&path).unwrap();
        seed.put(DEFAULT_USER, stored("cached-token", Some("r"), &["scope-a"]))
            .unwrap();

        let prompt = ScriptedPrompt::new("unused");
        // Endpoints deliberately left at the Google defaults: a cache hit
        // must not reach them.
        let authorizer = Authorizer::new(test_config(&path, &["scope-a"]))
            .unwrap()
            .with_prompt(prompt.clone());

        let credential = authorizer.authorize().await.unwrap();
        assert_eq!(credential.access_token, "cached-token");
        assert_eq!(prompt.call_count(), 0);
    }

    #[tokio::test]
    async fn cold_start_runs_flow_once_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.json");

        let token_url = spawn_token_endpoint("200 OK", TOKEN_OK);
        let prompt = ScriptedPrompt::new("pasted-code");
        let authorizer = Authorizer::new(test_config(&path, &["scope-a"]))
            .unwrap()
            .with_prompt(prompt.clone())
            .with_endpoints("https://example.test/auth", token_url);

        let credential = authorizer.authorize().await.unwrap();
        assert_eq!(credential.access_token, "fresh-access-token");
        assert_eq!(prompt.call_count(), 1);

        // The store now holds the credential under the fixed user key.
        let reopened = TokenStore::open(&path).unwrap();
        let persisted = reopened.get(DEFAULT_USER).unwrap();
        assert_eq!(persisted.access_token, "fresh-access-token");
        assert_eq!(persisted.refresh_token.as_deref(), Some("fresh-refresh-token"));
        assert_eq!(persisted.scopes, vec!["scope-a".to_string()]);
    }

    #[tokio::test]
    async fn persistence_round_trip_avoids_second_prompt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.json");

        let token_url = spawn_token_endpoint("200 OK", TOKEN_OK);
        let first = Authorizer::new(test_config(&path, &["scope-a"]))
            .unwrap()
            .with_prompt(ScriptedPrompt::new("pasted-code"))
            .with_endpoints("https://example.test/auth", token_url);
        first.authorize().await.unwrap();

        let second_prompt = ScriptedPrompt::new("unused");
        let second = Authorizer::new(test_config(&path, &["scope-a"]))
            .unwrap()
            .with_prompt(second_prompt.clone());

        let credential = second.authorize().await.unwrap();
        assert_eq!(credential.access_token, "fresh-access-token");
        assert_eq!(second_prompt.call_count(), 0);
    }

    #[tokio::test]
    async fn scope_mismatch_is_not_a_silent_match() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.json");

        let seed = TokenStore::open(&path).unwrap();
        seed.put(DEFAULT_USER, stored("narrow-token", Some("r"), &["scope-a"]))
            .unwrap();

        let token_url = spawn_token_endpoint("200 OK", TOKEN_OK);
        let prompt = ScriptedPrompt::new("pasted-code");
        let authorizer = Authorizer::new(test_config(&path, &["scope-b"]))
            .unwrap()
            .with_prompt(prompt.clone())
            .with_endpoints("https://example.test/auth", token_url);

        let credential = authorizer.authorize().await.unwrap();
        assert_eq!(prompt.call_count(), 1);
        assert_eq!(credential.access_token, "fresh-access-token");

        // The re-authorized credential replaced the narrow one.
        let reopened = TokenStore::open(&path).unwrap();
        assert_eq!(
            reopened.get(DEFAULT_USER).unwrap().scopes,
            vec!["scope-b".to_string()]
        );
    }

    #[tokio::test]
    async fn failed_exchange_leaves_store_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.json");

        let token_url =
            spawn_token_endpoint("400 Bad Request", r#"{"error": "invalid_grant"}"#);
        let authorizer = Authorizer::new(test_config(&path, &["scope-a"]))
            .unwrap()
            .with_prompt(ScriptedPrompt::new("expired-code"))
            .with_endpoints("https://example.test/auth", token_url);

        let result = authorizer.authorize().await;
        assert!(result.is_err());
        assert_eq!(result.unwrap_err().code(), AuthErrorCode::Authorization);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn fresh_token_returns_unexpired_access_token() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.json");

        let seed = TokenStore::open(&path).unwrap();
        seed.put(DEFAULT_USER, stored("live-token", Some("r"), &["scope-a"]))
            .unwrap();

        let authorizer = Authorizer::new(test_config(&path, &["scope-a"])).unwrap();
        assert_eq!(authorizer.fresh_access_token().await.unwrap(), "live-token");
    }

    #[tokio::test]
    async fn refresh_renews_and_persists_access_token() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.json");

        let mut lapsed = stored("stale-token", Some("the-refresh-token"), &["scope-a"]);
        lapsed.expires_at = Some(chrono::Utc::now() - chrono::Duration::hours(1));
        TokenStore::open(&path).unwrap().put(DEFAULT_USER, lapsed).unwrap();

        let token_url = spawn_token_endpoint("200 OK", REFRESH_OK);
        let authorizer = Authorizer::new(test_config(&path, &["scope-a"]))
            .unwrap()
            .with_endpoints("https://example.test/auth", token_url);

        let token = authorizer.fresh_access_token().await.unwrap();
        assert_eq!(token, "renewed-access-token");

        // Refresh token survives; new access token and expiry persisted.
        let reopened = TokenStore::open(&path).unwrap();
        let persisted = reopened.get(DEFAULT_USER).unwrap();
        assert_eq!(persisted.access_token, "renewed-access-token");
        assert_eq!(persisted.refresh_token.as_deref(), Some("the-refresh-token"));
        assert!(!persisted.is_expired());
    }

    #[tokio::test]
    async fn lapsed_credential_without_refresh_token_is_authorization_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.json");

        let mut lapsed = stored("stale-token", None, &["scope-a"]);
        lapsed.expires_at = Some(chrono::Utc::now() - chrono::Duration::hours(1));
        TokenStore::open(&path).unwrap().put(DEFAULT_USER, lapsed).unwrap();

        let authorizer = Authorizer::new(test_config(&path, &["scope-a"])).unwrap();
        let result = authorizer.fresh_access_token().await;
        assert!(result.is_err());
        assert_eq!(result.unwrap_err().code(), AuthErrorCode::Authorization);
    }

    #[tokio::test]
    async fn logout_removes_stored_credential() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.json");

        TokenStore::open(&path)
            .unwrap()
            .put(DEFAULT_USER, stored("t", Some("r"), &["scope-a"]))
            .unwrap();

        let authorizer = Authorizer::new(test_config(&path, &["scope-a"])).unwrap();
        assert!(authorizer.is_authorized());
        assert!(authorizer.logout().unwrap());
        assert!(!authorizer.is_authorized());
        assert!(authorizer.stored_credential().is_none());
    }

    #[test]
    fn config_user_id_moves_default_token_path() {
        let config = AuthConfig::new(test_secret(), vec!["s".to_string()]).with_user_id("work");
        assert_eq!(config.token_path, AuthConfig::default_token_path("work"));

        // An explicit path is left alone.
        let pinned = AuthConfig::new(test_secret(), vec!["s".to_string()])
            .with_token_path("/tmp/custom.json")
            .with_user_id("work");
        assert_eq!(pinned.token_path, PathBuf::from("/tmp/custom.json"));
    }
}
