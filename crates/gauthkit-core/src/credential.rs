//! The credential record produced by the authorization flow.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Margin subtracted from the advertised lifetime so callers refresh
/// before the token actually lapses server-side.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// An authorized credential for a provider API.
///
/// Either restored from the token store or produced by a code exchange.
/// The record carries enough state to answer expiry and scope questions
/// without a network round trip; obtaining a replacement access token is
/// the job of [`crate::oauth::OAuthClient`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
    /// The bearer token for API requests.
    pub access_token: String,

    /// The refresh token, when the provider granted offline access.
    pub refresh_token: Option<String>,

    /// When the access token lapses. `None` means no advertised expiry.
    pub expires_at: Option<DateTime<Utc>>,

    /// The scopes this credential was granted for.
    pub scopes: Vec<String>,

    /// When the access token was last obtained or refreshed.
    pub last_refresh: DateTime<Utc>,
}

impl Credential {
    /// Creates a credential from token-endpoint response data.
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_in_secs: Option<i64>,
        scopes: Vec<String>,
    ) -> Self {
        let expires_at = expires_in_secs
            .map(|secs| Utc::now() + Duration::seconds(secs) - Duration::seconds(EXPIRY_MARGIN_SECS));

        Self {
            access_token: access_token.into(),
            refresh_token,
            expires_at,
            scopes,
            last_refresh: Utc::now(),
        }
    }

    /// Returns true if the access token is lapsed or about to lapse.
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => Utc::now() >= expires_at,
            // No advertised expiry: treat as still valid.
            None => false,
        }
    }

    /// Returns true if every requested scope was granted to this credential.
    pub fn covers(&self, requested: &[String]) -> bool {
        requested.iter().all(|scope| self.scopes.contains(scope))
    }

    /// Replaces the access token after a refresh.
    pub fn update_access_token(
        &mut self,
        access_token: impl Into<String>,
        expires_in_secs: Option<i64>,
    ) {
        self.access_token = access_token.into();
        self.expires_at = expires_in_secs
            .map(|secs| Utc::now() + Duration::seconds(secs) - Duration::seconds(EXPIRY_MARGIN_SECS));
        self.last_refresh = Utc::now();
    }

    /// Returns the time remaining before expiry, if an expiry is known.
    pub fn time_until_expiry(&self) -> Option<Duration> {
        self.expires_at.map(|expires_at| expires_at - Utc::now())
    }
}
