//! OAuth2 credential bootstrap for Google APIs.
//!
//! Given a client-secret file and a set of scopes, produce a usable
//! credential: restored from a local token store when possible, obtained
//! through the interactive out-of-band authorization flow otherwise.
//!
//! - [`ClientSecret`] - the registered application identity (read-only)
//! - [`TokenStore`] - file-backed credential store keyed by user id
//! - [`Credential`] - the authorized token record
//! - [`OAuthClient`] - authorization URL, code exchange, token refresh
//! - [`Authorizer`] - the flow itself; [`authorize`] is the one-call form
//!
//! # Example
//!
//! ```ignore
//! use gauthkit_core::authorize;
//!
//! let credential = authorize(
//!     "client_secret.json",
//!     "tokens.json",
//!     vec!["https://www.googleapis.com/auth/calendar.readonly".to_string()],
//! )
//! .await?;
//!
//! // Use credential.access_token as a bearer token against the API.
//! ```
//!
//! The flow is one-shot and single-user: the only suspension point is the
//! wait for the pasted authorization code, and a failed exchange surfaces
//! immediately with no retry.

pub mod authorizer;
pub mod client_secret;
pub mod credential;
pub mod error;
pub mod oauth;
pub mod prompt;
pub mod store;

// Re-export main types at crate root
pub use authorizer::{AuthConfig, Authorizer, authorize};
pub use client_secret::ClientSecret;
pub use credential::Credential;
pub use error::{AuthError, AuthErrorCode, AuthResult};
pub use oauth::{OAuthClient, OOB_REDIRECT_URI, Pkce};
pub use prompt::{AuthPrompt, ConsolePrompt};
pub use store::{DEFAULT_USER, TokenStore};
