//! Error types for the credential bootstrap flow.
//!
//! The flow is one-shot and human-in-the-loop, so there is no retry logic
//! to feed: errors classify what went wrong and who has to fix it.

use std::fmt;
use thiserror::Error;

/// The category of a bootstrap error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthErrorCode {
    /// Client secret or token store is missing, unreadable, or malformed.
    /// Fixed by the operator before re-running.
    Configuration,
    /// The authorization exchange or token refresh was rejected, the
    /// transport failed mid-exchange, or the user supplied no code.
    /// Fixed by re-running the flow with a fresh code.
    Authorization,
    /// Unexpected internal state.
    Internal,
}

impl AuthErrorCode {
    /// Returns a stable machine-readable name for this code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Configuration => "configuration_error",
            Self::Authorization => "authorization_error",
            Self::Internal => "internal_error",
        }
    }
}

impl fmt::Display for AuthErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An error raised while bootstrapping a credential.
#[derive(Debug, Error)]
pub struct AuthError {
    code: AuthErrorCode,
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AuthError {
    /// Creates a new error with the given code and message.
    pub fn new(code: AuthErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(AuthErrorCode::Configuration, message)
    }

    /// Creates an authorization error.
    pub fn authorization(message: impl Into<String>) -> Self {
        Self::new(AuthErrorCode::Authorization, message)
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(AuthErrorCode::Internal, message)
    }

    /// Attaches the underlying cause of this error.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    /// Returns the error code.
    pub fn code(&self) -> AuthErrorCode {
        self.code
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// A specialized Result type for bootstrap operations.
pub type AuthResult<T> = Result<T, AuthError>;
