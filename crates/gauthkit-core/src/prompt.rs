//! The human boundary of the authorization flow.
//!
//! First-time authorization suspends on a person: the flow presents a URL
//! and waits for the code they bring back. That wait is a plain blocking
//! call with no timeout; cancellation is process termination.

use std::io::{self, BufRead, Write};

use tracing::warn;

use crate::error::{AuthError, AuthResult};

/// Presents an authorization URL and collects the resulting code.
///
/// The trait exists so tests and embedders can script the interaction;
/// [`ConsolePrompt`] is the interactive implementation.
pub trait AuthPrompt {
    /// Presents `auth_url` to the user and blocks until they supply the
    /// authorization code.
    fn obtain_code(&self, auth_url: &str) -> AuthResult<String>;
}

/// Interactive prompt on stdout/stdin.
#[derive(Debug, Default)]
pub struct ConsolePrompt {
    open_browser: bool,
}

impl ConsolePrompt {
    /// Creates a prompt that only prints the URL.
    pub fn new() -> Self {
        Self::default()
    }

    /// Also attempts to open the URL in the default browser. The URL is
    /// printed either way, so a failed launch just costs a copy/paste.
    pub fn with_browser(mut self) -> Self {
        self.open_browser = true;
        self
    }
}

impl AuthPrompt for ConsolePrompt {
    fn obtain_code(&self, auth_url: &str) -> AuthResult<String> {
        if self.open_browser
            && let Err(e) = open::that(auth_url)
        {
            warn!("failed to open browser: {}", e);
        }

        println!("Open the following URL in your browser and enter the resulting code after authorization:");
        println!();
        println!("{auth_url}");
        println!();
        print!("Code: ");
        io::stdout()
            .flush()
            .map_err(|e| AuthError::authorization("failed to write prompt").with_source(e))?;

        let mut line = String::new();
        io::stdin()
            .lock()
            .read_line(&mut line)
            .map_err(|e| AuthError::authorization("failed to read authorization code").with_source(e))?;

        let code = line.trim();
        if code.is_empty() {
            return Err(AuthError::authorization("no authorization code entered"));
        }
        Ok(code.to_string())
    }
}
