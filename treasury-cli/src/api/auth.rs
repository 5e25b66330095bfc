//! Session credentials and HTTP Basic authentication

use std::fmt;

use base64::Engine;
use base64::prelude::BASE64_STANDARD;
use log::{debug, info, warn};

use super::client::ODataClient;
use super::transport::TransportError;

/// Credentials of a logged-in user
///
/// Held for the lifetime of the process; there is no logout.
#[derive(Clone)]
pub struct Session {
    username: String,
    password: String,
    logged_in: bool,
}

impl Session {
    /// Session for credentials that were accepted by the service
    pub(crate) fn established(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            logged_in: true,
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("logged_in", &self.logged_in)
            .finish()
    }
}

/// Authentication failures
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Username or password left blank
    MissingCredentials,
    /// The service answered with a non-success status
    Rejected { status: u16, body_excerpt: String },
    /// The service could not be reached
    Unreachable(TransportError),
    /// An authenticated request was attempted without a session
    NotAuthenticated,
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::MissingCredentials => write!(f, "username and password are required"),
            AuthError::Rejected {
                status,
                body_excerpt,
            } => {
                if body_excerpt.is_empty() {
                    write!(f, "invalid username or password (status {})", status)
                } else {
                    write!(
                        f,
                        "invalid username or password ({}: {})",
                        status, body_excerpt
                    )
                }
            }
            AuthError::Unreachable(e) => write!(f, "cannot reach the server: {}", e),
            AuthError::NotAuthenticated => write!(f, "you must log in first"),
        }
    }
}

impl std::error::Error for AuthError {}

/// Encode a session as an `Authorization` header value
///
/// Every authenticated request builds its header through here.
pub fn build_auth_header(session: Option<&Session>) -> Result<String, AuthError> {
    match session {
        Some(session) if session.logged_in => Ok(basic_token(&session.username, &session.password)),
        _ => Err(AuthError::NotAuthenticated),
    }
}

fn basic_token(username: &str, password: &str) -> String {
    let raw = format!("{}:{}", username, password);
    format!("Basic {}", BASE64_STANDARD.encode(raw))
}

/// Owns the session and checks credentials against the service root
pub struct Authenticator {
    client: ODataClient,
    session: Option<Session>,
}

impl Authenticator {
    pub fn new(client: ODataClient) -> Self {
        Self {
            client,
            session: None,
        }
    }

    pub fn client(&self) -> &ODataClient {
        &self.client
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Verify credentials and store the session on success
    pub async fn authenticate(&mut self, username: &str, password: &str) -> Result<&Session, AuthError> {
        if username.is_empty() || password.is_empty() {
            return Err(AuthError::MissingCredentials);
        }

        debug!("Checking credentials for {}", username);
        let header = basic_token(username, password);
        let response = self
            .client
            .check_credentials(&header)
            .await
            .map_err(AuthError::Unreachable)?;

        if !response.is_success() {
            warn!("Authentication failed with status {}", response.status);
            return Err(AuthError::Rejected {
                status: response.status,
                body_excerpt: response.excerpt(),
            });
        }

        info!("Authenticated as {}", username);
        Ok(self
            .session
            .insert(Session::established(username, password)))
    }
}
