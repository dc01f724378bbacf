//! Options Stream Handshake
//!
//! The server greets with `success/connected`, expects an `auth` action
//! back and answers `success/authenticated` or an error. It drops sockets
//! that are still unauthenticated 10 seconds after connecting.
//!
//! Handshake error codes: 401 not authenticated, 402 bad credentials,
//! 403 already authenticated, 404 handshake too slow, 406 too many
//! connections.

use std::time::Duration;

use thiserror::Error;

use super::messages::{AuthRequest, ErrorMessage, SuccessKind, SuccessMessage};

/// Time allowed for the handshake, with a margin under the server's 10s.
pub const AUTH_TIMEOUT: Duration = Duration::from_secs(8);

/// Handshake failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// A key or secret is empty.
    #[error("missing credential: {0}")]
    MissingCredential(&'static str),

    /// A request was sent before the handshake completed.
    #[error("session is not authenticated")]
    NotAuthenticated,

    /// The key/secret pair was refused.
    #[error("invalid API key or secret")]
    InvalidCredentials,

    /// A second `auth` action was sent on the same socket.
    #[error("session is already authenticated")]
    AlreadyAuthenticated,

    /// The handshake did not finish in time.
    #[error("authentication timed out")]
    Timeout,

    /// The account has no free stream connections.
    #[error("stream connection limit reached for this account")]
    ConnectionLimitExceeded,

    /// Any other server-reported failure.
    #[error("server rejected handshake ({code}): {message}")]
    ServerError {
        /// Server error code.
        code: i32,
        /// Server message.
        message: String,
    },
}

impl From<&ErrorMessage> for AuthError {
    fn from(reply: &ErrorMessage) -> Self {
        match reply.code {
            401 => Self::NotAuthenticated,
            402 => Self::InvalidCredentials,
            403 => Self::AlreadyAuthenticated,
            404 => Self::Timeout,
            406 => Self::ConnectionLimitExceeded,
            code => Self::ServerError {
                code,
                message: reply.msg.clone(),
            },
        }
    }
}

/// Where the handshake stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthState {
    /// No socket, or the socket was closed.
    #[default]
    Disconnected,
    /// `auth` sent, no answer yet.
    Authenticating,
    /// Requests may be sent.
    Authenticated,
    /// The server refused the handshake.
    Failed,
}

/// Key/secret pair. `Debug` never prints the secret.
#[derive(Clone)]
pub struct Credentials {
    key: String,
    secret: String,
}

impl Credentials {
    /// Validate and wrap a key/secret pair.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::MissingCredential`] when either half is blank.
    pub fn new(key: impl Into<String>, secret: impl Into<String>) -> Result<Self, AuthError> {
        let key = key.into();
        let secret = secret.into();

        if key.trim().is_empty() {
            return Err(AuthError::MissingCredential("API key"));
        }
        if secret.trim().is_empty() {
            return Err(AuthError::MissingCredential("API secret"));
        }

        Ok(Self { key, secret })
    }

    /// Public key id.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    fn to_auth_request(&self) -> AuthRequest {
        AuthRequest::new(self.key.clone(), self.secret.clone())
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("key", &self.key)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

/// Handshake state machine, fed with the server's control messages.
#[derive(Debug)]
pub struct AuthHandler {
    credentials: Credentials,
    state: AuthState,
}

/// What the connection should do after a control message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthStep {
    /// Send this request.
    Send(AuthRequest),
    /// Handshake complete.
    Done,
}

impl AuthHandler {
    /// Handler for a fresh socket.
    #[must_use]
    pub const fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            state: AuthState::Disconnected,
        }
    }

    /// Current handshake state.
    #[must_use]
    pub const fn state(&self) -> AuthState {
        self.state
    }

    /// Whether requests may be sent.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self.state, AuthState::Authenticated)
    }

    /// Advance on a success message.
    pub fn on_success(&mut self, msg: &SuccessMessage) -> AuthStep {
        match msg.msg {
            SuccessKind::Connected => {
                self.state = AuthState::Authenticating;
                AuthStep::Send(self.credentials.to_auth_request())
            }
            SuccessKind::Authenticated => {
                self.state = AuthState::Authenticated;
                AuthStep::Done
            }
        }
    }

    /// Record a failure reported by the server.
    pub fn on_error(&mut self, msg: &ErrorMessage) -> AuthError {
        self.state = AuthState::Failed;
        AuthError::from(msg)
    }

    /// Forget the session after the socket closes.
    pub const fn reset(&mut self) {
        self.state = AuthState::Disconnected;
    }
}
