//! Bridge Error Types
//!
//! Bridge-specific error variants that integrate with the unified
//! `kernel::error::AppError` system. None of these ever reach the protocol
//! response verbatim: the handler turns every failure into a generic reject.

use std::sync::Arc;

use kernel::error::{app_error::AppError, kind::ErrorKind};
use thiserror::Error;

use crate::domain::entity::login_attempt::AttemptState;

/// Bridge-specific result type alias
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Reply text for every rejected attempt
pub const GENERIC_REJECT_MESSAGE: &str = "Authentication failed";

#[derive(Debug, Error)]
pub enum BridgeError {
    /// Invalid client or policy configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Malformed request data
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Directory rejected the user's password
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Directory could not be queried (bind, transport, filter)
    #[error("Directory error: {0}")]
    Directory(#[source] AppError),

    /// Second-factor API could not be reached or answered garbage
    #[error("Second-factor transport error: {0}")]
    SecondFactorTransport(#[source] AppError),

    /// Second-factor API answered but refused the call
    #[error("Second-factor API error: {0}")]
    SecondFactorApi(String),

    /// Forest metadata load failed; shared by every waiter of that load
    #[error("Forest metadata for '{root_domain}' unavailable: {source}")]
    ForestUnavailable {
        root_domain: String,
        source: Arc<BridgeError>,
    },

    /// Request names a client that is not configured
    #[error("Unknown client: {0}")]
    UnknownClient(String),

    /// Login attempt state machine misuse
    #[error("Invalid login attempt transition from {from} to {to}")]
    InvalidTransition { from: AttemptState, to: AttemptState },

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl BridgeError {
    /// Get the ErrorKind for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            BridgeError::Configuration(_) => ErrorKind::Configuration,
            BridgeError::InvalidInput(_) => ErrorKind::InvalidInput,
            BridgeError::InvalidCredentials => ErrorKind::Unauthorized,
            BridgeError::Directory(e) | BridgeError::SecondFactorTransport(e) => e.kind(),
            BridgeError::SecondFactorApi(_) => ErrorKind::Upstream,
            BridgeError::ForestUnavailable { source, .. } => source.kind(),
            BridgeError::UnknownClient(_) => ErrorKind::NotFound,
            BridgeError::InvalidTransition { .. } | BridgeError::Internal(_) => {
                ErrorKind::Internal
            }
        }
    }

    /// Second-factor API unreachable (timeout or connection failure)
    pub fn is_api_unreachable(&self) -> bool {
        matches!(self, BridgeError::SecondFactorTransport(e) if e.is_unreachable())
    }

    /// Directory refused the credential presented in a bind
    pub fn is_bind_rejected(&self) -> bool {
        match self {
            BridgeError::InvalidCredentials => true,
            BridgeError::Directory(e) => e.kind() == ErrorKind::Unauthorized,
            _ => false,
        }
    }

    /// Convert to AppError
    pub fn to_app_error(&self) -> AppError {
        AppError::new(self.kind(), self.to_string())
    }

    /// Reply text safe to put in a protocol response
    pub fn reply_message(&self) -> &'static str {
        GENERIC_REJECT_MESSAGE
    }

    /// Log the error with appropriate level
    pub fn log(&self) {
        match self {
            BridgeError::Directory(e) => {
                tracing::error!(error = %e, kind = %e.kind(), "Directory error");
            }
            BridgeError::SecondFactorTransport(e) => {
                tracing::error!(error = %e, kind = %e.kind(), "Second-factor API unreachable");
            }
            BridgeError::ForestUnavailable {
                root_domain,
                source,
            } => {
                tracing::error!(root_domain = %root_domain, error = %source, "Forest metadata unavailable");
            }
            BridgeError::Configuration(msg) => {
                tracing::error!(message = %msg, "Bridge configuration error");
            }
            BridgeError::InvalidTransition { from, to } => {
                tracing::error!(from = %from, to = %to, "Invalid login attempt transition");
            }
            BridgeError::Internal(msg) => {
                tracing::error!(message = %msg, "Bridge internal error");
            }
            BridgeError::InvalidCredentials => {
                tracing::warn!("Invalid first-factor credentials");
            }
            BridgeError::UnknownClient(name) => {
                tracing::warn!(client = %name, "Request from unknown client");
            }
            BridgeError::SecondFactorApi(msg) => {
                tracing::warn!(message = %msg, "Second-factor API refused the request");
            }
            BridgeError::InvalidInput(_) => {
                tracing::debug!(error = %self, "Bridge input error");
            }
        }
    }
}

impl From<AppError> for BridgeError {
    fn from(err: AppError) -> Self {
        match err.kind() {
            ErrorKind::Configuration => BridgeError::Configuration(err.to_string()),
            ErrorKind::InvalidInput => BridgeError::InvalidInput(err.message().to_string()),
            _ => BridgeError::Internal(err.to_string()),
        }
    }
}

impl From<ldap3::LdapError> for BridgeError {
    fn from(err: ldap3::LdapError) -> Self {
        BridgeError::Directory(AppError::from(err))
    }
}

impl From<reqwest::Error> for BridgeError {
    fn from(err: reqwest::Error) -> Self {
        BridgeError::SecondFactorTransport(AppError::from(err))
    }
}
