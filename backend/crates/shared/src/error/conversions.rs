//! Error conversions - From implementations for common error types
//!
//! Provides automatic conversion from common error types to [`AppError`].

use super::app_error::AppError;

// ============================================================================
// Standard library conversions
// ============================================================================

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::TimedOut => AppError::timeout("I/O operation timed out"),
            std::io::ErrorKind::ConnectionRefused
            | std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::ConnectionAborted
            | std::io::ErrorKind::NotConnected => AppError::upstream("Connection failed"),
            _ => AppError::internal("I/O operation failed"),
        }
        .with_source(err)
    }
}

impl From<std::num::ParseIntError> for AppError {
    fn from(err: std::num::ParseIntError) -> Self {
        AppError::configuration("Invalid integer format").with_source(err)
    }
}

impl From<std::str::ParseBoolError> for AppError {
    fn from(err: std::str::ParseBoolError) -> Self {
        AppError::configuration("Invalid boolean format").with_source(err)
    }
}

// ============================================================================
// serde_json conversions
// ============================================================================

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_syntax() || err.is_data() || err.is_eof() {
            AppError::upstream(format!("Malformed JSON from collaborator: {}", err)).with_source(err)
        } else {
            AppError::internal("JSON serialization error").with_source(err)
        }
    }
}

// ============================================================================
// LDAP conversions (feature-gated)
// ============================================================================

#[cfg(feature = "ldap")]
impl From<ldap3::LdapError> for AppError {
    fn from(err: ldap3::LdapError) -> Self {
        use ldap3::LdapError;

        let app_err = match &err {
            LdapError::Timeout { .. } => AppError::timeout("Directory operation timed out"),
            LdapError::Io { .. } => AppError::upstream("Directory connection error"),
            LdapError::FilterParsing { .. } => AppError::invalid_input("Malformed directory filter"),
            LdapError::UrlParsing { .. } | LdapError::UnknownScheme { .. } => {
                AppError::configuration("Invalid directory URI")
            }
            LdapError::LdapResult { result } => {
                // https://www.rfc-editor.org/rfc/rfc4511#appendix-A
                match result.rc {
                    // invalidCredentials
                    49 => AppError::unauthorized("Directory rejected the credentials"),
                    // noSuchObject
                    32 => AppError::not_found("Directory object does not exist"),
                    // busy, unavailable, unwillingToPerform
                    51..=53 => AppError::upstream("Directory unavailable"),
                    // timeLimitExceeded
                    3 => AppError::timeout("Directory time limit exceeded"),
                    _ => AppError::internal(format!("Directory returned result code {}", result.rc)),
                }
            }
            _ => AppError::internal("Directory error"),
        };
        app_err.with_source(err)
    }
}

// ============================================================================
// HTTP client conversions (feature-gated)
// ============================================================================

#[cfg(feature = "http")]
impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        let app_err = if err.is_timeout() {
            AppError::timeout("HTTP request timed out")
        } else if err.is_connect() || err.is_request() {
            AppError::upstream("HTTP connection error")
        } else if let Some(status) = err.status() {
            if status.is_server_error() {
                AppError::upstream(format!("HTTP server error: {}", status))
            } else {
                AppError::internal(format!("HTTP client error: {}", status))
            }
        } else if err.is_decode() {
            AppError::upstream("Malformed HTTP response body")
        } else {
            AppError::internal("HTTP error")
        };
        app_err.with_source(err)
    }
}
