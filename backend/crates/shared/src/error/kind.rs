//! Error Kind - Classification of errors
//!
//! Defines the [`ErrorKind`] enum shared by every crate in the bridge.

use serde::Serialize;

/// Error classification
///
/// Every failure in the pipeline falls into one of these buckets. The
/// bucket decides whether a client configuration may activate at all
/// (`Configuration`) and whether a second-factor outage counts as
/// "unreachable" (`Timeout` / `Upstream`).
///
/// ## Examples
/// ```rust
/// use kernel::error::kind::ErrorKind;
///
/// let kind = ErrorKind::Timeout;
/// assert!(kind.is_infrastructure());
/// assert_eq!(kind.as_str(), "Timeout");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[non_exhaustive]
pub enum ErrorKind {
    /// Invalid policy or settings value, fatal to the owning client configuration
    Configuration,
    /// Malformed value supplied by a caller (user name, one-time code)
    InvalidInput,
    /// Credentials rejected by the directory
    Unauthorized,
    /// Lookup found nothing
    NotFound,
    /// Collaborator did not answer in time
    Timeout,
    /// Collaborator unreachable or answered with a transport-level failure
    Upstream,
    /// Everything else
    Internal,
}

impl ErrorKind {
    /// Human-readable name
    ///
    /// ## Examples
    /// ```rust
    /// use kernel::error::kind::ErrorKind;
    /// assert_eq!(ErrorKind::InvalidInput.as_str(), "Invalid Input");
    /// ```
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Configuration => "Configuration",
            ErrorKind::InvalidInput => "Invalid Input",
            ErrorKind::Unauthorized => "Unauthorized",
            ErrorKind::NotFound => "Not Found",
            ErrorKind::Timeout => "Timeout",
            ErrorKind::Upstream => "Upstream",
            ErrorKind::Internal => "Internal",
        }
    }

    /// Failures caused by the network or a collaborator, not by the request.
    ///
    /// These are logged at error level.
    #[inline]
    pub const fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            ErrorKind::Timeout | ErrorKind::Upstream | ErrorKind::Internal
        )
    }

    /// Collaborator could not be reached or did not answer.
    #[inline]
    pub const fn is_unreachable(&self) -> bool {
        matches!(self, ErrorKind::Timeout | ErrorKind::Upstream)
    }

    /// Configuration errors prevent a client from activating.
    #[inline]
    pub const fn is_configuration(&self) -> bool {
        matches!(self, ErrorKind::Configuration)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
