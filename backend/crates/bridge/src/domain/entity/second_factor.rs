//! Second-factor API exchange
//!
//! Requests sent to the external second-factor API and the normalized
//! response shape the orchestrator maps onto attempt states.

use derive_more::Display;
use secrecy::SecretString;

/// API key pair issued per client
#[derive(Debug, Clone)]
pub struct ApiCredential {
    pub key: String,
    pub secret: SecretString,
}

/// Capabilities advertised to the API with every creation request
pub const CAPABILITIES: &[&str] = &["inline-challenge", "reply-message"];

/// Creation request for a new second-factor dialogue
///
/// Personal fields are already filtered by the privacy policy.
#[derive(Debug, Clone, Default)]
pub struct AccessRequestPayload {
    pub identity: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    /// Pre-authentication code, if one was collected
    pub passcode: Option<SecretString>,
    pub calling_station_id: Option<String>,
    pub called_station_id: Option<String>,
    pub remote_host: Option<String>,
    pub capabilities: Vec<String>,
    /// Groups new users are enrolled into
    pub sign_up_groups: Vec<String>,
}

/// Answer to a pending challenge
#[derive(Debug, Clone)]
pub struct ChallengeAnswer {
    pub identity: String,
    pub answer: SecretString,
    pub request_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ApiStatus {
    #[display("granted")]
    Granted,
    #[display("denied")]
    Denied,
    #[display("challenge")]
    Challenge,
    #[display("bypassed")]
    Bypassed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub identity: String,
    pub status: ApiStatus,
    pub challenge_request_id: Option<String>,
    pub reply_message: Option<String>,
    /// Second factor disabled or the user is exempt
    pub bypassed: bool,
}

impl ApiResponse {
    pub fn new(identity: impl Into<String>, status: ApiStatus) -> Self {
        Self {
            identity: identity.into(),
            status,
            challenge_request_id: None,
            reply_message: None,
            bypassed: false,
        }
    }

    pub fn with_challenge(mut self, request_id: impl Into<String>) -> Self {
        self.challenge_request_id = Some(request_id.into());
        self
    }

    pub fn with_reply(mut self, message: impl Into<String>) -> Self {
        self.reply_message = Some(message.into());
        self
    }

    pub fn bypassed(mut self) -> Self {
        self.bypassed = true;
        self
    }

    /// Whether the dialogue ends here with access granted
    pub fn grants_access(&self) -> bool {
        self.bypassed || matches!(self.status, ApiStatus::Granted | ApiStatus::Bypassed)
    }
}
