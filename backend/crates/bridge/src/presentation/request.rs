//! Parsed access request
//!
//! What the transport hands over after decoding a protocol packet.

use secrecy::SecretString;

use crate::application::orchestrator::{AttemptInput, ContinuationInput};

#[derive(Debug, Clone)]
pub struct AccessRequest {
    /// Client the packet arrived for
    pub client_name: String,
    pub user_name: String,
    /// Password on the first packet, challenge answer on follow-ups
    pub password: SecretString,
    /// Echoed state; present only on follow-up packets
    pub state: Option<String>,
    pub calling_station_id: Option<String>,
    pub called_station_id: Option<String>,
    pub remote_host: Option<String>,
}

impl AccessRequest {
    pub fn new(
        client_name: impl Into<String>,
        user_name: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            client_name: client_name.into(),
            user_name: user_name.into(),
            password: SecretString::from(password.into()),
            state: None,
            calling_station_id: None,
            called_station_id: None,
            remote_host: None,
        }
    }

    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    pub fn with_remote_host(mut self, remote_host: impl Into<String>) -> Self {
        self.remote_host = Some(remote_host.into());
        self
    }

    /// Echoed state, ignoring blank values
    pub fn continuation_state(&self) -> Option<&str> {
        self.state.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    pub(crate) fn into_attempt(self) -> AttemptInput {
        AttemptInput {
            user_name: self.user_name,
            password: self.password,
            calling_station_id: self.calling_station_id,
            called_station_id: self.called_station_id,
            remote_host: self.remote_host,
        }
    }

    pub(crate) fn into_continuation(self) -> ContinuationInput {
        ContinuationInput {
            user_name: self.user_name,
            answer: self.password,
        }
    }
}
