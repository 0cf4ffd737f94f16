//! Correlation ID Value Object
//!
//! Ties every packet and log line of one login attempt together.
//! Rendered as `{client_name}-{counter}` and echoed back by the transport
//! in the protocol `State` attribute of follow-up packets.

use derive_more::Display;
use kernel::error::app_error::{AppError, AppResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[display("{_0}")]
pub struct CorrelationId(String);

impl CorrelationId {
    pub fn new(client_name: &str, counter: u64) -> Self {
        Self(format!("{}-{}", client_name, counter))
    }

    /// Rebuild from the state value echoed by the transport
    pub fn from_state(state: &str) -> AppResult<Self> {
        let state = state.trim();
        match state.rsplit_once('-') {
            Some((client, counter))
                if !client.is_empty() && counter.parse::<u64>().is_ok() =>
            {
                Ok(Self(state.to_string()))
            }
            _ => Err(AppError::invalid_input(format!(
                "'{}' is not a correlation id",
                state
            ))),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Client name embedded in the id
    pub fn client_name(&self) -> &str {
        self.0.rsplit_once('-').map_or(&self.0, |(client, _)| client)
    }
}

impl AsRef<str> for CorrelationId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
