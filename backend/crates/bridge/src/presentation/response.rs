//! Protocol response

use derive_more::Display;

use crate::application::orchestrator::AttemptOutcome;
use crate::domain::entity::login_attempt::AttemptState;
use crate::error::GENERIC_REJECT_MESSAGE;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ResponseCode {
    #[display("accept")]
    Accept,
    #[display("reject")]
    Reject,
    #[display("challenge")]
    Challenge,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolResponse {
    pub code: ResponseCode,
    pub reply_message: Option<String>,
    /// Correlation state for the transport to echo back; set on Challenge
    pub state: Option<String>,
}

impl ProtocolResponse {
    pub fn accept(reply_message: Option<String>) -> Self {
        Self {
            code: ResponseCode::Accept,
            reply_message,
            state: None,
        }
    }

    pub fn reject(reply_message: Option<String>) -> Self {
        Self {
            code: ResponseCode::Reject,
            reply_message: Some(reply_message.unwrap_or_else(|| GENERIC_REJECT_MESSAGE.into())),
            state: None,
        }
    }

    /// Reject carrying only the generic message
    pub fn generic_reject() -> Self {
        Self::reject(None)
    }
}

impl From<AttemptOutcome> for ProtocolResponse {
    fn from(outcome: AttemptOutcome) -> Self {
        match outcome.state {
            AttemptState::Granted => Self::accept(outcome.reply_message),
            AttemptState::AwaitingChallenge => Self {
                code: ResponseCode::Challenge,
                reply_message: outcome.reply_message,
                state: Some(outcome.correlation_id.to_string()),
            },
            // Denied, Expired and anything left mid-flight
            _ => Self::reject(outcome.reply_message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_object::correlation_id::CorrelationId;

    fn outcome(state: AttemptState, reply: Option<&str>) -> AttemptOutcome {
        AttemptOutcome {
            correlation_id: CorrelationId::new("vpn", 7),
            state,
            reply_message: reply.map(str::to_string),
        }
    }

    #[test]
    fn test_challenge_carries_state() {
        let response = ProtocolResponse::from(outcome(
            AttemptState::AwaitingChallenge,
            Some("Enter code"),
        ));
        assert_eq!(response.code, ResponseCode::Challenge);
        assert_eq!(response.state.as_deref(), Some("vpn-7"));
        assert_eq!(response.reply_message.as_deref(), Some("Enter code"));
    }

    #[test]
    fn test_expired_and_denied_reject() {
        for state in [AttemptState::Expired, AttemptState::Denied] {
            let response = ProtocolResponse::from(outcome(state, None));
            assert_eq!(response.code, ResponseCode::Reject);
            assert_eq!(response.reply_message.as_deref(), Some(GENERIC_REJECT_MESSAGE));
            assert_eq!(response.state, None);
        }
    }

    #[test]
    fn test_granted_accepts() {
        let response = ProtocolResponse::from(outcome(AttemptState::Granted, None));
        assert_eq!(response.code, ResponseCode::Accept);
        assert_eq!(response.reply_message, None);
        assert_eq!(response.code.to_string(), "accept");
    }
}
