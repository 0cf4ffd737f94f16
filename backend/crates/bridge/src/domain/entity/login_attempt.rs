//! Login Attempt Entity
//!
//! State machine of one login attempt. Every transition goes through
//! [`LoginAttempt::advance`], which refuses edges outside the graph.

use derive_more::Display;

use crate::domain::value_object::correlation_id::CorrelationId;
use crate::error::{BridgeError, BridgeResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum AttemptState {
    #[display("start")]
    Start,
    #[display("pre_step")]
    PreStep,
    #[display("identity_resolving")]
    IdentityResolving,
    #[display("identity_resolved")]
    IdentityResolved,
    #[display("second_factor_requested")]
    SecondFactorRequested,
    #[display("awaiting_challenge")]
    AwaitingChallenge,
    #[display("granted")]
    Granted,
    #[display("denied")]
    Denied,
    #[display("expired")]
    Expired,
}

impl AttemptState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AttemptState::Granted | AttemptState::Denied | AttemptState::Expired
        )
    }

    pub fn can_transition_to(&self, next: AttemptState) -> bool {
        use AttemptState::*;

        matches!(
            (self, next),
            (Start, PreStep | IdentityResolving)
                | (PreStep, IdentityResolving | Denied)
                | (IdentityResolving, IdentityResolved | Denied)
                // group policy may settle the attempt before the API is asked
                | (IdentityResolved, SecondFactorRequested | Granted | Denied)
                | (SecondFactorRequested, Granted | Denied | AwaitingChallenge)
                | (AwaitingChallenge, Granted | Denied | AwaitingChallenge | Expired)
        )
    }
}

#[derive(Debug, Clone)]
pub struct LoginAttempt {
    correlation_id: CorrelationId,
    state: AttemptState,
    history: Vec<AttemptState>,
}

impl LoginAttempt {
    /// Fresh attempt from the first packet
    pub fn new(correlation_id: CorrelationId) -> Self {
        Self {
            correlation_id,
            state: AttemptState::Start,
            history: vec![AttemptState::Start],
        }
    }

    /// Attempt picked up again by a follow-up packet
    pub fn resume(correlation_id: CorrelationId) -> Self {
        Self {
            correlation_id,
            state: AttemptState::AwaitingChallenge,
            history: vec![AttemptState::AwaitingChallenge],
        }
    }

    pub fn advance(&mut self, next: AttemptState) -> BridgeResult<()> {
        if !self.state.can_transition_to(next) {
            return Err(BridgeError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        tracing::debug!(
            correlation_id = %self.correlation_id,
            from = %self.state,
            to = %next,
            "Login attempt transition"
        );
        self.state = next;
        self.history.push(next);
        Ok(())
    }

    pub fn state(&self) -> AttemptState {
        self.state
    }

    pub fn correlation_id(&self) -> &CorrelationId {
        &self.correlation_id
    }

    /// States visited so far, oldest first
    pub fn history(&self) -> &[AttemptState] {
        &self.history
    }
}
