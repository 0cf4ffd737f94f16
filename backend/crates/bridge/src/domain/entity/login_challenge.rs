//! Login Challenge Entity
//!
//! A second-factor dialogue waiting for the next protocol packet.
//! Keyed by correlation id in the challenge store.

use chrono::{DateTime, Duration, Utc};

use crate::domain::value_object::{correlation_id::CorrelationId, identity::Identity};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginChallenge {
    pub correlation_id: CorrelationId,
    /// Request id issued by the second-factor API
    pub request_id: String,
    pub identity: Identity,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl LoginChallenge {
    /// TTL is provided by the client configuration
    pub fn new(
        correlation_id: CorrelationId,
        request_id: impl Into<String>,
        identity: Identity,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        Self {
            correlation_id,
            request_id: request_id.into(),
            identity,
            created_at: now,
            expires_at: now + ttl,
        }
    }

    /// Age strictly greater than the TTL
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.created_at
    }

    /// Replace the request id after another challenge round
    ///
    /// The dialogue gets a fresh TTL window.
    pub fn renew(&mut self, request_id: impl Into<String>, now: DateTime<Utc>, ttl: Duration) {
        self.request_id = request_id.into();
        self.created_at = now;
        self.expires_at = now + ttl;
    }
}
