//! In-memory challenge store
//!
//! Pending challenges only live as long as the process; a restart drops
//! every open dialogue and the follow-up packets get rejected.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::domain::entity::login_challenge::LoginChallenge;
use crate::domain::repository::ChallengeStore;
use crate::domain::value_object::correlation_id::CorrelationId;
use crate::error::BridgeResult;

#[derive(Debug, Default)]
pub struct InMemoryChallengeStore {
    records: RwLock<HashMap<CorrelationId, LoginChallenge>>,
}

impl InMemoryChallengeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

impl ChallengeStore for InMemoryChallengeStore {
    async fn put(&self, challenge: LoginChallenge) -> BridgeResult<()> {
        self.records
            .write()
            .await
            .insert(challenge.correlation_id.clone(), challenge);
        Ok(())
    }

    async fn get(&self, correlation_id: &CorrelationId) -> BridgeResult<Option<LoginChallenge>> {
        Ok(self.records.read().await.get(correlation_id).cloned())
    }

    async fn remove(
        &self,
        correlation_id: &CorrelationId,
    ) -> BridgeResult<Option<LoginChallenge>> {
        Ok(self.records.write().await.remove(correlation_id))
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> BridgeResult<u64> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|_, challenge| !challenge.is_expired(now));
        Ok((before - records.len()) as u64)
    }
}
