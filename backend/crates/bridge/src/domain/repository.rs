//! Collaborator Traits
//!
//! Interfaces to the directory, the second-factor API and the pending
//! challenge store. Implementations live in the infrastructure layer.

use chrono::{DateTime, Utc};

use crate::domain::entity::{
    directory_entry::DirectoryEntry,
    login_challenge::LoginChallenge,
    second_factor::{AccessRequestPayload, ApiCredential, ApiResponse, ChallengeAnswer},
};
use crate::domain::value_object::{
    correlation_id::CorrelationId,
    directory_credential::{DirectoryCredential, DirectoryQuery},
};
use crate::error::BridgeResult;

/// Directory service
#[trait_variant::make(Directory: Send)]
pub trait LocalDirectory {
    /// Authenticate with `credential`; rejected credentials are an error
    async fn bind(&self, credential: &DirectoryCredential) -> BridgeResult<()>;

    /// Bind with `credential`, then run a subtree search
    ///
    /// An empty result is `Ok(vec![])`, never an error.
    async fn search(
        &self,
        credential: &DirectoryCredential,
        query: &DirectoryQuery,
    ) -> BridgeResult<Vec<DirectoryEntry>>;
}

/// External second-factor API
#[trait_variant::make(SecondFactorApi: Send)]
pub trait LocalSecondFactorApi {
    /// Open a new dialogue
    async fn create_request(
        &self,
        credential: &ApiCredential,
        payload: &AccessRequestPayload,
    ) -> BridgeResult<ApiResponse>;

    /// Answer the pending challenge of a dialogue
    async fn continue_challenge(
        &self,
        credential: &ApiCredential,
        answer: &ChallengeAnswer,
    ) -> BridgeResult<ApiResponse>;
}

/// Pending challenges keyed by correlation id
#[trait_variant::make(ChallengeStore: Send)]
pub trait LocalChallengeStore {
    /// Insert or replace
    async fn put(&self, challenge: LoginChallenge) -> BridgeResult<()>;

    async fn get(&self, correlation_id: &CorrelationId) -> BridgeResult<Option<LoginChallenge>>;

    async fn remove(&self, correlation_id: &CorrelationId)
    -> BridgeResult<Option<LoginChallenge>>;

    /// Drop every challenge expired at `now`; returns how many were dropped
    async fn purge_expired(&self, now: DateTime<Utc>) -> BridgeResult<u64>;
}
