//! Second-Factor Orchestrator
//!
//! Drives one login attempt from the first packet to a terminal state:
//! optional pre-step code, identity resolution, first-factor bind and group
//! policy, then the second-factor dialogue. Follow-up packets continue a
//! pending challenge; those are serialized per correlation id.

use std::sync::Arc;

use platform::clock::Clock;
use platform::sync::KeyedLocks;
use secrecy::SecretString;

use crate::application::config::{ClientConfig, FirstFactor};
use crate::application::forest_cache::ForestCache;
use crate::application::identity_resolver::{
    DirectoryMatch, ForestScope, IdentityResolver, Resolution,
};
use crate::domain::entity::{
    directory_entry::DirectoryEntry,
    login_attempt::{AttemptState, LoginAttempt},
    login_challenge::LoginChallenge,
    second_factor::{AccessRequestPayload, ApiResponse, ApiStatus, CAPABILITIES, ChallengeAnswer},
};
use crate::domain::repository::{ChallengeStore, Directory, SecondFactorApi};
use crate::domain::value_object::{
    correlation_id::CorrelationId,
    directory_credential::DirectoryCredential,
    identity::Identity,
    otp_code::{OtpCode, SplitPassword},
    privacy_mode::PrivacyField,
};
use crate::error::{BridgeError, BridgeResult, GENERIC_REJECT_MESSAGE};

/// First packet of an attempt
#[derive(Debug, Clone)]
pub struct AttemptInput {
    pub user_name: String,
    pub password: SecretString,
    pub calling_station_id: Option<String>,
    pub called_station_id: Option<String>,
    pub remote_host: Option<String>,
}

/// Follow-up packet answering a challenge
#[derive(Debug, Clone)]
pub struct ContinuationInput {
    pub user_name: String,
    pub answer: SecretString,
}

/// Where an attempt ended up after one packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptOutcome {
    pub correlation_id: CorrelationId,
    pub state: AttemptState,
    pub reply_message: Option<String>,
}

impl AttemptOutcome {
    fn new(attempt: &LoginAttempt, reply_message: Option<String>) -> Self {
        Self {
            correlation_id: attempt.correlation_id().clone(),
            state: attempt.state(),
            reply_message,
        }
    }
}

/// Profile fields sent with the creation request
#[derive(Debug, Default)]
struct Profile {
    display_name: Option<String>,
    email: Option<String>,
    phone: Option<String>,
}

impl Profile {
    fn from_entry(entry: &DirectoryEntry, phone_attributes: &[String]) -> Self {
        Self {
            display_name: entry.first("displayName").map(str::to_string),
            email: entry.first("mail").map(str::to_string),
            phone: entry.first_of(phone_attributes).map(str::to_string),
        }
    }
}

/// Second-factor orchestration use case
pub struct SecondFactorOrchestrator<D, A, S>
where
    D: Directory,
    A: SecondFactorApi,
    S: ChallengeStore,
{
    directory: Arc<D>,
    resolver: IdentityResolver<D>,
    api: Arc<A>,
    challenges: Arc<S>,
    continuations: KeyedLocks<CorrelationId>,
    clock: Arc<dyn Clock>,
}

impl<D, A, S> SecondFactorOrchestrator<D, A, S>
where
    D: Directory + Send + Sync + 'static,
    A: SecondFactorApi + Send + Sync,
    S: ChallengeStore + Send + Sync,
{
    pub fn new(
        directory: Arc<D>,
        api: Arc<A>,
        challenges: Arc<S>,
        cache: ForestCache,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            resolver: IdentityResolver::new(directory.clone(), cache),
            directory,
            api,
            challenges,
            continuations: KeyedLocks::new(),
            clock,
        }
    }

    /// Handle the first packet of an attempt
    pub async fn start(
        &self,
        client: &ClientConfig,
        correlation_id: CorrelationId,
        input: AttemptInput,
    ) -> BridgeResult<AttemptOutcome> {
        let mut attempt = LoginAttempt::new(correlation_id);

        // Pre-step: the code rides in the password field
        let (password, passcode) = if client.pre_authn.requires_otp() {
            attempt.advance(AttemptState::PreStep)?;
            match OtpCode::split_from_password(
                &input.password,
                client.pre_authn.otp_code_length(),
                client.first_factor == FirstFactor::None,
            ) {
                Ok(SplitPassword { password, code }) => (password, Some(code)),
                Err(e) => {
                    tracing::info!(
                        correlation_id = %attempt.correlation_id(),
                        reason = %e.message(),
                        "Pre-step code rejected"
                    );
                    return deny(&mut attempt, None);
                }
            }
        } else {
            (input.password.clone(), None)
        };

        attempt.advance(AttemptState::IdentityResolving)?;
        let identity = match Identity::parse(&input.user_name) {
            Ok(identity) => identity,
            Err(e) => {
                tracing::info!(
                    correlation_id = %attempt.correlation_id(),
                    reason = %e.message(),
                    "Unusable user name"
                );
                return deny(&mut attempt, None);
            }
        };

        let found = match &client.root_domain {
            Some(root_domain) => {
                let scope = ForestScope {
                    client_name: &client.name,
                    root_domain,
                    credential: &client.directory_credential,
                };
                match self
                    .resolver
                    .find_in_forest(scope, &identity, &client.directory_attributes())
                    .await?
                {
                    Resolution::Found(found) => Some(found),
                    Resolution::NotFound { attempted } => {
                        tracing::info!(
                            correlation_id = %attempt.correlation_id(),
                            user = %client.privacy.mask(PrivacyField::Name, identity.name()),
                            attempted = ?attempted.iter().map(Identity::name).collect::<Vec<_>>(),
                            "User not found in forest"
                        );
                        return deny(&mut attempt, None);
                    }
                }
            }
            None => None,
        };
        attempt.advance(AttemptState::IdentityResolved)?;

        if client.first_factor == FirstFactor::ActiveDirectory {
            let Some(found) = &found else {
                return Err(BridgeError::Configuration(format!(
                    "Client '{}': directory first factor without a root domain",
                    client.name
                )));
            };
            if let Some(outcome) = self.verify_first_factor(&mut attempt, found, password).await? {
                return Ok(outcome);
            }
        }

        if let Some(found) = &found {
            if let Some(outcome) = apply_group_policy(&mut attempt, client, &found.entry)? {
                return Ok(outcome);
            }
        }

        let profile = found
            .as_ref()
            .map(|f| Profile::from_entry(&f.entry, &client.phone_attributes))
            .unwrap_or_default();

        let payload = AccessRequestPayload {
            identity: identity.name().to_string(),
            display_name: client.privacy.filter(PrivacyField::Name, profile.display_name),
            email: client.privacy.filter(PrivacyField::Email, profile.email),
            phone: client.privacy.filter(PrivacyField::Phone, profile.phone),
            passcode: passcode.map(|code| code.as_secret().clone()),
            calling_station_id: input.calling_station_id,
            called_station_id: input.called_station_id,
            remote_host: client.privacy.filter(PrivacyField::RemoteHost, input.remote_host),
            capabilities: CAPABILITIES.iter().map(|c| c.to_string()).collect(),
            sign_up_groups: client.sign_up_groups.clone(),
        };

        attempt.advance(AttemptState::SecondFactorRequested)?;
        let response = self
            .api
            .create_request(&client.api_credential, &payload)
            .await;

        self.apply_response(&mut attempt, client, &identity, None, response)
            .await
    }

    /// Handle a follow-up packet for a pending challenge
    pub async fn continue_attempt(
        &self,
        client: &ClientConfig,
        correlation_id: CorrelationId,
        input: ContinuationInput,
    ) -> BridgeResult<AttemptOutcome> {
        let _guard = self.continuations.lock(&correlation_id).await;
        let mut attempt = LoginAttempt::resume(correlation_id);

        let Some(challenge) = self.challenges.get(attempt.correlation_id()).await? else {
            tracing::info!(
                correlation_id = %attempt.correlation_id(),
                "No pending challenge for follow-up packet"
            );
            return deny(&mut attempt, None);
        };

        let now = self.clock.now();
        if challenge.is_expired(now) {
            self.challenges.remove(attempt.correlation_id()).await?;
            attempt.advance(AttemptState::Expired)?;
            tracing::info!(
                correlation_id = %attempt.correlation_id(),
                age_secs = challenge.age(now).num_seconds(),
                "Challenge expired"
            );
            return Ok(AttemptOutcome::new(
                &attempt,
                Some(GENERIC_REJECT_MESSAGE.to_string()),
            ));
        }

        let same_user = Identity::parse(&input.user_name)
            .map(|presented| presented.name().eq_ignore_ascii_case(challenge.identity.name()))
            .unwrap_or(false);
        if !same_user {
            self.challenges.remove(attempt.correlation_id()).await?;
            tracing::warn!(
                correlation_id = %attempt.correlation_id(),
                user = %client.privacy.mask(PrivacyField::Name, &input.user_name),
                "Follow-up packet names a different user"
            );
            return deny(&mut attempt, None);
        }

        let answer = ChallengeAnswer {
            identity: challenge.identity.name().to_string(),
            answer: input.answer,
            request_id: challenge.request_id.clone(),
        };
        let response = self
            .api
            .continue_challenge(&client.api_credential, &answer)
            .await;

        let identity = challenge.identity.clone();
        let outcome = self
            .apply_response(&mut attempt, client, &identity, Some(challenge), response)
            .await?;
        if outcome.state.is_terminal() {
            self.challenges.remove(attempt.correlation_id()).await?;
        }
        Ok(outcome)
    }

    /// Load the client's forest schema ahead of the first login
    ///
    /// Returns the number of domains found; clients without a root domain
    /// have nothing to load.
    pub async fn warm_up(&self, client: &ClientConfig) -> BridgeResult<usize> {
        let Some(root_domain) = &client.root_domain else {
            return Ok(0);
        };
        let schema = self
            .resolver
            .forest(ForestScope {
                client_name: &client.name,
                root_domain,
                credential: &client.directory_credential,
            })
            .await?;
        Ok(schema.partitions().len())
    }

    /// Drop expired challenges; returns how many were removed
    pub async fn purge_expired(&self) -> BridgeResult<u64> {
        self.challenges.purge_expired(self.clock.now()).await
    }

    async fn verify_first_factor(
        &self,
        attempt: &mut LoginAttempt,
        found: &DirectoryMatch,
        password: SecretString,
    ) -> BridgeResult<Option<AttemptOutcome>> {
        let credential = DirectoryCredential::explicit(found.entry.dn(), password);
        match self.directory.bind(&credential).await {
            Ok(()) => Ok(None),
            Err(e) if e.is_bind_rejected() => {
                BridgeError::InvalidCredentials.log();
                tracing::debug!(correlation_id = %attempt.correlation_id(), error = %e, "Bind rejected");
                deny(attempt, None).map(Some)
            }
            Err(e) => Err(e),
        }
    }

    /// Map an API answer onto the attempt
    ///
    /// `pending` is the challenge being answered. A first packet passes
    /// `None`, so a Challenge always stores a new record and overwrites
    /// whatever sat under the same correlation id.
    async fn apply_response(
        &self,
        attempt: &mut LoginAttempt,
        client: &ClientConfig,
        identity: &Identity,
        pending: Option<LoginChallenge>,
        response: BridgeResult<ApiResponse>,
    ) -> BridgeResult<AttemptOutcome> {
        let response = match response {
            Ok(response) => response,
            Err(e) if client.bypass_when_api_unreachable && e.is_api_unreachable() => {
                tracing::warn!(
                    correlation_id = %attempt.correlation_id(),
                    error = %e,
                    "Second-factor API unreachable; bypass enabled, granting access"
                );
                attempt.advance(AttemptState::Granted)?;
                return Ok(AttemptOutcome::new(attempt, None));
            }
            Err(e) => {
                e.log();
                return deny(attempt, None);
            }
        };

        if response.bypassed {
            tracing::info!(
                correlation_id = %attempt.correlation_id(),
                status = %response.status,
                "Second factor bypassed"
            );
            attempt.advance(AttemptState::Granted)?;
            return Ok(AttemptOutcome::new(attempt, response.reply_message));
        }

        match response.status {
            ApiStatus::Granted | ApiStatus::Bypassed => {
                attempt.advance(AttemptState::Granted)?;
                Ok(AttemptOutcome::new(attempt, response.reply_message))
            }
            ApiStatus::Denied => deny(attempt, response.reply_message),
            ApiStatus::Challenge => {
                let Some(request_id) = response.challenge_request_id.filter(|id| !id.is_empty())
                else {
                    BridgeError::SecondFactorApi("challenge without a request id".into()).log();
                    return deny(attempt, None);
                };

                let now = self.clock.now();
                let challenge = match pending {
                    Some(mut pending) => {
                        pending.renew(request_id, now, client.challenge_ttl);
                        pending
                    }
                    None => LoginChallenge::new(
                        attempt.correlation_id().clone(),
                        request_id,
                        identity.clone(),
                        now,
                        client.challenge_ttl,
                    ),
                };
                self.challenges.put(challenge).await?;

                attempt.advance(AttemptState::AwaitingChallenge)?;
                Ok(AttemptOutcome::new(attempt, response.reply_message))
            }
        }
    }
}

/// Group policy after the first factor
///
/// Access groups gate everyone; bypass groups and users outside the
/// second-factor groups skip the API.
fn apply_group_policy(
    attempt: &mut LoginAttempt,
    client: &ClientConfig,
    entry: &DirectoryEntry,
) -> BridgeResult<Option<AttemptOutcome>> {
    if !client.access_groups.is_empty() && !entry.is_member_of_any(&client.access_groups) {
        tracing::warn!(
            correlation_id = %attempt.correlation_id(),
            "User is not a member of any access group"
        );
        return deny(attempt, None).map(Some);
    }

    if entry.is_member_of_any(&client.bypass_groups) {
        tracing::info!(
            correlation_id = %attempt.correlation_id(),
            "User is in a bypass group; second factor skipped"
        );
        attempt.advance(AttemptState::Granted)?;
        return Ok(Some(AttemptOutcome::new(attempt, None)));
    }

    if !client.second_factor_groups.is_empty()
        && !entry.is_member_of_any(&client.second_factor_groups)
    {
        tracing::info!(
            correlation_id = %attempt.correlation_id(),
            "User is outside the second-factor groups; second factor skipped"
        );
        attempt.advance(AttemptState::Granted)?;
        return Ok(Some(AttemptOutcome::new(attempt, None)));
    }

    Ok(None)
}

fn deny(attempt: &mut LoginAttempt, reply: Option<String>) -> BridgeResult<AttemptOutcome> {
    attempt.advance(AttemptState::Denied)?;
    Ok(AttemptOutcome::new(
        attempt,
        Some(reply.unwrap_or_else(|| GENERIC_REJECT_MESSAGE.to_string())),
    ))
}
