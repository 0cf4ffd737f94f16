//! Access request handler
//!
//! Entry point for the transport: looks up the client, assigns or recovers
//! the correlation id, runs the orchestrator and maps the outcome onto a
//! protocol response. Failures never leak past this point; they are logged
//! and answered with a generic reject.

use std::sync::Arc;

use tracing::Instrument;

use crate::application::config::{ClientConfig, ClientRegistry};
use crate::application::correlation::CorrelationTracker;
use crate::application::orchestrator::{AttemptOutcome, SecondFactorOrchestrator};
use crate::domain::repository::{ChallengeStore, Directory, SecondFactorApi};
use crate::domain::value_object::{correlation_id::CorrelationId, privacy_mode::PrivacyField};
use crate::error::{BridgeError, BridgeResult};
use crate::presentation::request::AccessRequest;
use crate::presentation::response::ProtocolResponse;

pub struct AccessRequestHandler<D, A, S>
where
    D: Directory,
    A: SecondFactorApi,
    S: ChallengeStore,
{
    clients: Arc<ClientRegistry>,
    tracker: Arc<CorrelationTracker>,
    orchestrator: Arc<SecondFactorOrchestrator<D, A, S>>,
}

impl<D, A, S> Clone for AccessRequestHandler<D, A, S>
where
    D: Directory,
    A: SecondFactorApi,
    S: ChallengeStore,
{
    fn clone(&self) -> Self {
        Self {
            clients: self.clients.clone(),
            tracker: self.tracker.clone(),
            orchestrator: self.orchestrator.clone(),
        }
    }
}

impl<D, A, S> AccessRequestHandler<D, A, S>
where
    D: Directory + Send + Sync + 'static,
    A: SecondFactorApi + Send + Sync,
    S: ChallengeStore + Send + Sync,
{
    pub fn new(
        clients: Arc<ClientRegistry>,
        tracker: Arc<CorrelationTracker>,
        orchestrator: Arc<SecondFactorOrchestrator<D, A, S>>,
    ) -> Self {
        Self {
            clients,
            tracker,
            orchestrator,
        }
    }

    pub fn orchestrator(&self) -> &Arc<SecondFactorOrchestrator<D, A, S>> {
        &self.orchestrator
    }

    pub async fn handle(&self, request: AccessRequest) -> ProtocolResponse {
        let Some(client) = self.clients.get(&request.client_name) else {
            BridgeError::UnknownClient(request.client_name.clone()).log();
            return ProtocolResponse::generic_reject();
        };

        let correlation_id = match request.continuation_state() {
            Some(state) => match correlation_for_state(&client, state) {
                Ok(id) => id,
                Err(e) => {
                    e.log();
                    return ProtocolResponse::generic_reject();
                }
            },
            None => self.tracker.create(&client.name),
        };

        let span = tracing::info_span!(
            "access_request",
            client = %client.name,
            correlation_id = %correlation_id,
        );

        async move {
            let user = client
                .privacy
                .mask(PrivacyField::Name, &request.user_name)
                .into_owned();
            let remote_host = request
                .remote_host
                .as_deref()
                .map(|h| client.privacy.mask(PrivacyField::RemoteHost, h).into_owned());

            match self.dispatch(&client, correlation_id, request).await {
                Ok(outcome) => {
                    audit(&outcome, &user, remote_host.as_deref());
                    ProtocolResponse::from(outcome)
                }
                Err(e) => {
                    e.log();
                    ProtocolResponse::reject(Some(e.reply_message().to_string()))
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn dispatch(
        &self,
        client: &ClientConfig,
        correlation_id: CorrelationId,
        request: AccessRequest,
    ) -> BridgeResult<AttemptOutcome> {
        if request.continuation_state().is_some() {
            self.orchestrator
                .continue_attempt(client, correlation_id, request.into_continuation())
                .await
        } else {
            self.orchestrator
                .start(client, correlation_id, request.into_attempt())
                .await
        }
    }
}

/// Recover the correlation id of a follow-up packet
fn correlation_for_state(client: &ClientConfig, state: &str) -> BridgeResult<CorrelationId> {
    let id = CorrelationId::from_state(state)?;
    if !id.client_name().eq_ignore_ascii_case(&client.name) {
        return Err(BridgeError::InvalidInput(format!(
            "state '{}' does not belong to client '{}'",
            id, client.name
        )));
    }
    Ok(id)
}

fn audit(outcome: &AttemptOutcome, user: &str, remote_host: Option<&str>) {
    tracing::info!(
        user = %user,
        remote_host = remote_host.unwrap_or("-"),
        state = %outcome.state,
        "Access request handled"
    );
}
