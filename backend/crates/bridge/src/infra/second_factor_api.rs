//! Second-factor API adapter
//!
//! JSON over HTTPS with basic auth (client API key and secret).
//! Every reply arrives in a `{Success, Message, Model}` envelope.

use reqwest::StatusCode;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use crate::domain::entity::second_factor::{
    AccessRequestPayload, ApiCredential, ApiResponse, ApiStatus, ChallengeAnswer,
};
use crate::domain::repository::SecondFactorApi;
use crate::error::{BridgeError, BridgeResult};

const CREATE_PATH: &str = "access/requests/ra";
const CHALLENGE_PATH: &str = "access/requests/ra/challenge";

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct CreateRequestDto<'a> {
    identity: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    phone: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    passcode: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    calling_station_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    called_station_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    remote_host: Option<&'a str>,
    capabilities: &'a [String],
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    sign_up_groups: &'a [String],
}

impl<'a> From<&'a AccessRequestPayload> for CreateRequestDto<'a> {
    fn from(p: &'a AccessRequestPayload) -> Self {
        Self {
            identity: &p.identity,
            name: p.display_name.as_deref(),
            email: p.email.as_deref(),
            phone: p.phone.as_deref(),
            passcode: p.passcode.as_ref().map(|c| c.expose_secret()),
            calling_station_id: p.calling_station_id.as_deref(),
            called_station_id: p.called_station_id.as_deref(),
            remote_host: p.remote_host.as_deref(),
            capabilities: &p.capabilities,
            sign_up_groups: &p.sign_up_groups,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct ChallengeRequestDto<'a> {
    identity: &'a str,
    challenge: &'a str,
    request_id: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct EnvelopeDto {
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    model: Option<AccessRequestDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AccessRequestDto {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    identity: Option<String>,
    status: String,
    #[serde(default)]
    reply_message: Option<String>,
    #[serde(default)]
    bypassed: bool,
}

impl AccessRequestDto {
    fn into_response(self, fallback_identity: &str) -> BridgeResult<ApiResponse> {
        let status = match self.status.to_ascii_lowercase().as_str() {
            "granted" => ApiStatus::Granted,
            "denied" => ApiStatus::Denied,
            "awaitingauthentication" => ApiStatus::Challenge,
            "bypassed" => ApiStatus::Bypassed,
            other => {
                return Err(BridgeError::SecondFactorApi(format!(
                    "unknown request status '{}'",
                    other
                )));
            }
        };

        Ok(ApiResponse {
            identity: self
                .identity
                .filter(|i| !i.is_empty())
                .unwrap_or_else(|| fallback_identity.to_string()),
            status,
            challenge_request_id: self.id,
            reply_message: self.reply_message,
            bypassed: self.bypassed,
        })
    }
}

pub struct HttpSecondFactorApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSecondFactorApi {
    /// `client` is shared; build it with `platform::http::build_client`
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn post<B: Serialize + ?Sized>(
        &self,
        credential: &ApiCredential,
        path: &str,
        body: &B,
        identity: &str,
    ) -> BridgeResult<ApiResponse> {
        let response = self
            .client
            .post(self.url(path))
            .basic_auth(&credential.key, Some(credential.secret.expose_secret()))
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(BridgeError::SecondFactorApi(format!(
                "API credentials rejected ({})",
                status
            )));
        }
        let response = response.error_for_status()?;

        let envelope: EnvelopeDto = response.json().await?;
        parse_envelope(envelope, identity)
    }
}

fn parse_envelope(envelope: EnvelopeDto, identity: &str) -> BridgeResult<ApiResponse> {
    if !envelope.success {
        return Err(BridgeError::SecondFactorApi(
            envelope
                .message
                .unwrap_or_else(|| "request was not successful".to_string()),
        ));
    }
    envelope
        .model
        .ok_or_else(|| BridgeError::SecondFactorApi("response without a model".to_string()))?
        .into_response(identity)
}

impl SecondFactorApi for HttpSecondFactorApi {
    async fn create_request(
        &self,
        credential: &ApiCredential,
        payload: &AccessRequestPayload,
    ) -> BridgeResult<ApiResponse> {
        let body = CreateRequestDto::from(payload);
        self.post(credential, CREATE_PATH, &body, &payload.identity)
            .await
    }

    async fn continue_challenge(
        &self,
        credential: &ApiCredential,
        answer: &ChallengeAnswer,
    ) -> BridgeResult<ApiResponse> {
        let body = ChallengeRequestDto {
            identity: &answer.identity,
            challenge: answer.answer.expose_secret(),
            request_id: &answer.request_id,
        };
        self.post(credential, CHALLENGE_PATH, &body, &answer.identity)
            .await
    }
}
