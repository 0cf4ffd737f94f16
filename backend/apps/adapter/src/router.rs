//! Access request ingress
//!
//! JSON stand-in for the packet transport: one decoded access request in,
//! one protocol response out. Always answers 200; the verdict is in `code`.

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use bridge::domain::repository::{ChallengeStore, Directory, SecondFactorApi};
use bridge::presentation::{AccessRequest, AccessRequestHandler, ProtocolResponse};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

/// Request for POST /access-request
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessRequestDto {
    pub client: String,
    pub user_name: String,
    pub password: String,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub calling_station_id: Option<String>,
    #[serde(default)]
    pub called_station_id: Option<String>,
    #[serde(default)]
    pub remote_host: Option<String>,
}

impl From<AccessRequestDto> for AccessRequest {
    fn from(dto: AccessRequestDto) -> Self {
        Self {
            client_name: dto.client,
            user_name: dto.user_name,
            password: SecretString::from(dto.password),
            state: dto.state,
            calling_station_id: dto.calling_station_id,
            called_station_id: dto.called_station_id,
            remote_host: dto.remote_host,
        }
    }
}

/// Response for POST /access-request
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolResponseDto {
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

impl From<ProtocolResponse> for ProtocolResponseDto {
    fn from(response: ProtocolResponse) -> Self {
        Self {
            code: response.code.to_string(),
            reply_message: response.reply_message,
            state: response.state,
        }
    }
}

pub fn bridge_router<D, A, S>(handler: AccessRequestHandler<D, A, S>) -> Router
where
    D: Directory + Send + Sync + 'static,
    A: SecondFactorApi + Send + Sync + 'static,
    S: ChallengeStore + Send + Sync + 'static,
{
    Router::new()
        .route("/access-request", post(access_request::<D, A, S>))
        .route("/health", get(health))
        .with_state(handler)
}

/// POST /access-request
async fn access_request<D, A, S>(
    State(handler): State<AccessRequestHandler<D, A, S>>,
    Json(req): Json<AccessRequestDto>,
) -> Json<ProtocolResponseDto>
where
    D: Directory + Send + Sync + 'static,
    A: SecondFactorApi + Send + Sync + 'static,
    S: ChallengeStore + Send + Sync + 'static,
{
    let response = handler.handle(req.into()).await;
    Json(response.into())
}

/// GET /health
async fn health() -> &'static str {
    "ok"
}
