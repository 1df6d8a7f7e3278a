//! HTTP API driving a game session.
//!
//! Every state-changing endpoint answers with the updated [`SessionView`] so
//! clients can simply re-render.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::auth::{self, AuthConfig};
use crate::error::GameError;
use crate::gateway::{ContentGateway, GatewayRequest, GatewayResponse, MISSING_INPUT_ERROR};
use crate::session::{GameSession, SessionView};
use crate::types::{IntensityPreference, Provider};

/// Error body returned by the API
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub msg: String,
    /// Whether repeating the same request may succeed
    pub retryable: bool,
}

/// A [`GameError`] rendered as an HTTP response
#[derive(Debug)]
pub struct ApiError(pub GameError);

impl From<GameError> for ApiError {
    fn from(e: GameError) -> Self {
        Self(e)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            GameError::MissingCredential(_)
            | GameError::InsufficientRoster(_)
            | GameError::InvalidPlayerName => StatusCode::BAD_REQUEST,
            GameError::PlayerNotFound(_) | GameError::TopicNotOffered(_) => StatusCode::NOT_FOUND,
            GameError::RosterLocked
            | GameError::InvalidTransition { .. }
            | GameError::RequestInFlight
            | GameError::RoundEnded => StatusCode::CONFLICT,
            GameError::GatewayFailure(_) | GameError::ResponseFormat { .. } => {
                StatusCode::BAD_GATEWAY
            }
            GameError::Exhausted => StatusCode::SERVICE_UNAVAILABLE,
            GameError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            code: self.0.code(),
            msg: self.0.user_message(),
            retryable: self.0.is_retryable(),
        };
        (self.status(), Json(body)).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

#[derive(Debug, Deserialize)]
pub struct NewPlayer {
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct SettingsUpdate {
    pub provider: Option<Provider>,
    #[serde(alias = "apiKey")]
    pub credential: Option<String>,
    pub preference: Option<IntensityPreference>,
}

#[derive(Debug, Deserialize)]
pub struct TopicPick {
    pub index: usize,
}

/// Build the API router. Basic auth applies to every route when enabled.
pub fn router(session: GameSession, auth_config: Arc<AuthConfig>) -> Router {
    Router::new()
        .route("/api/game", get(get_game))
        .route("/api/roster", post(add_player))
        .route("/api/roster/{index}", delete(remove_player))
        .route("/api/settings", put(update_settings))
        .route("/api/game/start", post(start_game))
        .route("/api/game/end", post(end_game))
        .route("/api/round/topics", post(fetch_topics))
        .route("/api/round/topic", post(choose_topic))
        .route("/api/round/next", post(next_round))
        .route("/api/generate", post(generate))
        .layer(middleware::from_fn_with_state(
            auth_config,
            auth::basic_auth_middleware,
        ))
        .with_state(session)
}

/// GET /api/game
pub async fn get_game(State(session): State<GameSession>) -> Json<SessionView> {
    Json(session.view().await)
}

/// POST /api/roster
pub async fn add_player(
    State(session): State<GameSession>,
    Json(body): Json<NewPlayer>,
) -> ApiResult<SessionView> {
    session.add_player(&body.name).await?;
    Ok(Json(session.view().await))
}

/// DELETE /api/roster/{index}
pub async fn remove_player(
    State(session): State<GameSession>,
    Path(index): Path<usize>,
) -> ApiResult<SessionView> {
    session.remove_player(index).await?;
    Ok(Json(session.view().await))
}

/// PUT /api/settings
///
/// Provider is applied before the credential, so a key sent together with a
/// provider belongs to that provider.
pub async fn update_settings(
    State(session): State<GameSession>,
    Json(body): Json<SettingsUpdate>,
) -> Json<SessionView> {
    if let Some(provider) = body.provider {
        session.set_provider(provider).await;
    }
    if let Some(credential) = body.credential {
        session.set_credential(&credential).await;
    }
    if let Some(preference) = body.preference {
        session.set_preference(preference).await;
    }
    Json(session.view().await)
}

/// POST /api/game/start
pub async fn start_game(State(session): State<GameSession>) -> ApiResult<SessionView> {
    session.start_game().await?;
    Ok(Json(session.view().await))
}

/// POST /api/game/end
pub async fn end_game(State(session): State<GameSession>) -> Json<SessionView> {
    session.end_game().await;
    Json(session.view().await)
}

/// POST /api/round/topics
pub async fn fetch_topics(State(session): State<GameSession>) -> ApiResult<SessionView> {
    session.fetch_topics().await?;
    Ok(Json(session.view().await))
}

/// POST /api/round/topic
pub async fn choose_topic(
    State(session): State<GameSession>,
    Json(body): Json<TopicPick>,
) -> ApiResult<SessionView> {
    session.choose_topic(body.index).await?;
    Ok(Json(session.view().await))
}

/// POST /api/round/next
pub async fn next_round(State(session): State<GameSession>) -> ApiResult<SessionView> {
    session.next_round().await?;
    Ok(Json(session.view().await))
}

/// Raw gateway proxy.
///
/// POST /api/generate
///
/// 400 when credential or prompt is missing, 500 when the provider fails.
pub async fn generate(
    State(session): State<GameSession>,
    Json(request): Json<GatewayRequest>,
) -> (StatusCode, Json<GatewayResponse>) {
    if request.credential.trim().is_empty() || request.prompt.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(GatewayResponse::failed(MISSING_INPUT_ERROR)),
        );
    }

    let response = session.gateway().generate(request).await;
    let status = if response.success {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, Json(response))
}
