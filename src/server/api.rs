use crate::conversation::ConversationService;
use crate::history::StorageError;
use crate::models::chat::{ ChatMessage, PromptRequest, PromptResponse };
use std::sync::Arc;
use axum::{
    routing::{ delete, get, post },
    Router,
    Json,
    extract::{ FromRequestParts, Path, State },
    response::{ IntoResponse, Response },
    http::{ header::InvalidHeaderName, request::Parts, HeaderName, StatusCode },
};
use serde_json::json;
use tower_http::cors::{ Any, CorsLayer };
use log::{ error, warn };

pub const API_KEY_HEADER: &str = "x-api-key";

#[derive(Clone)]
pub struct AppState {
    service: Arc<ConversationService>,
    identity_header: HeaderName,
    api_key: Option<String>,
}

impl AppState {
    pub fn new(
        service: Arc<ConversationService>,
        identity_header: &str,
        api_key: Option<String>
    ) -> Result<Self, InvalidHeaderName> {
        Ok(Self {
            service,
            identity_header: HeaderName::try_from(identity_header)?,
            api_key: api_key.filter(|k| !k.is_empty()),
        })
    }
}

#[derive(Debug)]
pub enum ApiError {
    Unauthorized(&'static str),
    Storage(StorageError),
}

impl From<StorageError> for ApiError {
    fn from(e: StorageError) -> Self {
        ApiError::Storage(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Unauthorized(reason) => {
                (StatusCode::UNAUTHORIZED, Json(json!({ "error": reason }))).into_response()
            }
            ApiError::Storage(e) => {
                error!("{}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": e.to_string() }))).into_response()
            }
        }
    }
}

/// Caller identity as verified by the gateway in front of this service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser(pub String);

impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(expected) = &state.api_key {
            let provided = parts.headers.get(API_KEY_HEADER).and_then(|v| v.to_str().ok());
            if provided != Some(expected.as_str()) {
                warn!("Rejected request to {} with missing or wrong API key", parts.uri.path());
                return Err(ApiError::Unauthorized("invalid API key"));
            }
        }

        parts.headers
            .get(&state.identity_header)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|user| !user.is_empty())
            .map(|user| AuthenticatedUser(user.to_string()))
            .ok_or(ApiError::Unauthorized("missing caller identity"))
    }
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/prompt", post(prompt_handler))
        .route("/api/history", get(history_handler))
        .route("/api/history/{created_at}", delete(delete_history_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .with_state(state)
}

async fn prompt_handler(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Json(req): Json<PromptRequest>
) -> Result<Json<PromptResponse>, ApiError> {
    let prompt = req.prompt.unwrap_or_default();
    let response = state.service.answer(&user_id, &prompt).await?;
    Ok(Json(PromptResponse { response }))
}

async fn history_handler(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser
) -> Result<Json<Vec<ChatMessage>>, ApiError> {
    Ok(Json(state.service.history(&user_id).await?))
}

async fn delete_history_handler(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Path(created_at): Path<i64>
) -> Result<StatusCode, ApiError> {
    state.service.delete_entry(&user_id, created_at).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn health_handler() -> impl IntoResponse {
    Json(json!({ "status": "UP" }))
}
