// Offer/answer exchange endpoints

use crate::AppState;
use crate::session::token::redact;
use crate::session::{
    AnswerResponse, CreateSessionResponse, HandshakeError, OfferResponse,
    SubmitAnswerRequest, SubmitOfferRequest, TokenQuery,
};
use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::{debug, error, info};

/// Failure of a signaling request
#[derive(Debug)]
pub enum ApiError {
    /// `?token=` missing or empty on a polling endpoint
    MissingToken,
    Handshake(HandshakeError),
}

impl From<HandshakeError> for ApiError {
    fn from(err: HandshakeError) -> Self {
        ApiError::Handshake(err)
    }
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        let err = match self {
            ApiError::MissingToken => return StatusCode::BAD_REQUEST,
            ApiError::Handshake(err) => err,
        };

        match err {
            HandshakeError::SessionNotFound
            | HandshakeError::OfferNotFound
            | HandshakeError::AnswerNotFound => StatusCode::NOT_FOUND,
            HandshakeError::SessionExpired => StatusCode::GONE,
            HandshakeError::InvalidOffer
            | HandshakeError::InvalidAnswer
            | HandshakeError::SessionNotReady => StatusCode::BAD_REQUEST,
            HandshakeError::OfferAlreadySubmitted | HandshakeError::AnswerAlreadyExists => {
                StatusCode::CONFLICT
            }
            HandshakeError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            ApiError::MissingToken => "missing token".to_string(),
            // Store internals stay out of the response body.
            ApiError::Handshake(HandshakeError::Internal(e)) => {
                error!("Session store failure: {}", e);
                "internal server error".to_string()
            }
            ApiError::Handshake(e) => e.to_string(),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

fn require_token(query: TokenQuery) -> Result<String, ApiError> {
    query
        .token
        .filter(|t| !t.is_empty())
        .ok_or(ApiError::MissingToken)
}

/// POST /api/new
pub async fn create_session(
    State(state): State<AppState>,
) -> Result<Json<CreateSessionResponse>, ApiError> {
    let response = state.sessions.create_session().await?;
    Ok(Json(response))
}

/// POST /api/offer
pub async fn submit_offer(
    State(state): State<AppState>,
    Json(request): Json<SubmitOfferRequest>,
) -> Result<StatusCode, ApiError> {
    info!("Sender posting offer for token {}", redact(&request.token));

    state.sessions.submit_offer(request).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/offer?token=
pub async fn get_offer(
    State(state): State<AppState>,
    Query(query): Query<TokenQuery>,
) -> Result<Json<OfferResponse>, ApiError> {
    let token = require_token(query)?;
    debug!("Viewer polling offer for token {}", redact(&token));

    let response = state.sessions.get_offer(&token).await?;
    Ok(Json(response))
}

/// POST /api/answer
pub async fn submit_answer(
    State(state): State<AppState>,
    Json(request): Json<SubmitAnswerRequest>,
) -> Result<StatusCode, ApiError> {
    info!("Viewer posting answer for token {}", redact(&request.token));

    state.sessions.submit_answer(request).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/answer?token=
pub async fn get_answer(
    State(state): State<AppState>,
    Query(query): Query<TokenQuery>,
) -> Result<Json<AnswerResponse>, ApiError> {
    let token = require_token(query)?;
    debug!("Sender polling answer for token {}", redact(&token));

    let response = state.sessions.get_answer(&token).await?;
    Ok(Json(response))
}
