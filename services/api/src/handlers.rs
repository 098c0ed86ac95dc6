//! Axum Handlers for the REST API
//!
//! Registration, user lookup, chat dispatch and the device command poll.
//! It uses `utoipa` doc comments to generate OpenAPI documentation.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use sakhi_core::{dispatch::DispatchError, user::User};
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::{
    models::{ChatPayload, ChatReply, CommandResponse, ErrorResponse, MessageResponse},
    state::AppState,
};

pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    /// A dependency the request relies on failed; its message is passed through.
    Upstream(String),
    InternalServerError(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(ErrorResponse { message })).into_response()
            }
            ApiError::NotFound(message) => {
                (StatusCode::NOT_FOUND, Json(ErrorResponse { message })).into_response()
            }
            ApiError::Upstream(message) => {
                error!("Upstream failure: {}", message);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse { message }),
                )
                    .into_response()
            }
            ApiError::InternalServerError(err) => {
                error!("Internal Server Error: {:?}", err);
                let message = "An internal server error occurred.".to_string();
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse { message }),
                )
                    .into_response()
            }
        }
    }
}

impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self::InternalServerError(err.into())
    }
}

/// Liveness check.
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Service is up", body = MessageResponse)
    )
)]
pub async fn root() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: "Welcome to Sakhi Personal Assistant API".to_string(),
    })
}

/// Register a new user or replace an existing one.
#[utoipa::path(
    post,
    path = "/register",
    request_body = User,
    responses(
        (status = 200, description = "User registered or updated", body = MessageResponse),
        (status = 400, description = "Bad request", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn register_user(
    State(state): State<Arc<AppState>>,
    Json(user): Json<User>,
) -> Result<Json<MessageResponse>, ApiError> {
    if user.face_id.trim().is_empty() {
        return Err(ApiError::BadRequest("face id is required".to_string()));
    }
    if user.name.trim().is_empty() {
        return Err(ApiError::BadRequest("name is required".to_string()));
    }

    state.users.upsert(&user).await?;
    info!(
        face_id = %user.face_id,
        reminders = user.reminders.len(),
        contacts = user.sos_contacts.len(),
        "User registered"
    );

    Ok(Json(MessageResponse {
        message: format!("User {} registered/updated successfully.", user.name),
    }))
}

/// Look up a user by face id.
#[utoipa::path(
    get,
    path = "/user/{face_id}",
    responses(
        (status = 200, description = "User document", body = User),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    params(
        ("face_id" = String, Path, description = "Face signature the user registered with")
    )
)]
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(face_id): Path<String>,
) -> Result<Json<User>, ApiError> {
    let user = state
        .users
        .get(&face_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
    Ok(Json(user))
}

/// Handle a chat message: device command, SOS alert, or conversational reply.
#[utoipa::path(
    post,
    path = "/chat",
    request_body = ChatPayload,
    responses(
        (status = 200, description = "Assistant reply", body = ChatReply),
        (status = 500, description = "Language model failure", body = ErrorResponse)
    )
)]
pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ChatPayload>,
) -> Result<Json<ChatReply>, ApiError> {
    let reply = state
        .dispatcher
        .dispatch(&payload.face_id, &payload.message)
        .await
        .map_err(|e| match e {
            DispatchError::Oracle(_) => ApiError::Upstream(e.to_string()),
        })?;

    Ok(Json(ChatReply { reply }))
}

/// Poll for the next device command. Reading a command consumes it.
#[utoipa::path(
    get,
    path = "/get-command",
    responses(
        (status = 200, description = "Pending command, or none", body = CommandResponse)
    )
)]
pub async fn get_command(State(state): State<Arc<AppState>>) -> Json<CommandResponse> {
    let command = state.commands.drain();
    debug!(%command, "Device polled for command");
    Json(CommandResponse { command })
}
