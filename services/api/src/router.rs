//! Axum Router Configuration
//!
//! This module defines the complete HTTP routing for the application,
//! including the REST API and OpenAPI documentation.

use crate::{
    handlers,
    models::{ChatPayload, ChatReply, CommandResponse, ErrorResponse, MessageResponse},
    state::AppState,
};

use axum::{
    Router,
    routing::{get, post},
};
use sakhi_core::{
    command::DeviceCommand,
    user::{Reminder, SosContact, User},
};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::root,
        handlers::register_user,
        handlers::get_user,
        handlers::chat,
        handlers::get_command,
    ),
    components(
        schemas(User, Reminder, SosContact, ChatPayload, ChatReply, CommandResponse, DeviceCommand, MessageResponse, ErrorResponse)
    ),
    tags(
        (name = "Sakhi API", description = "Backend for the Sakhi personal assistant robot")
    )
)]
pub struct ApiDoc;

/// Creates the main Axum router for the application.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    let api_router = Router::new()
        .route("/", get(handlers::root))
        .route("/register", post(handlers::register_user))
        .route("/user/{face_id}", get(handlers::get_user))
        .route("/chat", post(handlers::chat))
        .route("/get-command", get(handlers::get_command))
        .with_state(app_state);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(api_router)
}
