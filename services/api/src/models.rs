//! API Models
//!
//! Request and response bodies for the HTTP facade. The user document itself
//! lives in `sakhi_core::user`.

use sakhi_core::command::DeviceCommand;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A chat utterance transcribed by the frontend.
#[derive(Deserialize, ToSchema, Debug)]
pub struct ChatPayload {
    #[schema(example = "face-7f3a9c")]
    pub face_id: String,
    #[schema(example = "Sakhi, please turn on the light")]
    pub message: String,
}

#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct ChatReply {
    pub reply: String,
}

/// The pending device command, returned to the polling microcontroller.
#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct CommandResponse {
    #[schema(example = "led_on")]
    pub command: DeviceCommand,
}

#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    pub message: String,
}
