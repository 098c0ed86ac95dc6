use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A single reminder owned by a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Reminder {
    #[schema(example = "08:00")]
    pub time: String,
    #[schema(example = "Take morning medicine")]
    pub task: String,
}

/// A person to notify when the user raises an emergency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SosContact {
    pub name: String,
    pub phone: String,
}

/// A registered user, keyed by the face signature captured on the frontend.
///
/// The whole document is replaced on every registration; reminders and
/// contacts have no identity of their own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct User {
    #[serde(rename = "_id", alias = "face_id")]
    #[schema(example = "face-7f3a9c")]
    pub face_id: String,
    pub name: String,
    #[serde(default)]
    pub reminders: Vec<Reminder>,
    #[serde(default)]
    pub sos_contacts: Vec<SosContact>,
}

impl User {
    /// Creates a user with no reminders or contacts.
    pub fn new(face_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            face_id: face_id.into(),
            name: name.into(),
            reminders: Vec::new(),
            sos_contacts: Vec::new(),
        }
    }
}
