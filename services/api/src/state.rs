//! Shared Application State
//!
//! This module defines the `AppState` struct, which holds the shared
//! resources every handler needs.

use sakhi_core::{command::CommandSignal, dispatch::DispatchRouter, store::UserStore};
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserStore>,
    pub commands: Arc<CommandSignal>,
    pub dispatcher: Arc<DispatchRouter>,
}
