//! Sakhi API Library Crate
//!
//! This library contains the HTTP side of the Sakhi assistant backend:
//! configuration, the Postgres user store, API handlers and routing. The
//! `api` binary is a thin wrapper around this library.

pub mod config;
pub mod db;
pub mod handlers;
pub mod models;
pub mod router;
pub mod state;
