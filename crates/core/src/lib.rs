//! Core logic for the Sakhi assistant backend: the device command mailbox,
//! chat dispatch, and the capability traits for the external services it
//! talks to.

pub mod alert;
pub mod command;
pub mod dispatch;
pub mod oracle;
pub mod store;
pub mod user;
