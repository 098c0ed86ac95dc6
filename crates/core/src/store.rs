//! User persistence contract.
//!
//! The HTTP service plugs a database-backed implementation in here; the
//! in-memory store serves tests and local runs without a database.

use crate::user::User;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Keyed document access for user profiles.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Returns the user stored under `face_id`, or `None` if absent.
    async fn get(&self, face_id: &str) -> Result<Option<User>>;

    /// Inserts the user or replaces the existing document wholesale.
    async fn upsert(&self, user: &User) -> Result<()>;
}

/// A `UserStore` backed by a process-local map.
#[derive(Default)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<String, User>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn get(&self, face_id: &str) -> Result<Option<User>> {
        Ok(self.users.read().await.get(face_id).cloned())
    }

    async fn upsert(&self, user: &User) -> Result<()> {
        self.users
            .write()
            .await
            .insert(user.face_id.clone(), user.clone());
        Ok(())
    }
}
