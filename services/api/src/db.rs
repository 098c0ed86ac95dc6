//! Data Access Layer
//!
//! Postgres-backed implementation of `UserStore`. Each user is a single row
//! whose reminders and SOS contacts are embedded as JSONB arrays.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sakhi_core::{
    store::UserStore,
    user::{Reminder, SosContact, User},
};
use sqlx::{FromRow, PgPool, types::Json};

/// A wrapper around the `PgPool` to provide a clear data access interface.
#[derive(Clone)]
pub struct Db {
    pool: PgPool,
}

#[derive(FromRow)]
struct UserRow {
    id: String,
    name: String,
    reminders: Json<Vec<Reminder>>,
    sos_contacts: Json<Vec<SosContact>>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            face_id: row.id,
            name: row.name,
            reminders: row.reminders.0,
            sos_contacts: row.sos_contacts.0,
        }
    }
}

impl Db {
    /// Creates a new `Db` instance.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Runs all pending `sqlx` migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl UserStore for Db {
    async fn get(&self, face_id: &str) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, name, reminders, sos_contacts FROM users WHERE id = $1",
        )
        .bind(face_id)
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("Failed to load user '{}'", face_id))?;
        Ok(row.map(User::from))
    }

    async fn upsert(&self, user: &User) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, name, reminders, sos_contacts)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE
            SET name = EXCLUDED.name,
                reminders = EXCLUDED.reminders,
                sos_contacts = EXCLUDED.sos_contacts
            "#,
        )
        .bind(&user.face_id)
        .bind(&user.name)
        .bind(Json(&user.reminders))
        .bind(Json(&user.sos_contacts))
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to upsert user '{}'", user.face_id))?;
        Ok(())
    }
}
