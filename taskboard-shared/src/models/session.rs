/// Session model and database operations
///
/// A session is one refresh-token lineage. It is created on login, its
/// refresh token is swapped on every refresh and it is deleted on logout
/// or when a superseded refresh token is presented again.
///
/// Only the SHA-256 digest of the refresh token is stored. The token itself
/// is handed to the client once and never persisted.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE sessions (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     refresh_token_hash VARCHAR(64) NOT NULL,
///     expires_at TIMESTAMPTZ NOT NULL,
///     remember_me BOOLEAN NOT NULL DEFAULT FALSE,
///     user_agent TEXT,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;

const SESSION_COLUMNS: &str =
    "id, user_id, refresh_token_hash, expires_at, remember_me, user_agent, created_at";

/// Persisted session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Session {
    pub id: Uuid,

    /// Owner of the session
    pub user_id: Uuid,

    /// Hex encoded SHA-256 digest of the current refresh token
    #[serde(skip_serializing)]
    pub refresh_token_hash: String,

    /// When the current refresh token stops being accepted
    pub expires_at: DateTime<Utc>,

    /// Selects the long refresh lifetime
    pub remember_me: bool,

    /// Client fingerprint recorded at login
    pub user_agent: Option<String>,

    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Whether the refresh token has expired at `now`
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Input for creating a session
#[derive(Debug, Clone)]
pub struct NewSession {
    /// Session id, chosen by the caller so it can be embedded in the access token
    pub id: Uuid,
    pub user_id: Uuid,
    pub refresh_token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub remember_me: bool,
    pub user_agent: Option<String>,
}

impl Session {
    pub async fn create<'e, E>(executor: E, data: &NewSession) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Session>(&format!(
            r#"
            INSERT INTO sessions (id, user_id, refresh_token_hash, expires_at, remember_me, user_agent)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {SESSION_COLUMNS}
            "#
        ))
        .bind(data.id)
        .bind(data.user_id)
        .bind(&data.refresh_token_hash)
        .bind(data.expires_at)
        .bind(data.remember_me)
        .bind(&data.user_agent)
        .fetch_one(executor)
        .await
    }

    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Session>(&format!(
            "SELECT {SESSION_COLUMNS} FROM sessions WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    /// Replaces the refresh token if the stored digest still equals `expected_hash`
    ///
    /// The check and the write are one statement, so two concurrent refreshes
    /// presenting the same token cannot both succeed. Returns whether the
    /// swap happened.
    pub async fn rotate<'e, E>(
        executor: E,
        id: Uuid,
        expected_hash: &str,
        new_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query(
            r#"
            UPDATE sessions
            SET refresh_token_hash = $3, expires_at = $4
            WHERE id = $1 AND refresh_token_hash = $2
            "#,
        )
        .bind(id)
        .bind(expected_hash)
        .bind(new_hash)
        .bind(expires_at)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Deletes a session, returning whether it existed
    pub async fn delete<'e, E>(executor: E, id: Uuid) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM sessions WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
