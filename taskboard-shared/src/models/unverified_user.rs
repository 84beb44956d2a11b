/// Deferred project invitations
///
/// When a project owner invites an email that has no account yet, the
/// project id is recorded against that email. The record is consumed at
/// signup: each project id becomes a membership of the new user and the
/// row is deleted.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE unverified_users (
///     email VARCHAR(255) PRIMARY KEY,
///     project_ids UUID[] NOT NULL DEFAULT '{}',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;

/// Pending invitation for an email without an account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct UnverifiedUser {
    /// Lowercased email address
    pub email: String,

    /// Projects the email was invited to
    pub project_ids: Vec<Uuid>,
}

impl UnverifiedUser {
    /// Records an invitation, appending the project to an existing record
    ///
    /// Inviting the same email to the same project twice is a no-op.
    pub async fn upsert<'e, E>(executor: E, email: &str, project_id: Uuid) -> Result<(), sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query(
            r#"
            INSERT INTO unverified_users (email, project_ids)
            VALUES (LOWER($1), ARRAY[$2]::uuid[])
            ON CONFLICT (email) DO UPDATE
            SET project_ids = CASE
                WHEN $2 = ANY(unverified_users.project_ids) THEN unverified_users.project_ids
                ELSE array_append(unverified_users.project_ids, $2)
            END
            "#,
        )
        .bind(email)
        .bind(project_id)
        .execute(executor)
        .await?;

        Ok(())
    }

    /// Removes and returns the invitation for an email
    pub async fn take<'e, E>(executor: E, email: &str) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, UnverifiedUser>(
            r#"
            DELETE FROM unverified_users
            WHERE email = LOWER($1)
            RETURNING email, project_ids
            "#,
        )
        .bind(email)
        .fetch_optional(executor)
        .await
    }
}
