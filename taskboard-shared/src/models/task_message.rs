/// Task activity log
///
/// Messages are append-only. `inner` messages are produced by the system
/// (timer events), `declarative` ones narrate a field change made by a user.
/// The text is rendered once at write time and stored verbatim.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE task_message_type AS ENUM ('inner', 'declarative');
///
/// CREATE TABLE task_messages (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     task_id UUID NOT NULL REFERENCES tasks(id),
///     author_id UUID REFERENCES users(id) ON DELETE SET NULL,
///     message_type task_message_type NOT NULL,
///     text TEXT NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_message_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    /// System generated
    Inner,

    /// Narrates a field change
    Declarative,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct TaskMessage {
    pub id: Uuid,
    pub task_id: Uuid,
    pub author_id: Option<Uuid>,
    pub message_type: MessageType,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// Message waiting to be written alongside a task mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTaskMessage {
    pub author_id: Uuid,
    pub message_type: MessageType,
    pub text: String,
}

impl TaskMessage {
    pub async fn insert<'e, E>(
        executor: E,
        task_id: Uuid,
        message: &NewTaskMessage,
        created_at: DateTime<Utc>,
    ) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, TaskMessage>(
            r#"
            INSERT INTO task_messages (task_id, author_id, message_type, text, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, task_id, author_id, message_type, text, created_at
            "#,
        )
        .bind(task_id)
        .bind(message.author_id)
        .bind(message.message_type)
        .bind(&message.text)
        .bind(created_at)
        .fetch_one(executor)
        .await
    }

    /// Lists the messages of a task in write order
    pub async fn list_for_task<'e, E>(executor: E, task_id: Uuid) -> Result<Vec<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, TaskMessage>(
            r#"
            SELECT id, task_id, author_id, message_type, text, created_at
            FROM task_messages
            WHERE task_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(task_id)
        .fetch_all(executor)
        .await
    }
}
