/// Project sections
///
/// A section is an ordered column of a project board. Every task lives in
/// exactly one section, so deleting a section deletes its tasks (and their
/// messages) first.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE project_sections (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     project_id UUID NOT NULL REFERENCES projects(id),
///     name VARCHAR(255) NOT NULL,
///     position INTEGER NOT NULL DEFAULT 0,
///     color VARCHAR(32)
/// );
/// ```

use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;

const SECTION_COLUMNS: &str = "id, project_id, name, position, color";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Section {
    pub id: Uuid,
    pub project_id: Uuid,
    pub name: String,

    /// Ordering key within the project, ascending
    pub position: i32,

    pub color: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSection {
    pub name: String,
    #[serde(default)]
    pub position: i32,
    pub color: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateSection {
    pub name: Option<String>,
    pub position: Option<i32>,
    pub color: Option<String>,
}

impl Section {
    pub async fn insert<'e, E>(
        executor: E,
        project_id: Uuid,
        data: &CreateSection,
    ) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Section>(&format!(
            r#"
            INSERT INTO project_sections (project_id, name, position, color)
            VALUES ($1, $2, $3, $4)
            RETURNING {SECTION_COLUMNS}
            "#
        ))
        .bind(project_id)
        .bind(&data.name)
        .bind(data.position)
        .bind(&data.color)
        .fetch_one(executor)
        .await
    }

    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Section>(&format!(
            "SELECT {SECTION_COLUMNS} FROM project_sections WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    pub async fn list_for_project<'e, E>(executor: E, project_id: Uuid) -> Result<Vec<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Section>(&format!(
            r#"
            SELECT {SECTION_COLUMNS}
            FROM project_sections
            WHERE project_id = $1
            ORDER BY position ASC, name ASC
            "#
        ))
        .bind(project_id)
        .fetch_all(executor)
        .await
    }

    pub async fn update<'e, E>(
        executor: E,
        id: Uuid,
        data: &UpdateSection,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Section>(&format!(
            r#"
            UPDATE project_sections
            SET name = COALESCE($2, name),
                position = COALESCE($3, position),
                color = COALESCE($4, color)
            WHERE id = $1
            RETURNING {SECTION_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&data.name)
        .bind(data.position)
        .bind(&data.color)
        .fetch_optional(executor)
        .await
    }

    /// Deletes the section together with its tasks and their messages
    ///
    /// Call inside a transaction.
    pub async fn delete_cascade(conn: &mut sqlx::PgConnection, id: Uuid) -> Result<bool, sqlx::Error> {
        sqlx::query(
            r#"
            DELETE FROM task_messages
            WHERE task_id IN (SELECT id FROM tasks WHERE section_id = $1)
            "#,
        )
        .bind(id)
        .execute(&mut *conn)
        .await?;

        sqlx::query("DELETE FROM tasks WHERE section_id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        let result = sqlx::query("DELETE FROM project_sections WHERE id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
