/// Project and membership model
///
/// A project is owned by the user who created it (`created_by`). Access to
/// everything inside a project goes through the `project_users` join table.
/// The owner is always a member and is the only admin; the admin flag is not
/// stored but derived by comparing the member id with `created_by`.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE projects (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(255) NOT NULL UNIQUE,
///     icon_id INTEGER NOT NULL DEFAULT 1,
///     created_by UUID NOT NULL REFERENCES users(id),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
///
/// CREATE TABLE project_users (
///     project_id UUID NOT NULL REFERENCES projects(id),
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     PRIMARY KEY (project_id, user_id)
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use taskboard_shared::models::project::Project;
/// use taskboard_shared::db::pool::{create_pool, DatabaseConfig};
/// use uuid::Uuid;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
/// let user_id = Uuid::new_v4();
///
/// for project in Project::list_for_member(&pool, user_id).await? {
///     println!("{}", project.name);
/// }
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;

use crate::models::section::Section;

const PROJECT_COLUMNS: &str = "id, name, icon_id, created_by, created_at, updated_at";

/// Sections seeded into every new project, in position order
pub const DEFAULT_SECTIONS: [&str; 4] = ["Беклог", "Надо сделать", "В работе", "Закрыта"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Project {
    pub id: Uuid,

    /// Project name, unique across the installation
    pub name: String,

    /// Icon selector used by clients
    pub icon_id: i32,

    /// Owner
    pub created_by: Uuid,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    pub fn is_owner(&self, user_id: Uuid) -> bool {
        self.created_by == user_id
    }
}

/// Project together with its sections, as returned by detail and list endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectWithSections {
    #[serde(flatten)]
    pub project: Project,
    pub sections: Vec<Section>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProject {
    pub name: String,
    #[serde(default = "default_icon_id")]
    pub icon_id: i32,
}

fn default_icon_id() -> i32 {
    1
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateProject {
    pub name: Option<String>,
    pub icon_id: Option<i32>,
}

/// Member of a project as listed by `/project/{id}/users`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProjectMember {
    pub user_id: Uuid,
    pub username: String,
    pub email: String,
    pub name: String,
    pub surname: Option<String>,
    pub position: Option<String>,

    /// True for the project owner
    pub is_admin: bool,
}

impl Project {
    pub async fn insert<'e, E>(
        executor: E,
        owner: Uuid,
        data: &CreateProject,
    ) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Project>(&format!(
            r#"
            INSERT INTO projects (name, icon_id, created_by)
            VALUES ($1, $2, $3)
            RETURNING {PROJECT_COLUMNS}
            "#
        ))
        .bind(&data.name)
        .bind(data.icon_id)
        .bind(owner)
        .fetch_one(executor)
        .await
    }

    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Project>(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    pub async fn find_by_name<'e, E>(executor: E, name: &str) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Project>(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects WHERE name = $1"
        ))
        .bind(name)
        .fetch_optional(executor)
        .await
    }

    /// Lists projects the user is a member of, oldest first
    pub async fn list_for_member<'e, E>(executor: E, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Project>(
            r#"
            SELECT p.id, p.name, p.icon_id, p.created_by, p.created_at, p.updated_at
            FROM projects p
            INNER JOIN project_users pu ON pu.project_id = p.id
            WHERE pu.user_id = $1
            ORDER BY p.created_at ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(executor)
        .await
    }

    pub async fn update<'e, E>(
        executor: E,
        id: Uuid,
        data: &UpdateProject,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Project>(&format!(
            r#"
            UPDATE projects
            SET name = COALESCE($2, name),
                icon_id = COALESCE($3, icon_id),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {PROJECT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&data.name)
        .bind(data.icon_id)
        .fetch_optional(executor)
        .await
    }

    /// Deletes the project and everything inside it
    ///
    /// Rows are removed children first: memberships, task messages, tasks,
    /// sections, then the project. Call inside a transaction.
    pub async fn delete_cascade(conn: &mut sqlx::PgConnection, id: Uuid) -> Result<bool, sqlx::Error> {
        sqlx::query("DELETE FROM project_users WHERE project_id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        sqlx::query(
            r#"
            DELETE FROM task_messages
            WHERE task_id IN (
                SELECT t.id FROM tasks t
                INNER JOIN project_sections s ON s.id = t.section_id
                WHERE s.project_id = $1
            )
            "#,
        )
        .bind(id)
        .execute(&mut *conn)
        .await?;

        sqlx::query(
            r#"
            DELETE FROM tasks
            WHERE section_id IN (SELECT id FROM project_sections WHERE project_id = $1)
            "#,
        )
        .bind(id)
        .execute(&mut *conn)
        .await?;

        sqlx::query("DELETE FROM project_sections WHERE project_id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn is_member<'e, E>(executor: E, project_id: Uuid, user_id: Uuid) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let (exists,): (bool,) = sqlx::query_as(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM project_users WHERE project_id = $1 AND user_id = $2
            )
            "#,
        )
        .bind(project_id)
        .bind(user_id)
        .fetch_one(executor)
        .await?;

        Ok(exists)
    }

    pub async fn list_members<'e, E>(executor: E, project_id: Uuid) -> Result<Vec<ProjectMember>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, ProjectMember>(
            r#"
            SELECT u.id AS user_id, u.username, u.email, up.name, up.surname, up.position,
                   (u.id = p.created_by) AS is_admin
            FROM project_users pu
            INNER JOIN projects p ON p.id = pu.project_id
            INNER JOIN users u ON u.id = pu.user_id
            INNER JOIN user_profiles up ON up.user_id = u.id
            WHERE pu.project_id = $1
            ORDER BY is_admin DESC, u.username ASC
            "#,
        )
        .bind(project_id)
        .fetch_all(executor)
        .await
    }

    /// Adds members, skipping users that already are members
    ///
    /// Returns the number of memberships created.
    pub async fn add_members<'e, E>(executor: E, project_id: Uuid, user_ids: &[Uuid]) -> Result<u64, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query(
            r#"
            INSERT INTO project_users (project_id, user_id)
            SELECT $1, UNNEST($2::uuid[])
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(project_id)
        .bind(user_ids)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }

    /// Removes members of one project, never the owner
    pub async fn remove_members<'e, E>(executor: E, project_id: Uuid, user_ids: &[Uuid]) -> Result<u64, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query(
            r#"
            DELETE FROM project_users pu
            USING projects p
            WHERE pu.project_id = $1
              AND p.id = pu.project_id
              AND pu.user_id = ANY($2)
              AND pu.user_id <> p.created_by
            "#,
        )
        .bind(project_id)
        .bind(user_ids)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }
}
