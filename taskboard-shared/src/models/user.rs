/// User model and database operations
///
/// This module provides the User model, its profile row and the queries used
/// by authentication and profile editing. A user is split over two tables:
/// `users` holds the account (login data and the password hash) and
/// `user_profiles` holds the human-facing details shown in task activity.
///
/// The password hash is a sensitive column. It is never part of [`User`] and
/// is only loaded through [`UserCredentials`] when a login is verified.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     username VARCHAR(64) NOT NULL UNIQUE,
///     email VARCHAR(255) NOT NULL,
///     password_hash VARCHAR(255) NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// CREATE UNIQUE INDEX users_email_lower_idx ON users (LOWER(email));
///
/// CREATE TABLE user_profiles (
///     user_id UUID PRIMARY KEY REFERENCES users(id) ON DELETE CASCADE,
///     name VARCHAR(128) NOT NULL,
///     surname VARCHAR(128),
///     patronymic VARCHAR(128),
///     phone VARCHAR(32),
///     position VARCHAR(128),
///     joined_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use taskboard_shared::models::user::{CreateUser, User};
/// use taskboard_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
/// let mut tx = pool.begin().await?;
///
/// let user = User::insert(&mut *tx, &CreateUser {
///     username: "alice".to_string(),
///     email: "alice@example.com".to_string(),
///     password_hash: "$argon2id$...".to_string(),
///     name: "Alice".to_string(),
///     surname: None,
/// }).await?;
/// tx.commit().await?;
///
/// let found = User::find_by_id(&pool, user.id).await?;
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;

const USER_COLUMNS: &str = "id, username, email, created_at, updated_at";

const PROFILE_COLUMNS: &str = "user_id, name, surname, patronymic, phone, position, joined_at";

/// User account without sensitive columns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Unique user ID
    pub id: Uuid,

    /// Login name, unique across users
    pub username: String,

    /// Email address, unique case-insensitively
    pub email: String,

    /// When the account was created
    pub created_at: DateTime<Utc>,

    /// When the account was last updated
    pub updated_at: DateTime<Utc>,
}

/// User account together with its Argon2id password hash
///
/// Only produced by login lookups.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserCredentials {
    #[sqlx(flatten)]
    pub user: User,

    /// Argon2id hash in PHC string format
    pub password_hash: String,
}

/// Profile details of a user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserProfile {
    pub user_id: Uuid,
    pub name: String,
    pub surname: Option<String>,
    pub patronymic: Option<String>,
    pub phone: Option<String>,
    pub position: Option<String>,
    pub joined_at: DateTime<Utc>,
}

impl UserProfile {
    /// Name shown in task activity: the first name, followed by the surname if present
    pub fn display_name(&self) -> String {
        display_name(&self.name, self.surname.as_deref())
    }
}

/// Renders a display name from a first name and optional surname
pub fn display_name(name: &str, surname: Option<&str>) -> String {
    match surname {
        Some(surname) if !surname.trim().is_empty() => format!("{} {}", name, surname),
        _ => name.to_string(),
    }
}

/// Short user reference embedded in task responses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub surname: Option<String>,
}

impl From<&UserProfile> for UserSummary {
    fn from(profile: &UserProfile) -> Self {
        Self {
            id: profile.user_id,
            name: profile.name.clone(),
            surname: profile.surname.clone(),
        }
    }
}

/// Input for creating a user together with its profile
///
/// `email` must already be normalized to lowercase and `password_hash`
/// must be an Argon2id hash, never a plaintext password.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub surname: Option<String>,
}

/// Partial update of the account and profile of the current user
///
/// Only `Some` fields are written.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateUser {
    pub username: Option<String>,
    pub email: Option<String>,
    pub name: Option<String>,
    pub surname: Option<String>,
    pub patronymic: Option<String>,
    pub phone: Option<String>,
    pub position: Option<String>,
}

impl UpdateUser {
    /// Whether any column of the `users` table is touched
    pub fn touches_account(&self) -> bool {
        self.username.is_some() || self.email.is_some()
    }
}

/// Current user as returned by `/user/users/me`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserMe {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub name: String,
    pub surname: Option<String>,
    pub patronymic: Option<String>,
    pub phone: Option<String>,
    pub position: Option<String>,
    pub joined_at: DateTime<Utc>,
}

impl UserMe {
    pub fn new(user: User, profile: UserProfile) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            name: profile.name,
            surname: profile.surname,
            patronymic: profile.patronymic,
            phone: profile.phone,
            position: profile.position,
            joined_at: profile.joined_at,
        }
    }
}

impl User {
    /// Inserts the account row and its profile row
    ///
    /// Call inside a transaction so that both rows commit together.
    ///
    /// # Errors
    ///
    /// Returns a database error if the username or email is already taken
    /// (unique constraint violation).
    pub async fn insert(
        conn: &mut sqlx::PgConnection,
        data: &CreateUser,
    ) -> Result<Self, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (username, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&data.username)
        .bind(&data.email)
        .bind(&data.password_hash)
        .fetch_one(&mut *conn)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO user_profiles (user_id, name, surname)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(user.id)
        .bind(&data.name)
        .bind(&data.surname)
        .execute(&mut *conn)
        .await?;

        Ok(user)
    }

    /// Finds a user by ID
    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Finds credentials by login
    ///
    /// The login matches either the email (case-insensitive) or the username (exact).
    pub async fn find_credentials<'e, E>(
        executor: E,
        login: &str,
    ) -> Result<Option<UserCredentials>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, UserCredentials>(&format!(
            r#"
            SELECT {USER_COLUMNS}, password_hash
            FROM users
            WHERE LOWER(email) = LOWER($1) OR username = $1
            ORDER BY (username = $1) DESC
            LIMIT 1
            "#
        ))
        .bind(login)
        .fetch_optional(executor)
        .await
    }

    /// Checks whether the email or username is used by another account
    ///
    /// `except` excludes one user from the check (used when a user edits their own account).
    pub async fn is_taken<'e, E>(
        executor: E,
        email: Option<&str>,
        username: Option<&str>,
        except: Option<Uuid>,
    ) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let (taken,): (bool,) = sqlx::query_as(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM users
                WHERE (LOWER(email) = LOWER($1) OR username = $2)
                  AND ($3::uuid IS NULL OR id <> $3)
            )
            "#,
        )
        .bind(email)
        .bind(username)
        .bind(except)
        .fetch_one(executor)
        .await?;

        Ok(taken)
    }

    /// Finds users whose email or username is in `identifiers`
    pub async fn find_by_identifiers<'e, E>(
        executor: E,
        identifiers: &[String],
    ) -> Result<Vec<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let lowered: Vec<String> = identifiers.iter().map(|i| i.to_lowercase()).collect();

        sqlx::query_as::<_, User>(&format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            WHERE LOWER(email) = ANY($1) OR username = ANY($2)
            "#
        ))
        .bind(&lowered)
        .bind(identifiers)
        .fetch_all(executor)
        .await
    }

    /// Applies a partial update to the account and profile rows
    ///
    /// Call inside a transaction. Returns `None` if the user does not exist.
    pub async fn update(
        conn: &mut sqlx::PgConnection,
        id: Uuid,
        data: &UpdateUser,
    ) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET username = COALESCE($2, username),
                email = COALESCE($3, email),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&data.username)
        .bind(&data.email)
        .fetch_optional(&mut *conn)
        .await?;

        if user.is_none() {
            return Ok(None);
        }

        sqlx::query(
            r#"
            UPDATE user_profiles
            SET name = COALESCE($2, name),
                surname = COALESCE($3, surname),
                patronymic = COALESCE($4, patronymic),
                phone = COALESCE($5, phone),
                position = COALESCE($6, position)
            WHERE user_id = $1
            "#,
        )
        .bind(id)
        .bind(&data.name)
        .bind(&data.surname)
        .bind(&data.patronymic)
        .bind(&data.phone)
        .bind(&data.position)
        .execute(&mut *conn)
        .await?;

        Ok(user)
    }
}

impl UserProfile {
    /// Loads the profile of a user
    pub async fn find<'e, E>(executor: E, user_id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, UserProfile>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM user_profiles WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(executor)
        .await
    }

    /// Loads the profiles of several users in one query
    pub async fn find_many<'e, E>(executor: E, user_ids: &[Uuid]) -> Result<Vec<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, UserProfile>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM user_profiles WHERE user_id = ANY($1)"
        ))
        .bind(user_ids)
        .fetch_all(executor)
        .await
    }
}
