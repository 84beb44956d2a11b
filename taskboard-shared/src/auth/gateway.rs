/// Auth gateway
///
/// Orchestrates the credential verifier, the token issuer and the user
/// store into the four account flows: login, refresh, logout and signup.
///
/// Signup runs in two steps. The account and its profile are created in
/// one atomic write; only if that write committed are deferred project
/// invitations for the email turned into memberships. A failure in the
/// second step is logged and leaves the new account in place.

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::auth::password::{hash_password, validate_password_strength, verify_dummy, verify_password};
use crate::auth::tokens::{self, IssuedTokens, TokenConfig};
use crate::error::DomainError;
use crate::models::user::{CreateUser, User};
use crate::repository::{SessionRepository, StoreError, UserRepository};

/// Login attempt
#[derive(Debug, Clone)]
pub struct Credentials {
    /// Email or username
    pub login: String,
    pub password: String,
    pub remember_me: bool,
    /// Client fingerprint stored with the session
    pub user_agent: Option<String>,
}

/// Signup data
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub username: String,
    pub email: String,
    pub password: String,
    pub name: String,
    pub surname: Option<String>,
}

/// Result of a signup
#[derive(Debug, Clone)]
pub struct SignupOutcome {
    pub user: User,

    /// Projects joined through deferred invitations
    pub joined_projects: Vec<Uuid>,
}

/// Verifies credentials and opens a session
///
/// Unknown logins and wrong passwords both yield `InvalidCredentials` after
/// one password verification each.
pub async fn login<S>(
    store: &S,
    config: &TokenConfig,
    credentials: Credentials,
    now: DateTime<Utc>,
) -> Result<IssuedTokens, DomainError>
where
    S: UserRepository + SessionRepository + ?Sized,
{
    let login = credentials.login.trim();

    let Some(found) = store.find_credentials(login).await? else {
        verify_dummy(&credentials.password);
        info!("Login failed: unknown account");
        return Err(DomainError::InvalidCredentials);
    };

    let valid = match verify_password(&credentials.password, &found.password_hash) {
        Ok(valid) => valid,
        Err(e) => {
            error!(user_id = %found.user.id, error = %e, "Stored password hash is unusable");
            false
        }
    };
    if !valid {
        info!(user_id = %found.user.id, "Login failed: wrong password");
        return Err(DomainError::InvalidCredentials);
    }

    let issued = tokens::issue(
        store,
        config,
        found.user.id,
        credentials.remember_me,
        credentials.user_agent,
        now,
    )
    .await?;

    info!(user_id = %found.user.id, session_id = %issued.session_id, "User logged in");
    Ok(issued)
}

/// Rotates the token pair of a session
pub async fn refresh<S>(
    store: &S,
    config: &TokenConfig,
    access_token: &str,
    refresh_token: &str,
    now: DateTime<Utc>,
) -> Result<IssuedTokens, DomainError>
where
    S: SessionRepository + ?Sized,
{
    tokens::refresh(store, config, access_token, refresh_token, now).await
}

/// Ends a session
///
/// Fails with `Unauthorized` if the session is already gone, for example
/// after a previous logout or a detected refresh token reuse.
pub async fn logout<S>(store: &S, session_id: Uuid) -> Result<(), DomainError>
where
    S: SessionRepository + ?Sized,
{
    if !tokens::revoke(store, session_id).await? {
        debug!(session_id = %session_id, "Logout for unknown session");
        return Err(DomainError::Unauthorized);
    }

    info!(session_id = %session_id, "User logged out");
    Ok(())
}

/// Registers an account and resolves deferred invitations for its email
///
/// # Errors
///
/// - `PasswordTooWeak` for passwords shorter than five characters, checked first
/// - `AuthDataIsNotUnique` if the email or username is taken
pub async fn signup<S>(store: &S, account: NewAccount) -> Result<SignupOutcome, DomainError>
where
    S: UserRepository + ?Sized,
{
    validate_password_strength(&account.password).map_err(|_| DomainError::PasswordTooWeak)?;

    let email = account.email.trim().to_lowercase();
    let username = account.username.trim().to_string();

    if store.login_taken(Some(&email), Some(&username), None).await? {
        return Err(DomainError::AuthDataIsNotUnique);
    }

    let password_hash = hash_password(&account.password)?;

    let user = store
        .create_user(&CreateUser {
            username,
            email,
            password_hash,
            name: account.name.trim().to_string(),
            surname: account
                .surname
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
        })
        .await
        .map_err(|e| match e {
            // Lost a race with a concurrent signup for the same data
            StoreError::Conflict(_) => DomainError::AuthDataIsNotUnique,
            other => DomainError::Store(other),
        })?;

    info!(user_id = %user.id, "User signed up");

    let joined_projects = match store.resolve_pending_invite(&user.email, user.id).await {
        Ok(projects) => projects,
        Err(e) => {
            warn!(user_id = %user.id, error = %e, "Failed to resolve pending invitations");
            Vec::new()
        }
    };
    if !joined_projects.is_empty() {
        info!(user_id = %user.id, count = joined_projects.len(), "Pending invitations resolved");
    }

    Ok(SignupOutcome { user, joined_projects })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::project::CreateProject;
    use crate::repository::memory::MemoryStore;
    use crate::repository::ProjectRepository;
    use chrono::Duration;

    fn config() -> TokenConfig {
        TokenConfig {
            secret: "test-secret-key-that-is-at-least-32-bytes-long".to_string(),
            access_ttl: Duration::minutes(15),
            refresh_ttl: Duration::days(30),
            refresh_remember_ttl: Duration::days(900),
        }
    }

    fn account(username: &str, password: &str) -> NewAccount {
        NewAccount {
            username: username.to_string(),
            email: format!("{}@Example.com", username),
            password: password.to_string(),
            name: "Alice".to_string(),
            surname: Some("Smith".to_string()),
        }
    }

    fn credentials(login: &str, password: &str) -> Credentials {
        Credentials {
            login: login.to_string(),
            password: password.to_string(),
            remember_me: false,
            user_agent: Some("tests".to_string()),
        }
    }

    #[tokio::test]
    async fn test_signup_then_login_by_username_or_email() {
        let store = MemoryStore::new();
        let config = config();

        let outcome = signup(&store, account("alice", "correct")).await.unwrap();
        assert_eq!(outcome.user.email, "alice@example.com");
        assert!(outcome.joined_projects.is_empty());

        let by_name = login(&store, &config, credentials("alice", "correct"), Utc::now()).await.unwrap();
        assert_eq!(by_name.user_id, outcome.user.id);

        let by_email = login(&store, &config, credentials("ALICE@example.com", "correct"), Utc::now())
            .await
            .unwrap();
        assert_eq!(by_email.user_id, outcome.user.id);
        assert_eq!(store.session_count().await, 2);
    }

    #[tokio::test]
    async fn test_login_failures_look_the_same() {
        let store = MemoryStore::new();
        let config = config();
        signup(&store, account("alice", "correct")).await.unwrap();

        let wrong = login(&store, &config, credentials("alice", "wrong"), Utc::now()).await;
        let unknown = login(&store, &config, credentials("bob", "correct"), Utc::now()).await;

        let wrong = wrong.unwrap_err();
        let unknown = unknown.unwrap_err();
        assert_eq!(wrong.code(), "invalid_credentials");
        assert_eq!(wrong.code(), unknown.code());
        assert_eq!(wrong.to_string(), unknown.to_string());
        assert_eq!(store.session_count().await, 0);
    }

    #[tokio::test]
    async fn test_signup_rejects_weak_password_first() {
        let store = MemoryStore::new();
        signup(&store, account("alice", "correct")).await.unwrap();

        // Duplicate data and a weak password: the password check wins
        let result = signup(&store, account("alice", "1234")).await;
        assert!(matches!(result, Err(DomainError::PasswordTooWeak)));
    }

    #[tokio::test]
    async fn test_signup_rejects_duplicates() {
        let store = MemoryStore::new();
        signup(&store, account("alice", "correct")).await.unwrap();

        let same_name = NewAccount {
            email: "other@example.com".to_string(),
            ..account("alice", "correct")
        };
        assert!(matches!(
            signup(&store, same_name).await,
            Err(DomainError::AuthDataIsNotUnique)
        ));

        let same_email = NewAccount {
            username: "alice2".to_string(),
            email: "ALICE@EXAMPLE.COM".to_string(),
            ..account("alice", "correct")
        };
        assert!(matches!(
            signup(&store, same_email).await,
            Err(DomainError::AuthDataIsNotUnique)
        ));
    }

    #[tokio::test]
    async fn test_signup_resolves_pending_invites() {
        let store = MemoryStore::new();
        let owner = signup(&store, account("owner", "password")).await.unwrap().user;

        let first = store
            .create_project(owner.id, &CreateProject { name: "First".into(), icon_id: 0 })
            .await
            .unwrap();
        let second = store
            .create_project(owner.id, &CreateProject { name: "Second".into(), icon_id: 0 })
            .await
            .unwrap();
        store.add_pending_invite("carol@example.com", first.id).await.unwrap();
        store.add_pending_invite("carol@example.com", second.id).await.unwrap();

        let outcome = signup(&store, account("carol", "password")).await.unwrap();
        assert_eq!(outcome.joined_projects, vec![first.id, second.id]);
        assert!(store.is_member(first.id, outcome.user.id).await.unwrap());
        assert!(store.is_member(second.id, outcome.user.id).await.unwrap());
        assert!(store.pending_invite("carol@example.com").await.is_none());
    }

    #[tokio::test]
    async fn test_logout_revokes_session() {
        let store = MemoryStore::new();
        let config = config();
        signup(&store, account("alice", "correct")).await.unwrap();
        let issued = login(&store, &config, credentials("alice", "correct"), Utc::now()).await.unwrap();

        logout(&store, issued.session_id).await.unwrap();
        assert_eq!(store.session_count().await, 0);

        let result = refresh(&store, &config, &issued.access, &issued.refresh, Utc::now()).await;
        assert!(matches!(result, Err(DomainError::Unauthorized)));

        let again = logout(&store, issued.session_id).await;
        assert!(matches!(again, Err(DomainError::Unauthorized)));
    }
}
