/// Authentication and authorization
///
/// # Modules
///
/// - [`password`]: credential verifier (Argon2id hashing and strength check)
/// - [`jwt`]: access token encoding and validation
/// - [`tokens`]: token issuer/validator and refresh-token rotation
/// - [`gateway`]: login, refresh, logout and signup flows
/// - [`middleware`]: request authentication and access cookies
/// - [`authorization`]: project membership and ownership checks
///
/// # Example
///
/// ```no_run
/// use chrono::{Duration, Utc};
/// use taskboard_shared::auth::gateway::{login, Credentials};
/// use taskboard_shared::auth::tokens::TokenConfig;
/// use taskboard_shared::repository::memory::MemoryStore;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = MemoryStore::new();
/// let config = TokenConfig {
///     secret: "a-secret-key-that-is-at-least-32-bytes".to_string(),
///     access_ttl: Duration::minutes(15),
///     refresh_ttl: Duration::days(30),
///     refresh_remember_ttl: Duration::days(900),
/// };
///
/// let tokens = login(&store, &config, Credentials {
///     login: "alice".to_string(),
///     password: "secret".to_string(),
///     remember_me: false,
///     user_agent: None,
/// }, Utc::now()).await?;
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod gateway;
pub mod jwt;
pub mod middleware;
pub mod password;
pub mod tokens;
