/// Token issuer and validator
///
/// Pairs a short-lived JWT access token with a long-lived opaque refresh
/// token. Each pair belongs to one session row; the session stores only the
/// SHA-256 digest of the current refresh token.
///
/// # Session lifecycle
///
/// ```text
/// issue ──> ISSUED ──refresh──> ROTATED (new digest, sliding expiry) ──refresh──> ...
///              │                     │
///              └──── revoke / reuse detected / expired ────> REVOKED (row deleted)
/// ```
///
/// Rotation is a conditional update on the old digest, so of two refreshes
/// presenting the same refresh token at most one succeeds.

use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::auth::jwt::{create_token, decode_expired_token, validate_token, Claims, JwtError};
use crate::error::DomainError;
use crate::models::session::NewSession;
use crate::repository::SessionRepository;

/// Length of the random part of a refresh token, in bytes
const REFRESH_TOKEN_BYTES: usize = 32;

/// Secret and lifetimes used for issuing tokens
#[derive(Debug, Clone)]
pub struct TokenConfig {
    /// HS256 signing secret
    pub secret: String,

    /// Access token lifetime
    pub access_ttl: Duration,

    /// Refresh token lifetime
    pub refresh_ttl: Duration,

    /// Refresh token lifetime when the user asked to be remembered
    pub refresh_remember_ttl: Duration,
}

impl TokenConfig {
    pub fn refresh_ttl_for(&self, remember_me: bool) -> Duration {
        if remember_me {
            self.refresh_remember_ttl
        } else {
            self.refresh_ttl
        }
    }
}

/// Token pair handed to the client
#[derive(Debug, Clone, Serialize)]
pub struct IssuedTokens {
    /// Signed JWT access token
    pub access: String,

    /// Opaque refresh token
    pub refresh: String,

    #[serde(skip)]
    pub session_id: Uuid,

    #[serde(skip)]
    pub user_id: Uuid,

    #[serde(skip)]
    pub access_expires_at: DateTime<Utc>,

    #[serde(skip)]
    pub refresh_expires_at: DateTime<Utc>,
}

/// Generates a new opaque refresh token (64 hex characters)
pub fn generate_refresh_token() -> String {
    let mut bytes = [0u8; REFRESH_TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Digest under which a refresh token is stored
pub fn hash_refresh_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

fn sign_access(
    config: &TokenConfig,
    user_id: Uuid,
    session_id: Uuid,
    now: DateTime<Utc>,
) -> Result<(String, DateTime<Utc>), DomainError> {
    let claims = Claims::new(user_id, session_id, now, config.access_ttl);
    let token = create_token(&claims, &config.secret).map_err(|e| DomainError::Internal(e.to_string()))?;
    Ok((token, now + config.access_ttl))
}

/// Opens a new session for `user_id` and returns its first token pair
pub async fn issue<S>(
    store: &S,
    config: &TokenConfig,
    user_id: Uuid,
    remember_me: bool,
    user_agent: Option<String>,
    now: DateTime<Utc>,
) -> Result<IssuedTokens, DomainError>
where
    S: SessionRepository + ?Sized,
{
    let session_id = Uuid::new_v4();
    let refresh = generate_refresh_token();
    let refresh_expires_at = now + config.refresh_ttl_for(remember_me);

    store
        .create_session(&NewSession {
            id: session_id,
            user_id,
            refresh_token_hash: hash_refresh_token(&refresh),
            expires_at: refresh_expires_at,
            remember_me,
            user_agent,
        })
        .await?;

    let (access, access_expires_at) = sign_access(config, user_id, session_id, now)?;

    debug!(user_id = %user_id, session_id = %session_id, remember_me, "Session opened");

    Ok(IssuedTokens {
        access,
        refresh,
        session_id,
        user_id,
        access_expires_at,
        refresh_expires_at,
    })
}

/// Exchanges a token pair for a new one, rotating the refresh token
///
/// The access token may be expired but must carry a valid signature.
///
/// # Errors
///
/// - `TokenValidationFailed`: malformed access token, session of another
///   user, superseded refresh token (the session is revoked), or a
///   concurrent refresh won the rotation
/// - `Unauthorized`: the session does not exist
/// - `TokenExpired`: the refresh token expired (the session is deleted)
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
    let claims = decode_expired_token(access_token, &config.secret)
        .map_err(|_| DomainError::TokenValidationFailed)?;

    let session = store
        .find_session(claims.sid)
        .await?
        .ok_or(DomainError::Unauthorized)?;

    if session.user_id != claims.sub {
        warn!(session_id = %session.id, "Refresh with an access token of another user");
        return Err(DomainError::TokenValidationFailed);
    }

    let presented_hash = hash_refresh_token(refresh_token);
    if presented_hash != session.refresh_token_hash {
        // A superseded token came back: treat the lineage as compromised
        store.delete_session(session.id).await?;
        warn!(
            user_id = %session.user_id,
            session_id = %session.id,
            "Refresh token reuse detected, session revoked"
        );
        return Err(DomainError::TokenValidationFailed);
    }

    if session.is_expired(now) {
        store.delete_session(session.id).await?;
        info!(session_id = %session.id, "Refresh token expired, session removed");
        return Err(DomainError::TokenExpired);
    }

    let refresh = generate_refresh_token();
    let refresh_expires_at = now + config.refresh_ttl_for(session.remember_me);

    let rotated = store
        .rotate_session(
            session.id,
            &presented_hash,
            &hash_refresh_token(&refresh),
            refresh_expires_at,
        )
        .await?;
    if !rotated {
        debug!(session_id = %session.id, "Lost refresh rotation to a concurrent request");
        return Err(DomainError::TokenValidationFailed);
    }

    let (access, access_expires_at) = sign_access(config, session.user_id, session.id, now)?;

    Ok(IssuedTokens {
        access,
        refresh,
        session_id: session.id,
        user_id: session.user_id,
        access_expires_at,
        refresh_expires_at,
    })
}

/// Deletes a session; its refresh token stops working immediately
pub async fn revoke<S>(store: &S, session_id: Uuid) -> Result<bool, DomainError>
where
    S: SessionRepository + ?Sized,
{
    Ok(store.delete_session(session_id).await?)
}

/// Validates an access token presented with a request
///
/// No database access. Expired tokens yield `TokenExpired`, everything
/// else that fails yields `Unauthorized`.
pub fn authenticate(config: &TokenConfig, access_token: &str) -> Result<Claims, DomainError> {
    validate_token(access_token, &config.secret).map_err(|e| match e {
        JwtError::Expired => DomainError::TokenExpired,
        _ => DomainError::Unauthorized,
    })
}
