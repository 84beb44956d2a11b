/// Access token encoding and validation
///
/// Access tokens are HS256 JWTs. They name the user (`sub`) and the session
/// they were issued for (`sid`), so a request can be authenticated without a
/// database round trip while a refresh can still find its session.
///
/// # Security
///
/// - **Algorithm**: HS256 (HMAC with SHA-256)
/// - **Expiration**: `exp = iat + access TTL`, checked with zero leeway
/// - **Issuer**: always `"taskboard"`
/// - **Secret**: at least 32 bytes, enforced by configuration
///
/// # Example
///
/// ```
/// use chrono::{Duration, Utc};
/// use taskboard_shared::auth::jwt::{create_token, validate_token, Claims};
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let secret = "a-secret-key-that-is-at-least-32-bytes";
/// let claims = Claims::new(Uuid::new_v4(), Uuid::new_v4(), Utc::now(), Duration::minutes(15));
///
/// let token = create_token(&claims, secret)?;
/// let validated = validate_token(&token, secret)?;
/// assert_eq!(validated.sub, claims.sub);
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Value of the `iss` claim
pub const ISSUER: &str = "taskboard";

/// Error type for JWT operations
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("Failed to create token: {0}")]
    CreateError(String),

    #[error("Token has expired")]
    Expired,

    /// Bad signature, wrong issuer, malformed payload
    #[error("Invalid token: {0}")]
    Invalid(String),
}

/// Access token claims
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - user ID
    pub sub: Uuid,

    /// Session the token belongs to
    pub sid: Uuid,

    /// Issuer - always "taskboard"
    pub iss: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Not before (Unix timestamp)
    pub nbf: i64,
}

impl Claims {
    /// Creates claims issued at `issued_at` and valid for `ttl`
    pub fn new(user_id: Uuid, session_id: Uuid, issued_at: DateTime<Utc>, ttl: Duration) -> Self {
        let iat = issued_at.timestamp();

        Self {
            sub: user_id,
            sid: session_id,
            iss: ISSUER.to_string(),
            iat,
            exp: iat + ttl.num_seconds(),
            nbf: iat,
        }
    }

    /// Expiry as a timestamp
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.exp, 0).single()
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.exp
    }
}

/// Signs claims with HS256
///
/// # Errors
///
/// Returns `JwtError::CreateError` if encoding fails
pub fn create_token(claims: &Claims, secret: &str) -> Result<String, JwtError> {
    let header = Header::new(Algorithm::HS256);
    let key = EncodingKey::from_secret(secret.as_bytes());

    encode(&header, claims, &key)
        .map_err(|e| JwtError::CreateError(format!("Token encoding failed: {}", e)))
}

fn validation(check_expiry: bool) -> Validation {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);
    validation.leeway = 0;
    validation.validate_exp = check_expiry;
    validation.validate_nbf = true;
    validation
}

fn decode_claims(token: &str, secret: &str, check_expiry: bool) -> Result<Claims, JwtError> {
    let key = DecodingKey::from_secret(secret.as_bytes());

    let claims = decode::<Claims>(token, &key, &validation(check_expiry))
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => JwtError::Expired,
            _ => JwtError::Invalid(e.to_string()),
        })?;

    // jsonwebtoken still accepts a token when `now == exp`
    if check_expiry && claims.is_expired_at(Utc::now()) {
        return Err(JwtError::Expired);
    }

    Ok(claims)
}

/// Validates signature, issuer, `nbf` and expiry
///
/// # Errors
///
/// - `JwtError::Expired` once `exp` has passed
/// - `JwtError::Invalid` for any other defect
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    decode_claims(token, secret, true)
}

/// Validates a token but accepts it after expiry
///
/// Used by refresh, where an expired access token is the normal case. The
/// signature and issuer are still verified.
pub fn decode_expired_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    decode_claims(token, secret, false)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-that-is-at-least-32-bytes-long";

    fn claims_at(issued_at: DateTime<Utc>, ttl: Duration) -> Claims {
        Claims::new(Uuid::new_v4(), Uuid::new_v4(), issued_at, ttl)
    }

    #[test]
    fn test_claims_expire_at_issue_plus_ttl() {
        let now = Utc::now();
        let claims = claims_at(now, Duration::minutes(15));

        assert_eq!(claims.iss, ISSUER);
        assert_eq!(claims.nbf, claims.iat);
        assert_eq!(claims.exp - claims.iat, 15 * 60);
        assert!(!claims.is_expired_at(now));
        assert!(claims.is_expired_at(now + Duration::minutes(15)));
    }

    #[test]
    fn test_create_and_validate_token() {
        let claims = claims_at(Utc::now(), Duration::minutes(15));
        let token = create_token(&claims, SECRET).unwrap();

        assert_eq!(token.split('.').count(), 3);
        assert_eq!(validate_token(&token, SECRET).unwrap(), claims);
    }

    #[test]
    fn test_validate_token_wrong_secret() {
        let claims = claims_at(Utc::now(), Duration::minutes(15));
        let token = create_token(&claims, SECRET).unwrap();

        let result = validate_token(&token, "another-secret-key-that-is-long-enough");
        assert!(matches!(result, Err(JwtError::Invalid(_))));
    }

    #[test]
    fn test_validate_token_expired() {
        let claims = claims_at(Utc::now() - Duration::hours(1), Duration::minutes(15));
        let token = create_token(&claims, SECRET).unwrap();

        assert!(matches!(validate_token(&token, SECRET), Err(JwtError::Expired)));
    }

    #[test]
    fn test_validate_token_expired_at_exact_expiry() {
        let ttl = Duration::minutes(15);
        let claims = claims_at(Utc::now() - ttl, ttl);
        let token = create_token(&claims, SECRET).unwrap();

        assert!(matches!(validate_token(&token, SECRET), Err(JwtError::Expired)));
        assert!(decode_expired_token(&token, SECRET).is_ok());
    }

    #[test]
    fn test_decode_expired_token_accepts_expired() {
        let claims = claims_at(Utc::now() - Duration::hours(1), Duration::minutes(15));
        let token = create_token(&claims, SECRET).unwrap();

        assert_eq!(decode_expired_token(&token, SECRET).unwrap(), claims);
        assert!(decode_expired_token(&token, "wrong-secret-wrong-secret-wrong-secret").is_err());
    }

    #[test]
    fn test_validate_token_malformed() {
        assert!(matches!(validate_token("not-a-jwt", SECRET), Err(JwtError::Invalid(_))));
        assert!(matches!(validate_token("", SECRET), Err(JwtError::Invalid(_))));
        assert!(decode_expired_token("a.b.c", SECRET).is_err());
    }

    #[test]
    fn test_validate_token_wrong_issuer() {
        let mut claims = claims_at(Utc::now(), Duration::minutes(15));
        claims.iss = "someone-else".to_string();
        let token = create_token(&claims, SECRET).unwrap();

        assert!(matches!(validate_token(&token, SECRET), Err(JwtError::Invalid(_))));
    }
}
