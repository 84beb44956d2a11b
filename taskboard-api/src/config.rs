/// Configuration for the API server
///
/// Built once at startup from the process environment (a `.env` file is
/// loaded first when present) and shared read-only through the application
/// state.
///
/// # Environment Variables
///
/// - `API_HOST`: host to bind to (default: 0.0.0.0)
/// - `API_PORT`: port to bind to (default: 8080)
/// - `CORS_ORIGINS`: comma separated origins, `*` for any (default: *)
/// - `PRODUCTION`: enables HSTS and `Secure` cookies (default: false)
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default: 10)
/// - `JWT_SECRET`: HS256 signing secret, at least 32 characters (required)
/// - `JWT_ACCESS_EXPIRE`: access token lifetime in minutes (default: 15)
/// - `JWT_REFRESH_EXPIRE`: refresh token lifetime in minutes (default: 30 days)
/// - `JWT_REFRESH_LONG_EXPIRE`: remember-me refresh lifetime in minutes (default: 900 days)
/// - `STORAGE_ENDPOINT`, `STORAGE_ACCESS_KEY`, `STORAGE_SECRET_KEY`: optional object storage
///
/// # Example
///
/// ```no_run
/// use taskboard_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use anyhow::Context;
use chrono::Duration;
use config::{Environment, Source};
use serde::Deserialize;
use taskboard_shared::auth::tokens::TokenConfig;

/// Minimum length of `JWT_SECRET`
pub const MIN_SECRET_LENGTH: usize = 32;

/// Complete application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,

    /// Object storage credentials, if configured
    pub storage: Option<StorageConfig>,
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,

    /// Allowed CORS origins; empty means any origin
    pub cors_origins: Vec<String>,

    /// Production mode: HSTS and `Secure` cookies
    pub production: bool,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// Token secret and lifetimes, in minutes
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Generate with: `openssl rand -hex 32`
    pub secret: String,
    pub access_expire_minutes: i64,
    pub refresh_expire_minutes: i64,
    pub refresh_long_expire_minutes: i64,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub endpoint: String,
    pub access_key: String,
    pub secret_key: String,
}

/// Flat view of the environment, one field per variable
#[derive(Debug, Deserialize)]
struct RawConfig {
    api_host: String,
    api_port: u16,
    cors_origins: String,
    production: bool,
    database_url: Option<String>,
    database_max_connections: u32,
    jwt_secret: Option<String>,
    jwt_access_expire: i64,
    jwt_refresh_expire: i64,
    jwt_refresh_long_expire: i64,
    storage_endpoint: Option<String>,
    storage_access_key: Option<String>,
    storage_secret_key: Option<String>,
}

impl Config {
    /// Loads configuration from the process environment
    ///
    /// # Errors
    ///
    /// Fails if `DATABASE_URL` or `JWT_SECRET` is missing, the secret is
    /// shorter than 32 characters, a lifetime is not positive, or a value
    /// does not parse.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_source(Environment::default().try_parsing(true))
    }

    /// Loads configuration from any `config` source keyed like the environment
    pub fn from_source<S>(source: S) -> anyhow::Result<Self>
    where
        S: Source + Send + Sync + 'static,
    {
        let raw: RawConfig = config::Config::builder()
            .set_default("api_host", "0.0.0.0")?
            .set_default("api_port", 8080)?
            .set_default("cors_origins", "*")?
            .set_default("production", false)?
            .set_default("database_max_connections", 10)?
            .set_default("jwt_access_expire", 15)?
            .set_default("jwt_refresh_expire", 43_200)?
            .set_default("jwt_refresh_long_expire", 1_296_000)?
            .add_source(source)
            .build()?
            .try_deserialize()
            .context("Invalid configuration value")?;

        let database_url = raw
            .database_url
            .filter(|url| !url.is_empty())
            .context("DATABASE_URL environment variable is required")?;

        let jwt_secret = raw
            .jwt_secret
            .context("JWT_SECRET environment variable is required")?;
        if jwt_secret.chars().count() < MIN_SECRET_LENGTH {
            anyhow::bail!("JWT_SECRET must be at least {} characters long", MIN_SECRET_LENGTH);
        }

        for (name, minutes) in [
            ("JWT_ACCESS_EXPIRE", raw.jwt_access_expire),
            ("JWT_REFRESH_EXPIRE", raw.jwt_refresh_expire),
            ("JWT_REFRESH_LONG_EXPIRE", raw.jwt_refresh_long_expire),
        ] {
            if minutes <= 0 {
                anyhow::bail!("{} must be a positive number of minutes", name);
            }
        }

        let storage = match (raw.storage_endpoint, raw.storage_access_key, raw.storage_secret_key) {
            (Some(endpoint), Some(access_key), Some(secret_key)) => Some(StorageConfig {
                endpoint,
                access_key,
                secret_key,
            }),
            _ => None,
        };

        Ok(Self {
            api: ApiConfig {
                host: raw.api_host,
                port: raw.api_port,
                cors_origins: parse_origins(&raw.cors_origins),
                production: raw.production,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections: raw.database_max_connections,
            },
            jwt: JwtConfig {
                secret: jwt_secret,
                access_expire_minutes: raw.jwt_access_expire,
                refresh_expire_minutes: raw.jwt_refresh_expire,
                refresh_long_expire_minutes: raw.jwt_refresh_long_expire,
            },
            storage,
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    /// Secret and lifetimes for the token issuer
    pub fn token_config(&self) -> TokenConfig {
        TokenConfig {
            secret: self.jwt.secret.clone(),
            access_ttl: Duration::minutes(self.jwt.access_expire_minutes),
            refresh_ttl: Duration::minutes(self.jwt.refresh_expire_minutes),
            refresh_remember_ttl: Duration::minutes(self.jwt.refresh_long_expire_minutes),
        }
    }
}

/// Splits `CORS_ORIGINS`; `*` or an empty value allows any origin
fn parse_origins(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty() && *origin != "*")
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::{Map, Value};

    /// In-memory source keyed like the environment
    #[derive(Debug, Clone, Default)]
    pub struct MapSource(pub Map<String, Value>);

    impl MapSource {
        pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
            self.0.insert(key.to_string(), value.into());
            self
        }
    }

    impl Source for MapSource {
        fn clone_into_box(&self) -> Box<dyn Source + Send + Sync> {
            Box::new(self.clone())
        }

        fn collect(&self) -> Result<Map<String, Value>, config::ConfigError> {
            Ok(self.0.clone())
        }
    }

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    fn required() -> MapSource {
        MapSource::default()
            .with("database_url", "postgresql://localhost/taskboard")
            .with("jwt_secret", SECRET)
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_source(required()).unwrap();

        assert_eq!(config.bind_address(), "0.0.0.0:8080");
        assert!(config.api.cors_origins.is_empty());
        assert!(!config.api.production);
        assert_eq!(config.database.max_connections, 10);
        assert!(config.storage.is_none());

        let tokens = config.token_config();
        assert_eq!(tokens.access_ttl, Duration::minutes(15));
        assert_eq!(tokens.refresh_ttl, Duration::days(30));
        assert_eq!(tokens.refresh_remember_ttl, Duration::days(900));
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_source(
            required()
                .with("api_port", 9000)
                .with("cors_origins", "https://a.example, https://b.example")
                .with("production", true)
                .with("jwt_access_expire", 5)
                .with("storage_endpoint", "https://s3.example")
                .with("storage_access_key", "key")
                .with("storage_secret_key", "secret"),
        )
        .unwrap();

        assert_eq!(config.api.port, 9000);
        assert_eq!(config.api.cors_origins, vec!["https://a.example", "https://b.example"]);
        assert!(config.api.production);
        assert_eq!(config.token_config().access_ttl, Duration::minutes(5));
        assert_eq!(config.storage.map(|s| s.endpoint), Some("https://s3.example".to_string()));
    }

    #[test]
    fn test_missing_required_values() {
        let no_secret = MapSource::default().with("database_url", "postgresql://localhost/taskboard");
        assert!(Config::from_source(no_secret).is_err());

        let no_database = MapSource::default().with("jwt_secret", SECRET);
        assert!(Config::from_source(no_database).is_err());
    }

    #[test]
    fn test_short_secret_rejected() {
        let source = required().with("jwt_secret", "too-short");
        let err = Config::from_source(source).unwrap_err();
        assert!(err.to_string().contains("at least 32"));
    }

    #[test]
    fn test_non_positive_lifetime_rejected() {
        assert!(Config::from_source(required().with("jwt_refresh_expire", 0)).is_err());
    }
}
