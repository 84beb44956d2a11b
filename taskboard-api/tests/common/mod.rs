//! Common test utilities for integration tests
//!
//! The router runs against an in-memory store, so these tests need no
//! database:
//! - Test configuration
//! - Request helpers returning status, headers and JSON body
//! - Account creation and login

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::sync::Arc;
use taskboard_api::app::{build_router, AppState};
use taskboard_api::config::{ApiConfig, Config, DatabaseConfig, JwtConfig};
use taskboard_shared::repository::memory::MemoryStore;
use tower::Service as _;

pub const SECRET: &str = "integration-test-secret-at-least-32-bytes";
pub const PASSWORD: &str = "secret";

/// Response as seen by the client
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    /// Machine-readable error code of an error response
    pub fn error_code(&self) -> &str {
        self.body["error"].as_str().unwrap_or_default()
    }

    pub fn set_cookie(&self) -> &str {
        self.headers
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
    }
}

/// Access and refresh token of a logged-in user
#[derive(Debug, Clone)]
pub struct Session {
    pub access: String,
    pub refresh: String,
}

pub fn test_config() -> Config {
    Config {
        api: ApiConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            cors_origins: Vec::new(),
            production: false,
        },
        database: DatabaseConfig {
            url: "postgresql://unused".to_string(),
            max_connections: 1,
        },
        jwt: JwtConfig {
            secret: SECRET.to_string(),
            access_expire_minutes: 15,
            refresh_expire_minutes: 43_200,
            refresh_long_expire_minutes: 1_296_000,
        },
        storage: None,
    }
}

/// Test context: the router and the store behind it
pub struct TestContext {
    pub store: Arc<MemoryStore>,
    pub app: Router,
}

impl TestContext {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(store.clone(), test_config());

        Self {
            store,
            app: build_router(state),
        }
    }

    /// Sends a request with an optional bearer token and JSON body
    pub async fn send(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        self.call(request).await
    }

    pub async fn call(&self, request: Request<Body>) -> TestResponse {
        let response = self.app.clone().call(request).await.unwrap();

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into()))
        };

        TestResponse { status, headers, body }
    }

    pub async fn signup(&self, username: &str) -> TestResponse {
        self.send(
            Method::POST,
            "/api/auth/signup",
            None,
            Some(json!({
                "username": username,
                "email": format!("{}@example.com", username),
                "password": PASSWORD,
                "name": username,
            })),
        )
        .await
    }

    pub async fn login(&self, login: &str) -> Session {
        let response = self
            .send(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({ "login": login, "password": PASSWORD })),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "login failed: {:?}", response.body);

        Session {
            access: response.body["access"].as_str().unwrap().to_string(),
            refresh: response.body["refresh"].as_str().unwrap().to_string(),
        }
    }

    /// Signs up `username` and logs in
    pub async fn user(&self, username: &str) -> (String, Session) {
        let response = self.signup(username).await;
        assert_eq!(response.status, StatusCode::CREATED, "signup failed: {:?}", response.body);

        let id = response.body["id"].as_str().unwrap().to_string();
        (id, self.login(username).await)
    }

    /// Creates a project and returns its JSON
    pub async fn project(&self, session: &Session, name: &str) -> Value {
        let response = self
            .send(
                Method::POST,
                "/api/project/",
                Some(&session.access),
                Some(json!({ "name": name })),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "create project failed: {:?}", response.body);
        response.body
    }
}
