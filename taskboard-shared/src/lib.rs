//! # Taskboard Shared Library
//!
//! Domain types, persistence and business logic of the Taskboard backend.
//! The HTTP layer lives in `taskboard-api` and only translates requests
//! into calls of this crate.
//!
//! ## Module Organization
//!
//! - `models`: row types and their SQL queries
//! - `repository`: persistence traits with PostgreSQL and in-memory stores
//! - `auth`: passwords, tokens, login/refresh/signup flows, access checks
//! - `activity`: human-readable task activity messages
//! - `service`: project, section, task and user use cases
//! - `db`: connection pool and embedded migrations
//! - `error`: the domain error taxonomy

pub mod activity;
pub mod auth;
pub mod db;
pub mod error;
pub mod models;
pub mod repository;
pub mod service;

/// Current version of the Taskboard shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
