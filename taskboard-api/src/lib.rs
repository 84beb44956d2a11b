//! # Taskboard API Server Library
//!
//! HTTP surface of the task board: configuration, application state, the
//! router and its handlers. Business rules live in `taskboard-shared`; the
//! handlers here validate request shape, call the shared services and map
//! their errors to HTTP.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `middleware`: Authentication and security headers
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
