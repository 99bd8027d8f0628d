//! Authentication backend for the northblog API: user registration, password
//! login and HS256 access tokens.
//!
//! - **auth**: hashing, tokens, user store, register/login service, HTTP routes
//! - **config**: environment-driven settings
//! - **db**: Postgres pool and migrations
//! - **error**: error taxonomy and its HTTP mapping
//! - **app**: router, middleware and server loop
//! - **openapi**: OpenAPI document and Swagger UI

pub mod app;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod openapi;
pub mod state;

pub use error::{AuthError, AuthResult};
pub use state::AppState;
