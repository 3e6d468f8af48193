//! HTTP middleware components.
//!
//! Middleware are functions that run before route handlers.
//! They can:
//! - Authenticate requests
//! - Enforce scopes, location scoping and rate limits
//! - Short-circuit requests (reject unauthorized)

/// API key guard for API v1 routes
pub mod auth;
