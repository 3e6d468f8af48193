//! HTTP request handlers (route handlers).
//!
//! API v1 handlers run behind the API key guard and receive an
//! `ApiContext` extension; they only ever query within its tenant/location.

/// Calling key introspection
pub mod api_key;
/// Service health endpoint
pub mod health;
/// Practice locations
pub mod locations;
