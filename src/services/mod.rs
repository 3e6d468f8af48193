//! Business logic services.
//!
//! Services hold the authentication core, separated from HTTP handlers:
//! key codec, rate limiting, request authentication and key issuance.

pub mod api_key_service;
pub mod authenticator;
pub mod key_codec;
pub mod rate_limiter;
