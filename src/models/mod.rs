//! Data models representing database entities and API payloads.

/// API key authentication model
pub mod api_key;
/// List pagination and response envelope
pub mod pagination;
/// Permission scope registry
pub mod scope;
/// Tenants and their locations
pub mod tenant;
