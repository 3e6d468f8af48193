//! Common test utilities and helpers
//!
//! - In-memory implementations of the store traits
//! - Fixtures for tenants, locations and keys
//! - A test application wrapper around the router

#![allow(dead_code)]

pub mod fixtures;
pub mod mocks;
pub mod test_app;

pub use fixtures::*;
pub use mocks::*;
pub use test_app::*;
