//! Shared fixtures for unit tests.

pub mod context;
pub mod record;
pub mod schema;
