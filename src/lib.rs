//! Layered settings resolution service.
//!
//! `settingsd` stores scoped configuration records (system defaults,
//! country variants, per-app overrides, volatile session values) and
//! resolves them into one effective value map per request through a
//! deterministic priority-scored merge. Callers may subscribe to the keys
//! they read; writes, country changes, dimension changes and foreground
//! app switches re-derive the affected views and push only the keys whose
//! effective value changed.
//!
//! Entry points:
//! - [`ServiceBuilder`] wires the collaborators and produces a [`Service`]
//! - [`SettingsEngine`] is the single-threaded event loop behind it
//! - [`RecordMerger`] is the pure merge core, usable standalone

pub mod config;
pub mod constants;
mod dispatch;
mod engine;
mod errors;
mod merge;
mod model;
mod query;
mod schema;
mod service;
mod subscription;
pub mod utils;

pub use dispatch::*;
pub use engine::*;
pub use errors::*;
pub use merge::*;
pub use model::*;
pub use query::*;
pub use schema::*;
pub use service::*;
pub use subscription::*;

#[cfg(test)]
pub mod test_utils;
