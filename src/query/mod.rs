//! Query collaborator boundary.
//!
//! The engine reaches the backing document store only through the
//! [`QueryEngine`] request/response interface; queries are suspension
//! points, never blocking calls. [`SledQueryEngine`] is the embedded
//! reference implementation.

mod engine;
mod file_cache;
mod sled_engine;
mod spec;

pub use engine::*;
pub use file_cache::*;
pub use sled_engine::*;
pub use spec::*;
