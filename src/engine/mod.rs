//! The settings engine core: service context, event loop and the read
//! pipeline.

mod context;
mod engine;
mod event;
mod request;
mod resolver;

pub use context::*;
pub use engine::*;
pub use event::*;
pub use request::*;
pub use resolver::*;

#[cfg(test)]
mod resolver_test;
