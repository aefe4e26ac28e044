//! Service assembly and the public running-service handle.

mod builder;
mod service;

pub use builder::*;
pub use service::*;
