//! Subscription bookkeeping for outstanding subscribed requests.

mod index;
mod waiter;

pub use index::*;
pub use waiter::*;
