//! Change-event fan-out: the notification dispatcher and the per-app
//! switch reconciler.

mod app_switch;
mod dispatcher;
mod exclude;

pub use app_switch::*;
pub use dispatcher::*;
pub use exclude::*;

#[cfg(test)]
mod app_switch_test;
