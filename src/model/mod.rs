mod condition;
mod dimension;
mod record;

pub use condition::*;
pub use dimension::*;
pub use record::*;
