//! Priority-scored record merging.
//!
//! [`RecordMerger`] collapses a flat list of raw records into one effective
//! value map for a (category, app, dimension) context; [`score`] carries
//! the explicit composite priority; [`volatile`] patches in ephemeral
//! overlay values after the merge.

mod merger;
mod score;
mod volatile;

pub use merger::*;
pub use score::*;
pub use volatile::*;
