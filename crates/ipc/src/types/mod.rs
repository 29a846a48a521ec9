//! Value types shared between the core and the UI.

mod report;
mod stats;

pub use report::*;
pub use stats::*;
