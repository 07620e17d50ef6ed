//! Media library: track identity, the per-track preview slot and the
//! folder scan that produces the master list.

mod model;
mod scan;

pub use model::*;
pub use scan::scan;
