//! Admin reporting: totals and the completed-consultation export.

mod summary;

pub use summary::*;
