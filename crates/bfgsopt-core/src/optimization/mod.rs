//! Line searches and the optimizer framework.

pub mod line_search;
pub mod optimizer;

// Re-export optimization components
pub use line_search::*;
pub use optimizer::*;
