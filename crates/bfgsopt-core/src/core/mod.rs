//! Core traits and types for quasi-Newton optimization.

pub mod cost_function;
pub mod error;
pub mod line_function;
pub mod types;

// Re-export core types
pub use cost_function::*;
pub use error::*;
pub use line_function::*;
pub use types::*;
