//! Utility functions and helper types.

pub mod test_functions;
