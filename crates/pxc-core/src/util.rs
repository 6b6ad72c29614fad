//! Common utility functions.

pub mod data;

// Re-export commonly used items
pub use data::{load_yaml, deep_merge};
