//! Shared types for melfeat: matrix primitive, signal capability, errors and config.

pub mod config;
pub mod error;
pub mod matrix;
pub mod signal;

pub use error::{FeatureError, Result};
pub use matrix::{MatSize, Matrix};
pub use signal::Signal;
