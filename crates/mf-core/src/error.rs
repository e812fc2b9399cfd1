//! Error enumeration shared by every feature pipeline stage.
//!
//! Each variant maps to a fixed numeric status so that callers speaking the
//! integer convention (`0` = success) can still consume the pipeline.

use thiserror::Error;

/// Errors returned by the feature extraction pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeatureError {
    /// A generic failure, e.g. a short read from a signal source.
    #[error("Feature pipeline error: {0}")]
    Generic(String),

    #[error("Operation timed out")]
    Timeout,

    #[error("Resource is full")]
    Full,

    #[error("Resource is empty")]
    Empty,

    /// A buffer could not be reserved.
    #[error("Out of memory: {0}")]
    NoMemory(String),

    #[error("Function not implemented")]
    NotImplemented,

    #[error("Resource busy")]
    Busy,

    /// The underlying sample source failed.
    #[error("IO error: {0}")]
    Io(String),

    #[error("Interrupted")]
    Interrupted,

    /// Precondition or shape violation detected before any work was done.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("No such device")]
    NoDevice,

    #[error("Operation not permitted")]
    NotPermitted,
}

impl FeatureError {
    /// Numeric status code of this error. Success is `0` and never an error.
    ///
    /// # Example
    /// ```
    /// use mf_core::error::FeatureError;
    /// assert_eq!(FeatureError::InvalidArgument("shape".into()).code(), 10);
    /// assert_eq!(FeatureError::NotPermitted.code(), 12);
    /// ```
    #[must_use]
    pub fn code(&self) -> i32 {
        match self {
            Self::Generic(_) => 1,
            Self::Timeout => 2,
            Self::Full => 3,
            Self::Empty => 4,
            Self::NoMemory(_) => 5,
            Self::NotImplemented => 6,
            Self::Busy => 7,
            Self::Io(_) => 8,
            Self::Interrupted => 9,
            Self::InvalidArgument(_) => 10,
            Self::NoDevice => 11,
            Self::NotPermitted => 12,
        }
    }

    /// Shorthand for an [`FeatureError::InvalidArgument`] built from a message.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}

/// Result type for feature pipeline operations.
pub type Result<T> = std::result::Result<T, FeatureError>;

/// Collapse a pipeline result into its integer status (`0` on success).
///
/// # Example
/// ```
/// use mf_core::error::{status, FeatureError, Result};
/// let ok: Result<()> = Ok(());
/// let err: Result<()> = Err(FeatureError::Busy);
/// assert_eq!(status(&ok), 0);
/// assert_eq!(status(&err), 7);
/// ```
#[must_use]
pub fn status<T>(result: &Result<T>) -> i32 {
    match result {
        Ok(_) => 0,
        Err(e) => e.code(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_distinct_and_nonzero() {
        let all = [
            FeatureError::Generic(String::new()),
            FeatureError::Timeout,
            FeatureError::Full,
            FeatureError::Empty,
            FeatureError::NoMemory(String::new()),
            FeatureError::NotImplemented,
            FeatureError::Busy,
            FeatureError::Io(String::new()),
            FeatureError::Interrupted,
            FeatureError::InvalidArgument(String::new()),
            FeatureError::NoDevice,
            FeatureError::NotPermitted,
        ];
        for (i, e) in all.iter().enumerate() {
            assert_eq!(e.code(), i as i32 + 1, "code inattendu pour {e:?}");
        }
    }

    #[test]
    fn message_includes_detail() {
        let e = FeatureError::invalid("features is 2x3, expected 50x32");
        assert_eq!(e.to_string(), "Invalid argument: features is 2x3, expected 50x32");
    }
}
