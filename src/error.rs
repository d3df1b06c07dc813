//! Error types for the temporal clustering model.
//!
//! Every variant is fatal for the step that raised it: the model validates
//! before it mutates, so a returned error leaves the registry exactly as it
//! was before the call.

use alloc::string::String;

use thiserror::Error;

/// Errors raised by [`crate::model::DdpMeans`] and its inputs.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DdpError {
    /// A point or batch does not have the model's fixed dimensionality.
    #[error("Dimension mismatch: expected {expected}, actual {actual}")]
    DimensionMismatch {
        /// Dimensionality fixed at construction.
        expected: usize,
        /// Dimensionality that was supplied.
        actual: usize,
    },

    /// A cluster that existed at the last commit has no age/weight entry.
    ///
    /// Indicates broken registry bookkeeping; never masked.
    #[error("Missing age/weight state for cluster {cluster} ({committed} clusters committed)")]
    MissingClusterState {
        /// Index of the cluster whose state was looked up.
        cluster: usize,
        /// Number of age/weight entries present.
        committed: usize,
    },

    /// More age/weight entries exist than the registry can account for.
    ///
    /// Indicates broken registry bookkeeping; never masked.
    #[error("Unexpected age/weight state: {entries} entries, expected {expected}")]
    UnexpectedClusterState {
        /// Number of age/weight entries present.
        entries: usize,
        /// Number of entries the registry should hold.
        expected: usize,
    },

    /// A model parameter is out of range.
    #[error("Invalid parameter: {message}")]
    InvalidParameter {
        /// What is wrong with the parameter.
        message: String,
    },

    /// Batch data cannot be interpreted as N points of dimension D.
    #[error("Invalid batch: {message}")]
    InvalidBatch {
        /// What is wrong with the batch.
        message: String,
    },

    /// An operation was called out of the label → center → commit → swap order.
    #[error("Step out of order: {message}")]
    StepOrder {
        /// Which ordering rule was broken.
        message: &'static str,
    },
}

impl DdpError {
    /// Create a DimensionMismatch error.
    pub fn dimension_mismatch(expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch { expected, actual }
    }

    /// Create a MissingClusterState error.
    pub fn missing_cluster_state(cluster: usize, committed: usize) -> Self {
        Self::MissingClusterState { cluster, committed }
    }

    /// Create an UnexpectedClusterState error.
    pub fn unexpected_cluster_state(entries: usize, expected: usize) -> Self {
        Self::UnexpectedClusterState { entries, expected }
    }

    /// Create an InvalidParameter error.
    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            message: message.into(),
        }
    }

    /// Create an InvalidBatch error.
    pub fn invalid_batch(message: impl Into<String>) -> Self {
        Self::InvalidBatch {
            message: message.into(),
        }
    }

    /// Create a StepOrder error.
    pub fn step_order(message: &'static str) -> Self {
        Self::StepOrder { message }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = core::result::Result<T, DdpError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_messages() {
        let errors = [
            DdpError::dimension_mismatch(3, 2),
            DdpError::missing_cluster_state(4, 2),
            DdpError::unexpected_cluster_state(3, 2),
            DdpError::invalid_parameter("tau must be >= 0"),
            DdpError::invalid_batch("dimension must be > 0"),
            DdpError::step_order("update_state called twice"),
        ];
        let expected = [
            "expected 3, actual 2",
            "cluster 4 (2 clusters committed)",
            "3 entries, expected 2",
            "tau must be >= 0",
            "dimension must be > 0",
            "called twice",
        ];

        for (err, needle) in errors.iter().zip(expected.iter()) {
            let display = err.to_string();
            assert!(
                display.contains(needle),
                "Display for {:?} should contain '{}', got: {}",
                err,
                needle,
                display
            );
        }
    }
}
