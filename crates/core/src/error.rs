//! Error types for pcmstream_core

use thiserror::Error;

/// Errors raised by the chunker.
///
/// Only construction can fail; per-burst processing is infallible.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChunkerError {
    #[error("Invalid configuration: {field} {reason}")]
    InvalidConfiguration {
        field: &'static str,
        reason: &'static str,
    },
}

impl ChunkerError {
    pub(crate) fn invalid(field: &'static str, reason: &'static str) -> Self {
        Self::InvalidConfiguration { field, reason }
    }
}

/// Result type for chunker operations
pub type ChunkerResult<T> = Result<T, ChunkerError>;
