//! Error types for the aggregate-operation engine.
//!
//! Numeric boundary conditions (a dot product outside the sigmoid table, an
//! invalid negative-sampling draw) are not errors: kernels skip or fall back
//! silently. The variants here cover malformed buffers, descriptors and
//! configuration, all of which are caught before any kernel runs.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for aggregate operations.
#[derive(Error, Debug)]
pub enum AggregateError {
    /// A buffer length does not fit the matrix layout.
    #[error("Shape error in {buffer}: {reason}")]
    Shape {
        /// Which buffer was rejected.
        buffer: &'static str,
        /// Human-readable explanation.
        reason: String,
    },

    /// A lookup table has no entries.
    #[error("Empty table: {0}")]
    EmptyTable(&'static str),

    /// A descriptor asks for negative rounds but no negative table was supplied.
    #[error("Negative sampling requested but no negative table was provided")]
    MissingNegTable,

    /// The vocabulary is too small for the negative-sampling fallback draw.
    #[error("Negative sampling needs a vocabulary of at least 2 words, got {0}")]
    VocabTooSmall(usize),

    /// Index out of bounds.
    #[error("Index out of bounds for {what}: {index} >= {max}")]
    IndexOutOfBounds {
        /// Which index space was violated.
        what: &'static str,
        /// The index that was out of bounds.
        index: usize,
        /// The exclusive upper bound.
        max: usize,
    },

    /// A hierarchical-softmax path has a different number of nodes and codes.
    #[error("Huffman path has {nodes} nodes but {codes} codes")]
    CodeLengthMismatch {
        /// Number of tree-node indices.
        nodes: usize,
        /// Number of Huffman codes.
        codes: usize,
    },

    /// A Huffman code other than 0 or 1.
    #[error("Invalid Huffman code {0}, expected 0 or 1")]
    InvalidCode(u8),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// File not found.
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Accelerator failure.
    #[error("GPU error: {0}")]
    Gpu(String),
}

/// Result type alias for aggregate operations.
pub type Result<T> = std::result::Result<T, AggregateError>;

impl From<serde_json::Error> for AggregateError {
    fn from(err: serde_json::Error) -> Self {
        AggregateError::Serialization(err.to_string())
    }
}

impl AggregateError {
    pub(crate) fn shape(buffer: &'static str, reason: impl Into<String>) -> Self {
        AggregateError::Shape {
            buffer,
            reason: reason.into(),
        }
    }
}
