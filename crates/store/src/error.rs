//! Store error types

use thiserror::Error;

/// Errors from flow-log reading and writing
#[derive(Debug, Error)]
pub enum StoreError {
    /// I/O error from the underlying file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Existing file does not start with the log magic
    #[error("bad log magic 0x{found:08x} (expected 0x{expected:08x})")]
    BadMagic { found: u32, expected: u32 },

    /// Existing file uses an unsupported format version
    #[error("unsupported log version {found} (expected {expected})")]
    BadVersion { found: u32, expected: u32 },

    /// File ended in the middle of a header or record
    #[error("truncated log: {context}")]
    Truncated { context: &'static str },

    /// Record field mask carries bits this reader does not know
    #[error("record field mask 0x{bits:08x} has unknown bits")]
    UnknownFields { bits: u32 },

    /// Flow cannot be serialized as-is
    #[error("flow src/dst address family mismatch")]
    FamilyMismatch,
}
