//! Error types for decoding verifier inputs.

use thiserror::Error;

/// A malformed or missing field in an input record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// A field was not valid base64.
    #[error("batch {batch}: field '{field}' is not valid base64: {reason}")]
    Base64 {
        batch: i64,
        field: &'static str,
        reason: String,
    },

    /// A field was not valid hex.
    #[error("field '{field}' is not valid hex: {reason}")]
    Hex { field: &'static str, reason: String },

    /// A base64 field outside the proof table was not valid base64.
    #[error("field '{field}' is not valid base64: {reason}")]
    FieldBase64 { field: &'static str, reason: String },

    /// A digest outside the proof table did not decode to exactly 32 bytes.
    #[error("field '{field}' must be 32 bytes, got {len}")]
    FieldLength { field: &'static str, len: usize },

    /// A digest did not decode to exactly 32 bytes.
    #[error("batch {batch}: field '{field}' must be 32 bytes, got {len}")]
    DigestLength {
        batch: i64,
        field: &'static str,
        len: usize,
    },

    /// A (previous, new) pair did not carry exactly two entries.
    #[error("batch {batch}: field '{field}' must hold 2 entries, got {len}")]
    PairLength {
        batch: i64,
        field: &'static str,
        len: usize,
    },

    /// A batch carried no proof bytes.
    #[error("batch {batch}: proof is empty")]
    EmptyProof { batch: i64 },
}
