//! Crate-wide error type. One variant per error kind named in the spec's
//! error taxonomy, plus the two boundary passthroughs (`io`, JSON import).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DalError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("magic number mismatch")]
    MagicMismatch,

    #[error("buffer truncated: needed {needed} more byte(s), {remaining} remaining")]
    Truncated { needed: usize, remaining: usize },

    #[error("corrupted data: {0}")]
    Corrupted(String),

    #[error("unterminated string: no NUL byte before end of buffer")]
    UnterminatedString,

    #[error("decompression failed")]
    DecompressionFailed,

    #[error("compression failed")]
    CompressionFailed,

    #[error("base64 decode failed")]
    Base64Decode,

    #[error("key is invalid: {0}")]
    KeyInvalid(String),

    #[error("signature is invalid")]
    SignatureInvalid,

    #[error("unsupported version: {0}")]
    UnsupportedVersion(u64),

    #[error("duplicate name in bundle: '{0}'")]
    DuplicateName(String),

    #[error("name not found: '{0}'")]
    NameNotFound(String),

    #[error("scene references more than one skeleton")]
    MultipleSkeletons,

    #[error("resource kind is not supported: '{0}'")]
    ResourceNotSupported(String),

    #[error("invariant violated: {0}")]
    InvariantViolation(String),
}

pub type DalResult<T> = Result<T, DalError>;

impl DalError {
    /// Maps each error kind to a distinct non-zero process exit code
    /// (spec §6: "the error taxonomy of §7 maps one-to-one to distinct
    /// non-zero codes").
    pub fn exit_code(&self) -> i32 {
        match self {
            DalError::Io(_) => 1,
            DalError::Json(_) => 2,
            DalError::MagicMismatch => 3,
            DalError::Truncated { .. } => 4,
            DalError::Corrupted(_) => 5,
            DalError::UnterminatedString => 6,
            DalError::DecompressionFailed => 7,
            DalError::CompressionFailed => 8,
            DalError::Base64Decode => 9,
            DalError::KeyInvalid(_) => 10,
            DalError::SignatureInvalid => 11,
            DalError::UnsupportedVersion(_) => 12,
            DalError::DuplicateName(_) => 13,
            DalError::NameNotFound(_) => 14,
            DalError::MultipleSkeletons => 15,
            DalError::ResourceNotSupported(_) => 16,
            DalError::InvariantViolation(_) => 17,
        }
    }
}
