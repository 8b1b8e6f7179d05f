//! Error taxonomy for the IGFS library (spec §7).
//!
//! Parsing and verification fail closed: the first error aborts the
//! current operation. There is no silent recovery from an integrity
//! failure anywhere in this crate.

use igfs_common::model::ModelError;
use igfs_io::codec::CodecError;

/// The single error type returned by all fallible `igfs` operations.
#[derive(Debug, thiserror::Error)]
pub enum IgfsError {
    #[error("io error: {0}")]
    Io(#[from] igfs_io::Error),

    #[error("truncated data: need {needed} bytes, have {available}")]
    Truncated { needed: usize, available: usize },

    #[error("invalid magic in {where_}: expected {expected:#x}, got {got:#x}")]
    InvalidMagic {
        where_: &'static str,
        expected: u32,
        got: u32,
    },

    #[error("section index {index} out of range (image has {max} sections)")]
    OutOfRange { index: u32, max: u32 },

    #[error("corrupt directory: {0}")]
    CorruptDirectory(&'static str),

    #[error("partition chain for minor {0} contains a cycle")]
    CycleDetected(u32),

    #[error("CRC32 checksum failed for section {0}")]
    ChecksumFailed(u32),

    #[error("BLAKE2b hash mismatch for section {0}")]
    HashMismatch(u32),

    #[error("RSA signature verification failed")]
    SignatureInvalid,

    #[error("no trusted key verified the hash block signature")]
    UntrustedSigner,

    #[error("AEAD authentication failed while decrypting extent filesystem")]
    AeadFailure,

    #[error("key derivation failed: {0}")]
    KdfFailure(&'static str),

    #[error("master/filesystem key unwrap failed")]
    UnwrapFailure,

    #[error("optional feature not enabled: {0}")]
    FeatureNotEnabled(&'static str),

    #[error("the image is not a valid IGFS image: {0}")]
    InvalidImage(&'static str),

    #[error("operation cancelled")]
    Cancelled,
}

impl From<ModelError> for IgfsError {
    fn from(value: ModelError) -> Self {
        match value {
            ModelError::Truncated { needed, available } => IgfsError::Truncated { needed, available },
        }
    }
}

impl From<CodecError> for IgfsError {
    fn from(value: CodecError) -> Self {
        match value {
            CodecError::Truncated { needed, available } => IgfsError::Truncated { needed, available },
        }
    }
}

pub type Result<T> = core::result::Result<T, IgfsError>;
