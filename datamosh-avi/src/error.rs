//! Error types for AVI payload rewriting.

use crate::chunks::FourCC;
use thiserror::Error;

/// Result type for datamosh operations
pub type Result<T> = std::result::Result<T, MoshError>;

/// Broad category of a [`MoshError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The byte stream is not a RIFF/AVI file this tool can walk.
    Format,
    /// `movi` and `idx1` disagree with each other.
    Consistency,
    /// The frame-selection policy is invalid.
    Config,
    /// Reading or writing a file failed.
    Io,
}

/// Errors that can occur while parsing, transforming or rebuilding an AVI file.
#[derive(Error, Debug)]
pub enum MoshError {
    /// IO error during read/write
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Missing `RIFF` magic or `AVI ` form type
    #[error("Not a RIFF AVI file")]
    NotRiffAvi,

    /// Required top-level chunk not found
    #[error("{0} chunk not found")]
    MissingChunk(&'static str),

    /// Byte stream ends before a structure is complete
    #[error("Truncated {what}: need {needed} bytes, have {available}")]
    Truncated {
        what: &'static str,
        needed: usize,
        available: usize,
    },

    /// A `LIST` chunk inside `movi`
    #[error("Nested LIST chunk ({0}) inside movi is not supported")]
    NestedList(FourCC),

    /// `idx1` size is not a whole number of 16-byte entries
    #[error("idx1 chunk has {0} trailing bytes")]
    TrailingIndexBytes(usize),

    /// `idx1` starts before the end of `movi`
    #[error("idx1 chunk must follow the movi list")]
    IndexBeforeMovi,

    /// Rebuilt container does not fit 32-bit RIFF sizes
    #[error("Output too large for a RIFF container: {0} bytes")]
    OutputTooLarge(usize),

    /// A movi chunk declares more data than the payload holds
    #[error("Chunk at movi position {position} exceeds movi payload size ({size} bytes declared)")]
    ChunkOverrun { position: usize, size: u32 },

    /// More movi chunks than index entries
    #[error("idx1 has fewer entries than movi chunks")]
    IndexExhausted,

    /// Index entries left after the payload was consumed
    #[error("idx1 contains {remaining} extra entries after parsing movi")]
    IndexSurplus { remaining: usize },

    /// Chunk order differs between movi and idx1
    #[error("movi chunk order does not match idx1 at position {position}: movi has {movi}, idx1 has {index}")]
    TagMismatch {
        position: usize,
        movi: FourCC,
        index: FourCC,
    },

    /// Chunk size differs between movi and idx1
    #[error("Chunk size mismatch between movi and idx1 at position {position}: {movi} vs {index}")]
    SizeMismatch { position: usize, movi: u32, index: u32 },

    /// Chunk offset differs between movi and idx1
    #[error("Chunk offset mismatch between movi and idx1: expected {expected}, idx1 has {index}")]
    OffsetMismatch { expected: usize, index: u32 },

    /// Invalid frame-selection policy
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Malformed keyframe index specification
    #[error("{0}")]
    InvalidKeyframeSpec(String),
}

impl MoshError {
    /// Category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            MoshError::Io(_) => ErrorKind::Io,
            MoshError::NotRiffAvi
            | MoshError::MissingChunk(_)
            | MoshError::Truncated { .. }
            | MoshError::NestedList(_)
            | MoshError::TrailingIndexBytes(_)
            | MoshError::IndexBeforeMovi
            | MoshError::OutputTooLarge(_) => ErrorKind::Format,
            MoshError::ChunkOverrun { .. }
            | MoshError::IndexExhausted
            | MoshError::IndexSurplus { .. }
            | MoshError::TagMismatch { .. }
            | MoshError::SizeMismatch { .. }
            | MoshError::OffsetMismatch { .. } => ErrorKind::Consistency,
            MoshError::InvalidConfig(_) | MoshError::InvalidKeyframeSpec(_) => ErrorKind::Config,
        }
    }
}
