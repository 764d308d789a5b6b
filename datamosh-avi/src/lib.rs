//! AVI payload rewriting for datamoshing
//!
//! This crate edits the `movi` payload of RIFF/AVI files without decoding a
//! single frame. Keyframes are removed so that decoders smear motion from one
//! scene across the next, and predicted frames can be repeated to stretch
//! that motion out.
//!
//! # Features
//!
//! - RIFF chunk walking with `LIST movi` / `idx1` discovery
//! - Strict cross-validation of `movi` against `idx1`
//! - Keyframe selection by leading quota, explicit ordinals or per-clip policy
//! - P-frame duplication at a fixed cadence
//! - Rebuilt index plus patched `avih`, `strh` and OpenDML frame counts
//! - Appending further clips behind a base clip
//!
//! # Example
//!
//! ```no_run
//! use datamosh_avi::{rewrite_avi, MoshConfig};
//! use std::path::Path;
//!
//! let config = MoshConfig {
//!     keep_initial_keyframes: 1,
//!     duplicate_count: 2,
//!     duplicate_gap: 5,
//!     ..Default::default()
//! };
//! let stats = rewrite_avi(Path::new("in.avi"), &[], Path::new("out.avi"), &config).unwrap();
//! println!("{} video frames written", stats.video_frames);
//! ```

mod builder;
mod chunks;
mod error;
mod extract;
mod headers;
mod keyspec;
mod rewrite;
mod scanner;
mod select;
mod summary;
mod walker;

#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures;

pub use builder::{build_movi_and_index, BuiltContainer};
pub use chunks::{chunk_ids, parse_index, ChunkId, ChunkType, FourCC, IndexEntry};
pub use error::{ErrorKind, MoshError, Result};
pub use extract::{extract_chunks, MoshChunk};
pub use headers::{find_header_offsets, HeaderCounts, HeaderOffsets};
pub use keyspec::{parse_keyframe_spec, MAX_RANGE_WIDTH};
pub use rewrite::{rewrite_avi, rewrite_bytes, RewriteOutput, RewriteStats};
pub use scanner::{locate_chunks, AviStructure, ChunkSpan, ContainerLayout};
pub use select::{select_frames, ClipOptions, ClipPolicy, KeyframeSet, MoshConfig, Selection};
pub use summary::{ClipSummary, KeyframePosition};
pub use walker::{walk_chunks, ChunkHeader, Visit};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exports() {
        let _: fn() -> Result<()> = || Ok(());
    }

    #[test]
    fn test_fourcc() {
        let fourcc = FourCC::new(*b"RIFF");
        assert_eq!(fourcc.as_str(), "RIFF");
    }

    #[test]
    fn test_chunk_ids() {
        assert_eq!(chunk_ids::RIFF.as_str(), "RIFF");
        assert_eq!(chunk_ids::AVI.as_str(), "AVI ");
        assert_eq!(chunk_ids::MOVI.as_str(), "movi");
    }
}
