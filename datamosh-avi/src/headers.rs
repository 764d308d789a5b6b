//! Locates and patches the frame-count fields in the AVI headers.
//!
//! Three fields must follow the rewritten payload:
//!
//! - `avih.dwTotalFrames`, 16 bytes into the main header
//! - `strh.dwLength` of the first video stream, 32 bytes into the stream header
//! - `dmlh.dwTotalFrames` of every OpenDML extended header, at its start
//!
//! Only their positions are recorded. Header bytes are never resized, so the
//! positions stay valid after the payload changes.

use crate::chunks::{chunk_ids, read_u32_at, FourCC};
use crate::error::Result;
use crate::walker::{walk_chunks, ChunkHeader, Visit, RIFF_HEADER_SIZE};
use byteorder::{ByteOrder, LittleEndian};
use serde::Serialize;
use tracing::debug;

const AVIH_TOTAL_FRAMES: usize = 16;
const STRH_LENGTH: usize = 32;
const DMLH_TOTAL_FRAMES: usize = 0;

/// Byte offsets of the frame-count fields within the original prefix
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HeaderOffsets {
    /// `avih` total frames
    pub total_frames: Option<usize>,
    /// Length of the first video stream
    pub video_stream_length: Option<usize>,
    /// Every `dmlh` total-frames field
    pub odml_total_frames: Vec<usize>,
}

impl HeaderOffsets {
    /// All recorded offsets
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.total_frames
            .iter()
            .chain(self.video_stream_length.iter())
            .chain(self.odml_total_frames.iter())
            .copied()
    }

    /// Write `frames` into every recorded field
    pub fn patch(&self, prefix: &mut [u8], frames: u32) {
        for offset in self.iter() {
            if let Some(field) = prefix.get_mut(offset..offset + 4) {
                LittleEndian::write_u32(field, frames);
            }
        }
    }
}

/// Find the frame-count fields in the header list of `prefix`.
///
/// Missing fields are left as `None` (or an empty list); that is not an error.
pub fn find_header_offsets(prefix: &[u8]) -> Result<HeaderOffsets> {
    let mut offsets = HeaderOffsets::default();

    // A field counts only if all four bytes lie inside the buffer
    let field = |header: &ChunkHeader, at: usize| {
        let offset = header.data_start() + at;
        (offset + 4 <= prefix.len()).then_some(offset)
    };

    let _flow = walk_chunks(prefix, RIFF_HEADER_SIZE, prefix.len(), &mut |parent, header| {
        let hdrl = Some(chunk_ids::HDRL);
        let visit = match parent {
            None if header.id == chunk_ids::LIST && header.list_type.is_none() => Visit::Stop,
            None if header.is_list(chunk_ids::HDRL) => Visit::Descend,
            p if p == hdrl && header.id == chunk_ids::AVIH => {
                if offsets.total_frames.is_none() {
                    offsets.total_frames = field(header, AVIH_TOTAL_FRAMES);
                }
                Visit::Continue
            }
            p if p == hdrl && header.is_list(chunk_ids::STRL) => {
                if offsets.video_stream_length.is_none() {
                    Visit::Descend
                } else {
                    Visit::Continue
                }
            }
            p if p == hdrl && header.is_list(chunk_ids::ODML) => Visit::Descend,
            Some(list) if list == chunk_ids::STRL && header.id == chunk_ids::STRH => {
                let is_video = FourCC::read_at(prefix, header.data_start()) == Some(chunk_ids::VIDS);
                if is_video && offsets.video_stream_length.is_none() {
                    offsets.video_stream_length = field(header, STRH_LENGTH);
                }
                Visit::Continue
            }
            Some(list) if list == chunk_ids::ODML && header.id == chunk_ids::DMLH => {
                offsets.odml_total_frames.extend(field(header, DMLH_TOTAL_FRAMES));
                Visit::Continue
            }
            _ => Visit::Continue,
        };
        Ok(visit)
    })?;

    debug!("Header offsets: {:?}", offsets);
    Ok(offsets)
}

/// Values currently stored at the given offsets
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HeaderCounts {
    /// `avih` total frames
    pub total_frames: Option<u32>,
    /// Length of the first video stream
    pub video_stream_length: Option<u32>,
    /// Every `dmlh` total-frames value
    pub odml_total_frames: Vec<u32>,
}

impl HeaderCounts {
    /// Read the fields recorded in `offsets`
    pub fn read(prefix: &[u8], offsets: &HeaderOffsets) -> Self {
        HeaderCounts {
            total_frames: offsets.total_frames.and_then(|o| read_u32_at(prefix, o)),
            video_stream_length: offsets
                .video_stream_length
                .and_then(|o| read_u32_at(prefix, o)),
            odml_total_frames: offsets
                .odml_total_frames
                .iter()
                .filter_map(|&o| read_u32_at(prefix, o))
                .collect(),
        }
    }
}
