//! Chunk extraction: cross-validates `movi` against `idx1`

use crate::chunks::{chunk_ids, padded_len, read_u32_at, ChunkId, FourCC, IndexEntry, CHUNK_HEADER_SIZE};
use crate::error::{MoshError, Result};
use bytes::Bytes;

/// Index offsets count from the `movi` list-type tag, payload positions from just after it
pub const MOVI_TAG_SIZE: usize = 4;

/// One payload chunk of `movi`, with the index metadata that describes it.
///
/// The payload is reference-counted, so cloning a chunk (for instance to
/// duplicate a frame) never copies the compressed data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoshChunk {
    /// Chunk tag, e.g. `00dc`
    pub chunk_id: FourCC,
    /// idx1 flags
    pub flags: u32,
    /// Compressed payload
    pub data: Bytes,
    /// Decimal stream number from the first two tag bytes
    pub stream_id: Option<u16>,
    /// `##dc` / `##db` chunk with a numeric stream
    pub is_video: bool,
    /// Video chunk with the keyframe flag set
    pub is_keyframe: bool,
    /// Source file: 0 for the base clip, 1.. for appended clips
    pub clip_id: usize,
}

impl MoshChunk {
    /// Build a chunk, deriving the video and keyframe classification
    pub fn new(chunk_id: FourCC, flags: u32, data: Bytes, clip_id: usize) -> Self {
        let parsed = ChunkId::parse(chunk_id);
        let is_video = parsed.is_video();
        MoshChunk {
            chunk_id,
            flags,
            data,
            stream_id: parsed.stream_number,
            is_video,
            is_keyframe: is_video && (flags & IndexEntry::KEYFRAME) != 0,
            clip_id,
        }
    }

    /// A copy with the keyframe flag cleared
    pub fn as_duplicate(&self) -> Self {
        MoshChunk {
            flags: self.flags & !IndexEntry::KEYFRAME,
            is_keyframe: false,
            ..self.clone()
        }
    }

    /// Payload size as declared in movi and idx1
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Bytes this chunk occupies in movi: header, payload and pad byte
    pub fn stored_len(&self) -> usize {
        CHUNK_HEADER_SIZE + padded_len(self.size())
    }
}

/// Walk the `movi` payload and check every chunk against its idx1 entry.
///
/// `payload` starts right after the `movi` list-type tag.
pub fn extract_chunks(payload: &Bytes, entries: &[IndexEntry], clip_id: usize) -> Result<Vec<MoshChunk>> {
    let mut chunks = Vec::with_capacity(entries.len());
    let mut entries_iter = entries.iter();
    let mut pos = 0usize;

    while pos + CHUNK_HEADER_SIZE <= payload.len() {
        let chunk_id = FourCC::read_at(payload, pos).ok_or(MoshError::Truncated {
            what: "movi chunk header",
            needed: CHUNK_HEADER_SIZE,
            available: payload.len() - pos,
        })?;

        if chunk_id == chunk_ids::LIST {
            let list_type = FourCC::read_at(payload, pos + CHUNK_HEADER_SIZE).unwrap_or(FourCC(*b"    "));
            return Err(MoshError::NestedList(list_type));
        }

        let size = read_u32_at(payload, pos + 4).ok_or(MoshError::Truncated {
            what: "movi chunk header",
            needed: CHUNK_HEADER_SIZE,
            available: payload.len() - pos,
        })?;

        let data_start = pos + CHUNK_HEADER_SIZE;
        let data_end = data_start.saturating_add(size as usize);
        if data_end > payload.len() {
            return Err(MoshError::ChunkOverrun { position: pos, size });
        }

        let entry = entries_iter.next().ok_or(MoshError::IndexExhausted)?;

        if entry.chunk_id != chunk_id {
            return Err(MoshError::TagMismatch {
                position: pos,
                movi: chunk_id,
                index: entry.chunk_id,
            });
        }
        if entry.size != size {
            return Err(MoshError::SizeMismatch {
                position: pos,
                movi: size,
                index: entry.size,
            });
        }
        let expected_offset = pos + MOVI_TAG_SIZE;
        if entry.offset as usize != expected_offset {
            return Err(MoshError::OffsetMismatch {
                expected: expected_offset,
                index: entry.offset,
            });
        }

        chunks.push(MoshChunk::new(
            chunk_id,
            entry.flags,
            payload.slice(data_start..data_end),
            clip_id,
        ));

        pos = data_start + padded_len(size as usize);
    }

    let remaining = entries_iter.len();
    if remaining != 0 {
        return Err(MoshError::IndexSurplus { remaining });
    }

    Ok(chunks)
}
