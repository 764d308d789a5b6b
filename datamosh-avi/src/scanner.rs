//! Top-level container scan and decomposition of an AVI file

use crate::chunks::{chunk_ids, parse_index, CHUNK_HEADER_SIZE};
use crate::error::{MoshError, Result};
use crate::extract::{extract_chunks, MoshChunk};
use crate::walker::{walk_chunks, ChunkHeader, Visit, RIFF_HEADER_SIZE};
use bytes::Bytes;
use tracing::debug;

/// Position and declared size of a top-level chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkSpan {
    /// Offset of the chunk tag
    pub offset: usize,
    /// Declared payload size
    pub size: u32,
}

impl ChunkSpan {
    fn from_header(header: &ChunkHeader) -> Self {
        ChunkSpan {
            offset: header.offset,
            size: header.size,
        }
    }

    /// Offset one past the declared payload
    pub fn end(&self) -> usize {
        self.offset + CHUNK_HEADER_SIZE + self.size as usize
    }
}

/// Location of the `LIST movi` and `idx1` chunks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerLayout {
    /// `LIST movi` chunk
    pub movi: ChunkSpan,
    /// `idx1` chunk
    pub idx1: ChunkSpan,
}

/// Find the `LIST movi` list and the `idx1` index among the top-level chunks.
pub fn locate_chunks(data: &[u8]) -> Result<ContainerLayout> {
    let mut movi = None;
    let mut idx1 = None;

    let _flow = walk_chunks(data, RIFF_HEADER_SIZE, data.len(), &mut |_, header| {
        if header.id == chunk_ids::LIST {
            match header.list_type {
                None => {
                    return Err(MoshError::Truncated {
                        what: "LIST chunk header",
                        needed: CHUNK_HEADER_SIZE + 4,
                        available: data.len() - header.offset,
                    });
                }
                Some(list_type) if list_type == chunk_ids::MOVI => {
                    movi = Some(ChunkSpan::from_header(header));
                }
                Some(_) => {}
            }
        } else if header.id == chunk_ids::IDX1 {
            idx1 = Some(ChunkSpan::from_header(header));
        }

        Ok(if movi.is_some() && idx1.is_some() {
            Visit::Stop
        } else {
            Visit::Continue
        })
    })?;

    let movi = movi.ok_or(MoshError::MissingChunk("LIST movi"))?;
    let idx1 = idx1.ok_or(MoshError::MissingChunk("idx1"))?;

    debug!(
        "Found movi at {} ({} bytes), idx1 at {} ({} bytes)",
        movi.offset, movi.size, idx1.offset, idx1.size
    );

    Ok(ContainerLayout { movi, idx1 })
}

/// Check the `RIFF` magic and `AVI ` form type
pub fn check_riff_avi(data: &[u8]) -> Result<()> {
    if data.len() < RIFF_HEADER_SIZE
        || &data[0..4] != chunk_ids::RIFF.as_bytes()
        || &data[8..12] != chunk_ids::AVI.as_bytes()
    {
        return Err(MoshError::NotRiffAvi);
    }
    Ok(())
}

/// An AVI file broken down into the parts the rewrite needs.
#[derive(Debug, Clone)]
pub struct AviStructure {
    /// Everything before `LIST movi`, headers included
    pub prefix: Vec<u8>,
    /// Bytes between the end of `movi` and `idx1`, passed through untouched
    pub between: Bytes,
    /// Bytes after `idx1`, passed through untouched
    pub suffix: Bytes,
    /// Payload chunks of `movi`, in file order
    pub chunks: Vec<MoshChunk>,
}

impl AviStructure {
    /// Parse a whole AVI file, tagging every chunk with `clip_id`.
    pub fn parse(data: Bytes, clip_id: usize) -> Result<Self> {
        check_riff_avi(&data)?;

        let layout = locate_chunks(&data)?;
        let ContainerLayout { movi, idx1 } = layout;

        if idx1.offset < movi.end() {
            return Err(MoshError::IndexBeforeMovi);
        }

        // idx1 was found at or after movi.end(), so the payload is in bounds
        let payload_start = movi.offset + CHUNK_HEADER_SIZE + 4;
        let payload_end = movi.end();
        let payload = data.slice(payload_start.min(payload_end)..payload_end);

        let index_start = idx1.offset + CHUNK_HEADER_SIZE;
        let index_end = idx1.end();
        if index_end > data.len() {
            return Err(MoshError::Truncated {
                what: "idx1 chunk",
                needed: idx1.size as usize,
                available: data.len() - index_start,
            });
        }
        let entries = parse_index(&data[index_start..index_end])?;
        debug!("Parsed {} index entries for clip {}", entries.len(), clip_id);

        let chunks = extract_chunks(&payload, &entries, clip_id)?;

        Ok(AviStructure {
            prefix: data[..movi.offset].to_vec(),
            between: data.slice(movi.end()..idx1.offset),
            suffix: data.slice(index_end..),
            chunks,
        })
    }
}
