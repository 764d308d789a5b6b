//! Re-serializes a chunk sequence into `LIST movi` and `idx1`

use crate::chunks::{chunk_ids, write_chunk, IndexEntry, CHUNK_HEADER_SIZE, INDEX_ENTRY_SIZE};
use crate::error::{MoshError, Result};
use crate::extract::{MoshChunk, MOVI_TAG_SIZE};

/// Finished `movi` and `idx1` chunks
#[derive(Debug, Clone)]
pub struct BuiltContainer {
    /// Complete `LIST size movi ...` chunk
    pub movi: Vec<u8>,
    /// Complete `idx1 size ...` chunk
    pub idx1: Vec<u8>,
    /// Video chunks written; the corrected total-frame count
    pub video_frames: u32,
}

/// Serialize `chunks` into a new movi list and a matching idx1 index.
pub fn build_movi_and_index(chunks: &[MoshChunk]) -> Result<BuiltContainer> {
    let payload_len: usize = chunks.iter().map(MoshChunk::stored_len).sum();

    let mut movi = Vec::with_capacity(CHUNK_HEADER_SIZE + MOVI_TAG_SIZE + payload_len);
    let mut index = Vec::with_capacity(chunks.len() * INDEX_ENTRY_SIZE);
    let mut offset = MOVI_TAG_SIZE;
    let mut video_frames = 0u32;

    // LIST header; the size is known up front
    let list_size = MOVI_TAG_SIZE + payload_len;
    movi.extend_from_slice(chunk_ids::LIST.as_bytes());
    movi.extend_from_slice(&to_u32(list_size)?.to_le_bytes());
    movi.extend_from_slice(chunk_ids::MOVI.as_bytes());

    for chunk in chunks {
        write_chunk(&mut movi, chunk.chunk_id, &chunk.data)?;

        IndexEntry {
            chunk_id: chunk.chunk_id,
            flags: chunk.flags,
            offset: to_u32(offset)?,
            size: to_u32(chunk.size())?,
        }
        .write(&mut index)?;

        offset += chunk.stored_len();
        if chunk.is_video {
            video_frames += 1;
        }
    }

    let mut idx1 = Vec::with_capacity(CHUNK_HEADER_SIZE + index.len());
    write_chunk(&mut idx1, chunk_ids::IDX1, &index)?;

    Ok(BuiltContainer {
        movi,
        idx1,
        video_frames,
    })
}

fn to_u32(value: usize) -> Result<u32> {
    u32::try_from(value).map_err(|_| MoshError::OutputTooLarge(value))
}
