//! Generic RIFF chunk walker.
//!
//! The top-level scan and the header searches all share one shape: walk the
//! chunks in `[start, end)`, look at each tag (and list type), and recurse
//! into the lists that matter. [`walk_chunks`] implements that loop once and
//! hands every chunk header to a visitor.

use crate::chunks::{chunk_ids, padded_len, read_u32_at, FourCC, CHUNK_HEADER_SIZE};
use crate::error::Result;
use std::ops::ControlFlow;

/// Offset of the first chunk after the 12-byte `RIFF size AVI ` header
pub const RIFF_HEADER_SIZE: usize = 12;

/// Header of one chunk as seen by the walker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkHeader {
    /// Chunk tag
    pub id: FourCC,
    /// Absolute offset of the tag
    pub offset: usize,
    /// Declared payload size
    pub size: u32,
    /// List type for `LIST` chunks; `None` if the data ends before it
    pub list_type: Option<FourCC>,
}

impl ChunkHeader {
    /// Absolute offset of the payload
    pub fn data_start(&self) -> usize {
        self.offset + CHUNK_HEADER_SIZE
    }

    /// Absolute offset one past the declared payload
    pub fn data_end(&self) -> usize {
        self.data_start().saturating_add(self.size as usize)
    }

    /// Offset of the following chunk, including the pad byte
    pub fn next_offset(&self) -> usize {
        self.data_start()
            .saturating_add(padded_len(self.size as usize))
    }

    /// True if this is a `LIST` chunk of the given type
    pub fn is_list(&self, list_type: FourCC) -> bool {
        self.id == chunk_ids::LIST && self.list_type == Some(list_type)
    }
}

/// What the walker should do after visiting a chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    /// Move on to the next sibling
    Continue,
    /// Walk the children of this `LIST`, then move on
    Descend,
    /// Abort the whole walk
    Stop,
}

/// Walk the chunks of `data[start..end)`.
///
/// The visitor receives the enclosing list type (`None` at the starting level)
/// and the chunk header. Returns `ControlFlow::Break` if a visitor stopped the walk.
pub fn walk_chunks<F>(data: &[u8], start: usize, end: usize, visitor: &mut F) -> Result<ControlFlow<()>>
where
    F: FnMut(Option<FourCC>, &ChunkHeader) -> Result<Visit>,
{
    walk_level(data, start, end.min(data.len()), None, visitor)
}

fn walk_level<F>(
    data: &[u8],
    start: usize,
    end: usize,
    parent: Option<FourCC>,
    visitor: &mut F,
) -> Result<ControlFlow<()>>
where
    F: FnMut(Option<FourCC>, &ChunkHeader) -> Result<Visit>,
{
    let mut pos = start;

    while pos.saturating_add(CHUNK_HEADER_SIZE) <= end {
        let (Some(id), Some(size)) = (FourCC::read_at(data, pos), read_u32_at(data, pos + 4)) else {
            break;
        };

        let list_type = if id == chunk_ids::LIST {
            FourCC::read_at(data, pos + CHUNK_HEADER_SIZE)
        } else {
            None
        };

        let header = ChunkHeader {
            id,
            offset: pos,
            size,
            list_type,
        };

        match visitor(parent, &header)? {
            Visit::Continue => {}
            Visit::Descend => {
                if let Some(list_type) = header.list_type {
                    let child_start = header.data_start() + 4;
                    let child_end = header.data_end().min(end);
                    if walk_level(data, child_start, child_end, Some(list_type), visitor)?.is_break() {
                        return Ok(ControlFlow::Break(()));
                    }
                }
            }
            Visit::Stop => return Ok(ControlFlow::Break(())),
        }

        pos = header.next_offset();
    }

    Ok(ControlFlow::Continue(()))
}
