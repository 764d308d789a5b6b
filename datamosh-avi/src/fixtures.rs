//! Synthetic AVI files for tests and fuzzing.
//!
//! Layout produced by [`AviFixture::build`] with the default single video
//! stream and no odml list:
//!
//! ```text
//!   0  RIFF size "AVI "
//!  12  LIST size "hdrl"
//!  24    avih (56 bytes)         total frames at 48
//!  88    LIST size "strl"
//! 100      strh (56 bytes)       length at 140
//! 164      strf (40 bytes)
//! 212  LIST size "movi" ...
//! ```

use crate::chunks::{chunk_ids, write_chunk, FourCC, IndexEntry};

/// Offset of the avih total-frames field in a fixture
pub const AVIH_TOTAL_FRAMES_OFFSET: usize = 48;

/// Offset of the first stream's strh length field in a fixture
pub const FIRST_STRH_LENGTH_OFFSET: usize = 140;

/// One chunk to place inside `movi`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixtureChunk {
    pub id: [u8; 4],
    pub flags: u32,
    pub data: Vec<u8>,
}

/// Video keyframe `00dc` whose payload starts with `tag`.
///
/// Payload length alternates between odd and even with `tag`.
pub fn key(tag: u8) -> FixtureChunk {
    FixtureChunk {
        id: *b"00dc",
        flags: IndexEntry::KEYFRAME,
        data: payload(tag),
    }
}

/// Predicted video frame `00dc` whose payload starts with `tag`
pub fn delta(tag: u8) -> FixtureChunk {
    FixtureChunk {
        id: *b"00dc",
        flags: 0,
        data: payload(tag),
    }
}

/// Audio chunk `01wb`, flagged as a keyframe like most muxers do
pub fn audio(tag: u8) -> FixtureChunk {
    FixtureChunk {
        id: *b"01wb",
        flags: IndexEntry::KEYFRAME,
        data: payload(tag),
    }
}

fn payload(tag: u8) -> Vec<u8> {
    let mut data = vec![tag; 3 + (tag as usize % 2)];
    data[1] = 0xA5;
    data
}

/// Builder for a small but structurally complete AVI file
#[derive(Debug, Clone)]
pub struct AviFixture {
    /// strh fccType of each stream, in order
    pub streams: Vec<[u8; 4]>,
    /// Add `LIST odml` with a `dmlh` chunk at the end of `hdrl`
    pub odml: bool,
    /// Chunks placed in `movi`
    pub chunks: Vec<FixtureChunk>,
    /// Raw bytes between `movi` and `idx1`
    pub between: Vec<u8>,
    /// Raw bytes after `idx1`
    pub suffix: Vec<u8>,
    /// Emit the `idx1` chunk
    pub write_index: bool,
}

impl AviFixture {
    /// Single video stream, index included
    pub fn new(chunks: Vec<FixtureChunk>) -> Self {
        AviFixture {
            streams: vec![*b"vids"],
            odml: false,
            chunks,
            between: Vec::new(),
            suffix: Vec::new(),
            write_index: true,
        }
    }

    /// Index entries matching the chunk list
    pub fn index_entries(&self) -> Vec<IndexEntry> {
        let mut offset = 4u32;
        self.chunks
            .iter()
            .map(|chunk| {
                let size = chunk.data.len() as u32;
                let entry = IndexEntry {
                    chunk_id: FourCC(chunk.id),
                    flags: chunk.flags,
                    offset,
                    size,
                };
                offset += 8 + size + (size % 2);
                entry
            })
            .collect()
    }

    /// Build the file with a consistent index
    pub fn build(&self) -> Vec<u8> {
        self.build_with_index(|_| {})
    }

    /// Build the file after letting `tamper` edit the index entries
    pub fn build_with_index<F>(&self, tamper: F) -> Vec<u8>
    where
        F: FnOnce(&mut Vec<IndexEntry>),
    {
        let video_frames = self
            .chunks
            .iter()
            .filter(|c| &c.id[2..] == b"dc" || &c.id[2..] == b"db")
            .count() as u32;

        let mut data = Vec::new();
        data.extend_from_slice(chunk_ids::RIFF.as_bytes());
        data.extend_from_slice(&0u32.to_le_bytes());
        data.extend_from_slice(chunk_ids::AVI.as_bytes());

        write_list(&mut data, chunk_ids::HDRL, &self.hdrl(video_frames));

        let mut movi = Vec::new();
        for chunk in &self.chunks {
            write_chunk(&mut movi, FourCC(chunk.id), &chunk.data).unwrap();
        }
        write_list(&mut data, chunk_ids::MOVI, &movi);

        data.extend_from_slice(&self.between);

        if self.write_index {
            let mut entries = self.index_entries();
            tamper(&mut entries);
            let mut idx = Vec::new();
            for entry in &entries {
                entry.write(&mut idx).unwrap();
            }
            write_chunk(&mut data, chunk_ids::IDX1, &idx).unwrap();
        }

        data.extend_from_slice(&self.suffix);

        let riff_size = (data.len() - 8) as u32;
        data[4..8].copy_from_slice(&riff_size.to_le_bytes());
        data
    }

    fn hdrl(&self, video_frames: u32) -> Vec<u8> {
        let mut hdrl = Vec::new();

        let mut avih = vec![0u8; 56];
        avih[0..4].copy_from_slice(&40_000u32.to_le_bytes()); // 25 fps
        avih[16..20].copy_from_slice(&video_frames.to_le_bytes());
        avih[24..28].copy_from_slice(&(self.streams.len() as u32).to_le_bytes());
        write_chunk(&mut hdrl, chunk_ids::AVIH, &avih).unwrap();

        for (index, fcc_type) in self.streams.iter().enumerate() {
            let mut strh = vec![0u8; 56];
            strh[0..4].copy_from_slice(fcc_type);
            strh[20..24].copy_from_slice(&1u32.to_le_bytes()); // scale
            strh[24..28].copy_from_slice(&25u32.to_le_bytes()); // rate
            let length = self
                .chunks
                .iter()
                .filter(|c| c.id[..2] == [b'0' + (index / 10) as u8, b'0' + (index % 10) as u8])
                .count() as u32;
            strh[32..36].copy_from_slice(&length.to_le_bytes());

            let strf_len = if fcc_type == b"vids" { 40 } else { 16 };
            let mut strl = Vec::new();
            write_chunk(&mut strl, chunk_ids::STRH, &strh).unwrap();
            write_chunk(&mut strl, FourCC(*b"strf"), &vec![0u8; strf_len]).unwrap();
            write_list(&mut hdrl, chunk_ids::STRL, &strl);
        }

        if self.odml {
            let mut dmlh = vec![0u8; 248];
            dmlh[0..4].copy_from_slice(&video_frames.to_le_bytes());
            let mut odml = Vec::new();
            write_chunk(&mut odml, chunk_ids::DMLH, &dmlh).unwrap();
            write_list(&mut hdrl, chunk_ids::ODML, &odml);
        }

        hdrl
    }
}

fn write_list(out: &mut Vec<u8>, list_type: FourCC, children: &[u8]) {
    let mut payload = list_type.as_bytes().to_vec();
    payload.extend_from_slice(children);
    write_chunk(out, chunk_ids::LIST, &payload).unwrap();
}
