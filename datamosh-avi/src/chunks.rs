//! RIFF chunk identifiers and idx1 index entries

use crate::error::{MoshError, Result};
use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};
use std::io::Write;

/// Size of a chunk header: 4-byte tag plus 4-byte little-endian size
pub const CHUNK_HEADER_SIZE: usize = 8;

/// Size of one idx1 entry
pub const INDEX_ENTRY_SIZE: usize = 16;

/// Four-byte RIFF tag
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FourCC(pub [u8; 4]);

impl FourCC {
    pub fn new(bytes: [u8; 4]) -> Self {
        FourCC(bytes)
    }

    /// Read a tag at `offset`, if four bytes are available
    pub fn read_at(data: &[u8], offset: usize) -> Option<Self> {
        let bytes = data.get(offset..offset.checked_add(4)?)?;
        Some(FourCC([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Tag as text, non-UTF-8 bytes replaced
    pub fn as_str(&self) -> String {
        String::from_utf8_lossy(&self.0).into_owned()
    }

    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }
}

impl std::fmt::Debug for FourCC {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.as_str())
    }
}

impl std::fmt::Display for FourCC {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.as_str())
    }
}

/// Well-known chunk IDs
pub mod chunk_ids {
    use super::FourCC;

    pub const RIFF: FourCC = FourCC(*b"RIFF");
    pub const AVI: FourCC = FourCC(*b"AVI ");
    pub const LIST: FourCC = FourCC(*b"LIST");
    pub const HDRL: FourCC = FourCC(*b"hdrl");
    pub const AVIH: FourCC = FourCC(*b"avih");
    pub const STRL: FourCC = FourCC(*b"strl");
    pub const STRH: FourCC = FourCC(*b"strh");
    pub const MOVI: FourCC = FourCC(*b"movi");
    pub const IDX1: FourCC = FourCC(*b"idx1");
    pub const ODML: FourCC = FourCC(*b"odml");
    pub const DMLH: FourCC = FourCC(*b"dmlh");
    pub const VIDS: FourCC = FourCC(*b"vids");
}

/// A movi tag split into its stream number and type suffix, e.g. `01wb`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkId {
    pub fourcc: FourCC,
    /// Decimal stream number from the first two bytes
    pub stream_number: Option<u16>,
    pub chunk_type: ChunkType,
}

impl ChunkId {
    /// Classify a tag. Suffixes are case-sensitive and only count after a
    /// numeric stream number.
    pub fn parse(fourcc: FourCC) -> Self {
        let [hi, lo, c, d] = fourcc.0;
        let stream_number = (hi.is_ascii_digit() && lo.is_ascii_digit())
            .then(|| u16::from(hi - b'0') * 10 + u16::from(lo - b'0'));

        let chunk_type = match (stream_number, &[c, d]) {
            (Some(_), b"dc") => ChunkType::VideoCompressed,
            (Some(_), b"db") => ChunkType::VideoUncompressed,
            (Some(_), b"wb") => ChunkType::Audio,
            _ => ChunkType::Other,
        };

        ChunkId {
            fourcc,
            stream_number,
            chunk_type,
        }
    }

    /// `##dc` or `##db`
    pub fn is_video(&self) -> bool {
        matches!(
            self.chunk_type,
            ChunkType::VideoCompressed | ChunkType::VideoUncompressed
        )
    }

    /// `##wb`
    pub fn is_audio(&self) -> bool {
        self.chunk_type == ChunkType::Audio
    }
}

/// What a movi chunk carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkType {
    VideoCompressed,
    VideoUncompressed,
    Audio,
    /// Text, palette changes, index chunks and anything unrecognized
    Other,
}

/// Read the little-endian u32 at `offset`
pub(crate) fn read_u32_at(data: &[u8], offset: usize) -> Option<u32> {
    data.get(offset..offset.checked_add(4)?)
        .map(LittleEndian::read_u32)
}

/// Payload length rounded up to the RIFF word boundary
pub fn padded_len(size: usize) -> usize {
    size + (size & 1)
}

/// Write `id + size + data (+ pad byte)`
pub fn write_chunk<W: Write>(writer: &mut W, id: FourCC, data: &[u8]) -> Result<()> {
    let size = u32::try_from(data.len()).map_err(|_| MoshError::OutputTooLarge(data.len()))?;
    writer.write_all(id.as_bytes())?;
    writer.write_u32::<LittleEndian>(size)?;
    writer.write_all(data)?;

    // Pad to word boundary
    if data.len() % 2 != 0 {
        writer.write_all(&[0])?;
    }

    Ok(())
}

/// AVI index entry (idx1 format)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntry {
    /// Chunk ID
    pub chunk_id: FourCC,
    /// Flags
    pub flags: u32,
    /// Offset from the `movi` list-type tag
    pub offset: u32,
    /// Size of chunk data
    pub size: u32,
}

impl IndexEntry {
    /// AVIIF_KEYFRAME
    pub const KEYFRAME: u32 = 0x10;

    /// Decode the first 16 bytes of `data`
    pub fn read(data: &[u8]) -> Result<Self> {
        let entry = data.get(..INDEX_ENTRY_SIZE).ok_or(MoshError::Truncated {
            what: "idx1 entry",
            needed: INDEX_ENTRY_SIZE,
            available: data.len(),
        })?;
        let field = |at: usize| LittleEndian::read_u32(&entry[at..at + 4]);

        Ok(IndexEntry {
            chunk_id: FourCC([entry[0], entry[1], entry[2], entry[3]]),
            flags: field(4),
            offset: field(8),
            size: field(12),
        })
    }

    /// Append the 16-byte encoding
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(self.chunk_id.as_bytes())?;
        writer.write_u32::<LittleEndian>(self.flags)?;
        writer.write_u32::<LittleEndian>(self.offset)?;
        writer.write_u32::<LittleEndian>(self.size)?;
        Ok(())
    }

    pub fn is_keyframe(&self) -> bool {
        (self.flags & Self::KEYFRAME) != 0
    }
}

/// Parse the payload of an idx1 chunk.
///
/// The payload must be a whole number of 16-byte entries.
pub fn parse_index(data: &[u8]) -> Result<Vec<IndexEntry>> {
    let trailing = data.len() % INDEX_ENTRY_SIZE;
    if trailing != 0 {
        return Err(MoshError::TrailingIndexBytes(trailing));
    }

    data.chunks_exact(INDEX_ENTRY_SIZE)
        .map(IndexEntry::read)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fourcc() {
        let fourcc = FourCC::new(*b"RIFF");
        assert_eq!(fourcc.as_str(), "RIFF");
        assert_eq!(fourcc.as_bytes(), b"RIFF");
        assert_eq!(fourcc, chunk_ids::RIFF);
    }

    #[test]
    fn test_fourcc_read_at() {
        let data = b"LIST\x04\x00\x00\x00movi";
        assert_eq!(FourCC::read_at(data, 8), Some(chunk_ids::MOVI));
        assert_eq!(FourCC::read_at(data, 9), None);
        assert_eq!(FourCC::read_at(data, usize::MAX), None);
    }

    #[test]
    fn test_chunk_id_parse() {
        let video = ChunkId::parse(FourCC(*b"00dc"));
        assert_eq!(video.stream_number, Some(0));
        assert_eq!(video.chunk_type, ChunkType::VideoCompressed);
        assert!(video.is_video());

        let raw = ChunkId::parse(FourCC(*b"02db"));
        assert!(raw.is_video());

        let audio = ChunkId::parse(FourCC(*b"01wb"));
        assert_eq!(audio.stream_number, Some(1));
        assert_eq!(audio.chunk_type, ChunkType::Audio);
        assert!(!audio.is_video());
        assert!(audio.is_audio());

        let avih = ChunkId::parse(FourCC(*b"avih"));
        assert_eq!(avih.stream_number, None);
        assert!(!avih.is_video());
    }

    #[test]
    fn test_video_suffix_needs_numeric_stream() {
        assert!(!ChunkId::parse(FourCC(*b"xxdc")).is_video());
        assert!(!ChunkId::parse(FourCC(*b"0xdc")).is_video());
        assert!(!ChunkId::parse(FourCC(*b"00DC")).is_video());
    }

    #[test]
    fn test_write_chunk_pads_odd_payload() {
        let mut buffer = Vec::new();
        write_chunk(&mut buffer, FourCC(*b"test"), &[1, 2, 3, 4, 5]).unwrap();

        assert_eq!(buffer.len(), 8 + 6);
        assert_eq!(&buffer[0..4], b"test");
        assert_eq!(read_u32_at(&buffer, 4), Some(5));
        assert_eq!(buffer[13], 0);
    }

    #[test]
    fn test_padded_len() {
        assert_eq!(padded_len(0), 0);
        assert_eq!(padded_len(5), 6);
        assert_eq!(padded_len(6), 6);
    }

    #[test]
    fn test_index_entry() {
        let entry = IndexEntry {
            chunk_id: FourCC(*b"00dc"),
            flags: IndexEntry::KEYFRAME,
            offset: 1000,
            size: 5000,
        };

        assert!(entry.is_keyframe());

        let mut buffer = Vec::new();
        entry.write(&mut buffer).unwrap();
        assert_eq!(buffer.len(), INDEX_ENTRY_SIZE);
        assert_eq!(IndexEntry::read(&buffer).unwrap(), entry);
    }

    #[test]
    fn test_parse_index() {
        let mut data = Vec::new();

        IndexEntry {
            chunk_id: FourCC(*b"00dc"),
            flags: IndexEntry::KEYFRAME,
            offset: 4,
            size: 1000,
        }
        .write(&mut data)
        .unwrap();

        IndexEntry {
            chunk_id: FourCC(*b"01wb"),
            flags: 0,
            offset: 1012,
            size: 500,
        }
        .write(&mut data)
        .unwrap();

        let entries = parse_index(&data).unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries[0].is_keyframe());
        assert!(!entries[1].is_keyframe());
    }

    #[test]
    fn test_parse_index_trailing_bytes() {
        let data = vec![0u8; INDEX_ENTRY_SIZE + 3];
        assert!(matches!(
            parse_index(&data),
            Err(MoshError::TrailingIndexBytes(3))
        ));
    }
}
