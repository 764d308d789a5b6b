//! Per-clip inspection for choosing keyframe ordinals

use crate::chunks::ChunkId;
use crate::error::Result;
use crate::headers::{find_header_offsets, HeaderCounts, HeaderOffsets};
use crate::scanner::AviStructure;
use bytes::Bytes;
use serde::Serialize;

/// Where a keyframe sits in its clip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct KeyframePosition {
    /// Clip-local keyframe ordinal, as used by keep/drop sets
    pub ordinal: usize,
    /// Zero-based video frame number
    pub frame: usize,
}

/// Summary of a single AVI file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClipSummary {
    /// File size in bytes
    pub file_size: usize,
    /// movi chunks, all streams
    pub chunk_count: usize,
    /// Video chunks
    pub video_frames: usize,
    /// Audio chunks
    pub audio_chunks: usize,
    /// Keyframes in file order
    pub keyframes: Vec<KeyframePosition>,
    /// Frame counts as currently declared in the headers
    pub declared: HeaderCounts,
    /// Where those counts live
    pub header_offsets: HeaderOffsets,
}

impl ClipSummary {
    /// Parse and summarize a whole file
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let structure = AviStructure::parse(Bytes::copy_from_slice(data), 0)?;
        let header_offsets = find_header_offsets(&structure.prefix)?;
        let declared = HeaderCounts::read(&structure.prefix, &header_offsets);

        let mut video_frames = 0;
        let mut audio_chunks = 0;
        let mut keyframes = Vec::new();
        for chunk in &structure.chunks {
            if chunk.is_video {
                if chunk.is_keyframe {
                    keyframes.push(KeyframePosition {
                        ordinal: keyframes.len(),
                        frame: video_frames,
                    });
                }
                video_frames += 1;
            } else if ChunkId::parse(chunk.chunk_id).is_audio() {
                audio_chunks += 1;
            }
        }

        Ok(ClipSummary {
            file_size: data.len(),
            chunk_count: structure.chunks.len(),
            video_frames,
            audio_chunks,
            keyframes,
            declared,
            header_offsets,
        })
    }

    /// True when every declared frame count matches the video chunks present
    pub fn headers_consistent(&self) -> bool {
        let frames = self.video_frames as u32;
        self.declared.total_frames.map_or(true, |n| n == frames)
            && self.declared.video_stream_length.map_or(true, |n| n == frames)
            && self.declared.odml_total_frames.iter().all(|&n| n == frames)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{audio, delta, key, AviFixture};
    use crate::{rewrite_bytes, MoshConfig};

    #[test]
    fn test_summary_counts_and_keyframes() {
        let fixture = AviFixture {
            streams: vec![*b"vids", *b"auds"],
            ..AviFixture::new(vec![
                key(0),
                audio(1),
                delta(2),
                delta(3),
                audio(4),
                key(5),
                delta(6),
            ])
        };
        let summary = ClipSummary::from_bytes(&fixture.build()).unwrap();

        assert_eq!(summary.chunk_count, 7);
        assert_eq!(summary.video_frames, 5);
        assert_eq!(summary.audio_chunks, 2);
        assert_eq!(
            summary.keyframes,
            vec![
                KeyframePosition { ordinal: 0, frame: 0 },
                KeyframePosition { ordinal: 1, frame: 3 },
            ]
        );
        assert_eq!(summary.declared.total_frames, Some(5));
        assert!(summary.headers_consistent());
    }

    #[test]
    fn test_summary_detects_stale_headers() {
        let data = AviFixture::new(vec![key(0), delta(1), key(2), delta(3)]).build();
        let output = rewrite_bytes(&data, &[], &MoshConfig::default()).unwrap();

        let summary = ClipSummary::from_bytes(&output.data).unwrap();
        assert_eq!(summary.video_frames, 3);
        assert_eq!(summary.keyframes.len(), 1);
        assert!(summary.headers_consistent());

        // Splice the rewritten movi/idx1 back behind the original headers
        let mut stale = data[..212].to_vec();
        stale.extend_from_slice(&output.data[212..]);
        let summary = ClipSummary::from_bytes(&stale).unwrap();
        assert_eq!(summary.declared.total_frames, Some(4));
        assert!(!summary.headers_consistent());
    }

    #[test]
    fn test_summary_rejects_garbage() {
        assert!(ClipSummary::from_bytes(b"RIFF").is_err());
    }
}
