//! Rewrite orchestration: base clip plus appended clips into one AVI

use crate::builder::build_movi_and_index;
use crate::error::{MoshError, Result};
use crate::headers::find_header_offsets;
use crate::scanner::AviStructure;
use crate::select::{select_frames, MoshConfig};
use byteorder::{ByteOrder, LittleEndian};
use bytes::Bytes;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Counters describing one rewrite
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RewriteStats {
    /// Input files, base included
    pub clips: usize,
    /// movi chunks across all inputs
    pub input_chunks: usize,
    /// movi chunks written
    pub output_chunks: usize,
    /// Keyframes that survived
    pub keyframes_kept: usize,
    /// Keyframes removed
    pub keyframes_dropped: usize,
    /// Duplicate P-frames inserted
    pub duplicates_inserted: usize,
    /// Video frames in the output; written into the frame-count headers
    pub video_frames: u32,
    /// Size of the output file
    pub output_bytes: usize,
}

/// Rewritten file plus its statistics
#[derive(Debug, Clone)]
pub struct RewriteOutput {
    /// Complete output file
    pub data: Vec<u8>,
    /// What happened
    pub stats: RewriteStats,
}

/// Rewrite in memory.
///
/// Only the base file's headers, inter-chunk bytes and trailer are kept;
/// appended files contribute their movi payload alone.
pub fn rewrite_bytes(base: &[u8], appended: &[&[u8]], config: &MoshConfig) -> Result<RewriteOutput> {
    let appended = appended.iter().map(|data| Bytes::copy_from_slice(data)).collect();
    rewrite_clips(Bytes::copy_from_slice(base), appended, config)
}

/// Rewrite owned inputs; chunk payloads are sliced out of them without copying.
fn rewrite_clips(base: Bytes, appended: Vec<Bytes>, config: &MoshConfig) -> Result<RewriteOutput> {
    config.validate()?;

    let clips = appended.len() + 1;
    let base = AviStructure::parse(base, 0)?;
    let mut chunks = base.chunks;
    for (offset, data) in appended.into_iter().enumerate() {
        let clip_id = offset + 1;
        let extra = AviStructure::parse(data, clip_id)?;
        debug!("Clip {} contributes {} chunks", clip_id, extra.chunks.len());
        chunks.extend(extra.chunks);
    }
    let input_chunks = chunks.len();

    let selection = select_frames(&chunks, config)?;
    let built = build_movi_and_index(&selection.chunks)?;

    let mut prefix = base.prefix;
    let offsets = find_header_offsets(&prefix)?;
    offsets.patch(&mut prefix, built.video_frames);

    let total = prefix.len() + built.movi.len() + base.between.len() + built.idx1.len() + base.suffix.len();
    let mut data = Vec::with_capacity(total);
    data.extend_from_slice(&prefix);
    data.extend_from_slice(&built.movi);
    data.extend_from_slice(&base.between);
    data.extend_from_slice(&built.idx1);
    data.extend_from_slice(&base.suffix);

    let riff_size = u32::try_from(data.len() - 8).map_err(|_| MoshError::OutputTooLarge(data.len()))?;
    LittleEndian::write_u32(&mut data[4..8], riff_size);

    let stats = RewriteStats {
        clips,
        input_chunks,
        output_chunks: selection.chunks.len(),
        keyframes_kept: selection.keyframes_kept,
        keyframes_dropped: selection.keyframes_dropped,
        duplicates_inserted: selection.duplicates_inserted,
        video_frames: built.video_frames,
        output_bytes: data.len(),
    };

    info!(
        "Rewrote {} clip(s): {} -> {} chunks, {} keyframes dropped, {} duplicates, {} video frames",
        stats.clips,
        stats.input_chunks,
        stats.output_chunks,
        stats.keyframes_dropped,
        stats.duplicates_inserted,
        stats.video_frames
    );

    Ok(RewriteOutput { data, stats })
}

/// Rewrite files on disk.
///
/// All inputs are read whole, and the output is written in one go after it
/// has been assembled, so a failed run leaves no output behind.
pub fn rewrite_avi(source: &Path, appended: &[PathBuf], output: &Path, config: &MoshConfig) -> Result<RewriteStats> {
    let base = Bytes::from(fs::read(source)?);
    let extras = appended
        .iter()
        .map(|path| fs::read(path).map(Bytes::from))
        .collect::<std::io::Result<Vec<_>>>()?;

    let RewriteOutput { data, stats } = rewrite_clips(base, extras, config)?;
    fs::write(output, data)?;

    debug!("Wrote {} bytes to {}", stats.output_bytes, output.display());
    Ok(stats)
}
