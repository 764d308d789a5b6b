#![no_main]

//! Fuzz target for AVI parsing and rewriting.
//!
//! Raw bytes exercise the scanner and index cross-checks; structured input
//! builds well-formed files and checks that every rewrite parses back.

use arbitrary::Arbitrary;
use datamosh_avi::fixtures::{AviFixture, FixtureChunk};
use datamosh_avi::{rewrite_bytes, AviStructure, ClipSummary, IndexEntry, MoshConfig};
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
enum AviInput {
    /// Arbitrary bytes, usually rejected
    Raw(Vec<u8>),
    /// Valid file built from chunk descriptions
    Structured {
        chunks: Vec<(u8, Vec<u8>)>,
        keep: u8,
        count: u8,
        gap: u8,
    },
}

fuzz_target!(|input: AviInput| {
    match input {
        AviInput::Raw(data) => {
            if data.len() > 1024 * 1024 {
                return;
            }
            let _ = ClipSummary::from_bytes(&data);
            let _ = rewrite_bytes(&data, &[], &MoshConfig::default());
        }
        AviInput::Structured { chunks, keep, count, gap } => {
            let chunks: Vec<FixtureChunk> = chunks
                .into_iter()
                .take(256)
                .map(|(kind, data)| {
                    let (id, flags) = match kind % 3 {
                        0 => (*b"00dc", IndexEntry::KEYFRAME),
                        1 => (*b"00dc", 0),
                        _ => (*b"01wb", IndexEntry::KEYFRAME),
                    };
                    FixtureChunk { id, flags, data }
                })
                .collect();
            let data = AviFixture::new(chunks).build();

            let config = MoshConfig {
                keep_initial_keyframes: keep as usize,
                duplicate_count: (count % 8) as i32,
                duplicate_gap: (gap % 16) as i32 + 1,
                ..Default::default()
            };

            // Valid input and valid policy must always rewrite
            let output = rewrite_bytes(&data, &[], &config).expect("rewrite of a valid file failed");
            let reparsed = AviStructure::parse(output.data.into(), 0).expect("rewritten file does not parse");
            assert_eq!(reparsed.chunks.len(), output.stats.output_chunks);
        }
    }
});
