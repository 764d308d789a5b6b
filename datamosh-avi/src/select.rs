//! Frame selection: which keyframes survive and which P-frames get duplicated.

use crate::chunks::{CHUNK_HEADER_SIZE, INDEX_ENTRY_SIZE};
use crate::error::{MoshError, Result};
use crate::extract::MoshChunk;
use serde::{Deserialize, Serialize};
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Ordered set of keyframe ordinals
pub type KeyframeSet = BTreeSet<usize>;

/// Each output chunk costs at least a chunk header in movi plus an idx1 entry
const MIN_OUTPUT_BYTES_PER_CHUNK: usize = CHUNK_HEADER_SIZE + INDEX_ENTRY_SIZE;

/// Policy for a single clip
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClipOptions {
    /// Leading keyframes to keep
    pub keep_initial_keyframes: usize,
    /// Extra copies per duplicated P-frame
    pub duplicate_count: i32,
    /// Duplicate every Nth P-frame
    pub duplicate_gap: i32,
    /// Drop the clip's first keyframe regardless of the other settings
    pub drop_first_keyframe: bool,
    /// Clip-local keyframe ordinals to keep
    pub keep_specific_keys: Option<KeyframeSet>,
    /// Clip-local keyframe ordinals to drop
    pub drop_specific_keys: Option<KeyframeSet>,
}

impl Default for ClipOptions {
    fn default() -> Self {
        ClipOptions {
            keep_initial_keyframes: 1,
            duplicate_count: 0,
            duplicate_gap: 1,
            drop_first_keyframe: false,
            keep_specific_keys: None,
            drop_specific_keys: None,
        }
    }
}

/// Global policy, with optional per-clip overrides
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MoshConfig {
    /// Leading keyframes to keep in each clip
    pub keep_initial_keyframes: usize,
    /// Extra copies per duplicated P-frame
    pub duplicate_count: i32,
    /// Duplicate every Nth P-frame
    pub duplicate_gap: i32,
    /// Global keyframe ordinals to keep, counted across all clips
    pub keep_key_indices: Option<KeyframeSet>,
    /// Global keyframe ordinals to drop, counted across all clips
    pub drop_key_indices: Option<KeyframeSet>,
    /// Explicit options per clip id; a clip with an entry ignores the global values above
    pub clip_options: Option<BTreeMap<usize, ClipOptions>>,
    /// Drop the first keyframe of every appended clip that has no explicit options
    pub drop_appended_first: bool,
}

impl Default for MoshConfig {
    fn default() -> Self {
        MoshConfig {
            keep_initial_keyframes: 1,
            duplicate_count: 0,
            duplicate_gap: 1,
            keep_key_indices: None,
            drop_key_indices: None,
            clip_options: None,
            drop_appended_first: true,
        }
    }
}

impl MoshConfig {
    /// Keep every keyframe and insert nothing
    pub fn passthrough() -> Self {
        MoshConfig {
            keep_initial_keyframes: usize::MAX,
            drop_appended_first: false,
            ..Default::default()
        }
    }

    /// Check the global values
    pub fn validate(&self) -> Result<()> {
        validate_duplication(self.duplicate_count, self.duplicate_gap).map(|_| ())
    }

    /// Resolve the effective policy for one clip
    pub fn resolve(&self, clip_id: usize) -> Result<ClipPolicy<'_>> {
        match self.clip_options.as_ref().and_then(|map| map.get(&clip_id)) {
            Some(options) => {
                let (duplicate_count, duplicate_gap) =
                    validate_duplication(options.duplicate_count, options.duplicate_gap)?;
                Ok(ClipPolicy {
                    keep_limit: options.keep_initial_keyframes,
                    duplicate_count,
                    duplicate_gap,
                    drop_first: options.drop_first_keyframe,
                    keep_set: options.keep_specific_keys.as_ref(),
                    drop_set: options.drop_specific_keys.as_ref(),
                })
            }
            None => {
                let (duplicate_count, duplicate_gap) =
                    validate_duplication(self.duplicate_count, self.duplicate_gap)?;
                Ok(ClipPolicy {
                    keep_limit: self.keep_initial_keyframes,
                    duplicate_count,
                    duplicate_gap,
                    drop_first: self.drop_appended_first && clip_id != 0,
                    keep_set: None,
                    drop_set: None,
                })
            }
        }
    }
}

fn validate_duplication(count: i32, gap: i32) -> Result<(usize, usize)> {
    let count = usize::try_from(count)
        .map_err(|_| MoshError::InvalidConfig(format!("duplicate_count must be >= 0, got {count}")))?;
    let gap = usize::try_from(gap)
        .ok()
        .filter(|&gap| gap > 0)
        .ok_or_else(|| MoshError::InvalidConfig(format!("duplicate_gap must be >= 1, got {gap}")))?;
    Ok((count, gap))
}

/// Policy resolved for one clip, computed once per pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClipPolicy<'a> {
    pub keep_limit: usize,
    pub duplicate_count: usize,
    pub duplicate_gap: usize,
    pub drop_first: bool,
    pub keep_set: Option<&'a KeyframeSet>,
    pub drop_set: Option<&'a KeyframeSet>,
}

/// Per-clip counters
struct ClipState<'a> {
    policy: ClipPolicy<'a>,
    key_index: usize,
    keys_kept: usize,
    predicted: usize,
}

/// Result of a selection pass
#[derive(Debug, Clone, Default)]
pub struct Selection {
    /// Output chunk sequence
    pub chunks: Vec<MoshChunk>,
    /// Keyframes kept
    pub keyframes_kept: usize,
    /// Keyframes dropped
    pub keyframes_dropped: usize,
    /// Duplicate P-frames inserted
    pub duplicates_inserted: usize,
}

/// Apply the frame-selection policy to a concatenated chunk sequence.
///
/// Keyframe decisions follow a fixed precedence, first match wins:
/// drop-first flag, clip drop set, global drop set, clip keep set,
/// global keep set, then the leading-keyframe quota. Dropped keyframes
/// leave no replacement behind.
pub fn select_frames(chunks: &[MoshChunk], config: &MoshConfig) -> Result<Selection> {
    config.validate()?;

    let mut selection = Selection {
        chunks: Vec::with_capacity(chunks.len()),
        ..Default::default()
    };
    let mut clips: BTreeMap<usize, ClipState<'_>> = BTreeMap::new();
    let mut global_key_index = 0usize;

    for chunk in chunks {
        if !chunk.is_video {
            selection.chunks.push(chunk.clone());
            continue;
        }

        let state = match clips.entry(chunk.clip_id) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let policy = config.resolve(chunk.clip_id)?;
                debug!("Clip {} policy: {:?}", chunk.clip_id, policy);
                entry.insert(ClipState {
                    policy,
                    key_index: 0,
                    keys_kept: 0,
                    predicted: 0,
                })
            }
        };
        let policy = state.policy;

        if chunk.is_keyframe {
            let local = state.key_index;
            let keep = if policy.drop_first && local == 0 {
                false
            } else if policy.drop_set.is_some_and(|set| set.contains(&local)) {
                false
            } else if config
                .drop_key_indices
                .as_ref()
                .is_some_and(|set| set.contains(&global_key_index))
            {
                false
            } else if policy.keep_set.is_some_and(|set| set.contains(&local)) {
                true
            } else if config
                .keep_key_indices
                .as_ref()
                .is_some_and(|set| set.contains(&global_key_index))
            {
                true
            } else {
                state.keys_kept < policy.keep_limit
            };

            if keep {
                selection.chunks.push(chunk.clone());
                state.keys_kept += 1;
                selection.keyframes_kept += 1;
            } else {
                selection.keyframes_dropped += 1;
            }

            state.key_index += 1;
            global_key_index += 1;
            continue;
        }

        state.predicted += 1;
        selection.chunks.push(chunk.clone());

        if policy.duplicate_count > 0 && state.predicted % policy.duplicate_gap == 0 {
            let min_bytes = selection
                .chunks
                .len()
                .saturating_add(policy.duplicate_count)
                .saturating_mul(MIN_OUTPUT_BYTES_PER_CHUNK);
            if min_bytes > u32::MAX as usize {
                return Err(MoshError::OutputTooLarge(min_bytes));
            }
            for _ in 0..policy.duplicate_count {
                selection.chunks.push(chunk.as_duplicate());
            }
            selection.duplicates_inserted += policy.duplicate_count;
        }
    }

    Ok(selection)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunks::{FourCC, IndexEntry};
    use bytes::Bytes;

    fn chunk(id: &[u8; 4], keyframe: bool, tag: u8, clip_id: usize) -> MoshChunk {
        let flags = if keyframe { IndexEntry::KEYFRAME } else { 0 };
        MoshChunk::new(FourCC(*id), flags, Bytes::from(vec![tag]), clip_id)
    }

    fn k(tag: u8, clip: usize) -> MoshChunk {
        chunk(b"00dc", true, tag, clip)
    }

    fn p(tag: u8, clip: usize) -> MoshChunk {
        chunk(b"00dc", false, tag, clip)
    }

    fn a(tag: u8, clip: usize) -> MoshChunk {
        chunk(b"01wb", true, tag, clip)
    }

    fn tags(chunks: &[MoshChunk]) -> Vec<u8> {
        chunks.iter().map(|c| c.data[0]).collect()
    }

    fn set(items: &[usize]) -> Option<KeyframeSet> {
        Some(items.iter().copied().collect())
    }

    #[test]
    fn test_worked_example() {
        // [K0, P0, P1, P2, K1, P3]: K1 is past the quota, P1 and P3 are the
        // 2nd and 4th predicted frames
        let input = vec![k(0, 0), p(1, 0), p(2, 0), p(3, 0), k(4, 0), p(5, 0)];
        let config = MoshConfig {
            keep_initial_keyframes: 1,
            duplicate_count: 1,
            duplicate_gap: 2,
            ..Default::default()
        };

        let selection = select_frames(&input, &config).unwrap();

        assert_eq!(tags(&selection.chunks), vec![0, 1, 2, 2, 3, 5, 5]);
        assert_eq!(selection.chunks.iter().filter(|c| c.is_video).count(), 7);
        assert_eq!(selection.keyframes_kept, 1);
        assert_eq!(selection.keyframes_dropped, 1);
        assert_eq!(selection.duplicates_inserted, 2);
    }

    #[test]
    fn test_huge_duplicate_count_is_rejected_before_allocating() {
        let input = vec![k(0, 0), p(1, 0)];
        let config = MoshConfig {
            duplicate_count: i32::MAX,
            ..Default::default()
        };

        let err = select_frames(&input, &config).unwrap_err();
        assert!(matches!(err, MoshError::OutputTooLarge(_)));
        assert_eq!(err.kind(), crate::ErrorKind::Format);
    }

    #[test]
    fn test_worked_example_without_trailing_multiple() {
        // Dropping the last P-frame leaves only P1 on the cadence
        let input = vec![k(0, 0), p(1, 0), p(2, 0), p(3, 0), k(4, 0)];
        let config = MoshConfig {
            keep_initial_keyframes: 1,
            duplicate_count: 1,
            duplicate_gap: 2,
            ..Default::default()
        };

        let selection = select_frames(&input, &config).unwrap();
        assert_eq!(tags(&selection.chunks), vec![0, 1, 2, 2, 3]);
    }

    #[test]
    fn test_audio_passes_through_without_counting() {
        let input = vec![a(9, 0), k(0, 0), a(8, 0), p(1, 0), k(2, 0)];
        let config = MoshConfig {
            keep_initial_keyframes: 1,
            ..Default::default()
        };

        let selection = select_frames(&input, &config).unwrap();
        assert_eq!(tags(&selection.chunks), vec![9, 0, 8, 1]);
        assert!(selection.chunks[0].flags & IndexEntry::KEYFRAME != 0);
    }

    #[test]
    fn test_keep_zero_drops_all_keyframes() {
        let input = vec![k(0, 0), p(1, 0), k(2, 0), p(3, 0)];
        let config = MoshConfig {
            keep_initial_keyframes: 0,
            ..Default::default()
        };
        let selection = select_frames(&input, &config).unwrap();
        assert_eq!(tags(&selection.chunks), vec![1, 3]);
    }

    #[test]
    fn test_appended_first_keyframe_dropped_by_default() {
        let input = vec![k(0, 0), p(1, 0), k(2, 1), p(3, 1), k(4, 1)];
        let config = MoshConfig {
            keep_initial_keyframes: 2,
            ..Default::default()
        };

        let selection = select_frames(&input, &config).unwrap();
        // clip 1 drops K2 as its first keyframe, then keeps K4 under its own quota
        assert_eq!(tags(&selection.chunks), vec![0, 1, 3, 4]);

        let keep_first = MoshConfig {
            drop_appended_first: false,
            ..config
        };
        let selection = select_frames(&input, &keep_first).unwrap();
        assert_eq!(tags(&selection.chunks), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_global_sets_use_global_ordinals() {
        // global keyframe ordinals: K0=0, K2=1, K4=2, K6=3
        let input = vec![k(0, 0), k(2, 0), k(4, 1), k(6, 1)];
        let config = MoshConfig {
            keep_initial_keyframes: 0,
            keep_key_indices: set(&[1, 3]),
            drop_appended_first: false,
            ..Default::default()
        };
        let selection = select_frames(&input, &config).unwrap();
        assert_eq!(tags(&selection.chunks), vec![2, 6]);

        let config = MoshConfig {
            keep_initial_keyframes: usize::MAX,
            drop_key_indices: set(&[0, 2]),
            drop_appended_first: false,
            ..Default::default()
        };
        let selection = select_frames(&input, &config).unwrap();
        assert_eq!(tags(&selection.chunks), vec![2, 6]);
    }

    #[test]
    fn test_clip_options_use_local_ordinals() {
        let input = vec![k(0, 0), k(1, 0), k(2, 1), k(3, 1), k(4, 1)];
        let mut clip_options = BTreeMap::new();
        clip_options.insert(
            1,
            ClipOptions {
                keep_initial_keyframes: 0,
                keep_specific_keys: set(&[2]),
                ..Default::default()
            },
        );
        let config = MoshConfig {
            keep_initial_keyframes: 1,
            clip_options: Some(clip_options),
            ..Default::default()
        };

        let selection = select_frames(&input, &config).unwrap();
        // clip 0 falls back to the global quota; clip 1 keeps only its local #2
        assert_eq!(tags(&selection.chunks), vec![0, 4]);
    }

    #[test]
    fn test_precedence_drop_beats_keep() {
        let input = vec![k(0, 0), k(1, 0), k(2, 0)];
        let mut clip_options = BTreeMap::new();
        clip_options.insert(
            0,
            ClipOptions {
                keep_initial_keyframes: 0,
                keep_specific_keys: set(&[0, 1, 2]),
                drop_specific_keys: set(&[1]),
                drop_first_keyframe: true,
                ..Default::default()
            },
        );
        let config = MoshConfig {
            clip_options: Some(clip_options),
            drop_key_indices: set(&[2]),
            ..Default::default()
        };

        let selection = select_frames(&input, &config).unwrap();
        // #0 drop-first, #1 local drop set, #2 global drop set
        assert!(selection.chunks.is_empty());
        assert_eq!(selection.keyframes_dropped, 3);
    }

    #[test]
    fn test_global_keep_beyond_quota() {
        let input = vec![k(0, 0), k(1, 0), k(2, 0)];
        let config = MoshConfig {
            keep_initial_keyframes: 1,
            keep_key_indices: set(&[2]),
            ..Default::default()
        };
        let selection = select_frames(&input, &config).unwrap();
        assert_eq!(tags(&selection.chunks), vec![0, 2]);
    }

    #[test]
    fn test_forced_keeps_count_toward_quota() {
        let input = vec![k(0, 0), k(1, 0), k(2, 0)];
        let config = MoshConfig {
            keep_initial_keyframes: 1,
            keep_key_indices: set(&[0]),
            drop_key_indices: None,
            ..Default::default()
        };
        let selection = select_frames(&input, &config).unwrap();
        assert_eq!(tags(&selection.chunks), vec![0]);
    }

    #[test]
    fn test_duplication_cadence() {
        let input: Vec<MoshChunk> = std::iter::once(k(0, 0))
            .chain((1..=7).map(|t| p(t, 0)))
            .collect();
        let config = MoshConfig {
            duplicate_count: 2,
            duplicate_gap: 3,
            ..Default::default()
        };

        let selection = select_frames(&input, &config).unwrap();
        assert_eq!(
            tags(&selection.chunks),
            vec![0, 1, 2, 3, 3, 3, 4, 5, 6, 6, 6, 7]
        );
        assert_eq!(selection.duplicates_inserted, 2 * (7 / 3));
        assert!(selection.chunks.iter().all(|c| !c.is_keyframe || c.data[0] == 0));
    }

    #[test]
    fn test_predicted_counter_is_per_clip() {
        let input = vec![p(1, 0), p(2, 1), p(3, 0), p(4, 1)];
        let config = MoshConfig {
            duplicate_count: 1,
            duplicate_gap: 2,
            ..Default::default()
        };
        let selection = select_frames(&input, &config).unwrap();
        assert_eq!(tags(&selection.chunks), vec![1, 2, 3, 3, 4, 4]);
    }

    #[test]
    fn test_flagged_predicted_duplicate_loses_flag() {
        // A "db" frame with stray flag bits still gets a clean duplicate
        let mut source = chunk(b"00db", false, 7, 0);
        source.flags = 0x100;
        let config = MoshConfig {
            duplicate_count: 1,
            ..Default::default()
        };
        let selection = select_frames(&[source], &config).unwrap();
        assert_eq!(selection.chunks.len(), 2);
        assert_eq!(selection.chunks[1].flags & IndexEntry::KEYFRAME, 0);
    }

    #[test]
    fn test_invalid_global_config() {
        let negative = MoshConfig {
            duplicate_count: -1,
            ..Default::default()
        };
        assert!(matches!(
            select_frames(&[], &negative),
            Err(MoshError::InvalidConfig(_))
        ));

        let zero_gap = MoshConfig {
            duplicate_gap: 0,
            ..Default::default()
        };
        assert!(matches!(
            select_frames(&[], &zero_gap),
            Err(MoshError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_invalid_clip_config() {
        let mut clip_options = BTreeMap::new();
        clip_options.insert(
            1,
            ClipOptions {
                duplicate_gap: -4,
                ..Default::default()
            },
        );
        let config = MoshConfig {
            clip_options: Some(clip_options),
            ..Default::default()
        };

        assert!(select_frames(&[k(0, 0)], &config).is_ok());
        assert!(matches!(
            select_frames(&[k(0, 0), p(1, 1)], &config),
            Err(MoshError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_passthrough_keeps_everything() {
        let input = vec![k(0, 0), p(1, 0), a(2, 0), k(3, 1), p(4, 1)];
        let selection = select_frames(&input, &MoshConfig::passthrough()).unwrap();
        assert_eq!(selection.chunks, input);
    }

    #[test]
    fn test_clip_options_deserialize_with_defaults() {
        let options: ClipOptions =
            serde_json::from_str(r#"{"duplicate_count": 3, "keep_specific_keys": [4, 1]}"#).unwrap();
        assert_eq!(options.duplicate_count, 3);
        assert_eq!(options.keep_initial_keyframes, 1);
        assert_eq!(options.duplicate_gap, 1);
        assert_eq!(options.keep_specific_keys, set(&[1, 4]));
    }
}
