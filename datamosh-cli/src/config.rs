//! Per-clip policy files.
//!
//! A clips file is JSON with one profile per input, in argument order
//! (the base clip first):
//!
//! ```json
//! { "clips": [
//!     { "keep_first": 1 },
//!     { "keep_first": 0, "duplicate_count": 2, "duplicate_gap": 5, "keep_keys": "3,8-9" }
//! ] }
//! ```

use anyhow::Context;
use datamosh_avi::{parse_keyframe_spec, ClipOptions, KeyframeSet};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Policy for one clip as written in a clips file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClipProfile {
    /// Leading keyframes to keep.
    pub keep_first: usize,
    /// Extra copies per duplicated P-frame.
    pub duplicate_count: i32,
    /// Duplicate every Nth P-frame.
    pub duplicate_gap: i32,
    /// Drop the clip's first keyframe.
    pub drop_first_keyframe: bool,
    /// Clip-local keyframe ordinals to keep, e.g. `"0,5,10-12"`.
    pub keep_keys: Option<String>,
    /// Clip-local keyframe ordinals to drop.
    pub drop_keys: Option<String>,
}

impl Default for ClipProfile {
    fn default() -> Self {
        ClipProfile {
            keep_first: 1,
            duplicate_count: 0,
            duplicate_gap: 1,
            drop_first_keyframe: false,
            keep_keys: None,
            drop_keys: None,
        }
    }
}

impl ClipProfile {
    /// Convert to library options, parsing the keyframe specs.
    pub fn to_options(&self) -> datamosh_avi::Result<ClipOptions> {
        Ok(ClipOptions {
            keep_initial_keyframes: self.keep_first,
            duplicate_count: self.duplicate_count,
            duplicate_gap: self.duplicate_gap,
            drop_first_keyframe: self.drop_first_keyframe,
            keep_specific_keys: parse_key_set(self.keep_keys.as_deref())?,
            drop_specific_keys: parse_key_set(self.drop_keys.as_deref())?,
        })
    }
}

/// Top level of a clips file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClipsFile {
    /// One profile per clip; the index is the clip id.
    pub clips: Vec<ClipProfile>,
}

impl ClipsFile {
    /// Parse from JSON text.
    pub fn from_json(text: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Per-clip options keyed by clip id.
    pub fn to_options(&self) -> anyhow::Result<BTreeMap<usize, ClipOptions>> {
        self.clips
            .iter()
            .enumerate()
            .map(|(clip_id, profile)| {
                let options = profile
                    .to_options()
                    .with_context(|| format!("Invalid profile for clip {}", clip_id))?;
                Ok((clip_id, options))
            })
            .collect()
    }
}

/// Load a clips file and turn it into per-clip options.
pub fn load_clip_options(path: &Path) -> anyhow::Result<BTreeMap<usize, ClipOptions>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read clips file: {}", path.display()))?;
    let file = ClipsFile::from_json(&text)
        .with_context(|| format!("Failed to parse clips file: {}", path.display()))?;
    file.to_options()
}

/// Parse an optional keyframe spec; an empty set counts as no set.
pub fn parse_key_set(spec: Option<&str>) -> datamosh_avi::Result<Option<KeyframeSet>> {
    match spec {
        Some(spec) => {
            let keys = parse_keyframe_spec(spec)?;
            Ok((!keys.is_empty()).then_some(keys))
        }
        None => Ok(None),
    }
}
