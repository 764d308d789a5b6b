//! Keyframe index specifications such as `"0,5,10-12"`

use crate::error::{MoshError, Result};
use crate::select::KeyframeSet;

/// Widest range a single token may expand to
pub const MAX_RANGE_WIDTH: usize = 1 << 20;

/// Parse comma-separated keyframe ordinals and inclusive ranges.
///
/// Whitespace around tokens is ignored and empty tokens are skipped, so an
/// empty string yields an empty set.
///
/// ```
/// use datamosh_avi::parse_keyframe_spec;
///
/// let keys = parse_keyframe_spec("0, 5,10-12").unwrap();
/// assert_eq!(keys.into_iter().collect::<Vec<_>>(), vec![0, 5, 10, 11, 12]);
/// ```
pub fn parse_keyframe_spec(spec: &str) -> Result<KeyframeSet> {
    let mut keys = KeyframeSet::new();

    for part in spec.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        match part.split_once('-') {
            Some((start, end)) => {
                let invalid = || MoshError::InvalidKeyframeSpec(format!("Invalid keyframe range '{part}'"));
                let start: usize = start.trim().parse().map_err(|_| invalid())?;
                let end: usize = end.trim().parse().map_err(|_| invalid())?;
                if end < start {
                    return Err(MoshError::InvalidKeyframeSpec(format!(
                        "Range end before start in '{part}'"
                    )));
                }
                if end - start >= MAX_RANGE_WIDTH {
                    return Err(MoshError::InvalidKeyframeSpec(format!(
                        "Range too large in '{part}' (at most {MAX_RANGE_WIDTH} keyframes)"
                    )));
                }
                keys.extend(start..=end);
            }
            None => {
                let index = part.parse().map_err(|_| {
                    MoshError::InvalidKeyframeSpec(format!("Invalid keyframe index '{part}'"))
                })?;
                keys.insert(index);
            }
        }
    }

    Ok(keys)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(spec: &str) -> Vec<usize> {
        parse_keyframe_spec(spec).unwrap().into_iter().collect()
    }

    #[test]
    fn test_single_index() {
        assert_eq!(keys("5"), vec![5]);
    }

    #[test]
    fn test_multiple_indices() {
        assert_eq!(keys("3,1,2,1"), vec![1, 2, 3]);
    }

    #[test]
    fn test_range() {
        assert_eq!(keys("10-12"), vec![10, 11, 12]);
        assert_eq!(keys("4-4"), vec![4]);
    }

    #[test]
    fn test_mixed_with_whitespace() {
        assert_eq!(keys(" 0, 5 ,, 10 - 12 "), vec![0, 5, 10, 11, 12]);
    }

    #[test]
    fn test_empty() {
        assert!(keys("").is_empty());
        assert!(keys(" , ").is_empty());
    }

    #[test]
    fn test_invalid_token() {
        let err = parse_keyframe_spec("1,abc").unwrap_err();
        assert_eq!(err.to_string(), "Invalid keyframe index 'abc'");
    }

    #[test]
    fn test_invalid_range() {
        let err = parse_keyframe_spec("1-x").unwrap_err();
        assert_eq!(err.to_string(), "Invalid keyframe range '1-x'");

        // a leading minus reads as a range with an empty start
        let err = parse_keyframe_spec("-3").unwrap_err();
        assert_eq!(err.to_string(), "Invalid keyframe range '-3'");
    }

    #[test]
    fn test_range_width_is_capped() {
        let err = parse_keyframe_spec("0-18446744073709551615").unwrap_err();
        assert!(err.to_string().starts_with("Range too large in '0-18446744073709551615'"));
        assert_eq!(err.kind(), crate::ErrorKind::Config);

        let widest = format!("5-{}", 5 + MAX_RANGE_WIDTH - 1);
        assert_eq!(parse_keyframe_spec(&widest).unwrap().len(), MAX_RANGE_WIDTH);
        assert!(parse_keyframe_spec(&format!("5-{}", 5 + MAX_RANGE_WIDTH)).is_err());
    }

    #[test]
    fn test_inverted_range() {
        let err = parse_keyframe_spec("9-2").unwrap_err();
        assert_eq!(err.to_string(), "Range end before start in '9-2'");
        assert_eq!(err.kind(), crate::ErrorKind::Config);
    }
}
