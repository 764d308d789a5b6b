//! Keyframe spec checker.

use clap::Args;
use datamosh_avi::parse_keyframe_spec;

/// Parse a keyframe spec such as "0,5,10-12" and print the ordinals it selects.
#[derive(Args, Debug)]
pub struct CmdKeys {
    /// Comma-separated ordinals and inclusive ranges
    pub spec: String,

    /// Print the ordinals as a JSON array
    #[arg(long)]
    pub json: bool,
}

impl CmdKeys {
    /// Execute the keys command.
    pub fn run(&self) -> anyhow::Result<()> {
        let keys = parse_keyframe_spec(&self.spec)?;

        if self.json {
            println!("{}", serde_json::to_string(&keys)?);
        } else if keys.is_empty() {
            println!("(none)");
        } else {
            let list: Vec<String> = keys.iter().map(|k| k.to_string()).collect();
            println!("{} keyframe(s): {}", keys.len(), list.join(", "));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_spec() {
        let cmd = CmdKeys {
            spec: "2,0-1".into(),
            json: true,
        };
        assert!(cmd.run().is_ok());
    }

    #[test]
    fn test_invalid_spec() {
        let cmd = CmdKeys {
            spec: "3-1".into(),
            json: false,
        };
        let err = cmd.run().unwrap_err();
        assert_eq!(err.to_string(), "Range end before start in '3-1'");
    }

    #[test]
    fn test_huge_range_is_rejected() {
        let cmd = CmdKeys {
            spec: "0-18446744073709551615".into(),
            json: true,
        };
        let err = cmd.run().unwrap_err();
        assert!(err.to_string().contains("Range too large"));
    }
}
