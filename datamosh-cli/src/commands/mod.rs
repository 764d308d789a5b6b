//! CLI subcommand implementations.

pub mod info;
pub mod keys;
pub mod mosh;

pub use info::CmdInfo;
pub use keys::CmdKeys;
pub use mosh::CmdMosh;

/// Output mode for the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Normal human-readable output.
    Normal,
    /// JSON output for programmatic parsing.
    Json,
    /// Quiet mode with minimal output.
    Quiet,
    /// Verbose mode with detailed stats.
    Verbose,
}

impl OutputMode {
    /// Pick the mode from the usual trio of flags.
    pub fn from_flags(json: bool, quiet: bool, verbose: bool) -> Self {
        if json {
            OutputMode::Json
        } else if quiet {
            OutputMode::Quiet
        } else if verbose {
            OutputMode::Verbose
        } else {
            OutputMode::Normal
        }
    }

    /// Human-readable output is printed in this mode.
    pub fn is_human(self) -> bool {
        matches!(self, OutputMode::Normal | OutputMode::Verbose)
    }
}

/// Format bytes as human-readable size.
pub(crate) fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * KB;
    const GB: u64 = 1024 * MB;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
