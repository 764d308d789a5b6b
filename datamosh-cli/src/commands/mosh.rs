//! The rewrite command.

use super::{format_size, OutputMode};
use crate::config::{load_clip_options, parse_key_set};
use anyhow::Context;
use clap::Args;
use console::style;
use datamosh_avi::{rewrite_avi, MoshConfig, RewriteStats};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::warn;

/// Remove keyframes and duplicate P-frames in an AVI file.
#[derive(Args, Debug)]
pub struct CmdMosh {
    /// Base AVI file
    pub input: PathBuf,

    /// Output AVI file
    pub output: PathBuf,

    /// Leading keyframes to keep in each clip
    #[arg(long = "keep-first", default_value_t = 1)]
    pub keep_first: usize,

    /// Extra copies inserted for each duplicated P-frame
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    pub duplicate_count: i32,

    /// Duplicate every Nth P-frame
    #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
    pub duplicate_gap: i32,

    /// Append another AVI file after the base (repeatable)
    #[arg(short, long = "append", value_name = "FILE")]
    pub append: Vec<PathBuf>,

    /// Global keyframe ordinals to keep, e.g. "0,5,10-12"
    #[arg(long, value_name = "SPEC")]
    pub keep_keys: Option<String>,

    /// Global keyframe ordinals to drop
    #[arg(long, value_name = "SPEC")]
    pub drop_keys: Option<String>,

    /// Keep the first keyframe of appended clips
    #[arg(long)]
    pub keep_appended_first: bool,

    /// JSON file with one policy per clip
    #[arg(long, value_name = "FILE")]
    pub clips: Option<PathBuf>,

    /// Overwrite output file if it exists
    #[arg(short = 'y', long)]
    pub overwrite: bool,

    /// Verbose output
    #[arg(short, long, conflicts_with = "quiet", conflicts_with = "json")]
    pub verbose: bool,

    /// Quiet mode (only print the output path on success)
    #[arg(short, long, conflicts_with = "verbose", conflicts_with = "json")]
    pub quiet: bool,

    /// JSON output mode for programmatic parsing
    #[arg(long, conflicts_with = "verbose", conflicts_with = "quiet")]
    pub json: bool,
}

/// JSON completion output structure.
#[derive(Debug, Clone, Serialize)]
struct JsonCompleteOutput<'a> {
    /// Type of message.
    #[serde(rename = "type")]
    msg_type: &'static str,
    /// Whether the rewrite succeeded.
    success: bool,
    /// Output path.
    output: String,
    /// Rewrite statistics.
    stats: &'a RewriteStats,
    /// Wall time in seconds.
    elapsed_seconds: f64,
}

impl CmdMosh {
    /// Determine the output mode based on flags.
    pub fn output_mode(&self) -> OutputMode {
        OutputMode::from_flags(self.json, self.quiet, self.verbose)
    }

    /// Build the rewrite policy from the flags and the optional clips file.
    pub fn to_config(&self) -> anyhow::Result<MoshConfig> {
        let clip_options = match &self.clips {
            Some(path) => Some(load_clip_options(path)?),
            None => None,
        };

        Ok(MoshConfig {
            keep_initial_keyframes: self.keep_first,
            duplicate_count: self.duplicate_count,
            duplicate_gap: self.duplicate_gap,
            keep_key_indices: parse_key_set(self.keep_keys.as_deref()).context("Invalid --keep-keys")?,
            drop_key_indices: parse_key_set(self.drop_keys.as_deref()).context("Invalid --drop-keys")?,
            clip_options,
            drop_appended_first: !self.keep_appended_first,
        })
    }

    /// Execute the mosh command.
    pub fn run(&self) -> anyhow::Result<()> {
        let mode = self.output_mode();

        for path in std::iter::once(&self.input).chain(&self.append) {
            if !path.exists() {
                anyhow::bail!("Input file not found: {}", path.display());
            }
        }
        for message in self.extension_warnings() {
            emit_warning(mode, &message);
        }

        if self.output.exists() && !self.overwrite {
            anyhow::bail!(
                "Output file already exists: {} (use -y to overwrite)",
                self.output.display()
            );
        }

        let config = self.to_config()?;
        config.validate()?;

        if mode.is_human() {
            self.print_configuration(&config);
        }

        let start = Instant::now();
        let stats = rewrite_avi(&self.input, &self.append, &self.output, &config)
            .with_context(|| format!("Failed to rewrite {}", self.input.display()))?;
        let elapsed = start.elapsed().as_secs_f64();

        match mode {
            OutputMode::Json => {
                let output = JsonCompleteOutput {
                    msg_type: "complete",
                    success: true,
                    output: self.output.display().to_string(),
                    stats: &stats,
                    elapsed_seconds: elapsed,
                };
                println!("{}", serde_json::to_string(&output)?);
            }
            OutputMode::Quiet => {
                println!("{}", self.output.display());
            }
            OutputMode::Normal | OutputMode::Verbose => {
                self.print_stats(&stats, elapsed, mode == OutputMode::Verbose);
            }
        }

        Ok(())
    }

    fn extension_warnings(&self) -> Vec<String> {
        std::iter::once(&self.input)
            .chain(&self.append)
            .filter(|path| !has_avi_extension(path))
            .map(|path| format!("{} does not have an .avi extension", path.display()))
            .collect()
    }

    fn print_configuration(&self, config: &MoshConfig) {
        println!();
        println!("{}", style("Configuration:").cyan().bold());
        println!("  Input:           {}", style(self.input.display()).white());
        for path in &self.append {
            println!("  Append:          {}", style(path.display()).white());
        }
        println!("  Output:          {}", style(self.output.display()).white());

        match &config.clip_options {
            Some(options) => {
                println!("  Clip profiles:   {}", style(options.len()).white());
            }
            None => {
                println!("  Keep first:      {}", style(config.keep_initial_keyframes).white());
                println!(
                    "  Duplicates:      {} every {} P-frame(s)",
                    style(config.duplicate_count).white(),
                    style(config.duplicate_gap).white()
                );
            }
        }
        if let Some(keys) = &config.keep_key_indices {
            println!("  Keep keys:       {}", style(join_keys(keys)).white());
        }
        if let Some(keys) = &config.drop_key_indices {
            println!("  Drop keys:       {}", style(join_keys(keys)).white());
        }
        println!();
    }

    fn print_stats(&self, stats: &RewriteStats, elapsed: f64, verbose: bool) {
        println!("{}", style("Datamosh complete!").green().bold());
        println!();
        println!("{}", style("Statistics:").cyan().bold());
        println!("  {:20} {}", "Clips:", stats.clips);
        println!("  {:20} {}", "Video frames:", stats.video_frames);
        println!(
            "  {:20} {}",
            "Keyframes dropped:",
            style(stats.keyframes_dropped).yellow()
        );
        println!("  {:20} {}", "Duplicates added:", stats.duplicates_inserted);

        if verbose {
            println!("  {:20} {}", "Keyframes kept:", stats.keyframes_kept);
            println!("  {:20} {}", "Input chunks:", stats.input_chunks);
            println!("  {:20} {}", "Output chunks:", stats.output_chunks);
            println!(
                "  {:20} {} ({} bytes)",
                "Output size:",
                format_size(stats.output_bytes as u64),
                stats.output_bytes
            );
            println!("  {:20} {:.3}s", "Time elapsed:", elapsed);
        }

        println!();
        println!(
            "{} {}",
            style("Output saved to:").white(),
            style(self.output.display()).green().bold()
        );
    }
}

/// Warnings reach the user in every mode; logging is off for JSON and quiet.
fn emit_warning(mode: OutputMode, message: &str) {
    match mode {
        OutputMode::Json => println!("{}", warning_json(message)),
        OutputMode::Quiet => eprintln!("{} {}", style("Warning:").yellow().bold(), message),
        OutputMode::Normal | OutputMode::Verbose => warn!("{}", message),
    }
}

fn warning_json(message: &str) -> serde_json::Value {
    serde_json::json!({
        "type": "warning",
        "message": message,
    })
}

fn has_avi_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("avi"))
}

fn join_keys(keys: &datamosh_avi::KeyframeSet) -> String {
    keys.iter().map(|k| k.to_string()).collect::<Vec<_>>().join(",")
}
