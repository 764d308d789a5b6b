//! AVI file inspection command.

use super::format_size;
use anyhow::Context;
use clap::Args;
use console::style;
use datamosh_avi::ClipSummary;
use serde::Serialize;
use std::path::PathBuf;

/// Clip summary plus the path it came from.
#[derive(Debug, Clone, Serialize)]
pub struct ClipInfo {
    /// File path.
    pub file: String,
    /// Declared counts agree with the payload.
    pub headers_consistent: bool,
    /// Parsed summary.
    #[serde(flatten)]
    pub summary: ClipSummary,
}

/// Inspect an AVI file: chunk counts, keyframe ordinals and header totals.
#[derive(Args, Debug)]
pub struct CmdInfo {
    /// Path to the AVI file.
    pub file: PathBuf,

    /// Output in JSON format.
    #[arg(long)]
    pub json: bool,
}

impl CmdInfo {
    /// Execute the info command.
    pub fn run(&self) -> anyhow::Result<()> {
        let info = self.analyze()?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&info)?);
        } else {
            print_clip_info(&info);
        }

        Ok(())
    }

    fn analyze(&self) -> anyhow::Result<ClipInfo> {
        if !self.file.exists() {
            anyhow::bail!("File not found: {}", self.file.display());
        }

        let data = std::fs::read(&self.file)
            .with_context(|| format!("Failed to read {}", self.file.display()))?;
        let summary = ClipSummary::from_bytes(&data)
            .with_context(|| format!("Failed to parse {}", self.file.display()))?;

        Ok(ClipInfo {
            file: self.file.display().to_string(),
            headers_consistent: summary.headers_consistent(),
            summary,
        })
    }
}

fn print_clip_info(info: &ClipInfo) {
    let summary = &info.summary;

    println!();
    println!("{}", style("AVI Information").cyan().bold());
    println!();

    println!("  {:<16} {}", style("File:").white(), info.file);
    println!(
        "  {:<16} {}",
        style("Size:").white(),
        format_size(summary.file_size as u64)
    );
    println!("  {:<16} {}", style("Chunks:").white(), summary.chunk_count);
    println!("  {:<16} {}", style("Video frames:").white(), summary.video_frames);
    println!("  {:<16} {}", style("Audio chunks:").white(), summary.audio_chunks);
    println!("  {:<16} {}", style("Keyframes:").white(), summary.keyframes.len());

    println!();
    println!("{}", style("Declared frame counts:").cyan().bold());
    println!("    {:<14} {}", style("avih:").dim(), show(summary.declared.total_frames));
    println!(
        "    {:<14} {}",
        style("strh (video):").dim(),
        show(summary.declared.video_stream_length)
    );
    for (i, frames) in summary.declared.odml_total_frames.iter().enumerate() {
        println!("    {:<14} {}", style(format!("dmlh #{}:", i)).dim(), frames);
    }
    if !info.headers_consistent {
        println!(
            "    {}",
            style("Headers disagree with the number of video chunks").yellow()
        );
    }

    if !summary.keyframes.is_empty() {
        println!();
        println!("{}", style("Keyframes (ordinal -> frame):").cyan().bold());
        for position in &summary.keyframes {
            println!(
                "    {:>5} -> {}",
                style(position.ordinal).yellow(),
                position.frame
            );
        }
    }

    println!();
}

fn show(value: Option<u32>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}
