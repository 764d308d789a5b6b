//! Datamosh CLI - keyframe removal and P-frame duplication for AVI files.

mod commands;
mod config;

use clap::{Parser, Subcommand};
use commands::{CmdInfo, CmdKeys, CmdMosh, OutputMode};
use console::style;
use tracing_subscriber::EnvFilter;

/// Command-line arguments for the datamosh tool.
#[derive(Parser, Debug)]
#[command(name = "datamosh")]
#[command(version)]
#[command(about = "Glitch AVI files by removing keyframes and repeating P-frames")]
#[command(long_about = "Datamosh rewrites the compressed payload of AVI files without \n\
    decoding it. Dropped keyframes make the decoder smear motion from one \n\
    scene over the next; duplicated P-frames stretch that motion out.\n\n\
    EXAMPLES:\n    \
    datamosh mosh input.avi output.avi\n    \
    datamosh mosh a.avi out.avi --append b.avi --duplicate-count 3 --duplicate-gap 10\n    \
    datamosh mosh a.avi out.avi --keep-first 0 --keep-keys 0,4\n    \
    datamosh info input.avi\n    \
    datamosh keys 0,5,10-12")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Rewrite an AVI file (plus appended clips) into a datamoshed output
    Mosh(CmdMosh),
    /// Show chunk counts, keyframe ordinals and header frame counts
    Info(CmdInfo),
    /// Check a keyframe spec and list the ordinals it selects
    Keys(CmdKeys),
}

impl Command {
    fn output_mode(&self) -> OutputMode {
        match self {
            Command::Mosh(cmd) => cmd.output_mode(),
            Command::Info(cmd) if cmd.json => OutputMode::Json,
            Command::Keys(cmd) if cmd.json => OutputMode::Json,
            _ => OutputMode::Normal,
        }
    }
}

/// Install the tracing subscriber; `RUST_LOG` overrides the default level.
fn init_logging(mode: OutputMode) {
    if !mode.is_human() {
        return;
    }

    let default_level = if mode == OutputMode::Verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let output_mode = cli.command.output_mode();

    init_logging(output_mode);

    let result = match &cli.command {
        Command::Mosh(cmd) => cmd.run(),
        Command::Info(cmd) => cmd.run(),
        Command::Keys(cmd) => cmd.run(),
    };

    if let Err(e) = result {
        match output_mode {
            OutputMode::Json => {
                let error = serde_json::json!({
                    "type": "error",
                    "success": false,
                    "message": format!("{:#}", e)
                });
                println!("{}", error);
            }
            OutputMode::Quiet => {}
            OutputMode::Normal | OutputMode::Verbose => {
                eprintln!("{} {:#}", style("Error:").red().bold(), e);
            }
        }
        std::process::exit(1);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_subcommand_output_modes() {
        let cli = Cli::parse_from(["datamosh", "info", "clip.avi", "--json"]);
        assert_eq!(cli.command.output_mode(), OutputMode::Json);

        let cli = Cli::parse_from(["datamosh", "keys", "1-3"]);
        assert_eq!(cli.command.output_mode(), OutputMode::Normal);

        let cli = Cli::parse_from(["datamosh", "mosh", "a.avi", "b.avi", "-v"]);
        assert_eq!(cli.command.output_mode(), OutputMode::Verbose);
    }

    #[test]
    fn test_conflicting_modes_rejected() {
        let result = Cli::try_parse_from(["datamosh", "mosh", "a.avi", "b.avi", "--json", "--quiet"]);
        assert!(result.is_err());
    }
}
