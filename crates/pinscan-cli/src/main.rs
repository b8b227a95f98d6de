mod display;

use anyhow::Result;
use clap::{Parser, Subcommand};
use pinscan_core::scanner;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "pinscan",
    version,
    about = "pinscan — supply-chain hygiene scanner",
    long_about = "Statically inspect a repository's build, CI, and container files for unpinned or insecurely fetched external dependencies."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a repository and list every external dependency found
    Scan {
        /// Path to the repository root
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,

        /// Maximum directory depth to walk
        #[arg(long, default_value_t = pinscan_core::DEFAULT_MAX_DEPTH)]
        max_depth: usize,

        /// Also list files that could not be parsed
        #[arg(long)]
        show_errors: bool,
    },

    /// Print only the hygiene score for a repository
    Score {
        /// Path to the repository root
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Maximum directory depth to walk
        #[arg(long, default_value_t = pinscan_core::DEFAULT_MAX_DEPTH)]
        max_depth: usize,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Scan {
            path,
            format,
            max_depth,
            show_errors,
        } => cmd_scan(&path, &format, max_depth, show_errors),
        Commands::Score { path, max_depth } => cmd_score(&path, max_depth),
    }
}

fn cmd_scan(path: &PathBuf, format: &str, max_depth: usize, show_errors: bool) -> Result<()> {
    let summary = scanner::scan_repository(path, max_depth)?;

    match format {
        "json" => {
            let json = serde_json::to_string_pretty(&summary)?;
            println!("{}", json);
        }
        _ => {
            display::print_scan_report(&summary, show_errors);
        }
    }

    Ok(())
}

fn cmd_score(path: &PathBuf, max_depth: usize) -> Result<()> {
    let summary = scanner::scan_repository(path, max_depth)?;
    display::print_score(&summary);
    Ok(())
}
