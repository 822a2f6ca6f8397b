use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "liveset",
    about = "Merge, split, and inspect Ableton Live sets",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Merge configuration (TOML)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Merge the tracks of two sets into one
    Merge(MergeArgs),
    /// Write every track, scene, and locator of a set as XML fragments
    Split(SplitArgs),
    /// Show version, tempo, key, and the track listing of a set
    Inspect(InspectArgs),
}

#[derive(Args)]
pub struct MergeArgs {
    pub base: PathBuf,
    pub incoming: PathBuf,
    #[arg(short, long)]
    pub output: PathBuf,
    /// Set providing everything outside the track list (defaults to base)
    #[arg(long)]
    pub into: Option<PathBuf>,
    /// Also write the merged set as uncompressed XML
    #[arg(long)]
    pub xml: Option<PathBuf>,
}

#[derive(Args)]
pub struct SplitArgs {
    pub project: PathBuf,
    #[arg(long, default_value = "fragments")]
    pub out: PathBuf,
}

#[derive(Args)]
pub struct InspectArgs {
    pub project: PathBuf,
    /// Dump the decompressed XML to this path
    #[arg(long)]
    pub xml: Option<PathBuf>,
}
