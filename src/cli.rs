//! CLI argument definitions using clap derive

use assetlift::PackageKind;
use clap::{ArgAction, Parser, ValueEnum};
use std::path::PathBuf;

/// assetlift - extract front-end web assets from application containers
///
/// Unpacks a .zip, .asar, .exe, .dmg, .deb or .rpm, pulls out the HTML, CSS,
/// JS, fonts and images, and writes them as a clean web tree.
#[derive(Parser, Debug)]
#[command(name = "assetlift")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Container to extract
    pub input: PathBuf,

    /// Output directory or archive path (defaults next to the input)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output kind
    #[arg(short, long, value_enum, default_value_t = OutputMode::Dir)]
    pub mode: OutputMode,

    /// Configuration file path (JSON)
    #[arg(short, long, env = "ASSETLIFT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory for per-run scratch trees
    #[arg(long, env = "ASSETLIFT_SCRATCH")]
    pub scratch_root: Option<PathBuf>,

    /// Replace an existing output without asking
    #[arg(short, long)]
    pub yes: bool,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputMode {
    /// Plain directory
    Dir,
    /// Zip archive
    Archive,
}

impl From<OutputMode> for PackageKind {
    fn from(mode: OutputMode) -> Self {
        match mode {
            OutputMode::Dir => PackageKind::Directory,
            OutputMode::Archive => PackageKind::Archive,
        }
    }
}

impl Cli {
    pub fn kind(&self) -> PackageKind {
        self.mode.into()
    }

    /// `--output`, or `<stem>-web` / `<stem>-web.zip` beside the input.
    pub fn output_path(&self) -> PathBuf {
        if let Some(output) = &self.output {
            return output.clone();
        }
        let stem = self
            .input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "output".to_string());
        let name = match self.mode {
            OutputMode::Dir => format!("{stem}-web"),
            OutputMode::Archive => format!("{stem}-web.zip"),
        };
        self.input
            .parent()
            .map(|p| p.join(&name))
            .unwrap_or_else(|| PathBuf::from(name))
    }
}
