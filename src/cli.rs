use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(
    name = "helpdocs",
    version,
    about = "Sort scanned help-article PDFs into per-system folders"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Classify, deduplicate and file every PDF in a source folder.
    Organize(OrganizeArgs),
    /// Remove duplicate PDFs from a folder, keeping one per group.
    Dedup(DedupArgs),
    /// Move PDFs out of nested subfolders into their label folder.
    Flatten(FlattenArgs),
    /// Rebuild the flat alphabetical view of an organized tree.
    Alphabetical(AlphabeticalArgs),
    /// Move filed PDFs whose title names a different system.
    Recategorize(RecategorizeArgs),
    /// Show how a single PDF would be classified.
    Inspect(InspectArgs),
}

#[derive(Args, Debug, Clone)]
pub struct OrganizeArgs {
    #[arg(long)]
    pub source: PathBuf,

    #[arg(long)]
    pub dest: PathBuf,

    #[arg(long, default_value_t = false)]
    pub dry_run: bool,

    #[arg(long, default_value_t = false)]
    pub yes: bool,

    #[arg(long)]
    pub labels_file: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = PlaceMode::Copy)]
    pub mode: PlaceMode,

    #[arg(long, default_value_t = 1)]
    pub max_pages: usize,

    #[arg(long, value_enum, default_value_t = FallbackPolicy::Strict)]
    pub fallback: FallbackPolicy,

    #[arg(long, value_enum, default_value_t = ScoringPolicy::FirstMatch)]
    pub scoring: ScoringPolicy,

    /// Also link-or-copy every placed file into this flat folder.
    #[arg(long)]
    pub alphabetical: Option<PathBuf>,

    #[arg(long)]
    pub manifest: Option<PathBuf>,

    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Report documents that share a normalized header (never merged).
    #[arg(long, default_value_t = false)]
    pub header_groups: bool,
}

#[derive(Args, Debug, Clone)]
pub struct DedupArgs {
    #[arg(long)]
    pub dir: PathBuf,

    #[arg(long, default_value_t = false)]
    pub recursive: bool,

    #[arg(long, default_value_t = false)]
    pub include_header_duplicates: bool,

    #[arg(long, default_value_t = 1)]
    pub max_pages: usize,

    #[arg(long, default_value_t = false)]
    pub dry_run: bool,

    #[arg(long, default_value_t = false)]
    pub yes: bool,
}

#[derive(Args, Debug, Clone)]
pub struct FlattenArgs {
    #[arg(long)]
    pub root: PathBuf,

    #[arg(long, default_value_t = false)]
    pub dry_run: bool,

    #[arg(long, default_value_t = false)]
    pub yes: bool,
}

#[derive(Args, Debug, Clone)]
pub struct AlphabeticalArgs {
    #[arg(long)]
    pub root: PathBuf,

    #[arg(long)]
    pub out: PathBuf,

    /// Leave out files whose name does not start with "<label> - " for a
    /// label in the keyword table.
    #[arg(long, default_value_t = false)]
    pub only_labelled: bool,

    #[arg(long)]
    pub labels_file: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub dry_run: bool,

    #[arg(long, default_value_t = false)]
    pub yes: bool,
}

#[derive(Args, Debug, Clone)]
pub struct RecategorizeArgs {
    #[arg(long)]
    pub root: PathBuf,

    #[arg(long)]
    pub labels_file: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = ScoringPolicy::FirstMatch)]
    pub scoring: ScoringPolicy,

    #[arg(long, default_value_t = false)]
    pub dry_run: bool,

    #[arg(long, default_value_t = false)]
    pub yes: bool,
}

#[derive(Args, Debug, Clone)]
pub struct InspectArgs {
    pub pdf: PathBuf,

    #[arg(long)]
    pub labels_file: Option<PathBuf>,

    #[arg(long, default_value_t = 1)]
    pub max_pages: usize,

    #[arg(long, value_enum, default_value_t = FallbackPolicy::Strict)]
    pub fallback: FallbackPolicy,

    #[arg(long, value_enum, default_value_t = ScoringPolicy::FirstMatch)]
    pub scoring: ScoringPolicy,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum PlaceMode {
    Move,
    Copy,
    Link,
}

impl PlaceMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Move => "move",
            Self::Copy => "copy",
            Self::Link => "link",
        }
    }
}

/// What the classifier does when no keyword matches.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum FallbackPolicy {
    /// Always `Unclassified`.
    Strict,
    /// Title-case the first alphabetic word of the header.
    Heuristic,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum ScoringPolicy {
    FirstMatch,
    Weighted,
}

impl ScoringPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FirstMatch => "first-match",
            Self::Weighted => "weighted",
        }
    }
}
