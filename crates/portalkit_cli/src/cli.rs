use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use portalkit_io_fs::{EnumCopyFileConflictStrategy, EnumCopySymlinkStrategy, EnumPatternMode};

/// Maintenance tools for the portal monorepo.
#[derive(Parser, Debug, Clone)]
#[command(name = "portalkit", version)]
pub struct Cli {
    #[arg(long, short, global = true, default_value = "info", value_enum)]
    pub log_level: LogLevel,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Recursively delete files or directories.
    Remove(RemoveArgs),
    /// Recursively copy a file or directory.
    Copy(CopyArgs),
    /// Print an indented listing of a directory.
    Tree(TreeArgs),
    /// Delete every entry of a directory except a keep list.
    Prune(PruneArgs),
    /// Consolidate the monorepo layout.
    Cleanup(CleanupArgs),
    /// Generate app/package documentation.
    Docs(DocsArgs),
}

#[derive(Args, Debug, Clone)]
pub struct RemoveArgs {
    #[arg(required = true)]
    pub targets: Vec<PathBuf>,
    /// Confirm the deletion.
    #[arg(long, short = 'y')]
    pub yes: bool,
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args, Debug, Clone)]
pub struct CopyArgs {
    pub source: PathBuf,
    pub destination: PathBuf,
    /// Replace destination files that already exist.
    #[arg(long, conflicts_with = "error_on_conflict")]
    pub overwrite: bool,
    /// Fail when a destination file already exists.
    #[arg(long)]
    pub error_on_conflict: bool,
    #[arg(long, default_value = "copy", value_enum)]
    pub symlinks: SymlinkMode,
    /// Skip entries whose name matches (repeatable).
    #[arg(long = "exclude", value_name = "PATTERN")]
    pub patterns_exclude: Vec<String>,
    #[arg(long, default_value = "glob", value_enum)]
    pub pattern_mode: PatternMode,
    /// Carry permissions, timestamps and extended attributes.
    #[arg(long)]
    pub preserve_metadata: bool,
    #[arg(long)]
    pub dry_run: bool,
}

impl CopyArgs {
    pub fn rule_conflict_file(&self) -> EnumCopyFileConflictStrategy {
        if self.overwrite {
            EnumCopyFileConflictStrategy::Overwrite
        } else if self.error_on_conflict {
            EnumCopyFileConflictStrategy::Error
        } else {
            EnumCopyFileConflictStrategy::Skip
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct TreeArgs {
    pub path: PathBuf,
    #[arg(long, short, default_value_t = 2)]
    pub depth: usize,
    /// Extra names to skip besides hidden entries and node_modules.
    #[arg(long = "exclude", value_name = "NAME")]
    pub names_excluded: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct PruneArgs {
    pub directory: PathBuf,
    /// Entry names to keep (repeatable).
    #[arg(long = "keep", value_name = "NAME", default_values = ["node_modules", ".git"])]
    pub names_keep: Vec<String>,
    #[arg(long, short = 'y')]
    pub yes: bool,
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args, Debug, Clone)]
pub struct CleanupArgs {
    #[arg(long, default_value = ".")]
    pub root: PathBuf,
    /// JSON file overriding the built-in plan.
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Confirm removal of the obsolete directories.
    #[arg(long, short = 'y')]
    pub yes: bool,
    #[arg(long)]
    pub dry_run: bool,
    #[arg(long)]
    pub no_backup: bool,
}

#[derive(Args, Debug, Clone)]
pub struct DocsArgs {
    #[arg(long, default_value = ".")]
    pub root: PathBuf,
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
    Silent,
}

impl LogLevel {
    pub fn to_tracing_level(&self) -> Option<tracing::Level> {
        match self {
            LogLevel::Debug => Some(tracing::Level::DEBUG),
            LogLevel::Info => Some(tracing::Level::INFO),
            LogLevel::Warn => Some(tracing::Level::WARN),
            LogLevel::Error => Some(tracing::Level::ERROR),
            LogLevel::Silent => None,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SymlinkMode {
    Copy,
    Dereference,
    Skip,
}

impl From<SymlinkMode> for EnumCopySymlinkStrategy {
    fn from(value: SymlinkMode) -> Self {
        match value {
            SymlinkMode::Copy => Self::CopySymlinks,
            SymlinkMode::Dereference => Self::Dereference,
            SymlinkMode::Skip => Self::SkipSymlinks,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum PatternMode {
    Glob,
    Regex,
    Literal,
}

impl From<PatternMode> for EnumPatternMode {
    fn from(value: PatternMode) -> Self {
        match value {
            PatternMode::Glob => Self::Glob,
            PatternMode::Regex => Self::Regex,
            PatternMode::Literal => Self::Literal,
        }
    }
}
