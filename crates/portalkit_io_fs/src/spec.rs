//! Tree operation option models and top-level error types.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::report::ReportTree;

////////////////////////////////////////////////////////////////////////////////
// #region EnumsInit

/// Kind of a filesystem node as seen by `symlink_metadata` (links are not followed).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumNodeKind {
    File,
    Directory,
    Symlink,
    /// Sockets, FIFOs, devices.
    Other,
}

impl fmt::Display for EnumNodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c_name = match self {
            Self::File => "file",
            Self::Directory => "directory",
            Self::Symlink => "symlink",
            Self::Other => "special file",
        };
        f.write_str(c_name)
    }
}

/// Symlink handling policy for `copy_tree`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumCopySymlinkStrategy {
    /// Follow the link and copy the target bytes/entries.
    Dereference,
    /// Create a symbolic link at destination (do not copy target bytes).
    CopySymlinks,
    /// Ignore symlink entries.
    SkipSymlinks,
}

/// Existing destination file conflict policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumCopyFileConflictStrategy {
    /// Keep destination file and skip current source file.
    Skip,
    /// Replace destination file with source file.
    Overwrite,
    /// Fail with [`TreeError::DestinationExists`].
    Error,
}

/// Pattern matching mode for exclude lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumPatternMode {
    /// Shell-like wildcards (`*`, `?`, character classes).
    Glob,
    /// Regular expression pattern.
    Regex,
    /// Substring match.
    Literal,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Options

/// Input options for `remove_tree`.
#[derive(Debug, Clone, Default)]
pub struct SpecRemoveOptions {
    /// Do not mutate filesystem; count what would be removed.
    pub if_dry_run: bool,
}

/// Input options for `copy_tree`.
#[derive(Debug, Clone)]
pub struct SpecCopyOptions {
    /// Conflict behavior for existing destination files and links.
    pub rule_conflict_file: EnumCopyFileConflictStrategy,
    /// Symlink handling behavior.
    pub rule_symlink: EnumCopySymlinkStrategy,
    /// Exclude patterns applied to entry basenames (files and directories).
    pub patterns_exclude: Option<Vec<String>>,
    /// Pattern interpretation mode.
    pub rule_pattern: EnumPatternMode,
    /// Carry permissions, timestamps and extended attributes over.
    pub if_preserve_metadata: bool,
    /// Do not mutate filesystem; record what would happen.
    pub if_dry_run: bool,
}

impl Default for SpecCopyOptions {
    fn default() -> Self {
        Self {
            rule_conflict_file: EnumCopyFileConflictStrategy::Skip,
            rule_symlink: EnumCopySymlinkStrategy::CopySymlinks,
            patterns_exclude: None,
            rule_pattern: EnumPatternMode::Glob,
            if_preserve_metadata: false,
            if_dry_run: false,
        }
    }
}

impl SpecCopyOptions {
    /// Default options with the plain `overwrite` flag mapped onto a conflict rule.
    pub fn with_overwrite(if_overwrite: bool) -> Self {
        let rule_conflict_file = if if_overwrite {
            EnumCopyFileConflictStrategy::Overwrite
        } else {
            EnumCopyFileConflictStrategy::Skip
        };
        Self {
            rule_conflict_file,
            ..Self::default()
        }
    }
}

/// Input options for `describe_tree_with`.
#[derive(Debug, Clone)]
pub struct SpecDescribeOptions {
    /// Maximum number of nested levels to list. `0` lists nothing.
    pub depth_limit: usize,
    /// Names starting with this character are skipped.
    pub hidden_marker: char,
    /// Exact names skipped entirely (dependency caches).
    pub names_excluded: Vec<String>,
    /// Extra exclude patterns applied to entry basenames.
    pub patterns_exclude: Option<Vec<String>>,
    /// Pattern interpretation mode for `patterns_exclude`.
    pub rule_pattern: EnumPatternMode,
}

impl Default for SpecDescribeOptions {
    fn default() -> Self {
        Self {
            depth_limit: 2,
            hidden_marker: '.',
            names_excluded: vec!["node_modules".to_string()],
            patterns_exclude: None,
            rule_pattern: EnumPatternMode::Glob,
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Errors

/// Failure of a tree operation. The first failing node aborts the walk.
#[derive(Debug, Error)]
pub enum TreeError {
    /// Delete, create, read or write failed on an existing path.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// Source and destination node kinds disagree.
    #[error("Type mismatch at {}: expected {expected}", path.display())]
    TypeMismatch {
        path: PathBuf,
        expected: EnumNodeKind,
    },
    /// Destination file exists and the conflict rule is `Error`.
    #[error("Destination exists: {}", .0.display())]
    DestinationExists(PathBuf),
    /// Symlink target is missing while dereferencing.
    #[error("Broken symlink: {}", .0.display())]
    BrokenSymlink(PathBuf),
    /// Source and destination overlap (`src` contains `dst` or vice versa).
    #[error(
        "Source and destination directories overlap: {} <-> {}",
        src.display(),
        dst.display()
    )]
    SourceDestinationOverlap {
        /// Source directory as given.
        src: PathBuf,
        /// Destination directory as given.
        dst: PathBuf,
    },
    /// Invalid exclude pattern.
    #[error("{0}")]
    InvalidPattern(String),
    /// Some nodes were already committed when the walk failed.
    #[error("{source} (after {report})")]
    PartialFailure {
        /// Work committed before the failure. Not rolled back.
        report: ReportTree,
        source: Box<TreeError>,
    },
}

impl TreeError {
    pub(crate) fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Path that triggered the failure, if the error is tied to one.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Io { path, .. } | Self::TypeMismatch { path, .. } => Some(path),
            Self::DestinationExists(path) | Self::BrokenSymlink(path) => Some(path),
            Self::SourceDestinationOverlap { src, .. } => Some(src),
            Self::InvalidPattern(_) => None,
            Self::PartialFailure { source, .. } => source.path(),
        }
    }

    /// Underlying error with any `PartialFailure` wrapper removed.
    pub fn root_cause(&self) -> &TreeError {
        match self {
            Self::PartialFailure { source, .. } => source.root_cause(),
            _ => self,
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
