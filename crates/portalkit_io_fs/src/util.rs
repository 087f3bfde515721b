use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobMatcher};
use regex::Regex;

use crate::spec::{EnumNodeKind, EnumPatternMode, TreeError};

////////////////////////////////////////////////////////////////////////////////
// #region PatternMatching

#[derive(Debug, Clone)]
pub(crate) enum TypePatternSeq {
    Literal(Vec<String>),
    Glob(Vec<GlobMatcher>),
    Regex(Vec<Regex>),
}

impl TypePatternSeq {
    /// Compile raw patterns. `None` or an empty list disables matching.
    pub(crate) fn compile(
        patterns: Option<&[String]>,
        rule_pattern: EnumPatternMode,
    ) -> Result<Option<Self>, TreeError> {
        let Some(patterns) = patterns else {
            return Ok(None);
        };
        if patterns.is_empty() {
            return Ok(None);
        }

        match rule_pattern {
            EnumPatternMode::Literal => Ok(Some(Self::Literal(patterns.to_vec()))),
            EnumPatternMode::Glob => {
                let mut l_glob = Vec::with_capacity(patterns.len());
                for pattern in patterns {
                    let matcher = Glob::new(pattern)
                        .map_err(|e| {
                            TreeError::InvalidPattern(format!("Invalid exclude pattern: {e}"))
                        })?
                        .compile_matcher();
                    l_glob.push(matcher);
                }
                Ok(Some(Self::Glob(l_glob)))
            }
            EnumPatternMode::Regex => {
                let mut l_regex = Vec::with_capacity(patterns.len());
                for pattern in patterns {
                    let regex = Regex::new(pattern).map_err(|e| {
                        TreeError::InvalidPattern(format!("Invalid exclude pattern: {e}"))
                    })?;
                    l_regex.push(regex);
                }
                Ok(Some(Self::Regex(l_regex)))
            }
        }
    }

    pub(crate) fn is_match(&self, value: &str) -> bool {
        match self {
            Self::Literal(v) => v.iter().any(|p| value.contains(p.as_str())),
            Self::Glob(v) => v.iter().any(|p| p.is_match(value)),
            Self::Regex(v) => v.iter().any(|p| p.is_match(value)),
        }
    }
}

pub(crate) fn should_exclude_by_patterns(value: &str, patterns: Option<&TypePatternSeq>) -> bool {
    patterns.is_some_and(|p| p.is_match(value))
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region PathUtilities

/// Classify `path` without following links. `Ok(None)` means absent.
pub(crate) fn probe_node(path: &Path) -> Result<Option<EnumNodeKind>, TreeError> {
    match fs::symlink_metadata(path) {
        Ok(meta) => Ok(Some(classify_file_type(meta.file_type()))),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(TreeError::io(path, e)),
    }
}

pub(crate) fn classify_file_type(file_type: fs::FileType) -> EnumNodeKind {
    if file_type.is_symlink() {
        EnumNodeKind::Symlink
    } else if file_type.is_dir() {
        EnumNodeKind::Directory
    } else if file_type.is_file() {
        EnumNodeKind::File
    } else {
        EnumNodeKind::Other
    }
}

fn _normalize_path(path: &Path) -> PathBuf {
    if let Ok(resolved) = fs::canonicalize(path) {
        return resolved;
    }
    // Destination may not exist yet: resolve the nearest existing ancestor.
    if let (Some(parent), Some(name)) = (path.parent(), path.file_name())
        && !parent.as_os_str().is_empty()
    {
        return _normalize_path(parent).join(name);
    }
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(path)
}

pub(crate) fn is_overlap(src: &Path, dst: &Path) -> bool {
    let src_resolved = _normalize_path(src);
    let dst_resolved = _normalize_path(dst);
    dst_resolved.starts_with(&src_resolved) || src_resolved.starts_with(&dst_resolved)
}

pub(crate) fn create_symbolic_link(path_src: &Path, path_dst: &Path) -> Result<(), io::Error> {
    let target = fs::read_link(path_src)?;

    #[cfg(unix)]
    {
        std::os::unix::fs::symlink(&target, path_dst)
    }
    #[cfg(windows)]
    {
        use std::os::windows::fs::{symlink_dir, symlink_file};
        if path_src.is_dir() {
            symlink_dir(&target, path_dst)
        } else {
            symlink_file(&target, path_dst)
        }
    }
    #[cfg(not(any(unix, windows)))]
    {
        let _ = (target, path_dst);
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "Symbolic links are unsupported on this platform",
        ))
    }
}

/// Unlink a symlink itself. Windows directory links need `remove_dir`.
pub(crate) fn remove_symlink(path: &Path) -> Result<(), io::Error> {
    #[cfg(windows)]
    {
        if fs::metadata(path).is_ok_and(|m| m.is_dir()) {
            return fs::remove_dir(path);
        }
    }
    fs::remove_file(path)
}

/// Copy bytes (and optionally metadata). An unreadable source is reported
/// against the source path, every other failure against the destination.
pub(crate) fn copy_file_with_metadata(
    path_file_src: &Path,
    path_file_dst: &Path,
    if_preserve_metadata: bool,
) -> Result<(), TreeError> {
    fs::File::open(path_file_src).map_err(|e| TreeError::io(path_file_src, e))?;
    fs::copy(path_file_src, path_file_dst).map_err(|e| TreeError::io(path_file_dst, e))?;
    if if_preserve_metadata {
        apply_metadata(path_file_src, path_file_dst)
            .map_err(|e| TreeError::io(path_file_dst, e))?;
    }
    Ok(())
}

fn apply_metadata(path_file_src: &Path, path_file_dst: &Path) -> Result<(), io::Error> {
    use filetime::{FileTime, set_file_times};

    let stat_src = fs::metadata(path_file_src)?;
    let file_time_access = FileTime::from_last_access_time(&stat_src);
    let file_time_modify = FileTime::from_last_modification_time(&stat_src);
    set_file_times(path_file_dst, file_time_access, file_time_modify)?;

    #[cfg(target_os = "linux")]
    copy_xattrs_linux(path_file_src, path_file_dst);

    // Permissions last: a read-only mode would block the steps above.
    fs::set_permissions(path_file_dst, stat_src.permissions())?;
    Ok(())
}

#[cfg(target_os = "linux")]
fn copy_xattrs_linux(path_file_src: &Path, path_file_dst: &Path) {
    let iter_xattr_names = match xattr::list(path_file_src) {
        Ok(v) => v,
        Err(_) => return,
    };

    for name in iter_xattr_names {
        let Some(raw_value) = xattr::get(path_file_src, &name).ok().flatten() else {
            continue;
        };
        if let Err(e) = xattr::set(path_file_dst, &name, &raw_value) {
            tracing::debug!(
                "Extended attribute {:?} not copied to {}: {e}",
                name,
                path_file_dst.display()
            );
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
