//! Filesystem tree traversal and copy orchestration.

use std::collections::HashSet;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::report::{ReportTree, ReportTreeBuilder};
use crate::spec::{
    EnumCopyFileConflictStrategy, EnumCopySymlinkStrategy, EnumNodeKind, SpecCopyOptions,
    TreeError,
};
use crate::util::{
    TypePatternSeq, classify_file_type, copy_file_with_metadata, create_symbolic_link, is_overlap,
    probe_node, remove_symlink, should_exclude_by_patterns,
};

#[derive(Debug, Clone)]
struct SpecChildEntry {
    path_src: PathBuf,
    /// Raw entry name, used to build the destination path.
    name_os: OsString,
    /// Lossy rendering for pattern matching and logs.
    name: String,
    enum_kind: EnumNodeKind,
}

#[derive(Debug)]
struct SpecCopyContext {
    spec_cp_options: SpecCopyOptions,
    spec_cp_pats: Option<TypePatternSeq>,
    builder_cp_report: ReportTreeBuilder,
    /// (dev, ino) of the directories on the current descent path.
    set_ancestor_dirs: HashSet<(u64, u64)>,
}

/// Copy `dir_source` (a directory, file or link) to `dir_destination`.
///
/// Behavior is controlled by [`SpecCopyOptions`]:
/// - conflict policy for destination files that already exist,
/// - symlink handling strategy,
/// - exclude patterns on entry basenames,
/// - metadata preservation and dry-run.
///
/// Directories are created before their children are copied and existing
/// destination directories are merged into. With the default `Skip` policy a
/// second run leaves already-present files untouched.
///
/// A missing source is a successful no-op. The first failing node aborts the
/// walk; files copied up to that point stay in place and the error is wrapped
/// in [`TreeError::PartialFailure`].
pub fn copy_tree<P, Q>(
    dir_source: P,
    dir_destination: Q,
    spec_cp_options: SpecCopyOptions,
) -> Result<ReportTree, TreeError>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let path_src = dir_source.as_ref();
    let path_dst = dir_destination.as_ref();

    let spec_cp_pats = TypePatternSeq::compile(
        spec_cp_options.patterns_exclude.as_deref(),
        spec_cp_options.rule_pattern,
    )?;

    let Some(enum_kind_src) = probe_node(path_src)? else {
        debug!("Nothing to copy at {}", path_src.display());
        return Ok(ReportTree::default());
    };

    let b_src_is_dir = match enum_kind_src {
        EnumNodeKind::Directory => true,
        EnumNodeKind::Symlink => {
            spec_cp_options.rule_symlink == EnumCopySymlinkStrategy::Dereference
                && path_src.is_dir()
        }
        EnumNodeKind::File | EnumNodeKind::Other => false,
    };
    if b_src_is_dir && is_overlap(path_src, path_dst) {
        return Err(TreeError::SourceDestinationOverlap {
            src: path_src.to_path_buf(),
            dst: path_dst.to_path_buf(),
        });
    }

    let mut spec_cp_ctx = SpecCopyContext {
        spec_cp_options,
        spec_cp_pats,
        builder_cp_report: ReportTreeBuilder::default(),
        set_ancestor_dirs: HashSet::new(),
    };

    match copy_node(path_src, path_dst, enum_kind_src, &mut spec_cp_ctx) {
        Ok(()) => Ok(spec_cp_ctx.builder_cp_report.build()),
        Err(e) => Err(spec_cp_ctx.builder_cp_report.into_failure(e)),
    }
}

fn copy_node(
    path_src: &Path,
    path_dst: &Path,
    enum_kind: EnumNodeKind,
    spec_cp_ctx: &mut SpecCopyContext,
) -> Result<(), TreeError> {
    spec_cp_ctx.builder_cp_report.add_scanned();

    match enum_kind {
        EnumNodeKind::Directory => copy_directory(path_src, path_dst, spec_cp_ctx),
        EnumNodeKind::File => copy_file(path_src, path_dst, spec_cp_ctx),
        EnumNodeKind::Symlink => copy_symlink_entry(path_src, path_dst, spec_cp_ctx),
        EnumNodeKind::Other => {
            spec_cp_ctx
                .builder_cp_report
                .add_warning(format!("Special file skipped: {}", path_src.display()));
            spec_cp_ctx.builder_cp_report.add_skipped();
            Ok(())
        }
    }
}

fn copy_directory(
    path_src: &Path,
    path_dst: &Path,
    spec_cp_ctx: &mut SpecCopyContext,
) -> Result<(), TreeError> {
    let if_dereference =
        spec_cp_ctx.spec_cp_options.rule_symlink == EnumCopySymlinkStrategy::Dereference;
    let key_dir = if if_dereference {
        dir_identity(path_src)?
    } else {
        None
    };
    if let Some(key) = key_dir
        && !spec_cp_ctx.set_ancestor_dirs.insert(key)
    {
        spec_cp_ctx
            .builder_cp_report
            .add_warning(format!("Symlink loop detected: {}", path_src.display()));
        spec_cp_ctx.builder_cp_report.add_skipped();
        return Ok(());
    }

    let res = copy_directory_entries(path_src, path_dst, spec_cp_ctx);
    if let Some(key) = key_dir {
        spec_cp_ctx.set_ancestor_dirs.remove(&key);
    }
    res
}

fn copy_directory_entries(
    path_src: &Path,
    path_dst: &Path,
    spec_cp_ctx: &mut SpecCopyContext,
) -> Result<(), TreeError> {
    match probe_node(path_dst)? {
        None if spec_cp_ctx.spec_cp_options.if_dry_run => {
            debug!("Would create directory {}", path_dst.display());
        }
        None => {
            fs::create_dir_all(path_dst).map_err(|e| TreeError::io(path_dst, e))?;
            debug!("Created directory {}", path_dst.display());
            spec_cp_ctx.builder_cp_report.add_created();
        }
        Some(EnumNodeKind::Directory) => {
            debug!("Merging into existing directory {}", path_dst.display());
        }
        Some(_) => {
            return Err(TreeError::TypeMismatch {
                path: path_dst.to_path_buf(),
                expected: EnumNodeKind::Directory,
            });
        }
    }

    for spec_child in list_children(path_src)? {
        if should_exclude_by_patterns(&spec_child.name, spec_cp_ctx.spec_cp_pats.as_ref()) {
            debug!("Excluded {}", spec_child.path_src.display());
            spec_cp_ctx.builder_cp_report.add_skipped();
            continue;
        }
        let path_dst_child = path_dst.join(&spec_child.name_os);
        copy_node(
            &spec_child.path_src,
            &path_dst_child,
            spec_child.enum_kind,
            spec_cp_ctx,
        )?;
    }
    Ok(())
}

fn copy_file(
    path_src: &Path,
    path_dst: &Path,
    spec_cp_ctx: &mut SpecCopyContext,
) -> Result<(), TreeError> {
    ensure_parent_dir(path_dst, spec_cp_ctx)?;
    if should_skip_file_conflict(path_dst, false, spec_cp_ctx)? {
        return Ok(());
    }

    if spec_cp_ctx.spec_cp_options.if_dry_run {
        debug!("Would copy {} -> {}", path_src.display(), path_dst.display());
        spec_cp_ctx.builder_cp_report.add_skipped();
        return Ok(());
    }

    copy_file_with_metadata(
        path_src,
        path_dst,
        spec_cp_ctx.spec_cp_options.if_preserve_metadata,
    )?;
    debug!("Copied {} -> {}", path_src.display(), path_dst.display());
    spec_cp_ctx.builder_cp_report.add_copied();
    Ok(())
}

fn copy_symlink_entry(
    path_src: &Path,
    path_dst: &Path,
    spec_cp_ctx: &mut SpecCopyContext,
) -> Result<(), TreeError> {
    match spec_cp_ctx.spec_cp_options.rule_symlink {
        EnumCopySymlinkStrategy::SkipSymlinks => {
            debug!("Skipped symlink {}", path_src.display());
            spec_cp_ctx.builder_cp_report.add_skipped();
            Ok(())
        }
        EnumCopySymlinkStrategy::CopySymlinks => {
            ensure_parent_dir(path_dst, spec_cp_ctx)?;
            if should_skip_file_conflict(path_dst, true, spec_cp_ctx)? {
                return Ok(());
            }
            if spec_cp_ctx.spec_cp_options.if_dry_run {
                debug!("Would link {}", path_dst.display());
                spec_cp_ctx.builder_cp_report.add_skipped();
                return Ok(());
            }
            create_symbolic_link(path_src, path_dst).map_err(|e| TreeError::io(path_dst, e))?;
            debug!("Linked {} -> {}", path_dst.display(), path_src.display());
            spec_cp_ctx.builder_cp_report.add_copied();
            Ok(())
        }
        EnumCopySymlinkStrategy::Dereference => {
            let meta_target = match fs::metadata(path_src) {
                Ok(v) => v,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    return Err(TreeError::BrokenSymlink(path_src.to_path_buf()));
                }
                Err(e) => return Err(TreeError::io(path_src, e)),
            };
            if meta_target.is_dir() {
                copy_directory(path_src, path_dst, spec_cp_ctx)
            } else if meta_target.is_file() {
                copy_file(path_src, path_dst, spec_cp_ctx)
            } else {
                spec_cp_ctx.builder_cp_report.add_warning(format!(
                    "Special file target skipped: {}",
                    path_src.display()
                ));
                spec_cp_ctx.builder_cp_report.add_skipped();
                Ok(())
            }
        }
    }
}

/// Decide what to do with an existing destination file.
///
/// Returns `true` when the source must be skipped. With `Overwrite`, links at
/// the destination are unlinked first so the copy never writes through them;
/// `if_link_src` also clears regular files, since a link cannot replace them
/// in place.
fn should_skip_file_conflict(
    path_dst: &Path,
    if_link_src: bool,
    spec_cp_ctx: &mut SpecCopyContext,
) -> Result<bool, TreeError> {
    let Some(enum_kind_dst) = probe_node(path_dst)? else {
        return Ok(false);
    };
    if enum_kind_dst == EnumNodeKind::Directory {
        return Err(TreeError::TypeMismatch {
            path: path_dst.to_path_buf(),
            expected: EnumNodeKind::File,
        });
    }

    match spec_cp_ctx.spec_cp_options.rule_conflict_file {
        EnumCopyFileConflictStrategy::Skip => {
            debug!("Kept existing {}", path_dst.display());
            spec_cp_ctx.builder_cp_report.add_skipped();
            Ok(true)
        }
        EnumCopyFileConflictStrategy::Error => {
            Err(TreeError::DestinationExists(path_dst.to_path_buf()))
        }
        EnumCopyFileConflictStrategy::Overwrite => {
            if spec_cp_ctx.spec_cp_options.if_dry_run {
                return Ok(false);
            }
            if enum_kind_dst == EnumNodeKind::Symlink {
                remove_symlink(path_dst).map_err(|e| TreeError::io(path_dst, e))?;
            } else if if_link_src {
                fs::remove_file(path_dst).map_err(|e| TreeError::io(path_dst, e))?;
            }
            Ok(false)
        }
    }
}

fn ensure_parent_dir(path_dst: &Path, spec_cp_ctx: &mut SpecCopyContext) -> Result<(), TreeError> {
    let Some(path_parent) = path_dst.parent() else {
        return Ok(());
    };
    if path_parent.as_os_str().is_empty() || path_parent.is_dir() {
        return Ok(());
    }
    if spec_cp_ctx.spec_cp_options.if_dry_run {
        debug!("Would create directory {}", path_parent.display());
        return Ok(());
    }
    fs::create_dir_all(path_parent).map_err(|e| TreeError::io(path_parent, e))?;
    spec_cp_ctx.builder_cp_report.add_created();
    Ok(())
}

#[cfg(unix)]
fn dir_identity(path_dir: &Path) -> Result<Option<(u64, u64)>, TreeError> {
    use std::os::unix::fs::MetadataExt;

    let stat_dir = fs::metadata(path_dir).map_err(|e| TreeError::io(path_dir, e))?;
    Ok(Some((stat_dir.dev(), stat_dir.ino())))
}

#[cfg(not(unix))]
fn dir_identity(_path_dir: &Path) -> Result<Option<(u64, u64)>, TreeError> {
    Ok(None)
}

/// Drain the directory listing before any child is copied.
fn list_children(path_dir: &Path) -> Result<Vec<SpecChildEntry>, TreeError> {
    let iter_entries = fs::read_dir(path_dir).map_err(|e| TreeError::io(path_dir, e))?;

    let mut l_children = Vec::new();
    for entry_res in iter_entries {
        let entry = entry_res.map_err(|e| TreeError::io(path_dir, e))?;
        let path_entry = entry.path();
        let cfg_file_type = entry
            .file_type()
            .map_err(|e| TreeError::io(&path_entry, e))?;
        let name_os = entry.file_name();
        l_children.push(SpecChildEntry {
            name: name_os.to_string_lossy().to_string(),
            name_os,
            path_src: path_entry,
            enum_kind: classify_file_type(cfg_file_type),
        });
    }
    Ok(l_children)
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::copy_tree;
    use crate::spec::{
        EnumCopyFileConflictStrategy, EnumCopySymlinkStrategy, EnumNodeKind, EnumPatternMode,
        SpecCopyOptions, TreeError,
    };

    fn write_text(path: &Path, txt: &str) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent");
        }
        std::fs::write(path, txt).expect("write text");
    }

    fn read_text(path: &Path) -> String {
        std::fs::read_to_string(path).expect("read text")
    }

    /// `A/x.txt = "hello"` plus empty `A/sub`.
    fn build_source(root: &Path) -> std::path::PathBuf {
        let src = root.join("A");
        write_text(&src.join("x.txt"), "hello");
        std::fs::create_dir_all(src.join("sub")).expect("mkdir sub");
        src
    }

    #[test]
    fn copy_tree_copies_files_and_empty_dirs() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let src = build_source(tmp.path());
        let dst = tmp.path().join("B");

        let report = copy_tree(&src, &dst, SpecCopyOptions::with_overwrite(false))
            .expect("copy tree");
        assert_eq!(read_text(&dst.join("x.txt")), "hello");
        assert!(dst.join("sub").is_dir());
        assert_eq!(
            std::fs::read_dir(dst.join("sub")).expect("read sub").count(),
            0
        );
        assert_eq!(report.cnt_copied, 1);
        assert_eq!(report.cnt_created, 2);
    }

    #[test]
    fn copy_tree_missing_source_is_noop() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let dst = tmp.path().join("B");

        let report = copy_tree(tmp.path().join("absent"), &dst, SpecCopyOptions::default())
            .expect("missing source is not an error");
        assert_eq!(report.cnt_scanned, 0);
        assert!(!dst.exists());
    }

    #[test]
    fn copy_tree_skip_keeps_existing_and_overwrite_replaces() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let src = build_source(tmp.path());
        let dst = tmp.path().join("B");
        write_text(&dst.join("x.txt"), "old");

        let report = copy_tree(&src, &dst, SpecCopyOptions::with_overwrite(false))
            .expect("copy skip");
        assert_eq!(read_text(&dst.join("x.txt")), "old");
        assert_eq!(report.cnt_skipped, 1);
        assert_eq!(report.cnt_copied, 0);

        copy_tree(&src, &dst, SpecCopyOptions::with_overwrite(true)).expect("copy overwrite");
        assert_eq!(read_text(&dst.join("x.txt")), "hello");
    }

    #[test]
    fn copy_tree_is_idempotent_without_overwrite() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let src = tmp.path().join("src");
        let dst = tmp.path().join("dst");
        write_text(&src.join("a.txt"), "a");
        write_text(&src.join("b/c.txt"), "c");

        let first = copy_tree(&src, &dst, SpecCopyOptions::default()).expect("first run");
        assert_eq!(first.cnt_copied, 2);

        let second = copy_tree(&src, &dst, SpecCopyOptions::default()).expect("second run");
        assert_eq!(second.cnt_copied, 0);
        assert_eq!(second.cnt_created, 0);
        assert_eq!(second.cnt_skipped, 2);
        assert_eq!(read_text(&dst.join("a.txt")), "a");
        assert_eq!(read_text(&dst.join("b/c.txt")), "c");
    }

    #[test]
    fn copy_tree_overwrite_makes_destination_identical() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let src = tmp.path().join("src");
        let dst = tmp.path().join("dst");
        write_text(&src.join("a.txt"), "fresh-a");
        write_text(&src.join("deep/b.txt"), "fresh-b");
        write_text(&dst.join("a.txt"), "stale");
        write_text(&dst.join("deep/b.txt"), "stale and longer than source");
        write_text(&dst.join("extra.txt"), "untouched");

        copy_tree(&src, &dst, SpecCopyOptions::with_overwrite(true)).expect("copy tree");
        assert_eq!(std::fs::read(dst.join("a.txt")).expect("a"), b"fresh-a");
        assert_eq!(std::fs::read(dst.join("deep/b.txt")).expect("b"), b"fresh-b");
        assert_eq!(read_text(&dst.join("extra.txt")), "untouched");
    }

    #[test]
    fn copy_tree_single_file_creates_parent() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path_file_src = tmp.path().join("layout.tsx");
        write_text(&path_file_src, "layout");
        let path_file_dst = tmp.path().join("apps/main/src/app/layout.tsx");

        let report =
            copy_tree(&path_file_src, &path_file_dst, SpecCopyOptions::default()).expect("copy");
        assert_eq!(read_text(&path_file_dst), "layout");
        assert_eq!(report.cnt_copied, 1);
    }

    #[test]
    fn copy_tree_file_onto_directory_is_type_mismatch() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let src = tmp.path().join("src");
        let dst = tmp.path().join("dst");
        write_text(&src.join("x.txt"), "x");
        std::fs::create_dir_all(dst.join("x.txt")).expect("mkdir clash");

        let err = copy_tree(&src, &dst, SpecCopyOptions::with_overwrite(true))
            .expect_err("type mismatch must fail");
        assert!(matches!(
            err.root_cause(),
            TreeError::TypeMismatch {
                expected: EnumNodeKind::File,
                ..
            }
        ));
        assert_eq!(err.path(), Some(dst.join("x.txt").as_path()));
    }

    #[test]
    fn copy_tree_directory_onto_file_is_type_mismatch() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let src = tmp.path().join("src");
        let dst = tmp.path().join("dst");
        write_text(&src.join("sub/x.txt"), "x");
        write_text(&dst.join("sub"), "not a dir");

        let err = copy_tree(&src, &dst, SpecCopyOptions::default()).expect_err("must fail");
        assert!(matches!(
            err.root_cause(),
            TreeError::TypeMismatch {
                expected: EnumNodeKind::Directory,
                ..
            }
        ));
        assert_eq!(read_text(&dst.join("sub")), "not a dir");
    }

    #[test]
    fn copy_tree_error_conflict_rule_fails_on_existing() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let src = tmp.path().join("src");
        let dst = tmp.path().join("dst");
        write_text(&src.join("x.txt"), "new");
        write_text(&dst.join("x.txt"), "old");

        let spec_cp_options = SpecCopyOptions {
            rule_conflict_file: EnumCopyFileConflictStrategy::Error,
            ..SpecCopyOptions::default()
        };
        let err = copy_tree(&src, &dst, spec_cp_options).expect_err("must fail");
        assert!(matches!(err.root_cause(), TreeError::DestinationExists(_)));
        assert_eq!(read_text(&dst.join("x.txt")), "old");
    }

    #[test]
    fn copy_tree_overlap_rejected() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let src = tmp.path().join("src");
        std::fs::create_dir_all(&src).expect("mkdir src");

        let err = copy_tree(&src, src.join("nested"), SpecCopyOptions::default())
            .expect_err("must fail");
        assert!(matches!(err, TreeError::SourceDestinationOverlap { .. }));
        assert!(!src.join("nested").exists());
    }

    #[test]
    fn copy_tree_excludes_matching_names() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let src = tmp.path().join("src");
        let dst = tmp.path().join("dst");
        write_text(&src.join("keep.txt"), "k");
        write_text(&src.join("node_modules/pkg/index.js"), "js");
        write_text(&src.join("sub/debug.log"), "log");

        let spec_cp_options = SpecCopyOptions {
            patterns_exclude: Some(vec!["node_modules".to_string(), "*.log".to_string()]),
            rule_pattern: EnumPatternMode::Glob,
            ..SpecCopyOptions::default()
        };
        let report = copy_tree(&src, &dst, spec_cp_options).expect("copy tree");
        assert!(dst.join("keep.txt").exists());
        assert!(dst.join("sub").is_dir());
        assert!(!dst.join("node_modules").exists());
        assert!(!dst.join("sub/debug.log").exists());
        assert_eq!(report.cnt_skipped, 2);
    }

    #[test]
    fn copy_tree_invalid_pattern_rejected_before_walking() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let src = tmp.path().join("src");
        let dst = tmp.path().join("dst");
        write_text(&src.join("a.txt"), "a");

        let spec_cp_options = SpecCopyOptions {
            patterns_exclude: Some(vec!["(".to_string()]),
            rule_pattern: EnumPatternMode::Regex,
            ..SpecCopyOptions::default()
        };
        let err = copy_tree(&src, &dst, spec_cp_options).expect_err("invalid regex");
        assert!(matches!(err, TreeError::InvalidPattern(_)));
        assert!(!dst.exists());
    }

    #[test]
    fn copy_tree_dry_run_leaves_destination_absent() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let src = build_source(tmp.path());
        let dst = tmp.path().join("B");

        let spec_cp_options = SpecCopyOptions {
            if_dry_run: true,
            ..SpecCopyOptions::default()
        };
        let report = copy_tree(&src, &dst, spec_cp_options).expect("dry run");
        assert!(!dst.exists());
        assert_eq!(report.cnt_copied, 0);
        assert_eq!(report.cnt_skipped, 1);
        assert_eq!(report.cnt_scanned, 3);
    }

    #[cfg(unix)]
    #[test]
    fn copy_tree_symlink_strategies() {
        use std::os::unix::fs::symlink;

        let tmp = tempfile::tempdir().expect("tempdir");
        let src = tmp.path().join("src");
        write_text(&src.join("root.txt"), "root");
        symlink("root.txt", src.join("link_root.txt")).expect("create symlink");

        let dst_copy = tmp.path().join("dst_copy");
        copy_tree(&src, &dst_copy, SpecCopyOptions::default()).expect("copy links");
        assert!(dst_copy.join("link_root.txt").is_symlink());
        assert_eq!(read_text(&dst_copy.join("link_root.txt")), "root");

        let dst_skip = tmp.path().join("dst_skip");
        let spec_cp_options = SpecCopyOptions {
            rule_symlink: EnumCopySymlinkStrategy::SkipSymlinks,
            ..SpecCopyOptions::default()
        };
        copy_tree(&src, &dst_skip, spec_cp_options).expect("skip links");
        assert!(!dst_skip.join("link_root.txt").exists());
        assert!(dst_skip.join("root.txt").exists());

        let dst_deref = tmp.path().join("dst_deref");
        let spec_cp_options = SpecCopyOptions {
            rule_symlink: EnumCopySymlinkStrategy::Dereference,
            ..SpecCopyOptions::default()
        };
        copy_tree(&src, &dst_deref, spec_cp_options).expect("deref links");
        assert!(!dst_deref.join("link_root.txt").is_symlink());
        assert_eq!(read_text(&dst_deref.join("link_root.txt")), "root");
    }

    #[cfg(unix)]
    #[test]
    fn copy_tree_dereference_detects_loop_and_broken_link() {
        use std::os::unix::fs::symlink;

        let tmp = tempfile::tempdir().expect("tempdir");
        let src = tmp.path().join("src");
        let dst = tmp.path().join("dst");
        write_text(&src.join("a/file.txt"), "f");
        symlink("..", src.join("a/loop")).expect("create loop");

        let spec_cp_options = SpecCopyOptions {
            rule_symlink: EnumCopySymlinkStrategy::Dereference,
            ..SpecCopyOptions::default()
        };
        let report = copy_tree(&src, &dst, spec_cp_options.clone()).expect("copy with loop");
        assert!(dst.join("a/file.txt").exists());
        assert!(
            report
                .warnings
                .iter()
                .any(|w| w.contains("Symlink loop detected"))
        );

        symlink("missing.txt", src.join("broken")).expect("create broken link");
        let err = copy_tree(&src, tmp.path().join("dst2"), spec_cp_options)
            .expect_err("broken link must fail");
        assert!(matches!(err.root_cause(), TreeError::BrokenSymlink(_)));
    }

    #[cfg(unix)]
    #[test]
    fn copy_tree_dereference_copies_shared_directory_twice() {
        use std::os::unix::fs::symlink;

        let tmp = tempfile::tempdir().expect("tempdir");
        let src = tmp.path().join("src");
        let dst = tmp.path().join("dst");
        write_text(&src.join("shared/f.txt"), "shared");
        symlink("shared", src.join("alias")).expect("create alias");

        let spec_cp_options = SpecCopyOptions {
            rule_symlink: EnumCopySymlinkStrategy::Dereference,
            ..SpecCopyOptions::default()
        };
        let report = copy_tree(&src, &dst, spec_cp_options).expect("copy diamond");
        assert!(report.warnings.is_empty(), "{:?}", report.warnings);
        assert_eq!(read_text(&dst.join("shared/f.txt")), "shared");
        assert_eq!(read_text(&dst.join("alias/f.txt")), "shared");
        assert!(!dst.join("alias").is_symlink());
        assert_eq!(report.cnt_copied, 2);
    }

    #[cfg(unix)]
    #[test]
    fn copy_tree_keeps_non_utf8_names() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let tmp = tempfile::tempdir().expect("tempdir");
        let src = tmp.path().join("src");
        let dst = tmp.path().join("dst");
        std::fs::create_dir_all(&src).expect("mkdir src");
        let name_a = OsStr::from_bytes(b"bad\xffname");
        let name_b = OsStr::from_bytes(b"bad\xfename");
        if std::fs::write(src.join(name_a), "a").is_err() {
            // Filesystem rejects non-UTF-8 names.
            return;
        }
        std::fs::write(src.join(name_b), "b").expect("write second name");

        let report = copy_tree(&src, &dst, SpecCopyOptions::default()).expect("copy tree");
        assert_eq!(report.cnt_copied, 2);
        assert_eq!(report.cnt_skipped, 0);
        assert_eq!(read_text(&dst.join(name_a)), "a");
        assert_eq!(read_text(&dst.join(name_b)), "b");
    }

    #[cfg(unix)]
    #[test]
    fn copy_tree_wraps_partial_failure() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::tempdir().expect("tempdir");
        let src = tmp.path().join("src");
        let dst = tmp.path().join("dst");
        write_text(&src.join("good.txt"), "good");
        let path_bad = src.join("bad.txt");
        write_text(&path_bad, "bad");
        std::fs::set_permissions(&path_bad, std::fs::Permissions::from_mode(0o000))
            .expect("lock file");
        if std::fs::read(&path_bad).is_ok() {
            // Privileged user: permissions are not enforced.
            return;
        }

        let err = copy_tree(&src, &dst, SpecCopyOptions::default()).expect_err("must fail");
        std::fs::set_permissions(&path_bad, std::fs::Permissions::from_mode(0o644))
            .expect("unlock file");

        // The destination root is always created first, so work is committed.
        let TreeError::PartialFailure { report, .. } = &err else {
            panic!("expected partial failure, got {err:?}");
        };
        assert!(matches!(err.root_cause(), TreeError::Io { .. }));
        assert_eq!(err.path(), Some(path_bad.as_path()));
        assert_eq!(report.cnt_created, 1);
        assert!(!dst.join("bad.txt").exists());

        // Enumeration order decides whether `good.txt` went first; if it did,
        // the copy stays in place and is counted.
        let if_good_copied = dst.join("good.txt").exists();
        assert_eq!(report.cnt_copied, u64::from(if_good_copied));
        if if_good_copied {
            assert_eq!(read_text(&dst.join("good.txt")), "good");
        }
    }

    #[cfg(unix)]
    #[test]
    fn copy_tree_overwrite_does_not_write_through_destination_link() {
        use std::os::unix::fs::symlink;

        let tmp = tempfile::tempdir().expect("tempdir");
        let src = tmp.path().join("src");
        let dst = tmp.path().join("dst");
        let outside = tmp.path().join("outside.txt");
        write_text(&src.join("a.txt"), "safe");
        write_text(&outside, "outside");
        std::fs::create_dir_all(&dst).expect("mkdir dst");
        symlink(&outside, dst.join("a.txt")).expect("create dst symlink");

        copy_tree(&src, &dst, SpecCopyOptions::with_overwrite(true)).expect("copy tree");
        assert!(!dst.join("a.txt").is_symlink());
        assert_eq!(read_text(&dst.join("a.txt")), "safe");
        assert_eq!(read_text(&outside), "outside");
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn copy_tree_preserves_metadata_when_asked() {
        use filetime::{FileTime, set_file_times};
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::tempdir().expect("tempdir");
        let src = tmp.path().join("src");
        let dst = tmp.path().join("dst");
        let path_file_src = src.join("meta.txt");
        write_text(&path_file_src, "meta");

        std::fs::set_permissions(&path_file_src, std::fs::Permissions::from_mode(0o640))
            .expect("set permissions");
        set_file_times(
            &path_file_src,
            FileTime::from_unix_time(1_700_000_010, 0),
            FileTime::from_unix_time(1_700_000_020, 0),
        )
        .expect("set times");

        let c_xattr_name = "user.portalkit_fs_test";
        let b_if_has_xattr = xattr::set(&path_file_src, c_xattr_name, b"meta_value").is_ok();

        let spec_cp_options = SpecCopyOptions {
            if_preserve_metadata: true,
            ..SpecCopyOptions::default()
        };
        copy_tree(&src, &dst, spec_cp_options).expect("copy tree");

        let path_file_dst = dst.join("meta.txt");
        let stat_src = std::fs::metadata(&path_file_src).expect("src metadata");
        let stat_dst = std::fs::metadata(&path_file_dst).expect("dst metadata");
        assert_eq!(
            stat_src.permissions().mode() & 0o777,
            stat_dst.permissions().mode() & 0o777
        );
        assert_eq!(
            FileTime::from_last_modification_time(&stat_src),
            FileTime::from_last_modification_time(&stat_dst)
        );

        if b_if_has_xattr {
            let raw_value_dst = xattr::get(&path_file_dst, c_xattr_name)
                .expect("get dst xattr")
                .expect("xattr exists");
            assert_eq!(raw_value_dst, b"meta_value");
        }
    }
}
