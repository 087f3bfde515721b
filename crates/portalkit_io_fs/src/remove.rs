//! Recursive subtree removal.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::report::{ReportTree, ReportTreeBuilder};
use crate::spec::{EnumNodeKind, SpecRemoveOptions, TreeError};
use crate::util::{classify_file_type, probe_node, remove_symlink};

#[derive(Debug)]
struct SpecRemoveContext {
    spec_rm_options: SpecRemoveOptions,
    builder_rm_report: ReportTreeBuilder,
}

/// Remove `path` and everything beneath it.
///
/// A missing `path` is a successful no-op. Symlinks are unlinked, never
/// followed. Directories are emptied child-first, then removed.
///
/// The first failing node aborts the walk with [`TreeError::Io`] naming that
/// node; its ancestors stay on disk. When some nodes were already deleted the
/// error is wrapped in [`TreeError::PartialFailure`].
pub fn remove_tree<P>(path: P, spec_rm_options: SpecRemoveOptions) -> Result<ReportTree, TreeError>
where
    P: AsRef<Path>,
{
    let path_root = path.as_ref();
    let Some(enum_kind) = probe_node(path_root)? else {
        debug!("Nothing to remove at {}", path_root.display());
        return Ok(ReportTree::default());
    };

    let mut spec_rm_ctx = SpecRemoveContext {
        spec_rm_options,
        builder_rm_report: ReportTreeBuilder::default(),
    };
    match remove_node(path_root, enum_kind, &mut spec_rm_ctx) {
        Ok(()) => Ok(spec_rm_ctx.builder_rm_report.build()),
        Err(e) => Err(spec_rm_ctx.builder_rm_report.into_failure(e)),
    }
}

fn remove_node(
    path_node: &Path,
    enum_kind: EnumNodeKind,
    spec_rm_ctx: &mut SpecRemoveContext,
) -> Result<(), TreeError> {
    spec_rm_ctx.builder_rm_report.add_scanned();

    if enum_kind == EnumNodeKind::Directory {
        for (path_child, enum_kind_child) in list_children(path_node)? {
            remove_node(&path_child, enum_kind_child, spec_rm_ctx)?;
        }
    }

    if spec_rm_ctx.spec_rm_options.if_dry_run {
        debug!("Would remove {enum_kind} {}", path_node.display());
        spec_rm_ctx.builder_rm_report.add_skipped();
        return Ok(());
    }

    let res_remove = match enum_kind {
        EnumNodeKind::Directory => fs::remove_dir(path_node),
        EnumNodeKind::Symlink => remove_symlink(path_node),
        EnumNodeKind::File | EnumNodeKind::Other => fs::remove_file(path_node),
    };
    res_remove.map_err(|e| TreeError::io(path_node, e))?;

    debug!("Removed {enum_kind} {}", path_node.display());
    spec_rm_ctx.builder_rm_report.add_removed();
    Ok(())
}

/// Drain the directory listing before any child is touched.
fn list_children(path_dir: &Path) -> Result<Vec<(PathBuf, EnumNodeKind)>, TreeError> {
    let iter_entries = fs::read_dir(path_dir).map_err(|e| TreeError::io(path_dir, e))?;

    let mut l_children = Vec::new();
    for entry_res in iter_entries {
        let entry = entry_res.map_err(|e| TreeError::io(path_dir, e))?;
        let path_entry = entry.path();
        let cfg_file_type = entry
            .file_type()
            .map_err(|e| TreeError::io(&path_entry, e))?;
        l_children.push((path_entry, classify_file_type(cfg_file_type)));
    }
    Ok(l_children)
}
