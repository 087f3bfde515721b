//! Indented text listing of a directory tree.

use std::fs;
use std::path::Path;

use crate::spec::{SpecDescribeOptions, TreeError};
use crate::util::{TypePatternSeq, should_exclude_by_patterns};

const C_INDENT_UNIT: &str = "  ";

/// List `path` down to `max_depth` levels with the default filters
/// (hidden entries and `node_modules` skipped).
pub fn describe_tree<P>(path: P, max_depth: usize) -> Result<String, TreeError>
where
    P: AsRef<Path>,
{
    let spec_desc_options = SpecDescribeOptions {
        depth_limit: max_depth,
        ..SpecDescribeOptions::default()
    };
    describe_tree_with(path, &spec_desc_options)
}

/// List `path` as one line per entry: `name/` for directories, `name`
/// otherwise, indented two spaces per level below the first.
///
/// Entries come in filesystem enumeration order. Symlinks are listed but not
/// followed. A depth limit of `0` yields an empty string without touching the
/// filesystem.
pub fn describe_tree_with<P>(
    path: P,
    spec_desc_options: &SpecDescribeOptions,
) -> Result<String, TreeError>
where
    P: AsRef<Path>,
{
    if spec_desc_options.depth_limit == 0 {
        return Ok(String::new());
    }
    let spec_desc_pats = TypePatternSeq::compile(
        spec_desc_options.patterns_exclude.as_deref(),
        spec_desc_options.rule_pattern,
    )?;

    let mut c_tree = String::new();
    describe_level(
        path.as_ref(),
        0,
        spec_desc_options,
        spec_desc_pats.as_ref(),
        &mut c_tree,
    )?;
    Ok(c_tree)
}

fn describe_level(
    path_dir: &Path,
    n_depth_current: usize,
    spec_desc_options: &SpecDescribeOptions,
    spec_desc_pats: Option<&TypePatternSeq>,
    c_tree: &mut String,
) -> Result<(), TreeError> {
    if n_depth_current >= spec_desc_options.depth_limit {
        return Ok(());
    }

    // Drain the handle before descending.
    let l_entries = fs::read_dir(path_dir)
        .and_then(|iter_entries| iter_entries.collect::<Result<Vec<_>, _>>())
        .map_err(|e| TreeError::io(path_dir, e))?;
    let c_indent = C_INDENT_UNIT.repeat(n_depth_current);

    for entry in l_entries {
        let name = entry.file_name().to_string_lossy().to_string();
        if is_filtered(&name, spec_desc_options, spec_desc_pats) {
            continue;
        }

        let path_entry = entry.path();
        let cfg_file_type = entry
            .file_type()
            .map_err(|e| TreeError::io(&path_entry, e))?;
        if cfg_file_type.is_dir() {
            c_tree.push_str(&format!("{c_indent}{name}/\n"));
            describe_level(
                &path_entry,
                n_depth_current + 1,
                spec_desc_options,
                spec_desc_pats,
                c_tree,
            )?;
        } else {
            c_tree.push_str(&format!("{c_indent}{name}\n"));
        }
    }
    Ok(())
}

fn is_filtered(
    name: &str,
    spec_desc_options: &SpecDescribeOptions,
    spec_desc_pats: Option<&TypePatternSeq>,
) -> bool {
    name.starts_with(spec_desc_options.hidden_marker)
        || spec_desc_options.names_excluded.iter().any(|v| v == name)
        || should_exclude_by_patterns(name, spec_desc_pats)
}
