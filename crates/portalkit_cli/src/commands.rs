//! Single-purpose subcommands: `remove`, `copy`, `tree`, `prune`.

use std::fs;
use std::path::Path;

use portalkit_io_fs::{
    ReportTree, SpecCopyOptions, SpecDescribeOptions, SpecRemoveOptions, copy_tree,
    describe_tree_with, remove_tree,
};
use tracing::info;

use crate::cli::{CopyArgs, PruneArgs, RemoveArgs, TreeArgs};
use crate::error::{CliError, Result};
use crate::report::ReportRun;

/// Whether anything (including a dangling link) sits at `path`.
pub(crate) fn is_present(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

fn require_confirmation(if_yes: bool, if_dry_run: bool, action: &str) -> Result<()> {
    if if_yes || if_dry_run {
        return Ok(());
    }
    Err(CliError::ConfirmationRequired {
        action: action.to_string(),
    })
}

pub fn run_remove(args: &RemoveArgs) -> Result<ReportRun> {
    require_confirmation(args.yes, args.dry_run, "remove targets")?;

    let spec_rm_options = SpecRemoveOptions {
        if_dry_run: args.dry_run,
    };
    let mut report = ReportRun::default();
    for path_target in &args.targets {
        if !is_present(path_target) {
            report.add_skipped(&format!("{} does not exist", path_target.display()));
            continue;
        }
        info!("Removing {}...", path_target.display());
        let res = remove_tree(path_target, spec_rm_options.clone());
        report.record(&format!("remove {}", path_target.display()), res);
    }
    info!("{report}");
    Ok(report)
}

pub fn run_copy(args: &CopyArgs) -> Result<ReportTree> {
    let spec_cp_options = SpecCopyOptions {
        rule_conflict_file: args.rule_conflict_file(),
        rule_symlink: args.symlinks.into(),
        patterns_exclude: Some(args.patterns_exclude.clone()),
        rule_pattern: args.pattern_mode.into(),
        if_preserve_metadata: args.preserve_metadata,
        if_dry_run: args.dry_run,
    };
    let report = copy_tree(&args.source, &args.destination, spec_cp_options)?;
    println!("{}", report.format("[COPY]"));
    Ok(report)
}

pub fn run_tree(args: &TreeArgs) -> Result<()> {
    let mut spec_desc_options = SpecDescribeOptions {
        depth_limit: args.depth,
        ..SpecDescribeOptions::default()
    };
    spec_desc_options
        .names_excluded
        .extend(args.names_excluded.iter().cloned());

    let c_tree = describe_tree_with(&args.path, &spec_desc_options)?;
    print!("{c_tree}");
    Ok(())
}

/// Remove every direct entry of `args.directory` not named in the keep list.
pub fn run_prune(args: &PruneArgs) -> Result<ReportRun> {
    require_confirmation(args.yes, args.dry_run, "prune directory")?;

    let iter_entries =
        fs::read_dir(&args.directory).map_err(|e| CliError::io(&args.directory, e))?;
    let mut l_targets = Vec::new();
    for entry_res in iter_entries {
        let entry = entry_res.map_err(|e| CliError::io(&args.directory, e))?;
        let name = entry.file_name().to_string_lossy().to_string();
        if args.names_keep.iter().any(|v| *v == name) {
            info!("Keeping {name}");
            continue;
        }
        l_targets.push(entry.path());
    }

    let spec_rm_options = SpecRemoveOptions {
        if_dry_run: args.dry_run,
    };
    let mut report = ReportRun::default();
    for path_target in l_targets {
        let res = remove_tree(&path_target, spec_rm_options.clone());
        report.record(&format!("delete {}", path_target.display()), res);
    }
    info!("{report}");
    Ok(report)
}
