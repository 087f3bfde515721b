//! `cleanup`: consolidate the monorepo layout in one ordered pass.
//!
//! Steps: backup, create directories, promote files, SEO layout,
//! `package.json` scripts, remove obsolete directories. Only a failed
//! backup aborts the run; every later failure is logged, counted, and
//! the next target is attempted.

use std::fs;
use std::path::{Path, PathBuf};

use portalkit_io_fs::{
    EnumCopyFileConflictStrategy, EnumPatternMode, ReportTree, SpecCopyOptions,
    SpecRemoveOptions, TreeError, copy_tree, remove_tree,
};
use serde::de::Error as _;
use serde_json::{Map, Value};
use tracing::info;

use crate::cli::CleanupArgs;
use crate::commands::is_present;
use crate::config::ConfigCleanup;
use crate::error::{CliError, Result};
use crate::report::ReportRun;

#[derive(Debug)]
struct SpecCleanupContext<'a> {
    path_root: PathBuf,
    config: &'a ConfigCleanup,
    if_yes: bool,
    if_dry_run: bool,
    report: ReportRun,
}

pub fn run_cleanup(args: &CleanupArgs, config: &ConfigCleanup) -> Result<ReportRun> {
    let path_root = fs::canonicalize(&args.root).map_err(|e| CliError::io(&args.root, e))?;
    if !path_root.is_dir() {
        return Err(CliError::io(
            &path_root,
            std::io::Error::new(std::io::ErrorKind::NotADirectory, "root is not a directory"),
        ));
    }
    info!("Starting cleanup of {}", path_root.display());

    let mut spec_cl_ctx = SpecCleanupContext {
        path_root,
        config,
        if_yes: args.yes,
        if_dry_run: args.dry_run,
        report: ReportRun::default(),
    };

    if args.no_backup {
        info!("Backup disabled");
    } else {
        let path_backup = create_backup(&spec_cl_ctx)?;
        info!("Backup written to {}", path_backup.display());
    }

    create_directories(&mut spec_cl_ctx);
    promote_files(&mut spec_cl_ctx);
    integrate_seo_layout(&mut spec_cl_ctx);
    merge_package_scripts(&mut spec_cl_ctx);
    remove_directories(&mut spec_cl_ctx);

    info!("Cleanup finished: {}", spec_cl_ctx.report);
    Ok(spec_cl_ctx.report)
}

fn create_backup(spec_cl_ctx: &SpecCleanupContext) -> Result<PathBuf> {
    let dir_parent = spec_cl_ctx
        .path_root
        .parent()
        .unwrap_or(spec_cl_ctx.path_root.as_path());
    let path_backup = dir_parent.join(format!(
        "{}{}",
        spec_cl_ctx.config.backup_prefix,
        chrono::Utc::now().timestamp_millis()
    ));
    info!("Creating backup...");

    let spec_cp_options = SpecCopyOptions {
        patterns_exclude: Some(spec_cl_ctx.config.backup_exclude.clone()),
        rule_pattern: EnumPatternMode::Glob,
        if_dry_run: spec_cl_ctx.if_dry_run,
        ..SpecCopyOptions::default()
    };
    let report = copy_tree(&spec_cl_ctx.path_root, &path_backup, spec_cp_options)?;
    info!("{}", report.format("[BACKUP]"));
    Ok(path_backup)
}

fn create_directories(spec_cl_ctx: &mut SpecCleanupContext) {
    info!("Creating necessary directories...");
    for dir_rel in &spec_cl_ctx.config.dirs_create {
        let path_dir = spec_cl_ctx.path_root.join(dir_rel);
        if is_present(&path_dir) {
            spec_cl_ctx
                .report
                .add_skipped(&format!("Directory {} already exists", dir_rel.display()));
            continue;
        }
        let res = if spec_cl_ctx.if_dry_run {
            Ok(())
        } else {
            fs::create_dir_all(&path_dir)
        };
        spec_cl_ctx
            .report
            .record(&format!("create {}", dir_rel.display()), res);
    }
}

fn copy_overwrite(
    path_src: &Path,
    path_dst: &Path,
    if_dry_run: bool,
) -> std::result::Result<ReportTree, TreeError> {
    let spec_cp_options = SpecCopyOptions {
        rule_conflict_file: EnumCopyFileConflictStrategy::Overwrite,
        if_dry_run,
        ..SpecCopyOptions::default()
    };
    copy_tree(path_src, path_dst, spec_cp_options)
}

fn promote_files(spec_cl_ctx: &mut SpecCleanupContext) {
    let dir_promote = spec_cl_ctx.path_root.join(&spec_cl_ctx.config.promote_source);
    info!("Copying files from {}...", spec_cl_ctx.config.promote_source.display());

    for file_rel in &spec_cl_ctx.config.files_promote {
        let path_src = dir_promote.join(file_rel);
        if !is_present(&path_src) {
            spec_cl_ctx
                .report
                .add_failed(&format!("Source file {} does not exist", file_rel.display()));
            continue;
        }
        let path_dst = spec_cl_ctx.path_root.join(file_rel);
        let res = copy_overwrite(&path_src, &path_dst, spec_cl_ctx.if_dry_run);
        spec_cl_ctx
            .report
            .record(&format!("copy {}", file_rel.display()), res);
    }
}

fn integrate_seo_layout(spec_cl_ctx: &mut SpecCleanupContext) {
    let path_seo = spec_cl_ctx.path_root.join(&spec_cl_ctx.config.layout_seo);
    if !is_present(&path_seo) {
        info!("No SEO layout found");
        return;
    }
    info!(
        "Found {}, using it as the main layout...",
        spec_cl_ctx.config.layout_seo.display()
    );
    let path_main = spec_cl_ctx.path_root.join(&spec_cl_ctx.config.layout_main);
    let res = copy_overwrite(&path_seo, &path_main, spec_cl_ctx.if_dry_run);
    spec_cl_ctx.report.record("integrate SEO layout", res);
}

fn merge_package_scripts(spec_cl_ctx: &mut SpecCleanupContext) {
    info!("Updating package.json scripts...");
    let path_manifest = spec_cl_ctx.path_root.join("package.json");
    let res = update_package_json(
        &path_manifest,
        &spec_cl_ctx.config.package_scripts,
        spec_cl_ctx.if_dry_run,
    );
    spec_cl_ctx.report.record("update package.json", res);
}

/// Merge `scripts` into the manifest's `scripts` object, keeping key order.
/// Existing keys are replaced in place, new keys are appended.
pub(crate) fn update_package_json(
    path_manifest: &Path,
    scripts: &[(String, String)],
    if_dry_run: bool,
) -> Result<()> {
    let raw = fs::read_to_string(path_manifest).map_err(|e| CliError::io(path_manifest, e))?;
    let json_err = |source| CliError::Json {
        path: path_manifest.to_path_buf(),
        source,
    };
    let mut manifest: Value = serde_json::from_str(&raw).map_err(json_err)?;

    let Some(obj_manifest) = manifest.as_object_mut() else {
        return Err(json_err(serde_json::Error::custom(
            "top-level value is not an object",
        )));
    };
    let entry = obj_manifest
        .entry("scripts")
        .or_insert_with(|| Value::Object(Map::new()));
    if !entry.is_object() {
        *entry = Value::Object(Map::new());
    }
    if let Value::Object(obj_scripts) = entry {
        for (name, command) in scripts {
            obj_scripts.insert(name.clone(), Value::String(command.clone()));
        }
    }

    if if_dry_run {
        return Ok(());
    }
    let mut c_out = serde_json::to_string_pretty(&manifest).map_err(json_err)?;
    c_out.push('\n');
    fs::write(path_manifest, c_out).map_err(|e| CliError::io(path_manifest, e))
}

fn remove_directories(spec_cl_ctx: &mut SpecCleanupContext) {
    info!("Removing obsolete directories...");
    let spec_rm_options = SpecRemoveOptions {
        if_dry_run: spec_cl_ctx.if_dry_run,
    };
    for dir_rel in &spec_cl_ctx.config.dirs_remove {
        let path_dir = spec_cl_ctx.path_root.join(dir_rel);
        if !is_present(&path_dir) {
            spec_cl_ctx
                .report
                .add_skipped(&format!("Directory {} does not exist", dir_rel.display()));
            continue;
        }
        if !spec_cl_ctx.if_yes && !spec_cl_ctx.if_dry_run {
            let err = CliError::ConfirmationRequired {
                action: format!("remove {}", dir_rel.display()),
            };
            spec_cl_ctx.report.add_failed(&err.to_string());
            continue;
        }
        let res = remove_tree(&path_dir, spec_rm_options.clone());
        spec_cl_ctx
            .report
            .record(&format!("remove {}", dir_rel.display()), res);
    }
}
