//! Maintenance plans, loaded from an optional JSON file.
//!
//! Every field has a default matching the portal's layout, so an empty `{}`
//! file (or no file at all) reproduces the stock behavior.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::error::{CliError, Result};

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigPortal {
    pub cleanup: ConfigCleanup,
    pub docs: ConfigDocs,
}

impl ConfigPortal {
    /// Read `path` when given, otherwise fall back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = fs::read_to_string(path).map_err(|e| CliError::io(path, e))?;
        let config = serde_json::from_str(&raw).map_err(|source| CliError::Config {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigCleanup {
    /// Obsolete directories removed at the end of the run.
    pub dirs_remove: Vec<PathBuf>,
    /// Directories ensured before anything is copied.
    pub dirs_create: Vec<PathBuf>,
    /// Directory whose selected files get promoted to the root.
    pub promote_source: PathBuf,
    /// Root-relative files copied from `promote_source` with overwrite.
    pub files_promote: Vec<PathBuf>,
    /// SEO-enabled layout that replaces `layout_main` when present.
    pub layout_seo: PathBuf,
    pub layout_main: PathBuf,
    /// Backup directory name prefix, created next to the root.
    pub backup_prefix: String,
    /// Entry names left out of the backup.
    pub backup_exclude: Vec<String>,
    /// Scripts merged into `package.json`, in order.
    pub package_scripts: Vec<(String, String)>,
}

impl Default for ConfigCleanup {
    fn default() -> Self {
        Self {
            dirs_remove: paths(&["AlphaBetaGama", "GDevelopers-Final", "GDevelopers-New", "src"]),
            dirs_create: paths(&["docs", "scripts/cleanup"]),
            promote_source: PathBuf::from("GDevelopers-New"),
            files_promote: paths(&[
                "apps/main/src/app/layout.tsx",
                "apps/main/src/app/page.tsx",
                "packages/ui/components/layout/Header.tsx",
                "packages/ui/components/layout/Footer.tsx",
                "packages/ui/components/ThemeToggle.tsx",
            ]),
            layout_seo: PathBuf::from("apps/main/src/app/layout-with-seo.tsx"),
            layout_main: PathBuf::from("apps/main/src/app/layout.tsx"),
            backup_prefix: "GDevelopers-Backup-".to_string(),
            backup_exclude: strings(&["node_modules", ".git"]),
            package_scripts: [
                ("cleanup", "portalkit cleanup"),
                ("setup", "npm install && npm run build"),
                ("dev:all", "turbo dev"),
                ("build:all", "turbo build"),
                ("lint:all", "turbo lint"),
            ]
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigDocs {
    /// Root-relative output directory.
    pub output_dir: PathBuf,
    pub packages: Vec<String>,
    pub apps: Vec<String>,
    /// Depth of the directory listing embedded in app READMEs.
    pub tree_depth: usize,
}

impl Default for ConfigDocs {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("docs/api"),
            packages: strings(&[
                "ui",
                "accessibility",
                "seo",
                "performance",
                "i18n",
                "api",
                "caching",
                "ab-testing",
                "analytics",
            ]),
            apps: strings(&[
                "main", "blog", "docs", "projects", "team", "contact", "auth",
            ]),
            tree_depth: 2,
        }
    }
}

fn paths(raw: &[&str]) -> Vec<PathBuf> {
    raw.iter().map(PathBuf::from).collect()
}

fn strings(raw: &[&str]) -> Vec<String> {
    raw.iter().map(|v| v.to_string()).collect()
}
