//! `docs`: per-app READMEs, copied package READMEs and an `index.html`.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use portalkit_io_fs::{EnumCopyFileConflictStrategy, SpecCopyOptions, copy_tree, describe_tree};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::cli::DocsArgs;
use crate::config::ConfigDocs;
use crate::error::{CliError, Result};
use crate::report::ReportRun;

/// The fields of an app's `package.json` that end up in its README.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AppManifest {
    pub name: Option<String>,
    pub description: Option<String>,
    /// `null` reads as absent.
    pub dependencies: Option<Map<String, Value>>,
    pub dev_dependencies: Option<Map<String, Value>>,
}

impl AppManifest {
    /// Read `<dir_app>/package.json`; a missing file yields an empty manifest.
    pub fn load(dir_app: &Path) -> Result<Self> {
        let path_manifest = dir_app.join("package.json");
        let raw = match fs::read_to_string(&path_manifest) {
            Ok(v) => v,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(CliError::io(&path_manifest, e)),
        };
        serde_json::from_str(&raw).map_err(|source| CliError::Json {
            path: path_manifest,
            source,
        })
    }

    /// Dependency names, runtime ones first.
    pub fn dependency_names(&self) -> Vec<&str> {
        self.dependencies
            .iter()
            .chain(self.dev_dependencies.iter())
            .flat_map(|deps| deps.keys())
            .map(String::as_str)
            .collect()
    }

    /// Display name; an empty or missing `name` falls back to `app`.
    pub fn display_name<'a>(&'a self, app: &'a str) -> &'a str {
        self.name.as_deref().filter(|v| !v.is_empty()).unwrap_or(app)
    }
}

pub fn run_docs(args: &DocsArgs, config: &ConfigDocs) -> Result<ReportRun> {
    let dir_out = args.root.join(&config.output_dir);
    fs::create_dir_all(&dir_out).map_err(|e| CliError::io(&dir_out, e))?;
    info!("Generating documentation into {}", dir_out.display());

    let mut report = ReportRun::default();

    let l_packages = existing_names(&args.root.join("packages"), &config.packages);
    info!(
        "Found {} packages to document: {}",
        l_packages.len(),
        l_packages.join(", ")
    );
    // Only packages whose README was copied get an index link.
    let mut l_packages_linked = Vec::new();
    for pkg in &l_packages {
        let res = write_package_docs(
            &args.root.join("packages").join(pkg),
            &dir_out.join("packages").join(pkg),
        );
        if matches!(res, Ok(true)) {
            l_packages_linked.push(*pkg);
        }
        report.record(&format!("document package {pkg}"), res);
    }

    let l_apps = existing_names(&args.root.join("apps"), &config.apps);
    info!("Found {} apps to document: {}", l_apps.len(), l_apps.join(", "));
    for app in &l_apps {
        let res = write_app_docs(
            app,
            &args.root.join("apps").join(app),
            &dir_out.join("apps").join(app),
            config.tree_depth,
        );
        report.record(&format!("document app {app}"), res);
    }

    let generated_at = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    let path_index = dir_out.join("index.html");
    let res = fs::write(&path_index, render_index(&l_packages_linked, &l_apps, &generated_at));
    report.record("write index.html", res);

    info!("{report}");
    Ok(report)
}

fn existing_names<'a>(dir_parent: &Path, names: &'a [String]) -> Vec<&'a str> {
    names
        .iter()
        .filter(|name| dir_parent.join(name).exists())
        .map(String::as_str)
        .collect()
}

/// Returns whether a README was written.
fn write_package_docs(dir_pkg: &Path, dir_out: &Path) -> Result<bool> {
    fs::create_dir_all(dir_out).map_err(|e| CliError::io(dir_out, e))?;
    let path_readme = dir_pkg.join("README.md");
    if !path_readme.is_file() {
        debug!("No README in {}", dir_pkg.display());
        return Ok(false);
    }
    let spec_cp_options = SpecCopyOptions {
        rule_conflict_file: EnumCopyFileConflictStrategy::Overwrite,
        ..SpecCopyOptions::default()
    };
    copy_tree(&path_readme, dir_out.join("README.md"), spec_cp_options)?;
    Ok(true)
}

fn write_app_docs(app: &str, dir_app: &Path, dir_out: &Path, tree_depth: usize) -> Result<()> {
    let manifest = AppManifest::load(dir_app)?;
    let c_tree = describe_tree(dir_app, tree_depth)?;
    fs::create_dir_all(dir_out).map_err(|e| CliError::io(dir_out, e))?;
    let path_readme = dir_out.join("README.md");
    fs::write(&path_readme, render_app_readme(app, &manifest, &c_tree))
        .map_err(|e| CliError::io(&path_readme, e))
}

pub fn render_app_readme(app: &str, manifest: &AppManifest, tree: &str) -> String {
    let name = manifest.display_name(app);
    let description = manifest.description.as_deref().unwrap_or("");
    let l_deps = manifest.dependency_names();
    let c_deps = if l_deps.is_empty() {
        "No dependencies found.".to_string()
    } else {
        l_deps
            .iter()
            .map(|dep| format!("- {dep}"))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        "# {name}

{description}

## Overview

This is the {app} application in the portal monorepo.

## Directory Structure

```
{tree}
```

## Dependencies

{c_deps}

## Running the App

```bash
# From the root of the monorepo
npm run dev:{app}

# Or directly
cd apps/{app}
npm run dev
```

## Building the App

```bash
# From the root of the monorepo
npm run build -- --filter={app}

# Or directly
cd apps/{app}
npm run build
```
"
    )
}

fn render_links(prefix: &str, names: &[&str]) -> String {
    let mut c_out = String::new();
    for name in names {
        let _ = write!(
            c_out,
            "\n          <li><a href=\"{prefix}/{name}/README.md\">{name}</a></li>"
        );
    }
    c_out
}

pub fn render_index(packages: &[&str], apps: &[&str], generated_at: &str) -> String {
    let c_packages = render_links("packages", packages);
    let c_apps = render_links("apps", apps);
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>Portal Documentation</title>
</head>
<body>
  <header>
    <h1>Portal Documentation</h1>
    <p>API documentation and developer resources</p>
  </header>
  <main>
    <section>
      <h2>Packages</h2>
      <ul>{c_packages}
      </ul>
    </section>
    <section>
      <h2>Applications</h2>
      <ul>{c_apps}
      </ul>
    </section>
    <section>
      <h2>Getting Started</h2>
      <h3>Running the Development Server</h3>
      <pre>npm run dev</pre>
      <h3>Building for Production</h3>
      <pre>npm run build</pre>
    </section>
  </main>
  <footer>
    <p>Generated on {generated_at}</p>
  </footer>
</body>
</html>
"#
    )
}
