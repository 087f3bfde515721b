//! `portalkit_cli`: command-line front end over `portalkit_io_fs`.
//!
//! Modules:
//! - `cli`      : clap argument model
//! - `commands` : remove / copy / tree / prune
//! - `cleanup`  : monorepo consolidation plan
//! - `docs`     : README and index generation
//! - `config`   : optional JSON overrides
//! - `report`   : per-target outcome tally
//! - `error`    : error type

pub mod cleanup;
pub mod cli;
pub mod commands;
pub mod config;
pub mod docs;
pub mod error;
pub mod report;

pub use cli::Cli;
pub use error::{CliError, Result};

use crate::cli::Command;
use crate::config::ConfigPortal;

/// Dispatch one parsed invocation.
pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Remove(args) => commands::run_remove(&args)?.into_result(),
        Command::Copy(args) => commands::run_copy(&args).map(|_| ()),
        Command::Tree(args) => commands::run_tree(&args),
        Command::Prune(args) => commands::run_prune(&args)?.into_result(),
        Command::Cleanup(args) => {
            let config = ConfigPortal::load(args.config.as_deref())?;
            cleanup::run_cleanup(&args, &config.cleanup)?.into_result()
        }
        Command::Docs(args) => {
            let config = ConfigPortal::load(args.config.as_deref())?;
            docs::run_docs(&args, &config.docs)?.into_result()
        }
    }
}
