//! `portalkit_io_fs` v1:
//! Rust-side filesystem tree reconciliation for the portal maintenance tools.
//!
//! Modules:
//! - `remove`   : recursive subtree removal
//! - `copy`     : recursive copy/merge with overwrite policy
//! - `describe` : depth-limited indented tree listing
//! - `spec`     : enums/options/errors
//! - `report`   : run-time report model
//! - `util`     : shared helper functions
//!
//! Every operation is synchronous and runs on the calling thread.

pub mod copy;
pub mod describe;
pub mod remove;
pub mod report;
pub mod spec;
mod util;

pub use copy::copy_tree;
pub use describe::{describe_tree, describe_tree_with};
pub use remove::remove_tree;
pub use report::{ReportTree, ReportTreeBuilder};
pub use spec::{
    EnumCopyFileConflictStrategy, EnumCopySymlinkStrategy, EnumNodeKind, EnumPatternMode,
    SpecCopyOptions, SpecDescribeOptions, SpecRemoveOptions, TreeError,
};
