//! Tree operation report models and mutable report builder.

use std::collections::BTreeMap;
use std::fmt;

use crate::spec::TreeError;

/// Aggregate counters and diagnostics for one tree operation.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReportTree {
    /// Total visited nodes (root included).
    pub cnt_scanned: u64,
    /// Directories created at destination.
    pub cnt_created: u64,
    /// Files or links written at destination.
    pub cnt_copied: u64,
    /// Nodes deleted.
    pub cnt_removed: u64,
    /// Nodes skipped by policy, filter or dry-run.
    pub cnt_skipped: u64,
    /// Non-fatal warnings collected during traversal.
    pub warnings: Vec<String>,
}

impl ReportTree {
    /// Number of collected warnings.
    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    /// Number of nodes whose change was committed to disk.
    pub fn committed_count(&self) -> u64 {
        self.cnt_created + self.cnt_copied + self.cnt_removed
    }

    /// Machine-readable counters.
    pub fn to_dict(&self) -> BTreeMap<String, u64> {
        let mut dict_counts = BTreeMap::new();
        dict_counts.insert("cnt_scanned".to_string(), self.cnt_scanned);
        dict_counts.insert("cnt_created".to_string(), self.cnt_created);
        dict_counts.insert("cnt_copied".to_string(), self.cnt_copied);
        dict_counts.insert("cnt_removed".to_string(), self.cnt_removed);
        dict_counts.insert("cnt_skipped".to_string(), self.cnt_skipped);
        dict_counts.insert("cnt_warnings".to_string(), self.warning_count() as u64);
        dict_counts
    }

    /// Human-readable one-line summary.
    pub fn format(&self, prefix: &str) -> String {
        format!(
            "{prefix} scanned={} created={} copied={} removed={} skipped={} warnings={}",
            self.cnt_scanned,
            self.cnt_created,
            self.cnt_copied,
            self.cnt_removed,
            self.cnt_skipped,
            self.warning_count()
        )
    }
}

impl fmt::Display for ReportTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format("[TREE]"))
    }
}

/// Mutable accumulator for tree operation statistics.
#[derive(Debug, Default, Clone)]
pub struct ReportTreeBuilder {
    report: ReportTree,
}

impl ReportTreeBuilder {
    pub fn add_scanned(&mut self) {
        self.report.cnt_scanned += 1;
    }

    pub fn add_created(&mut self) {
        self.report.cnt_created += 1;
    }

    pub fn add_copied(&mut self) {
        self.report.cnt_copied += 1;
    }

    pub fn add_removed(&mut self) {
        self.report.cnt_removed += 1;
    }

    pub fn add_skipped(&mut self) {
        self.report.cnt_skipped += 1;
    }

    /// Record a warning and mirror it to the log.
    pub fn add_warning(&mut self, warning: String) {
        tracing::warn!("{warning}");
        self.report.warnings.push(warning);
    }

    /// Whether any change already reached the disk.
    pub fn has_committed(&self) -> bool {
        self.report.committed_count() > 0
    }

    /// Attach committed progress to `err` so callers see it was not a clean failure.
    pub(crate) fn into_failure(self, err: TreeError) -> TreeError {
        if !self.has_committed() {
            return err;
        }
        TreeError::PartialFailure {
            report: self.build(),
            source: Box::new(err),
        }
    }

    /// Finalize builder into immutable report.
    pub fn build(self) -> ReportTree {
        self.report
    }
}
