//! Per-target outcome tally for multi-target commands.

use std::fmt;

use tracing::{error, info};

use crate::error::{CliError, Result};

/// Outcome counters of one command run. Failures never stop the run; they
/// are tallied here and turned into a non-zero exit by [`ReportRun::into_result`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReportRun {
    pub cnt_succeeded: u64,
    pub cnt_skipped: u64,
    pub cnt_failed: u64,
}

impl ReportRun {
    /// Log and count the outcome of one target.
    pub fn record<T, E: fmt::Display>(&mut self, action: &str, res: std::result::Result<T, E>) {
        match res {
            Ok(_) => {
                info!("{action}: done");
                self.cnt_succeeded += 1;
            }
            Err(e) => {
                error!("{action}: {e}");
                self.cnt_failed += 1;
            }
        }
    }

    pub fn add_skipped(&mut self, reason: &str) {
        info!("{reason}, skipping");
        self.cnt_skipped += 1;
    }

    pub fn add_failed(&mut self, reason: &str) {
        error!("{reason}");
        self.cnt_failed += 1;
    }

    pub fn into_result(self) -> Result<()> {
        if self.cnt_failed > 0 {
            return Err(CliError::TargetsFailed(self.cnt_failed));
        }
        Ok(())
    }
}

impl fmt::Display for ReportRun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[RUN] succeeded={} skipped={} failed={}",
            self.cnt_succeeded, self.cnt_skipped, self.cnt_failed
        )
    }
}
