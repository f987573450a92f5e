//! Migration steps and the run driver that sequences them.

pub mod assets;
pub mod driver;
pub mod records;

use tracing::info;

pub use assets::AssetMigrator;
pub use driver::{execute_asset_run, execute_data_run};
pub use records::migrate_records;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchStatus {
    Completed,
    /// Destination table absent; the type was skipped.
    MissingTable,
    /// Legacy table or database could not be read.
    SourceUnavailable,
    /// Candidate query failed for another reason.
    Aborted,
}

/// Outcome counts for one record type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport {
    pub label: &'static str,
    pub status: BatchStatus,
    pub found: usize,
    pub migrated: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl BatchReport {
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            status: BatchStatus::Completed,
            found: 0,
            migrated: 0,
            skipped: 0,
            failed: 0,
        }
    }

    pub fn with_status(mut self, status: BatchStatus) -> Self {
        self.status = status;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub batches: Vec<BatchReport>,
}

impl RunSummary {
    pub fn batch(&self, label: &str) -> Option<&BatchReport> {
        self.batches.iter().find(|b| b.label == label)
    }

    pub fn total_failed(&self) -> usize {
        self.batches.iter().map(|b| b.failed).sum()
    }

    pub fn log(&self) {
        info!("📊 Summary");
        for b in &self.batches {
            info!(
                "  {:<18} {:>4} found  {:>4} migrated  {:>4} skipped  {:>4} failed  ({:?})",
                b.label, b.found, b.migrated, b.skipped, b.failed, b.status
            );
        }
        if self.total_failed() > 0 {
            info!("⚠ {} row(s) failed; see the ✗ lines above", self.total_failed());
        }
    }
}
