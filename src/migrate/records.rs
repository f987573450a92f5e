//! Row migration: copy every legacy row of one type into the destination.

use tracing::{error, info, warn};

use super::{BatchReport, BatchStatus};
use crate::datastore::{DatastoreError, DestinationDatabase, SourceDatabase};
use crate::records::RecordKind;

/// Copy all rows of `kind`. Never fails: every outcome lands in the report.
pub async fn migrate_records(
    source: &dyn SourceDatabase,
    dest: &dyn DestinationDatabase,
    kind: RecordKind,
) -> BatchReport {
    let mut report = BatchReport::new(kind.label());
    info!("📦 Migrating {}...", kind.label());

    let rows = match source.fetch_all(kind).await {
        Ok(rows) => rows,
        Err(e) => {
            warn!(table = kind.source_table(), "⚠ Source not accessible, skipping {}: {e}", kind.label());
            return report.with_status(BatchStatus::SourceUnavailable);
        }
    };
    report.found = rows.len();
    info!("  Found {} {}", rows.len(), kind.label());

    for row in rows {
        let row = match row {
            Ok(row) => row,
            Err(e) => {
                report.failed += 1;
                error!("  ✗ {e}");
                continue;
            }
        };
        let label = row.describe();
        let row = row.into_destination();
        match dest.insert_record(&row).await {
            Ok(()) => {
                report.migrated += 1;
                info!("  ✓ {label}");
            }
            Err(DatastoreError::UniqueViolation { .. }) => {
                report.skipped += 1;
                info!("  ⚠ {label} skipped, already exists");
            }
            Err(DatastoreError::MissingTable(table)) => {
                warn!("  ⚠ Destination table {table} does not exist, skipping {}", kind.label());
                return report.with_status(BatchStatus::MissingTable);
            }
            Err(e) => {
                report.failed += 1;
                error!("  ✗ {label}: {e}");
            }
        }
    }

    info!(
        "  {} done: {} inserted, {} skipped, {} failed",
        kind.label(),
        report.migrated,
        report.skipped,
        report.failed
    );
    report
}
