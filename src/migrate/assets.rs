//! Asset migration: move files referenced by local `/...` URLs into the bucket
//! for their record type and repoint the rows.
//!
//! Object keys preserve the folder layout under the public assets root:
//! `/gallery/event1.jpg` becomes `gallery/event1.jpg` in the `gallery` bucket.
//!
//! Each row goes through two writes. The planned key is stored in
//! `storage_path` before uploading (the row is now *pending*), and the URL is
//! repointed after. A pending row whose object already exists is repaired by
//! repointing alone.

use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use super::{BatchReport, BatchStatus};
use crate::datastore::{DatastoreError, DestinationDatabase};
use crate::records::{AssetKind, AssetRow, LOCAL_PATH_MARKER};
use crate::storage::{upload_file, ObjectStore, StoreError, UploadError};

/// Object key for a local asset URL, or `None` when the URL is not local or
/// would escape the public assets root.
pub fn remote_object_path(url: &str) -> Option<String> {
    let relative = url.strip_prefix(LOCAL_PATH_MARKER)?;
    let relative = relative.split(['?', '#']).next().unwrap_or(relative);
    let mut segments = Vec::new();
    for raw in relative.split('/').filter(|s| !s.is_empty()) {
        let segment = urlencoding::decode(raw).ok()?;
        if segment == "." || segment == ".." || segment.contains(['/', '\\']) {
            return None;
        }
        segments.push(segment.into_owned());
    }
    if segments.is_empty() {
        return None;
    }
    Some(segments.join("/"))
}

pub fn resolve_local_path(public_root: &Path, object_path: &str) -> PathBuf {
    object_path
        .split('/')
        .fold(public_root.to_path_buf(), |acc, segment| acc.join(segment))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome {
    Migrated { url: String },
    /// Pending row whose object was already uploaded; only repointed.
    Repaired { url: String },
    AlreadyMigrated,
    NotLocal,
    UnsafePath,
    FileMissing(PathBuf),
}

#[derive(Debug, thiserror::Error)]
pub enum RowError {
    #[error(transparent)]
    Upload(#[from] UploadError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Datastore(#[from] DatastoreError),
}

pub struct AssetMigrator<'a> {
    dest: &'a dyn DestinationDatabase,
    store: &'a dyn ObjectStore,
    public_root: &'a Path,
}

impl<'a> AssetMigrator<'a> {
    pub fn new(
        dest: &'a dyn DestinationDatabase,
        store: &'a dyn ObjectStore,
        public_root: &'a Path,
    ) -> Self {
        Self {
            dest,
            store,
            public_root,
        }
    }

    /// Migrate every candidate row of `kind`. Never fails: every outcome lands in the report.
    pub async fn migrate(&self, kind: AssetKind) -> BatchReport {
        let mut report = BatchReport::new(kind.label());
        info!("🖼  Migrating {} images to bucket '{}'...", kind.label(), kind.bucket());

        let candidates = match self.dest.asset_candidates(kind).await {
            Ok(rows) => rows,
            Err(DatastoreError::MissingTable(table)) => {
                warn!("⚠ Table {table} not found, model might not exist, skipping");
                return report.with_status(BatchStatus::MissingTable);
            }
            Err(e) => {
                warn!("⚠ Could not list {}: {e}", kind.label());
                return report.with_status(BatchStatus::Aborted);
            }
        };
        report.found = candidates.len();
        info!("  Found {} {} to check", candidates.len(), kind.label());

        for row in &candidates {
            match self.migrate_row(kind, row).await {
                Ok(RowOutcome::Migrated { url }) => {
                    report.migrated += 1;
                    info!("  ✓ {} → {url}", row.id);
                }
                Ok(RowOutcome::Repaired { url }) => {
                    report.migrated += 1;
                    info!("  ✓ {} repointed to existing object {url}", row.id);
                }
                Ok(RowOutcome::AlreadyMigrated) => {
                    report.skipped += 1;
                    info!("  ⚠ {} already migrated", row.id);
                }
                Ok(RowOutcome::NotLocal) => {
                    report.skipped += 1;
                    info!("  ⚠ {} is not a local asset ({:?}), skipping", row.id, row.url);
                }
                Ok(RowOutcome::UnsafePath) => {
                    report.skipped += 1;
                    warn!("  ⚠ {} has an unusable local path ({:?}), skipping", row.id, row.url);
                }
                Ok(RowOutcome::FileMissing(path)) => {
                    report.skipped += 1;
                    warn!("  ⚠ {} file not found: {}", row.id, path.display());
                }
                Err(e) => {
                    report.failed += 1;
                    error!("  ✗ {}: {e}", row.id);
                }
            }
        }

        info!(
            "  {} done: {} migrated, {} skipped, {} failed",
            kind.label(),
            report.migrated,
            report.skipped,
            report.failed
        );
        report
    }

    pub async fn migrate_row(&self, kind: AssetKind, row: &AssetRow) -> Result<RowOutcome, RowError> {
        if row.is_migrated() {
            return Ok(RowOutcome::AlreadyMigrated);
        }
        let Some(url) = row.url.as_deref().filter(|u| row.has_local_url() && !u.is_empty()) else {
            return Ok(RowOutcome::NotLocal);
        };
        let Some(object_path) = remote_object_path(url) else {
            return Ok(RowOutcome::UnsafePath);
        };
        let bucket = kind.bucket();

        if let Some(pending) = row.storage_path.as_deref() {
            if self.store.object_exists(bucket, pending).await? {
                let public = self.store.public_url(bucket, pending);
                self.dest
                    .repoint_asset(kind, &row.id, &public, pending)
                    .await?;
                return Ok(RowOutcome::Repaired { url: public });
            }
        }

        let local = resolve_local_path(self.public_root, &object_path);
        if !tokio::fs::try_exists(&local).await.unwrap_or(false) {
            return Ok(RowOutcome::FileMissing(local));
        }

        self.dest.mark_pending(kind, &row.id, &object_path).await?;
        let uploaded = upload_file(self.store, &local, bucket, &object_path).await?;
        self.dest
            .repoint_asset(kind, &row.id, &uploaded.url, &uploaded.path)
            .await?;
        Ok(RowOutcome::Migrated { url: uploaded.url })
    }
}
