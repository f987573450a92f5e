//! Run driver: connectivity gate, fixed migration sequences, guaranteed close.

use std::path::Path;

use anyhow::Context;
use tracing::{info, warn};

use super::{migrate_records, AssetMigrator, RunSummary};
use crate::datastore::{DestinationDatabase, SourceDatabase};
use crate::records::{AssetKind, RecordKind};
use crate::storage::ObjectStore;

pub const DESTINATION_HELP: &str = "could not reach the destination database. \
Set DATABASE_URL (pooled, e.g. postgres://postgres.<ref>:<password>@<region>.pooler.supabase.com:6543/postgres) \
or DIRECT_URL (direct, e.g. postgres://postgres:<password>@db.<ref>.supabase.co:5432/postgres) \
and make sure the schema has been applied";

pub const STORE_HELP: &str = "could not reach the remote object store. \
Set SUPABASE_URL (e.g. https://<ref>.supabase.co) and SUPABASE_SERVICE_ROLE_KEY \
(the service_role key from the project's API settings)";

pub async fn preflight_destination(dest: &dyn DestinationDatabase) -> anyhow::Result<()> {
    dest.ping().await.context(DESTINATION_HELP)?;
    info!("✓ Destination database reachable");
    Ok(())
}

/// Lists buckets once; missing asset buckets only warn, their rows fail later.
pub async fn preflight_store(store: &dyn ObjectStore) -> anyhow::Result<()> {
    let buckets = store.list_buckets().await.context(STORE_HELP)?;
    info!(count = buckets.len(), "✓ Object store reachable");
    for kind in AssetKind::SEQUENCE {
        if !buckets.iter().any(|b| b == kind.bucket()) {
            warn!(
                "⚠ Bucket '{}' does not exist; {} uploads will fail until it is created",
                kind.bucket(),
                kind.label()
            );
        }
    }
    Ok(())
}

pub async fn run_data_migration(
    source: &dyn SourceDatabase,
    dest: &dyn DestinationDatabase,
) -> RunSummary {
    let mut summary = RunSummary::default();
    for kind in RecordKind::SEQUENCE {
        summary.batches.push(migrate_records(source, dest, kind).await);
    }
    summary
}

pub async fn run_asset_migration(
    dest: &dyn DestinationDatabase,
    store: &dyn ObjectStore,
    public_root: &Path,
) -> RunSummary {
    let migrator = AssetMigrator::new(dest, store, public_root);
    let mut summary = RunSummary::default();
    for kind in AssetKind::SEQUENCE {
        summary.batches.push(migrator.migrate(kind).await);
    }
    summary
}

/// Data mode. Both handles are closed whatever the outcome.
pub async fn execute_data_run(
    source: &dyn SourceDatabase,
    dest: &dyn DestinationDatabase,
) -> anyhow::Result<RunSummary> {
    info!("🚀 Starting data migration");
    let result = async {
        preflight_destination(dest).await?;
        Ok(run_data_migration(source, dest).await)
    }
    .await;

    source.close().await;
    dest.close().await;
    result
}

/// Asset mode. The destination is closed whatever the outcome.
pub async fn execute_asset_run(
    dest: &dyn DestinationDatabase,
    store: &dyn ObjectStore,
    public_root: &Path,
) -> anyhow::Result<RunSummary> {
    info!(root = %public_root.display(), "🚀 Starting asset migration");
    let result = async {
        preflight_destination(dest).await?;
        preflight_store(store).await?;
        Ok(run_asset_migration(dest, store, public_root).await)
    }
    .await;

    dest.close().await;
    result
}
