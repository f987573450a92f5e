//! Upload local public assets to object storage and repoint their rows.
use anyhow::{Context, Result};
use tracing::info;

use centre_migrate::datastore::PgDestination;
use centre_migrate::migrate::driver::{execute_asset_run, DESTINATION_HELP, STORE_HELP};
use centre_migrate::storage::{StorageSettings, SupabaseStorage};
use centre_migrate::util::db::Db;
use centre_migrate::util::env::{
    self, DIRECT_DATABASE_URL, POOLED_DATABASE_URL, PUBLIC_ASSETS_DIR, SUPABASE_SERVICE_ROLE_KEY,
    SUPABASE_URL,
};

#[tokio::main]
async fn main() -> Result<()> {
    env::init_env();
    centre_migrate::logging::init_tracing("info")?;
    env::preflight_check(
        "migrate_assets",
        &[SUPABASE_URL, SUPABASE_SERVICE_ROLE_KEY],
        &[
            POOLED_DATABASE_URL,
            DIRECT_DATABASE_URL,
            SUPABASE_URL,
            SUPABASE_SERVICE_ROLE_KEY,
            PUBLIC_ASSETS_DIR,
        ],
    )
    .context(STORE_HELP)?;

    let settings = StorageSettings::from_env().context(STORE_HELP)?;
    let store = SupabaseStorage::new(&settings).context(STORE_HELP)?;

    let destination = env::destination_db_url().context(DESTINATION_HELP)?;
    let db = Db::connect(&destination, 2).await.context(DESTINATION_HELP)?;
    let dest = PgDestination::new(db);

    let public_root = env::public_assets_dir();
    let summary = execute_asset_run(&dest, &store, &public_root).await?;
    summary.log();
    info!("✅ Asset migration finished");
    Ok(())
}
