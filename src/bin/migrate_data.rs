//! Copy every legacy row from the SQLite source into the destination database.
use anyhow::{Context, Result};
use tracing::info;

use centre_migrate::datastore::{PgDestination, SqliteSource};
use centre_migrate::migrate::driver::{execute_data_run, DESTINATION_HELP};
use centre_migrate::util::db::Db;
use centre_migrate::util::env::{self, DIRECT_DATABASE_URL, POOLED_DATABASE_URL, SOURCE_DATABASE_URL};

#[tokio::main]
async fn main() -> Result<()> {
    env::init_env();
    centre_migrate::logging::init_tracing("info")?;
    env::preflight_check(
        "migrate_data",
        &[],
        &[SOURCE_DATABASE_URL, POOLED_DATABASE_URL, DIRECT_DATABASE_URL],
    )?;

    let destination = env::destination_db_url().context(DESTINATION_HELP)?;
    let db = Db::connect(&destination, 2).await.context(DESTINATION_HELP)?;
    let dest = PgDestination::new(db);

    let source_url = env::source_db_url();
    let source = SqliteSource::open_lazy(&source_url)
        .with_context(|| format!("invalid {SOURCE_DATABASE_URL}"))?;

    let summary = execute_data_run(&source, &dest).await?;
    summary.log();
    info!("✅ Data migration finished");
    Ok(())
}
