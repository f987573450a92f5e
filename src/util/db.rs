use anyhow::Result;
use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions, PgSslMode},
    PgPool,
};
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, instrument};

use super::env::{DestinationUrl, Endpoint};

#[derive(Clone)]
pub struct Db {
    pub pool: PgPool,
    /// False behind a transaction-mode pooler: statements must stay unnamed.
    pub persistent: bool,
}

impl Db {
    // SECURITY: never include raw DSNs in tracing spans (they may contain credentials).
    #[instrument(skip(destination), fields(endpoint = ?destination.endpoint))]
    pub async fn connect(destination: &DestinationUrl, max_connections: u32) -> Result<Self> {
        let database_url = destination.url.as_str();
        let mut connect_options = PgConnectOptions::from_str(database_url)?;

        // Ensure TLS is enabled when DSN contains sslmode=require
        if database_url.contains("sslmode=require") {
            connect_options = connect_options.ssl_mode(PgSslMode::Require);
        }

        let persistent = destination.endpoint == Endpoint::Direct;
        if !persistent {
            // PgBouncer txn mode safe
            connect_options = connect_options.statement_cache_capacity(0);
        }

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(600))
            .connect_with(connect_options)
            .await?;
        info!("connected to destination db");
        Ok(Self { pool, persistent })
    }

    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .persistent(self.persistent)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
        info!("closed destination db");
    }
}
