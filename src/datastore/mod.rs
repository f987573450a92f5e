//! Datastore handles used by the migrators.
//!
//! The run driver opens one [`SourceDatabase`] and one [`DestinationDatabase`]
//! and passes them by reference into every migration step.

#[cfg(test)]
pub(crate) mod memory;
pub mod postgres;
pub mod sqlite;

use async_trait::async_trait;

use crate::records::{AssetKind, AssetRow, Record, RecordKind};

pub use postgres::PgDestination;
pub use sqlite::SqliteSource;

#[derive(Debug, thiserror::Error)]
pub enum DatastoreError {
    #[error("unique constraint violated ({})", .constraint.as_deref().unwrap_or("unnamed"))]
    UniqueViolation { constraint: Option<String> },

    #[error("table {0} does not exist")]
    MissingTable(String),

    #[error("datastore not reachable: {0}")]
    Unreachable(String),

    #[error("no row with id {id} in {table}")]
    RowNotFound { table: &'static str, id: String },

    #[error("undecodable row {position} in {table}: {source}")]
    Decode {
        table: &'static str,
        position: usize,
        #[source]
        source: sqlx::Error,
    },

    #[error("query failed: {0}")]
    Query(#[from] sqlx::Error),
}

impl DatastoreError {
    /// Classify a driver error by SQLSTATE (Postgres) or message (SQLite).
    pub fn from_sqlx(err: sqlx::Error, table: &str) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            match db_err.code().as_deref() {
                Some("23505") => {
                    return Self::UniqueViolation {
                        constraint: db_err.constraint().map(str::to_owned),
                    }
                }
                Some("42P01") => return Self::MissingTable(table.to_string()),
                _ => {}
            }
            if db_err.message().contains("no such table") {
                return Self::MissingTable(table.to_string());
            }
        }
        Self::Query(err)
    }
}

/// One legacy row, decoded independently of its neighbours.
pub type SourceRow = Result<Record, DatastoreError>;

/// Read side of row migration: the legacy database.
#[async_trait]
pub trait SourceDatabase: Send + Sync {
    /// Every row of one legacy model, ordered by primary key.
    ///
    /// The outer error means the table could not be read at all; a row that
    /// fails to decode is returned in place as an `Err`.
    async fn fetch_all(&self, kind: RecordKind) -> Result<Vec<SourceRow>, DatastoreError>;

    async fn close(&self);
}

/// The live database both migration modes write to.
#[async_trait]
pub trait DestinationDatabase: Send + Sync {
    async fn ping(&self) -> Result<(), DatastoreError>;

    /// Plain insert; a duplicate surfaces as [`DatastoreError::UniqueViolation`].
    async fn insert_record(&self, record: &Record) -> Result<(), DatastoreError>;

    /// Rows with no storage path OR a URL that still starts with the local-path marker.
    async fn asset_candidates(&self, kind: AssetKind) -> Result<Vec<AssetRow>, DatastoreError>;

    /// Record the planned object key before uploading.
    async fn mark_pending(
        &self,
        kind: AssetKind,
        id: &str,
        storage_path: &str,
    ) -> Result<(), DatastoreError>;

    /// Point the row's asset URL at the uploaded object.
    async fn repoint_asset(
        &self,
        kind: AssetKind,
        id: &str,
        url: &str,
        storage_path: &str,
    ) -> Result<(), DatastoreError>;

    async fn close(&self);
}
