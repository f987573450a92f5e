//! Legacy SQLite database the site ran on before the move to Postgres.
//!
//! Tables keep their original model names and camelCase columns; each query
//! aliases them onto the snake_case field names used by [`crate::records`].
//! Timestamps are stored either as RFC 3339 text or as epoch milliseconds,
//! depending on which tool last wrote the row, so both are accepted.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

use super::{DatastoreError, SourceDatabase, SourceRow};
use crate::records::{
    Appointment, Article, ContactMessage, Donation, GalleryImage, Record, RecordKind,
};

pub struct SqliteSource {
    pool: SqlitePool,
}

impl SqliteSource {
    /// Open lazily and read-only: a missing file surfaces on the first query,
    /// so each record type can report it independently.
    pub fn open_lazy(database_url: &str) -> Result<Self, DatastoreError> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(false)
            .read_only(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .acquire_timeout(Duration::from_secs(5))
            .connect_lazy_with(options);
        Ok(Self { pool })
    }
}

fn select_sql(kind: RecordKind) -> &'static str {
    match kind {
        RecordKind::GalleryImage => {
            r#"SELECT "id", "src", "imageUrl" AS image_url, "alt", "title", "description",
                      "category", "displayOrder" AS display_order, "createdAt" AS created_at
               FROM "GalleryImage" ORDER BY "id""#
        }
        RecordKind::Article => {
            r#"SELECT "id", "title", "slug", "category", "excerpt", "content",
                      "imageUrl" AS image_url, "author", "published",
                      "publishedAt" AS published_at, "createdAt" AS created_at,
                      "updatedAt" AS updated_at
               FROM "Article" ORDER BY "id""#
        }
        RecordKind::Appointment => {
            r#"SELECT "name", "email", "phone", "appointmentDate" AS appointment_date,
                      "appointmentTime" AS appointment_time, "reason", "status", "notes",
                      "createdAt" AS created_at, "updatedAt" AS updated_at
               FROM "Appointment" ORDER BY "id""#
        }
        RecordKind::ContactMessage => {
            r#"SELECT "name", "email", "phone", "subject", "message", "service", "read",
                      "createdAt" AS created_at
               FROM "ContactMessage" ORDER BY "id""#
        }
        RecordKind::Donation => {
            r#"SELECT "name", "email", "amount", "transactionId" AS transaction_id, "status",
                      "isRecurring" AS is_recurring, "frequency",
                      "sponsorName" AS sponsor_name, "createdAt" AS created_at
               FROM "Donation" ORDER BY "id""#
        }
    }
}

fn legacy_timestamp_opt(
    row: &SqliteRow,
    column: &str,
) -> Result<Option<DateTime<Utc>>, sqlx::Error> {
    match row.try_get::<Option<i64>, _>(column) {
        Ok(Some(millis)) => DateTime::from_timestamp_millis(millis)
            .map(Some)
            .ok_or_else(|| sqlx::Error::ColumnDecode {
                index: column.to_string(),
                source: format!("epoch millis {millis} out of range").into(),
            }),
        Ok(None) => Ok(None),
        // Stored as text.
        Err(_) => row.try_get::<Option<DateTime<Utc>>, _>(column),
    }
}

fn legacy_timestamp(row: &SqliteRow, column: &str) -> Result<DateTime<Utc>, sqlx::Error> {
    legacy_timestamp_opt(row, column)?.ok_or_else(|| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: "unexpected NULL timestamp".into(),
    })
}

fn decode_row(kind: RecordKind, r: &SqliteRow) -> Result<Record, sqlx::Error> {
    let record = match kind {
        RecordKind::GalleryImage => Record::GalleryImage(GalleryImage {
            id: r.try_get("id")?,
            src: r.try_get("src")?,
            image_url: r.try_get("image_url")?,
            alt: r.try_get("alt")?,
            title: r.try_get("title")?,
            description: r.try_get("description")?,
            category: r.try_get("category")?,
            display_order: r.try_get::<Option<i32>, _>("display_order")?.unwrap_or(0),
            created_at: legacy_timestamp(r, "created_at")?,
        }),
        RecordKind::Article => Record::Article(Article {
            id: r.try_get("id")?,
            title: r.try_get("title")?,
            slug: r.try_get("slug")?,
            category: r.try_get("category")?,
            excerpt: r.try_get("excerpt")?,
            content: r.try_get("content")?,
            image_url: r.try_get("image_url")?,
            author: r.try_get("author")?,
            published: r.try_get("published")?,
            published_at: legacy_timestamp_opt(r, "published_at")?,
            created_at: legacy_timestamp(r, "created_at")?,
            updated_at: legacy_timestamp(r, "updated_at")?,
        }),
        RecordKind::Appointment => Record::Appointment(Appointment {
            name: r.try_get("name")?,
            email: r.try_get("email")?,
            phone: r.try_get("phone")?,
            appointment_date: legacy_timestamp(r, "appointment_date")?,
            appointment_time: r.try_get("appointment_time")?,
            reason: r.try_get("reason")?,
            status: r.try_get("status")?,
            notes: r.try_get("notes")?,
            created_at: legacy_timestamp(r, "created_at")?,
            updated_at: legacy_timestamp(r, "updated_at")?,
        }),
        RecordKind::ContactMessage => Record::ContactMessage(ContactMessage {
            name: r.try_get("name")?,
            email: r.try_get("email")?,
            phone: r.try_get("phone")?,
            subject: r.try_get("subject")?,
            message: r.try_get("message")?,
            service: r.try_get("service")?,
            read: r.try_get("read")?,
            created_at: legacy_timestamp(r, "created_at")?,
        }),
        RecordKind::Donation => Record::Donation(Donation {
            name: r.try_get("name")?,
            email: r.try_get("email")?,
            amount: r.try_get("amount")?,
            transaction_id: r.try_get("transaction_id")?,
            status: r.try_get("status")?,
            is_recurring: r.try_get("is_recurring")?,
            frequency: r.try_get("frequency")?,
            sponsor_name: r.try_get("sponsor_name")?,
            created_at: legacy_timestamp(r, "created_at")?,
        }),
    };
    Ok(record)
}

fn classify_source_error(err: sqlx::Error, table: &str) -> DatastoreError {
    match err {
        sqlx::Error::Io(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::Configuration(_) => DatastoreError::Unreachable(err.to_string()),
        // SQLITE_CANTOPEN
        sqlx::Error::Database(ref db) if db.code().as_deref() == Some("14") => {
            DatastoreError::Unreachable(err.to_string())
        }
        other => DatastoreError::from_sqlx(other, table),
    }
}

#[async_trait]
impl SourceDatabase for SqliteSource {
    async fn fetch_all(&self, kind: RecordKind) -> Result<Vec<SourceRow>, DatastoreError> {
        let table = kind.source_table();
        let rows = sqlx::query(select_sql(kind))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| classify_source_error(e, table))?;
        let records: Vec<SourceRow> = rows
            .iter()
            .enumerate()
            .map(|(i, r)| {
                decode_row(kind, r).map_err(|source| DatastoreError::Decode {
                    table,
                    position: i + 1,
                    source,
                })
            })
            .collect();
        let undecodable = records.iter().filter(|r| r.is_err()).count();
        info!(table, rows = records.len(), undecodable, "read legacy rows");
        Ok(records)
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
