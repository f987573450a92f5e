use async_trait::async_trait;
use sqlx::Row;

use super::{DatastoreError, DestinationDatabase};
use crate::records::{AssetKind, AssetRow, Record};
use crate::util::db::Db;

/// Destination Postgres (Supabase) database.
pub struct PgDestination {
    db: Db,
}

impl PgDestination {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    async fn execute(
        &self,
        query: sqlx::query::Query<'_, sqlx::Postgres, sqlx::postgres::PgArguments>,
        table: &str,
    ) -> Result<u64, DatastoreError> {
        query
            .persistent(self.db.persistent)
            .execute(&self.db.pool)
            .await
            .map(|done| done.rows_affected())
            .map_err(|e| DatastoreError::from_sqlx(e, table))
    }
}

/// Gallery rows fall back to the legacy `src` column.
fn url_expr(kind: AssetKind) -> String {
    if kind.mirrors_legacy_src() {
        format!("COALESCE(NULLIF({}, ''), src)", kind.url_column())
    } else {
        kind.url_column().to_string()
    }
}

fn candidates_sql(kind: AssetKind) -> String {
    let url = url_expr(kind);
    format!(
        "SELECT id::text AS id, {url} AS url, storage_path FROM {table} \
         WHERE storage_path IS NULL OR {url} LIKE '/%' \
         ORDER BY id",
        table = kind.table(),
    )
}

fn repoint_sql(kind: AssetKind) -> String {
    let mut sql = format!(
        "UPDATE {} SET {} = $2, storage_path = $3",
        kind.table(),
        kind.url_column()
    );
    if kind.mirrors_legacy_src() {
        sql.push_str(", src = $2");
    }
    sql.push_str(" WHERE id::text = $1");
    sql
}

#[async_trait]
impl DestinationDatabase for PgDestination {
    async fn ping(&self) -> Result<(), DatastoreError> {
        self.db
            .ping()
            .await
            .map_err(|e| DatastoreError::Unreachable(format!("{e:#}")))
    }

    async fn insert_record(&self, record: &Record) -> Result<(), DatastoreError> {
        let table = record.kind().destination_table();
        let query = match record {
            Record::GalleryImage(g) => sqlx::query(
                "INSERT INTO gallery_images \
                 (id, src, image_url, alt, title, description, category, display_order, created_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
            )
            .bind(&g.id)
            .bind(&g.src)
            .bind(&g.image_url)
            .bind(&g.alt)
            .bind(&g.title)
            .bind(&g.description)
            .bind(&g.category)
            .bind(g.display_order)
            .bind(g.created_at),
            Record::Article(a) => sqlx::query(
                "INSERT INTO articles \
                 (id, title, slug, category, excerpt, content, image_url, author, published, \
                  published_at, created_at, updated_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
            )
            .bind(&a.id)
            .bind(&a.title)
            .bind(&a.slug)
            .bind(&a.category)
            .bind(&a.excerpt)
            .bind(&a.content)
            .bind(&a.image_url)
            .bind(&a.author)
            .bind(a.published)
            .bind(a.published_at)
            .bind(a.created_at)
            .bind(a.updated_at),
            Record::Appointment(a) => sqlx::query(
                "INSERT INTO appointments \
                 (name, email, phone, appointment_date, appointment_time, reason, status, notes, \
                  created_at, updated_at, dedup_key) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
            )
            .bind(&a.name)
            .bind(&a.email)
            .bind(&a.phone)
            .bind(a.appointment_date)
            .bind(&a.appointment_time)
            .bind(&a.reason)
            .bind(&a.status)
            .bind(&a.notes)
            .bind(a.created_at)
            .bind(a.updated_at)
            .bind(a.dedup_key()),
            Record::ContactMessage(m) => sqlx::query(
                "INSERT INTO contact_messages \
                 (name, email, phone, subject, message, service, read, created_at, dedup_key) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
            )
            .bind(&m.name)
            .bind(&m.email)
            .bind(&m.phone)
            .bind(&m.subject)
            .bind(&m.message)
            .bind(&m.service)
            .bind(m.read)
            .bind(m.created_at)
            .bind(m.dedup_key()),
            Record::Donation(d) => sqlx::query(
                "INSERT INTO donations \
                 (name, email, amount, transaction_id, status, is_recurring, frequency, \
                  sponsor_name, created_at, dedup_key) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
            )
            .bind(&d.name)
            .bind(&d.email)
            .bind(d.amount)
            .bind(&d.transaction_id)
            .bind(&d.status)
            .bind(d.is_recurring)
            .bind(&d.frequency)
            .bind(&d.sponsor_name)
            .bind(d.created_at)
            .bind(d.dedup_key()),
        };
        self.execute(query, table).await.map(|_| ())
    }

    async fn asset_candidates(&self, kind: AssetKind) -> Result<Vec<AssetRow>, DatastoreError> {
        let sql = candidates_sql(kind);
        let rows = sqlx::query(&sql)
            .persistent(self.db.persistent)
            .fetch_all(&self.db.pool)
            .await
            .map_err(|e| DatastoreError::from_sqlx(e, kind.table()))?;

        rows.iter()
            .map(|r| {
                Ok(AssetRow {
                    id: r.try_get("id")?,
                    url: r.try_get("url")?,
                    storage_path: r.try_get("storage_path")?,
                })
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()
            .map_err(DatastoreError::Query)
    }

    async fn mark_pending(
        &self,
        kind: AssetKind,
        id: &str,
        storage_path: &str,
    ) -> Result<(), DatastoreError> {
        let sql = format!(
            "UPDATE {} SET storage_path = $2 WHERE id::text = $1",
            kind.table()
        );
        let affected = self
            .execute(sqlx::query(&sql).bind(id).bind(storage_path), kind.table())
            .await?;
        if affected == 0 {
            return Err(DatastoreError::RowNotFound {
                table: kind.table(),
                id: id.to_string(),
            });
        }
        Ok(())
    }

    async fn repoint_asset(
        &self,
        kind: AssetKind,
        id: &str,
        url: &str,
        storage_path: &str,
    ) -> Result<(), DatastoreError> {
        let sql = repoint_sql(kind);
        let affected = self
            .execute(
                sqlx::query(&sql).bind(id).bind(url).bind(storage_path),
                kind.table(),
            )
            .await?;
        if affected == 0 {
            return Err(DatastoreError::RowNotFound {
                table: kind.table(),
                id: id.to_string(),
            });
        }
        Ok(())
    }

    async fn close(&self) {
        self.db.close().await;
    }
}
