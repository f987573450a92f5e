//! In-memory datastores for exercising the migrators without a database.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use super::{DatastoreError, DestinationDatabase, SourceDatabase, SourceRow};
use crate::records::{AssetKind, AssetRow, Record, RecordKind};

#[derive(Default)]
pub struct MemorySource {
    tables: HashMap<RecordKind, Vec<Record>>,
    unreachable: bool,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unreachable() -> Self {
        Self {
            unreachable: true,
            ..Self::default()
        }
    }

    pub fn with(mut self, rows: Vec<Record>) -> Self {
        for row in rows {
            self.tables.entry(row.kind()).or_default().push(row);
        }
        self
    }
}

#[async_trait]
impl SourceDatabase for MemorySource {
    async fn fetch_all(&self, kind: RecordKind) -> Result<Vec<SourceRow>, DatastoreError> {
        if self.unreachable {
            return Err(DatastoreError::Unreachable("unable to open database file".into()));
        }
        self.tables
            .get(&kind)
            .map(|rows| rows.iter().cloned().map(Ok).collect())
            .ok_or_else(|| DatastoreError::MissingTable(kind.source_table().to_string()))
    }

    async fn close(&self) {}
}

#[derive(Debug, Clone, Default)]
pub struct DestinationState {
    pub records: Vec<Record>,
    pub assets: HashMap<AssetKind, Vec<AssetRow>>,
    /// Gallery `src` column, keyed by row id.
    pub legacy_src: HashMap<String, String>,
    pub missing_tables: HashSet<&'static str>,
    /// Inserts whose unique key is listed here fail with a generic query error.
    pub failing_inserts: HashSet<String>,
    /// Repoints for these row ids fail with a generic query error.
    pub failing_repoints: HashSet<String>,
    pub unreachable: bool,
    pub closed: bool,
}

impl DestinationState {
    pub fn count(&self, kind: RecordKind) -> usize {
        self.records.iter().filter(|r| r.kind() == kind).count()
    }

    pub fn asset(&self, kind: AssetKind, id: &str) -> Option<&AssetRow> {
        self.assets.get(&kind)?.iter().find(|r| r.id == id)
    }
}

#[derive(Default)]
pub struct MemoryDestination {
    state: Mutex<DestinationState>,
}

fn query_error(what: &str) -> DatastoreError {
    DatastoreError::Query(sqlx::Error::Protocol(what.to_string()))
}

impl MemoryDestination {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(self, rows: Vec<Record>) -> Self {
        self.state.lock().unwrap().records.extend(rows);
        self
    }

    pub fn with_assets(self, kind: AssetKind, rows: Vec<AssetRow>) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            for row in &rows {
                if kind.mirrors_legacy_src() {
                    if let Some(url) = &row.url {
                        state.legacy_src.insert(row.id.clone(), url.clone());
                    }
                }
            }
            state.assets.entry(kind).or_default().extend(rows);
        }
        self
    }

    pub fn unreachable(self) -> Self {
        self.state.lock().unwrap().unreachable = true;
        self
    }

    pub fn without_table(self, table: &'static str) -> Self {
        self.state.lock().unwrap().missing_tables.insert(table);
        self
    }

    pub fn failing_insert(self, unique_key: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .failing_inserts
            .insert(unique_key.to_string());
        self
    }

    pub fn failing_repoint(self, id: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .failing_repoints
            .insert(id.to_string());
        self
    }

    pub fn snapshot(&self) -> DestinationState {
        self.state.lock().unwrap().clone()
    }

    fn check_table(state: &DestinationState, table: &'static str) -> Result<(), DatastoreError> {
        if state.missing_tables.contains(table) {
            return Err(DatastoreError::MissingTable(table.to_string()));
        }
        Ok(())
    }

    fn row_mut<'a>(
        state: &'a mut DestinationState,
        kind: AssetKind,
        id: &str,
    ) -> Result<&'a mut AssetRow, DatastoreError> {
        state
            .assets
            .get_mut(&kind)
            .and_then(|rows| rows.iter_mut().find(|r| r.id == id))
            .ok_or_else(|| DatastoreError::RowNotFound {
                table: kind.table(),
                id: id.to_string(),
            })
    }
}

#[async_trait]
impl DestinationDatabase for MemoryDestination {
    async fn ping(&self) -> Result<(), DatastoreError> {
        if self.state.lock().unwrap().unreachable {
            return Err(DatastoreError::Unreachable("connection refused".into()));
        }
        Ok(())
    }

    async fn insert_record(&self, record: &Record) -> Result<(), DatastoreError> {
        let mut state = self.state.lock().unwrap();
        Self::check_table(&state, record.kind().destination_table())?;
        let key = record.unique_key();
        if let Some(key) = &key {
            if state.failing_inserts.contains(key) {
                return Err(query_error("null value in column violates not-null constraint"));
            }
            let duplicate = state
                .records
                .iter()
                .any(|r| r.kind() == record.kind() && r.unique_key().as_ref() == Some(key));
            if duplicate {
                return Err(DatastoreError::UniqueViolation {
                    constraint: Some(format!("{}_key", record.kind().destination_table())),
                });
            }
        }
        state.records.push(record.clone());
        Ok(())
    }

    async fn asset_candidates(&self, kind: AssetKind) -> Result<Vec<AssetRow>, DatastoreError> {
        let state = self.state.lock().unwrap();
        Self::check_table(&state, kind.table())?;
        let mut rows: Vec<AssetRow> = state
            .assets
            .get(&kind)
            .map(|rows| rows.iter().filter(|r| r.is_candidate()).cloned().collect())
            .unwrap_or_default();
        rows.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(rows)
    }

    async fn mark_pending(
        &self,
        kind: AssetKind,
        id: &str,
        storage_path: &str,
    ) -> Result<(), DatastoreError> {
        let mut state = self.state.lock().unwrap();
        Self::check_table(&state, kind.table())?;
        Self::row_mut(&mut state, kind, id)?.storage_path = Some(storage_path.to_string());
        Ok(())
    }

    async fn repoint_asset(
        &self,
        kind: AssetKind,
        id: &str,
        url: &str,
        storage_path: &str,
    ) -> Result<(), DatastoreError> {
        let mut state = self.state.lock().unwrap();
        Self::check_table(&state, kind.table())?;
        if state.failing_repoints.contains(id) {
            return Err(query_error("canceling statement due to statement timeout"));
        }
        let row = Self::row_mut(&mut state, kind, id)?;
        row.url = Some(url.to_string());
        row.storage_path = Some(storage_path.to_string());
        if kind.mirrors_legacy_src() {
            state.legacy_src.insert(id.to_string(), url.to_string());
        }
        Ok(())
    }

    async fn close(&self) {
        self.state.lock().unwrap().closed = true;
    }
}
