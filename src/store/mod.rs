//! Persistence seam: the store reads pages and single records; every write goes through a
//! transaction that is committed or rolled back as a unit.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::{ensure_database_exists, PgStore, PgTransaction};

use crate::config::ResolvedTable;
use crate::error::AppError;
use async_trait::async_trait;
use serde_json::{Map, Value};

/// One row as a JSON object keyed by column name.
pub type Record = Map<String, Value>;

#[derive(Clone, Debug, Default)]
pub struct Page {
    pub rows: Vec<Record>,
    /// Live rows in the whole table.
    pub total: u64,
}

#[async_trait]
pub trait Store: Send + Sync {
    /// Live rows ordered by primary key; `page` is 1-based.
    async fn paginate(&self, table: &ResolvedTable, per_page: u32, page: u32) -> Result<Page, AppError>;

    async fn find_by(
        &self,
        table: &ResolvedTable,
        column: &str,
        value: &Value,
        with_trashed: bool,
    ) -> Result<Option<Record>, AppError>;

    async fn begin(&self) -> Result<Box<dyn Transaction>, AppError>;

    async fn ping(&self) -> Result<(), AppError>;
}

#[async_trait]
pub trait Transaction: Send {
    /// Live rows matching every `(column, value)` pair.
    async fn select_where(
        &mut self,
        table: &ResolvedTable,
        filters: &[(String, Value)],
    ) -> Result<Vec<Record>, AppError>;

    /// Insert and return the stored row (generated key and defaults filled in).
    async fn insert(&mut self, table: &ResolvedTable, data: &Record) -> Result<Record, AppError>;

    /// Update by primary key; `None` when no row has that key.
    async fn update(
        &mut self,
        table: &ResolvedTable,
        id: &Value,
        data: &Record,
    ) -> Result<Option<Record>, AppError>;

    async fn delete(&mut self, table: &ResolvedTable, id: &Value) -> Result<Option<Record>, AppError>;

    async fn delete_where(
        &mut self,
        table: &ResolvedTable,
        filters: &[(String, Value)],
    ) -> Result<u64, AppError>;

    async fn commit(self: Box<Self>) -> Result<(), AppError>;

    async fn rollback(self: Box<Self>) -> Result<(), AppError>;
}

/// Key value of a record as display text (flash messages, log fields).
pub fn key_text(record: &Record, column: &str) -> String {
    match record.get(column) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(v) => v.to_string(),
    }
}
