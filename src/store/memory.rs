//! In-memory store for tests and demos.
//!
//! Tables are created on first write. A transaction holds the store lock for its whole lifetime
//! and works on a copy of the data; commit swaps the copy in, rollback or drop discards it.

use super::{Page, Record, Store, Transaction};
use crate::config::{PkType, ResolvedTable};
use crate::error::AppError;
use async_trait::async_trait;
use serde_json::{Number, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Clone, Debug, Default)]
struct MemTable {
    rows: Vec<Record>,
    next_id: i64,
}

type Tables = HashMap<String, MemTable>;

#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every row of a table, trashed included, in insertion order.
    pub async fn rows(&self, qualified_name: &str) -> Vec<Record> {
        self.tables
            .lock()
            .await
            .get(qualified_name)
            .map(|t| t.rows.clone())
            .unwrap_or_default()
    }
}

/// Equality across the text/number split of form input: `"3"` matches `3`.
fn loose_eq(a: &Value, b: &Value) -> bool {
    if a == b {
        return true;
    }
    match (a, b) {
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::Array(_) | Value::Object(_), _) | (_, Value::Array(_) | Value::Object(_)) => false,
        _ => scalar_text(a) == scalar_text(b),
    }
}

fn scalar_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Apply the conversion a `$n::type` cast would do for the common column types.
fn coerce(pg_type: &str, v: &Value) -> Value {
    let Value::String(s) = v else {
        return v.clone();
    };
    match pg_type {
        "bigint" | "integer" | "int" | "int4" | "int8" | "smallint" => s
            .trim()
            .parse::<i64>()
            .map(|n| Value::Number(n.into()))
            .unwrap_or_else(|_| v.clone()),
        "numeric" | "real" | "double precision" | "float8" => s
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .unwrap_or_else(|| v.clone()),
        "boolean" | "bool" => match s.as_str() {
            "1" | "true" | "on" | "yes" => Value::Bool(true),
            "0" | "false" | "off" | "no" | "" => Value::Bool(false),
            _ => v.clone(),
        },
        _ => v.clone(),
    }
}

fn now() -> Value {
    Value::String(chrono::Utc::now().to_rfc3339())
}

fn matches(row: &Record, filters: &[(String, Value)]) -> bool {
    filters.iter().all(|(col, val)| match row.get(col) {
        Some(cell) if val.is_null() => cell.is_null(),
        Some(cell) => loose_eq(cell, val),
        None => val.is_null(),
    })
}

fn find_by<'a>(
    rows: &'a [Record],
    table: &ResolvedTable,
    column: &str,
    value: &Value,
    with_trashed: bool,
) -> Option<&'a Record> {
    rows.iter().find(|r| {
        r.get(column).map_or(false, |cell| loose_eq(cell, value))
            && (with_trashed || !table.is_trashed(r))
    })
}

#[async_trait]
impl Store for MemoryStore {
    async fn paginate(&self, table: &ResolvedTable, per_page: u32, page: u32) -> Result<Page, AppError> {
        let tables = self.tables.lock().await;
        let live: Vec<&Record> = tables
            .get(&table.qualified_name())
            .map(|t| t.rows.iter().filter(|r| !table.is_trashed(r)).collect())
            .unwrap_or_default();
        let skip = page.saturating_sub(1) as usize * per_page as usize;
        Ok(Page {
            total: live.len() as u64,
            rows: live
                .into_iter()
                .skip(skip)
                .take(per_page as usize)
                .cloned()
                .collect(),
        })
    }

    async fn find_by(
        &self,
        table: &ResolvedTable,
        column: &str,
        value: &Value,
        with_trashed: bool,
    ) -> Result<Option<Record>, AppError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .get(&table.qualified_name())
            .and_then(|t| find_by(&t.rows, table, column, value, with_trashed))
            .cloned())
    }

    async fn begin(&self) -> Result<Box<dyn Transaction>, AppError> {
        let guard = self.tables.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryTransaction { guard, working }))
    }

    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }
}

pub struct MemoryTransaction {
    guard: OwnedMutexGuard<Tables>,
    working: Tables,
}

impl MemoryTransaction {
    fn table(&mut self, table: &ResolvedTable) -> &mut MemTable {
        self.working.entry(table.qualified_name()).or_default()
    }
}

#[async_trait]
impl Transaction for MemoryTransaction {
    async fn select_where(
        &mut self,
        table: &ResolvedTable,
        filters: &[(String, Value)],
    ) -> Result<Vec<Record>, AppError> {
        Ok(self
            .table(table)
            .rows
            .iter()
            .filter(|r| !table.is_trashed(r) && matches(r, filters))
            .cloned()
            .collect())
    }

    async fn insert(&mut self, table: &ResolvedTable, data: &Record) -> Result<Record, AppError> {
        let mem = self.table(table);
        let pk = match data.get(&table.pk).filter(|v| !v.is_null()) {
            Some(given) => {
                let given = table
                    .column(&table.pk)
                    .map(|c| coerce(&c.pg_type, given))
                    .unwrap_or_else(|| given.clone());
                if find_by(&mem.rows, table, &table.pk, &given, true).is_some() {
                    return Err(AppError::Conflict(format!(
                        "duplicate key {} = {} in {}",
                        table.pk,
                        scalar_text(&given),
                        table.qualified_name()
                    )));
                }
                if let Some(n) = given.as_i64() {
                    mem.next_id = mem.next_id.max(n);
                }
                given
            }
            None => match table.pk_type {
                PkType::BigInt | PkType::Int => {
                    mem.next_id += 1;
                    Value::Number(mem.next_id.into())
                }
                PkType::Uuid | PkType::Text => Value::String(uuid::Uuid::new_v4().to_string()),
            },
        };

        let mut row = Record::new();
        for c in &table.columns {
            let v = if c.name == table.pk {
                pk.clone()
            } else if let Some(v) = data.get(&c.name) {
                coerce(&c.pg_type, v)
            } else if c.name == "created_at" || c.name == "updated_at" {
                now()
            } else {
                Value::Null
            };
            row.insert(c.name.clone(), v);
        }
        tracing::debug!(table = %table.qualified_name(), id = %scalar_text(&pk), "memory insert");
        mem.rows.push(row.clone());
        Ok(row)
    }

    async fn update(
        &mut self,
        table: &ResolvedTable,
        id: &Value,
        data: &Record,
    ) -> Result<Option<Record>, AppError> {
        let mem = self.table(table);
        let Some(row) = mem
            .rows
            .iter_mut()
            .find(|r| r.get(&table.pk).map_or(false, |v| loose_eq(v, id)))
        else {
            return Ok(None);
        };
        let mut changed = false;
        for c in &table.columns {
            if c.name == table.pk || c.name == "updated_at" {
                continue;
            }
            if let Some(v) = data.get(&c.name) {
                row.insert(c.name.clone(), coerce(&c.pg_type, v));
                changed = true;
            }
        }
        if changed && table.has_column("updated_at") {
            row.insert("updated_at".into(), now());
        }
        tracing::debug!(table = %table.qualified_name(), id = %scalar_text(id), "memory update");
        Ok(Some(row.clone()))
    }

    async fn delete(&mut self, table: &ResolvedTable, id: &Value) -> Result<Option<Record>, AppError> {
        let mem = self.table(table);
        let pos = mem
            .rows
            .iter()
            .position(|r| r.get(&table.pk).map_or(false, |v| loose_eq(v, id)));
        tracing::debug!(table = %table.qualified_name(), id = %scalar_text(id), "memory delete");
        Ok(pos.map(|i| mem.rows.remove(i)))
    }

    async fn delete_where(
        &mut self,
        table: &ResolvedTable,
        filters: &[(String, Value)],
    ) -> Result<u64, AppError> {
        let mem = self.table(table);
        let before = mem.rows.len();
        mem.rows.retain(|r| !matches(r, filters));
        Ok((before - mem.rows.len()) as u64)
    }

    async fn commit(self: Box<Self>) -> Result<(), AppError> {
        let MemoryTransaction { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), AppError> {
        Ok(())
    }
}
