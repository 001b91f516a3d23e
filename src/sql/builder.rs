//! Builds parameterized SELECT, INSERT, UPDATE, DELETE for a resolved table.

use crate::config::ResolvedTable;
use serde_json::{Map, Value};

/// Quote identifier for PostgreSQL (safe: only from config).
fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// Full qualified table name.
fn qualified_table(table: &ResolvedTable) -> String {
    format!("{}.{}", quoted(&table.schema), quoted(&table.name))
}

#[derive(Debug)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<Value>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    /// Push a value and return its placeholder cast to the column type.
    fn push_param(&mut self, table: &ResolvedTable, column: &str, v: Value) -> String {
        self.params.push(v);
        let n = self.params.len();
        let pg_type = table
            .column(column)
            .map(|c| c.pg_type.as_str())
            .unwrap_or("text");
        format!("${}::{}", n, pg_type)
    }
}

/// SELECT list: numeric and custom enum (schema.typename) columns come back as text.
fn select_column_list(table: &ResolvedTable) -> String {
    table
        .columns
        .iter()
        .map(|c| {
            let q = quoted(&c.name);
            if c.pg_type.contains('.') || c.pg_type == "numeric" {
                format!("{}::text AS {}", q, q)
            } else {
                q
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn live_filter(table: &ResolvedTable, with_trashed: bool) -> Option<String> {
    match (&table.soft_delete_column, with_trashed) {
        (Some(col), false) => Some(format!("{} IS NULL", quoted(col))),
        _ => None,
    }
}

/// ORDER BY the primary key when the table has one (join tables may not).
fn order_by_pk(table: &ResolvedTable) -> String {
    if table.has_column(&table.pk) {
        format!(" ORDER BY {}", quoted(&table.pk))
    } else {
        String::new()
    }
}

fn where_clause(parts: &[String]) -> String {
    if parts.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", parts.join(" AND "))
    }
}

fn equality_filters(q: &mut QueryBuf, table: &ResolvedTable, filters: &[(String, Value)]) -> Vec<String> {
    filters
        .iter()
        .filter(|(col, _)| table.has_column(col))
        .map(|(col, val)| {
            if val.is_null() {
                format!("{} IS NULL", quoted(col))
            } else {
                let ph = q.push_param(table, col, val.clone());
                format!("{} = {}", quoted(col), ph)
            }
        })
        .collect()
}

/// SELECT one row by any column (route key lookups). Soft-deleted rows excluded unless `with_trashed`.
pub fn select_by_column(table: &ResolvedTable, column: &str, value: &Value, with_trashed: bool) -> QueryBuf {
    let mut q = QueryBuf::new();
    let ph = q.push_param(table, column, value.clone());
    let mut parts = vec![format!("{} = {}", quoted(column), ph)];
    parts.extend(live_filter(table, with_trashed));
    q.sql = format!(
        "SELECT {} FROM {}{} LIMIT 1",
        select_column_list(table),
        qualified_table(table),
        where_clause(&parts)
    );
    q
}

/// SELECT rows matching every (column = value) filter, live rows only, ORDER BY pk.
pub fn select_where(table: &ResolvedTable, filters: &[(String, Value)]) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut parts = equality_filters(&mut q, table, filters);
    parts.extend(live_filter(table, false));
    q.sql = format!(
        "SELECT {} FROM {}{}{}",
        select_column_list(table),
        qualified_table(table),
        where_clause(&parts),
        order_by_pk(table)
    );
    q
}

/// One page of live rows ordered by pk.
pub fn select_page(table: &ResolvedTable, limit: u32, offset: u64) -> QueryBuf {
    let mut q = QueryBuf::new();
    let parts: Vec<String> = live_filter(table, false).into_iter().collect();
    q.sql = format!(
        "SELECT {} FROM {}{} ORDER BY {} LIMIT {} OFFSET {}",
        select_column_list(table),
        qualified_table(table),
        where_clause(&parts),
        quoted(&table.pk),
        limit,
        offset
    );
    q
}

/// COUNT(*) of live rows, paired with `select_page`.
pub fn count(table: &ResolvedTable) -> QueryBuf {
    let mut q = QueryBuf::new();
    let parts: Vec<String> = live_filter(table, false).into_iter().collect();
    q.sql = format!(
        "SELECT COUNT(*) AS total FROM {}{}",
        qualified_table(table),
        where_clause(&parts)
    );
    q
}

/// INSERT the entries of `data` that name a column. The pk is only written when provided,
/// and omitted columns keep their database default.
pub fn insert(table: &ResolvedTable, data: &Map<String, Value>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut cols = Vec::new();
    let mut placeholders = Vec::new();
    for c in &table.columns {
        let Some(val) = data.get(&c.name) else { continue };
        if c.name == table.pk && val.is_null() {
            continue;
        }
        let ph = q.push_param(table, &c.name, val.clone());
        cols.push(quoted(&c.name));
        placeholders.push(ph);
    }
    let returning = select_column_list(table);
    q.sql = if cols.is_empty() {
        format!(
            "INSERT INTO {} DEFAULT VALUES RETURNING {}",
            qualified_table(table),
            returning
        )
    } else {
        format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
            qualified_table(table),
            cols.join(", "),
            placeholders.join(", "),
            returning
        )
    };
    q
}

/// UPDATE by pk: SET only columns present in `data`. Touches `updated_at` when the table has it.
/// With nothing to set, selects the row instead.
pub fn update(table: &ResolvedTable, id: &Value, data: &Map<String, Value>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut sets = Vec::new();
    for c in &table.columns {
        if c.name == table.pk || c.name == "updated_at" {
            continue;
        }
        let Some(val) = data.get(&c.name) else { continue };
        let ph = q.push_param(table, &c.name, val.clone());
        sets.push(format!("{} = {}", quoted(&c.name), ph));
    }
    let returning = select_column_list(table);
    if sets.is_empty() {
        let ph = q.push_param(table, &table.pk, id.clone());
        q.sql = format!(
            "SELECT {} FROM {} WHERE {} = {}",
            returning,
            qualified_table(table),
            quoted(&table.pk),
            ph
        );
        return q;
    }
    if table.has_column("updated_at") {
        sets.push(format!("{} = NOW()", quoted("updated_at")));
    }
    let ph = q.push_param(table, &table.pk, id.clone());
    q.sql = format!(
        "UPDATE {} SET {} WHERE {} = {} RETURNING {}",
        qualified_table(table),
        sets.join(", "),
        quoted(&table.pk),
        ph,
        returning
    );
    q
}

/// DELETE by pk.
pub fn delete(table: &ResolvedTable, id: &Value) -> QueryBuf {
    let mut q = QueryBuf::new();
    let ph = q.push_param(table, &table.pk, id.clone());
    q.sql = format!(
        "DELETE FROM {} WHERE {} = {} RETURNING {}",
        qualified_table(table),
        quoted(&table.pk),
        ph,
        select_column_list(table)
    );
    q
}

/// DELETE every row matching all filters (pivot detach).
pub fn delete_where(table: &ResolvedTable, filters: &[(String, Value)]) -> QueryBuf {
    let mut q = QueryBuf::new();
    let parts = equality_filters(&mut q, table, filters);
    q.sql = format!("DELETE FROM {}{}", qualified_table(table), where_clause(&parts));
    q
}
