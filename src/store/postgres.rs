//! PostgreSQL store over a sqlx pool.

use super::{Page, Record, Store, Transaction};
use crate::config::ResolvedTable;
use crate::error::AppError;
use crate::sql::{self, bind_all, row_to_json, QueryBuf};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::{ConnectOptions, PgPool, Postgres, Row};
use std::str::FromStr;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        PgStore { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Unique violations surface as conflicts; everything else stays a database error.
fn map_db_err(e: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db) = &e {
        if db.code().as_deref() == Some("23505") {
            return AppError::Conflict(db.message().to_string());
        }
    }
    AppError::Db(e)
}

/// `invalid_text_representation` and `numeric_value_out_of_range`: a lookup value that
/// cannot be cast to the column type matches no row.
fn is_uncastable(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::Database(db) => matches!(db.code().as_deref(), Some("22P02") | Some("22003")),
        _ => false,
    }
}

fn log_query(q: &QueryBuf) {
    tracing::debug!(sql = %q.sql, params = ?q.params, "query");
}

#[async_trait]
impl Store for PgStore {
    async fn paginate(&self, table: &ResolvedTable, per_page: u32, page: u32) -> Result<Page, AppError> {
        let count = sql::count(table);
        log_query(&count);
        let total: i64 = bind_all(&count.sql, &count.params)
            .fetch_one(&self.pool)
            .await?
            .try_get("total")?;

        let offset = u64::from(page.saturating_sub(1)) * u64::from(per_page);
        let q = sql::select_page(table, per_page, offset);
        log_query(&q);
        let rows = bind_all(&q.sql, &q.params).fetch_all(&self.pool).await?;
        Ok(Page {
            rows: rows.iter().map(row_to_json).collect(),
            total: total.max(0) as u64,
        })
    }

    async fn find_by(
        &self,
        table: &ResolvedTable,
        column: &str,
        value: &Value,
        with_trashed: bool,
    ) -> Result<Option<Record>, AppError> {
        let q = sql::select_by_column(table, column, value, with_trashed);
        log_query(&q);
        match bind_all(&q.sql, &q.params).fetch_optional(&self.pool).await {
            Ok(row) => Ok(row.as_ref().map(row_to_json)),
            Err(e) if is_uncastable(&e) => {
                tracing::debug!(table = %table.qualified_name(), column = %column, "lookup value not castable");
                Ok(None)
            }
            Err(e) => Err(map_db_err(e)),
        }
    }

    async fn begin(&self) -> Result<Box<dyn Transaction>, AppError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgTransaction { tx }))
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").fetch_optional(&self.pool).await?;
        Ok(())
    }
}

pub struct PgTransaction {
    tx: sqlx::Transaction<'static, Postgres>,
}

#[async_trait]
impl Transaction for PgTransaction {
    async fn select_where(
        &mut self,
        table: &ResolvedTable,
        filters: &[(String, Value)],
    ) -> Result<Vec<Record>, AppError> {
        let q = sql::select_where(table, filters);
        log_query(&q);
        let rows = bind_all(&q.sql, &q.params).fetch_all(&mut *self.tx).await?;
        Ok(rows.iter().map(row_to_json).collect())
    }

    async fn insert(&mut self, table: &ResolvedTable, data: &Record) -> Result<Record, AppError> {
        let q = sql::insert(table, data);
        log_query(&q);
        let row = bind_all(&q.sql, &q.params)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(map_db_err)?;
        Ok(row_to_json(&row))
    }

    async fn update(
        &mut self,
        table: &ResolvedTable,
        id: &Value,
        data: &Record,
    ) -> Result<Option<Record>, AppError> {
        let q = sql::update(table, id, data);
        log_query(&q);
        let row = bind_all(&q.sql, &q.params)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(map_db_err)?;
        Ok(row.as_ref().map(row_to_json))
    }

    async fn delete(&mut self, table: &ResolvedTable, id: &Value) -> Result<Option<Record>, AppError> {
        let q = sql::delete(table, id);
        log_query(&q);
        let row = bind_all(&q.sql, &q.params)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(row.as_ref().map(row_to_json))
    }

    async fn delete_where(
        &mut self,
        table: &ResolvedTable,
        filters: &[(String, Value)],
    ) -> Result<u64, AppError> {
        let q = sql::delete_where(table, filters);
        log_query(&q);
        let done = bind_all(&q.sql, &q.params).execute(&mut *self.tx).await?;
        Ok(done.rows_affected())
    }

    async fn commit(self: Box<Self>) -> Result<(), AppError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), AppError> {
        self.tx.rollback().await?;
        Ok(())
    }
}

/// Ensure the database in `database_url` exists; create it if not. Connects to the
/// default `postgres` database to run CREATE DATABASE. Call before creating the main pool.
pub async fn ensure_database_exists(database_url: &str) -> Result<(), AppError> {
    let (admin_url, db_name) = parse_db_name_from_url(database_url)?;
    if db_name.is_empty() || db_name == "postgres" {
        return Ok(());
    }
    let opts = sqlx::postgres::PgConnectOptions::from_str(&admin_url)
        .map_err(|e| AppError::BadRequest(format!("invalid DATABASE_URL: {}", e)))?;
    let mut conn: sqlx::PgConnection = opts.connect().await?;
    let exists: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
        .bind(&db_name)
        .fetch_one(&mut conn)
        .await?;
    if !exists.0 {
        tracing::info!(database = %db_name, "creating database");
        sqlx::query(&format!("CREATE DATABASE \"{}\"", db_name.replace('"', "\"\"")))
            .execute(&mut conn)
            .await?;
    }
    Ok(())
}

fn parse_db_name_from_url(url: &str) -> Result<(String, String), AppError> {
    let path_start = url
        .rfind('/')
        .ok_or_else(|| AppError::BadRequest("DATABASE_URL: no path".into()))?
        + 1;
    let db_name = url
        .get(path_start..)
        .unwrap_or("")
        .split('?')
        .next()
        .unwrap_or("")
        .trim();
    let base = url.get(..path_start).unwrap_or(url);
    Ok((format!("{}postgres", base), db_name.to_string()))
}
