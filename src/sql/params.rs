//! Bind serde_json values to sqlx queries and read rows back as JSON objects.

use serde_json::{Map, Value};
use sqlx::postgres::{PgArguments, PgRow, Postgres};
use sqlx::query::Query;
use sqlx::{Column, Row, TypeInfo};

pub type PgQuery<'q> = Query<'q, Postgres, PgArguments>;

/// Bind one value with its natural Postgres type; placeholders carry a `::type` cast to the
/// column type, so the server converts text, numbers and booleans as needed.
pub fn bind_value<'q>(query: PgQuery<'q>, v: &Value) -> PgQuery<'q> {
    match v {
        Value::Null => query.bind(None::<String>),
        Value::Bool(b) => query.bind(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => query.bind(i),
            None => query.bind(n.as_f64()),
        },
        Value::String(s) => query.bind(s.clone()),
        Value::Array(_) | Value::Object(_) => query.bind(v.clone()),
    }
}

pub fn bind_all<'q>(sql: &'q str, params: &[Value]) -> PgQuery<'q> {
    params.iter().fold(sqlx::query(sql), bind_value)
}

pub fn row_to_json(row: &PgRow) -> Map<String, Value> {
    let mut map = Map::new();
    for col in row.columns() {
        let v = cell_to_value(row, col.ordinal(), col.type_info().name());
        map.insert(col.name().to_string(), v);
    }
    map
}

fn number<T: Into<serde_json::Number>>(v: Option<T>) -> Value {
    v.map(|n| Value::Number(n.into())).unwrap_or(Value::Null)
}

fn float(v: Option<f64>) -> Value {
    v.and_then(serde_json::Number::from_f64)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

fn string(v: Option<String>) -> Value {
    v.map(Value::String).unwrap_or(Value::Null)
}

fn cell_to_value(row: &PgRow, i: usize, type_name: &str) -> Value {
    let decoded = match type_name {
        "INT2" => row.try_get::<Option<i16>, _>(i).map(number),
        "INT4" => row.try_get::<Option<i32>, _>(i).map(number),
        "INT8" => row.try_get::<Option<i64>, _>(i).map(number),
        "FLOAT4" => row
            .try_get::<Option<f32>, _>(i)
            .map(|v| float(v.map(f64::from))),
        "FLOAT8" => row.try_get::<Option<f64>, _>(i).map(float),
        "BOOL" => row
            .try_get::<Option<bool>, _>(i)
            .map(|v| v.map(Value::Bool).unwrap_or(Value::Null)),
        "UUID" => row
            .try_get::<Option<uuid::Uuid>, _>(i)
            .map(|v| string(v.map(|u| u.to_string()))),
        "TIMESTAMPTZ" => row
            .try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(i)
            .map(|v| string(v.map(|d| d.to_rfc3339()))),
        "TIMESTAMP" => row
            .try_get::<Option<chrono::NaiveDateTime>, _>(i)
            .map(|v| string(v.map(|d| d.format("%Y-%m-%dT%H:%M:%S%.f").to_string()))),
        "DATE" => row
            .try_get::<Option<chrono::NaiveDate>, _>(i)
            .map(|v| string(v.map(|d| d.format("%Y-%m-%d").to_string()))),
        "JSON" | "JSONB" => row
            .try_get::<Option<Value>, _>(i)
            .map(|v| v.unwrap_or(Value::Null)),
        _ => row.try_get::<Option<String>, _>(i).map(string),
    };
    match decoded {
        Ok(v) => v,
        Err(e) => {
            tracing::debug!(column = i, type_name, error = %e, "undecodable column; returning null");
            Value::Null
        }
    }
}
