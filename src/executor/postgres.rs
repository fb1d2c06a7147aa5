//! The `tokio-postgres` executor (feature `postgres-native`).
//!
//! Scope is deliberately narrow (spec §1: Postgres only) — no connection
//! pooling, no prepared-statement cache, no retry policy. Those are exactly
//! the concerns quaint's `PostgreSql` connector layers on top of a bare
//! `tokio_postgres::Client`; this adapter stops at the bare client because
//! pooling/retries are out of this engine's scope (spec Non-goals).

use super::{Executor, Row};
use crate::compiler::CompiledQuery;
use crate::error::{Error, Result};
use crate::value::Value;
use async_trait::async_trait;
use postgres_types::Type;
use tokio_postgres::Client;

pub struct PostgresExecutor {
    client: Client,
}

impl PostgresExecutor {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn params(compiled: &CompiledQuery) -> Vec<&(dyn postgres_types::ToSql + Sync)> {
        compiled.values.iter().map(|v| v as &(dyn postgres_types::ToSql + Sync)).collect()
    }

    fn row_to_map(row: &tokio_postgres::Row) -> Row {
        row.columns()
            .iter()
            .enumerate()
            .map(|(i, col)| (col.name().to_string(), column_value(row, i, col.type_())))
            .collect()
    }
}

fn column_value(row: &tokio_postgres::Row, idx: usize, ty: &Type) -> Value {
    match *ty {
        Type::INT4 => row.get::<_, Option<i32>>(idx).map(Value::Int32).unwrap_or(Value::Int32(None)),
        Type::INT8 => row.get::<_, Option<i64>>(idx).map(Value::Int64).unwrap_or(Value::Int64(None)),
        Type::BOOL => row.get::<_, Option<bool>>(idx).map(Value::Boolean).unwrap_or(Value::Boolean(None)),
        Type::FLOAT4 | Type::FLOAT8 => row
            .get::<_, Option<f64>>(idx)
            .map(Value::Float)
            .unwrap_or(Value::Float(None)),
        Type::DATE => row.get::<_, Option<chrono::NaiveDate>>(idx).map(Value::Date).unwrap_or(Value::Date(None)),
        Type::TIMESTAMPTZ => row
            .get::<_, Option<chrono::DateTime<chrono::Utc>>>(idx)
            .map(Value::DateTime)
            .unwrap_or(Value::DateTime(None)),
        Type::UUID => row.get::<_, Option<uuid::Uuid>>(idx).map(Value::Uuid).unwrap_or(Value::Uuid(None)),
        Type::JSON | Type::JSONB => row
            .get::<_, Option<serde_json::Value>>(idx)
            .map(Value::Json)
            .unwrap_or(Value::Json(None)),
        _ => row.get::<_, Option<String>>(idx).map(Value::Text).unwrap_or(Value::Text(None)),
    }
}

#[async_trait]
impl Executor for PostgresExecutor {
    async fn query(&self, compiled: &CompiledQuery) -> Result<Vec<Row>> {
        let params = Self::params(compiled);
        let rows = self.client.query(&compiled.sql, &params).await.map_err(|err| {
            tracing::error!(sql = %super::describe(compiled), error = %err, "select failed");
            Error::from(err)
        })?;
        Ok(rows.iter().map(Self::row_to_map).collect())
    }

    async fn count(&self, compiled: &CompiledQuery) -> Result<i64> {
        let params = Self::params(compiled);
        let row = self.client.query_one(&compiled.sql, &params).await.map_err(|err| {
            tracing::error!(sql = %super::describe(compiled), error = %err, "count failed");
            Error::from(err)
        })?;
        Ok(row.get::<_, i64>(0))
    }

    async fn insert(&self, compiled: &CompiledQuery) -> Result<Vec<Row>> {
        let params = Self::params(compiled);
        let rows = self.client.query(&compiled.sql, &params).await.map_err(|err| {
            tracing::error!(sql = %super::describe(compiled), error = %err, "insert failed");
            Error::from(err)
        })?;
        Ok(rows.iter().map(Self::row_to_map).collect())
    }

    async fn execute(&self, compiled: &CompiledQuery) -> Result<()> {
        let params = Self::params(compiled);
        self.client.execute(&compiled.sql, &params).await.map_err(|err| {
            tracing::error!(sql = %super::describe(compiled), error = %err, "statement failed");
            Error::from(err)
        })?;
        Ok(())
    }
}
