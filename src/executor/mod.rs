//! The executor adapter (spec §4.7): runs a [`CompiledQuery`] against a
//! driver and maps results back into row maps or instance counts.
//!
//! `Executor` is a trait rather than a concrete connection type so the
//! compiler/catalog/relation layers stay driver-agnostic; `postgres`
//! (feature `postgres-native`) is the one adapter this crate ships, mirroring
//! quaint's split between its connector trait and its per-backend impls.

#[cfg(feature = "postgres-native")]
pub mod postgres;

use crate::compiler::CompiledQuery;
use crate::error::Result;
use crate::value::Value;
use async_trait::async_trait;
use std::collections::HashMap;

/// One result row: column name to bound value, RealDict-style (spec §6).
pub type Row = HashMap<String, Value>;

/// A driver binding for compiled statements (spec §4.7).
///
/// SELECT and INSERT...RETURNING both yield rows; COUNT yields a scalar;
/// UPDATE/DELETE yield nothing. All four share one compiled-statement
/// shape (`sql` + positional `values`) so a single adapter implementation
/// covers every verb.
#[async_trait]
pub trait Executor: Send + Sync {
    async fn query(&self, compiled: &CompiledQuery) -> Result<Vec<Row>>;
    async fn count(&self, compiled: &CompiledQuery) -> Result<i64>;
    async fn insert(&self, compiled: &CompiledQuery) -> Result<Vec<Row>>;
    async fn execute(&self, compiled: &CompiledQuery) -> Result<()>;
}

/// Renders `sql` with its bound values inlined, for the diagnostic log line
/// printed on driver failure (spec §7; a `mogrify`-style echo, via
/// `tracing::error!` rather than the source's raw stderr write — see
/// `SPEC_FULL.md` §7).
pub fn describe(compiled: &CompiledQuery) -> String {
    let rendered: Vec<String> = compiled.values.iter().map(Value::to_string).collect();
    format!("{} -- [{}]", compiled.sql, rendered.join(", "))
}
