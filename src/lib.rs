//! A relation-graph query-expression engine for PostgreSQL.
//!
//! Reflects a schema through a [`catalog::CatalogProvider`], builds queries
//! as constrained [`relation::Relation`] instances joined through foreign
//! keys and combined with set algebra, and compiles the whole graph down to
//! one parameterized statement (see [`compiler`]).
//!
//! ```ignore
//! use pgrel::prelude::*;
//!
//! let catalog = Catalog::build(&provider, "db")?;
//! let session = Session::new(Arc::new(catalog));
//! let person = session.relation(r#""db"."actor"."person""#)?;
//! let query = person.set("last_name", "Lagaffe")?.select(None)?;
//! assert_eq!(query.sql, r#"select distinct r0.* from "db"."actor"."person" as r0 where (r0."last_name" = $1)"#);
//! ```

pub mod arena;
pub mod catalog;
pub mod compiler;
pub mod config;
pub mod error;
pub mod executor;
pub mod field;
pub mod fqrn;
pub mod relation;
pub mod setop;
pub mod value;

#[cfg(test)]
mod tests;

pub mod prelude {
    pub use crate::arena::RelationId;
    pub use crate::catalog::{Catalog, CatalogProvider, RelationMeta};
    pub use crate::compiler::CompiledQuery;
    pub use crate::config::ConnectionConfig;
    pub use crate::error::{Error, ErrorKind, Result};
    pub use crate::executor::{Executor, Row};
    pub use crate::field::Comparator;
    pub use crate::fqrn::Fqrn;
    pub use crate::relation::{Relation, Session};
    pub use crate::value::Value;
}
