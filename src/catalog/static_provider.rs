//! A literal, in-memory [`CatalogProvider`] reference implementation.
//!
//! Real schema introspection against a live PostgreSQL connection is out of
//! scope for this crate (spec §1, §6); this provider exists so the engine
//! can be built and tested without one, and to document the shape a real
//! provider must produce.

use super::{CatalogProvider, RawFieldMeta, RawForeignKeyMeta, RawRelationMeta, RelationKind};
use crate::error::Result;

/// A provider backed by a fixed `Vec<RawRelationMeta>` supplied at
/// construction time.
pub struct StaticCatalog {
    relations: Vec<RawRelationMeta>,
}

impl StaticCatalog {
    pub fn new(relations: Vec<RawRelationMeta>) -> Self {
        Self { relations }
    }

    /// The `actor.person` / `actor.blog_comment` fixture used throughout this
    /// crate's test suite (spec §8 scenarios S1–S6): a self-referencing
    /// `manager` foreign key on `person`, and a `blog_comment.author` foreign
    /// key into `person`.
    pub fn test_fixture() -> Self {
        let person = RawRelationMeta {
            kind: RelationKind::Table,
            db: "db".to_string(),
            schema: "actor".to_string(),
            name: "person".to_string(),
            description: None,
            inherits: Vec::new(),
            fields: vec![
                RawFieldMeta {
                    name: "id".to_string(),
                    num: 1,
                    type_name: "int4".to_string(),
                    pkey: true,
                    unique: true,
                    notnull: true,
                },
                RawFieldMeta {
                    name: "first_name".to_string(),
                    num: 2,
                    type_name: "text".to_string(),
                    pkey: false,
                    unique: false,
                    notnull: true,
                },
                RawFieldMeta {
                    name: "last_name".to_string(),
                    num: 3,
                    type_name: "text".to_string(),
                    pkey: false,
                    unique: false,
                    notnull: true,
                },
                RawFieldMeta {
                    name: "manager_id".to_string(),
                    num: 4,
                    type_name: "int4".to_string(),
                    pkey: false,
                    unique: false,
                    notnull: false,
                },
            ],
            fkeys: vec![RawForeignKeyMeta {
                name: "manager".to_string(),
                remote_relation_fqrn: "\"db\".\"actor\".\"person\"".to_string(),
                local_field_nums: vec![4],
                remote_field_nums: vec![1],
            }],
        };

        let blog_comment = RawRelationMeta {
            kind: RelationKind::Table,
            db: "db".to_string(),
            schema: "actor".to_string(),
            name: "blog_comment".to_string(),
            description: None,
            inherits: Vec::new(),
            fields: vec![
                RawFieldMeta {
                    name: "id".to_string(),
                    num: 1,
                    type_name: "int4".to_string(),
                    pkey: true,
                    unique: true,
                    notnull: true,
                },
                RawFieldMeta {
                    name: "author_id".to_string(),
                    num: 2,
                    type_name: "int4".to_string(),
                    pkey: false,
                    unique: false,
                    notnull: true,
                },
                RawFieldMeta {
                    name: "content".to_string(),
                    num: 3,
                    type_name: "text".to_string(),
                    pkey: false,
                    unique: false,
                    notnull: false,
                },
            ],
            fkeys: vec![RawForeignKeyMeta {
                name: "author".to_string(),
                remote_relation_fqrn: "\"db\".\"actor\".\"person\"".to_string(),
                local_field_nums: vec![2],
                remote_field_nums: vec![1],
            }],
        };

        Self::new(vec![person, blog_comment])
    }
}

impl CatalogProvider for StaticCatalog {
    fn relations(&self, db: &str) -> Result<Vec<RawRelationMeta>> {
        Ok(self
            .relations
            .iter()
            .filter(|r| r.db == db)
            .cloned()
            .collect())
    }
}
