//! Catalog & factory (spec §4.6): consumes metadata from the external
//! catalog provider and produces per-FQRN relation metadata with Field and
//! ForeignKey wiring, caching by FQRN.

mod provider;
pub mod static_provider;

pub use provider::{CatalogProvider, RawFieldMeta, RawForeignKeyMeta, RawRelationMeta, RelationKind};

use crate::error::{Error, ErrorKind, Result};
use crate::field::FieldMeta;
use crate::fqrn::Fqrn;
use std::collections::HashMap;
use std::sync::Arc;

/// A directed edge descriptor between two relations (spec §4.2). Shared,
/// read-only once the catalog is built.
#[derive(Debug, Clone)]
pub struct ForeignKeyDef {
    pub name: String,
    pub from_fqrn: Fqrn,
    pub to_fqrn: Fqrn,
    pub local_fields: Vec<String>,
    pub remote_fields: Vec<String>,
}

/// Per-FQRN relation metadata, cached by the catalog factory.
#[derive(Debug)]
pub struct RelationMeta {
    pub fqrn: Fqrn,
    pub kind: RelationKind,
    pub description: Option<String>,
    pub fields: Vec<FieldMeta>,
    pub field_index: HashMap<String, usize>,
    pub fkeys: Vec<ForeignKeyDef>,
    pub fkey_index: HashMap<String, usize>,
}

impl RelationMeta {
    pub fn field_position(&self, name: &str) -> Option<usize> {
        self.field_index.get(name).copied()
    }

    pub fn fkey_position(&self, name: &str) -> Option<usize> {
        self.fkey_index.get(name).copied()
    }
}

struct RelationBuilder {
    fqrn: Fqrn,
    kind: RelationKind,
    description: Option<String>,
    fields: Vec<FieldMeta>,
    fkeys: Vec<ForeignKeyDef>,
    own_fkeys: Vec<RawForeignKeyMeta>,
    inherits: Vec<Fqrn>,
}

/// Builds and caches [`RelationMeta`] for every relation a [`CatalogProvider`]
/// reports, synthesizing reverse foreign keys so the join graph is navigable
/// from either side (spec §4.2 invariant).
pub struct Catalog {
    relations: HashMap<(String, String, String), Arc<RelationMeta>>,
}

impl Catalog {
    pub fn build(provider: &dyn CatalogProvider, db: &str) -> Result<Self> {
        let raws = provider.relations(db)?;

        let mut builders: HashMap<(String, String, String), RelationBuilder> = HashMap::new();
        for raw in &raws {
            let fqrn = Fqrn {
                db: raw.db.clone(),
                schema: raw.schema.clone(),
                name: raw.name.clone(),
            };
            let mut fields: Vec<RawFieldMeta> = raw.fields.clone();
            fields.sort_by_key(|f| f.num);
            let field_metas = fields
                .into_iter()
                .map(|f| FieldMeta {
                    name: f.name,
                    type_name: f.type_name,
                    pkey: f.pkey,
                    unique: f.unique,
                    notnull: f.notnull,
                })
                .collect();
            let inherits = raw
                .inherits
                .iter()
                .map(|s| Fqrn::parse(s))
                .collect::<Result<Vec<_>>>()?;
            let key = (fqrn.db.clone(), fqrn.schema.clone(), fqrn.name.clone());
            builders.insert(
                key,
                RelationBuilder {
                    fqrn,
                    kind: raw.kind,
                    description: raw.description.clone(),
                    fields: field_metas,
                    fkeys: Vec::new(),
                    own_fkeys: raw.fkeys.clone(),
                    inherits,
                },
            );
        }

        // Forward fkeys: resolve local/remote field numbers to names using
        // each relation's own field list (numbers are scoped to the
        // declaring/remote relation, not the merged inheritance view).
        let field_names_by_fqrn: HashMap<(String, String, String), Vec<(u32, String)>> = raws
            .iter()
            .map(|raw| {
                let key = (raw.db.clone(), raw.schema.clone(), raw.name.clone());
                let names = raw.fields.iter().map(|f| (f.num, f.name.clone())).collect();
                (key, names)
            })
            .collect();

        let mut reverse_fkeys: Vec<((String, String, String), ForeignKeyDef)> = Vec::new();

        for key in builders.keys().cloned().collect::<Vec<_>>() {
            let own_fkeys = builders[&key].own_fkeys.clone();
            let from_fqrn = builders[&key].fqrn.clone();
            for raw_fk in &own_fkeys {
                let to_fqrn = Fqrn::parse(&raw_fk.remote_relation_fqrn)?;
                let to_key = (to_fqrn.db.clone(), to_fqrn.schema.clone(), to_fqrn.name.clone());
                let local_names = resolve_field_names(&field_names_by_fqrn, &key, &raw_fk.local_field_nums)?;
                let remote_names = resolve_field_names(&field_names_by_fqrn, &to_key, &raw_fk.remote_field_nums)?;

                let forward = ForeignKeyDef {
                    name: raw_fk.name.clone(),
                    from_fqrn: from_fqrn.clone(),
                    to_fqrn: to_fqrn.clone(),
                    local_fields: local_names.clone(),
                    remote_fields: remote_names.clone(),
                };

                let reverse_name = format!(
                    "_reverse_fkey_{}_{}",
                    from_fqrn.path_token(),
                    local_names.join("_")
                );
                let reverse = ForeignKeyDef {
                    name: reverse_name,
                    from_fqrn: to_fqrn.clone(),
                    to_fqrn: from_fqrn.clone(),
                    local_fields: remote_names,
                    remote_fields: local_names,
                };

                builders.get_mut(&key).unwrap().fkeys.push(forward);
                reverse_fkeys.push((to_key, reverse));
            }
        }

        for (key, reverse) in reverse_fkeys {
            if let Some(builder) = builders.get_mut(&key) {
                builder.fkeys.push(reverse);
            }
        }

        // Inheritance: parents' fields/fkeys become available on the child,
        // parent-first, child entries win on name collision.
        let mut resolved: HashMap<(String, String, String), (Vec<FieldMeta>, Vec<ForeignKeyDef>)> = HashMap::new();
        let keys: Vec<_> = builders.keys().cloned().collect();
        for key in keys {
            resolve_inheritance(&key, &builders, &mut resolved, &mut Vec::new())?;
        }

        let mut relations = HashMap::new();
        for (key, builder) in builders {
            let (fields, fkeys) = resolved.remove(&key).unwrap();
            let field_index = fields
                .iter()
                .enumerate()
                .map(|(i, f)| (f.name.clone(), i))
                .collect();
            let fkey_index = fkeys
                .iter()
                .enumerate()
                .map(|(i, f)| (f.name.clone(), i))
                .collect();
            relations.insert(
                key,
                Arc::new(RelationMeta {
                    fqrn: builder.fqrn,
                    kind: builder.kind,
                    description: builder.description,
                    fields,
                    field_index,
                    fkeys,
                    fkey_index,
                }),
            );
        }

        Ok(Catalog { relations })
    }

    pub fn get(&self, fqrn: &str) -> Result<Arc<RelationMeta>> {
        let parsed = Fqrn::parse(fqrn)?;
        let key = (parsed.db.clone(), parsed.schema.clone(), parsed.name.clone());
        self.relations
            .get(&key)
            .cloned()
            .ok_or_else(|| Error::new(ErrorKind::UnknownRelation(parsed.normalized())))
    }
}

fn resolve_field_names(
    index: &HashMap<(String, String, String), Vec<(u32, String)>>,
    key: &(String, String, String),
    nums: &[u32],
) -> Result<Vec<String>> {
    let names = index
        .get(key)
        .ok_or_else(|| Error::new(ErrorKind::UnknownRelation(format!("{}.{}.{}", key.0, key.1, key.2))))?;
    nums.iter()
        .map(|num| {
            names
                .iter()
                .find(|(n, _)| n == num)
                .map(|(_, name)| name.clone())
                .ok_or_else(|| Error::new(ErrorKind::UnknownAttribute(vec![format!("field #{num}")])))
        })
        .collect()
}

/// Depth-first, memoized resolution of a relation's effective (fields, fkeys)
/// including everything inherited from its parents, parent-first so a
/// child's own definitions win on name collision.
fn resolve_inheritance(
    key: &(String, String, String),
    builders: &HashMap<(String, String, String), RelationBuilder>,
    resolved: &mut HashMap<(String, String, String), (Vec<FieldMeta>, Vec<ForeignKeyDef>)>,
    in_progress: &mut Vec<(String, String, String)>,
) -> Result<()> {
    if resolved.contains_key(key) {
        return Ok(());
    }
    if in_progress.contains(key) {
        // Inheritance cycle; treat as having no parents rather than looping.
        return Ok(());
    }
    in_progress.push(key.clone());

    let builder = builders
        .get(key)
        .ok_or_else(|| Error::new(ErrorKind::UnknownRelation(format!("{}.{}.{}", key.0, key.1, key.2))))?;

    let mut fields = Vec::new();
    let mut fkeys = Vec::new();
    let mut field_seen = std::collections::HashSet::new();
    let mut fkey_seen = std::collections::HashSet::new();

    for parent in &builder.inherits {
        let parent_key = (parent.db.clone(), parent.schema.clone(), parent.name.clone());
        resolve_inheritance(&parent_key, builders, resolved, in_progress)?;
        if let Some((pfields, pfkeys)) = resolved.get(&parent_key) {
            for f in pfields {
                if field_seen.insert(f.name.clone()) {
                    fields.push(f.clone());
                }
            }
            for fk in pfkeys {
                if fkey_seen.insert(fk.name.clone()) {
                    fkeys.push(fk.clone());
                }
            }
        }
    }

    for f in &builder.fields {
        if field_seen.insert(f.name.clone()) {
            fields.push(f.clone());
        } else if let Some(slot) = fields.iter_mut().find(|e: &&mut FieldMeta| e.name == f.name) {
            *slot = f.clone();
        }
    }
    for fk in &builder.fkeys {
        if fkey_seen.insert(fk.name.clone()) {
            fkeys.push(fk.clone());
        } else if let Some(slot) = fkeys.iter_mut().find(|e: &&mut ForeignKeyDef| e.name == fk.name) {
            *slot = fk.clone();
        }
    }

    in_progress.pop();
    resolved.insert(key.clone(), (fields, fkeys));
    Ok(())
}
