//! Relation instances (spec §3, §4.4) and the session-scoped arena that owns
//! them.
//!
//! `Relation` is a cheap, `Clone`-able handle — a shared pointer to the
//! session's arena plus a stable index — mirroring quaint's owned,
//! method-chaining builder types (`Select`, `Insert`, …) while keeping the
//! cyclic join graph itself index-based rather than reference-counted.

use crate::arena::{Arena, RelationId};
use crate::catalog::{Catalog, ForeignKeyDef, RelationMeta};
use crate::compiler::{self, CompiledQuery};
use crate::error::{Error, ErrorKind, Result};
use crate::executor::{Executor, Row};
use crate::field::{Comparator, Field};
use crate::setop::{BinOp, SetOp};
use crate::value::Value;
use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct SelectParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub order_by: Option<String>,
}

/// One relation instance: a mapping from column to [`Field`], a mapping from
/// foreign-key name to joined partner, a set-op root, and query-scoped
/// knobs (spec §3).
#[derive(Debug, Clone)]
pub struct RelationInstance {
    pub(crate) meta: Arc<RelationMeta>,
    pub(crate) fields: Vec<Field>,
    /// Parallel to `meta.fkeys`; `Some(partner)` is spec's `joined_to[fkey]`.
    pub(crate) joined_to: Vec<Option<RelationId>>,
    pub(crate) set_op: SetOp,
    pub(crate) negated: bool,
    pub(crate) only: bool,
    pub(crate) id_cast: Option<RelationId>,
    pub(crate) select_params: SelectParams,
}

impl RelationInstance {
    pub fn fresh(meta: Arc<RelationMeta>) -> Self {
        let fields = meta.fields.iter().map(|m| Field::new(m.clone())).collect();
        let joined_to = vec![None; meta.fkeys.len()];
        Self {
            meta,
            fields,
            joined_to,
            set_op: SetOp::Leaf,
            negated: false,
            only: false,
            id_cast: None,
            select_params: SelectParams::default(),
        }
    }

    pub fn meta(&self) -> &Arc<RelationMeta> {
        &self.meta
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn joined_to(&self) -> &[Option<RelationId>] {
        &self.joined_to
    }

    pub fn set_op(&self) -> SetOp {
        self.set_op
    }

    pub fn negated(&self) -> bool {
        self.negated
    }

    pub fn only(&self) -> bool {
        self.only
    }

    pub fn id_cast(&self) -> Option<RelationId> {
        self.id_cast
    }

    pub fn select_params(&self) -> &SelectParams {
        &self.select_params
    }
}

/// A session owns the arena every relation instance built from its catalog
/// lives in, plus the read-only, write-once catalog itself (spec §5: "the
/// catalog ... are shared across instances of a session ... written once at
/// schema load and thereafter read-only").
#[derive(Clone)]
pub struct Session {
    arena: Rc<RefCell<Arena>>,
    catalog: Arc<Catalog>,
}

impl Session {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self {
            arena: Rc::new(RefCell::new(Arena::new())),
            catalog,
        }
    }

    /// The catalog factory operation (spec §4.6): instantiates a fresh
    /// relation instance for the given FQRN, with all fields unset.
    pub fn relation(&self, fqrn: &str) -> Result<Relation> {
        let meta = self.catalog.get(fqrn)?;
        let instance = RelationInstance::fresh(meta);
        let id = self.arena.borrow_mut().push(instance);
        Ok(Relation {
            session: self.clone(),
            id,
        })
    }
}

/// A handle to one relation instance in a [`Session`]'s arena (spec §3, §4).
#[derive(Clone)]
pub struct Relation {
    session: Session,
    pub(crate) id: RelationId,
}

/// A handle to one foreign key slot on a relation instance (spec §4.2).
pub struct ForeignKey {
    relation: Relation,
    index: usize,
}

impl Relation {
    pub fn id(&self) -> RelationId {
        self.id
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub(crate) fn with_arena<R>(&self, f: impl FnOnce(&Arena) -> R) -> R {
        f(&self.session.arena.borrow())
    }

    pub(crate) fn with_arena_mut<R>(&self, f: impl FnOnce(&mut Arena) -> R) -> R {
        f(&mut self.session.arena.borrow_mut())
    }

    fn same_session(&self, other: &Relation) -> bool {
        Rc::ptr_eq(&self.session.arena, &other.session.arena)
    }

    pub fn fqrn(&self) -> String {
        self.with_arena(|arena| arena.get(self.id).meta.fqrn.normalized())
    }

    /// Sets a field to `value` with the default comparator (`=`, or `is` for
    /// a null value). Returns a clone of `self` so calls can be chained.
    pub fn set(&self, name: &str, value: impl Into<Value>) -> Result<Relation> {
        self.set_comp(name, value, None)
    }

    /// Sets a field to a (value, comparator) pair (spec §4.1).
    pub fn set_comp(&self, name: &str, value: impl Into<Value>, comp: Option<Comparator>) -> Result<Relation> {
        let value = value.into();
        self.with_arena_mut(|arena| -> Result<()> {
            let inst = arena.get_mut(self.id);
            let idx = inst
                .meta
                .field_position(name)
                .ok_or_else(|| Error::new(ErrorKind::UnknownAttribute(vec![name.to_string()])))?;
            inst.fields[idx].set(value, comp)
        })?;
        Ok(self.clone())
    }

    pub fn field(&self, name: &str) -> Result<Field> {
        self.with_arena(|arena| {
            let inst = arena.get(self.id);
            let idx = inst
                .meta
                .field_position(name)
                .ok_or_else(|| Error::new(ErrorKind::UnknownAttribute(vec![name.to_string()])))?;
            Ok(inst.fields[idx].clone())
        })
    }

    pub fn fkey(&self, name: &str) -> Result<ForeignKey> {
        let index = self.with_arena(|arena| {
            arena
                .get(self.id)
                .meta
                .fkey_position(name)
                .ok_or_else(|| Error::new(ErrorKind::UnknownAttribute(vec![name.to_string()])))
        })?;
        Ok(ForeignKey {
            relation: self.clone(),
            index,
        })
    }

    pub fn only(&self, flag: bool) -> Relation {
        self.with_arena_mut(|arena| arena.get_mut(self.id).only = flag);
        self.clone()
    }

    pub fn limit(&self, limit: i64) -> Relation {
        self.with_arena_mut(|arena| arena.get_mut(self.id).select_params.limit = Some(limit));
        self.clone()
    }

    pub fn offset(&self, offset: i64) -> Relation {
        self.with_arena_mut(|arena| arena.get_mut(self.id).select_params.offset = Some(offset));
        self.clone()
    }

    pub fn order_by(&self, order_by: impl Into<String>) -> Relation {
        self.with_arena_mut(|arena| arena.get_mut(self.id).select_params.order_by = Some(order_by.into()));
        self.clone()
    }

    /// Recursive `is_set()` (spec §3): any field set, any joined partner
    /// set, a non-leaf set-op root, or the instance negated.
    pub fn is_set(&self) -> bool {
        self.with_arena(|arena| is_set_rec(arena, self.id, &mut HashSet::new()))
    }

    /// Only the (value, comp) pairs that are set, by field name.
    pub fn to_dict(&self) -> Vec<(String, Value, Comparator)> {
        self.with_arena(|arena| {
            arena
                .get(self.id)
                .fields
                .iter()
                .filter(|f| f.is_set())
                .map(|f| (f.name().to_string(), f.value().cloned().unwrap(), f.comp().clone()))
                .collect()
        })
    }

    fn combine(&self, other: &Relation, op: BinOp) -> Relation {
        assert!(
            self.same_session(other),
            "cannot combine relation instances from different sessions"
        );
        let new_id = self.with_arena_mut(|arena| {
            let l = arena.get(self.id).clone();
            let mut new_inst = RelationInstance::fresh(l.meta.clone());
            for (i, f) in l.fields.iter().enumerate() {
                if f.is_set() {
                    new_inst.fields[i] = f.clone();
                }
            }
            new_inst.id_cast = l.id_cast;
            new_inst.only = l.only;
            new_inst.joined_to = l.joined_to.clone();
            new_inst.set_op = SetOp::Binary(op, self.id, other.id);
            let new_id = arena.push(new_inst);

            // Re-point any joined_to entry that referenced the old left to
            // the new duplicate, and pull in the right operand's joins too
            // (spec §4.3 cloning rule).
            let r_joined = arena.get(other.id).joined_to.clone();
            let entry = arena.get_mut(new_id);
            for slot in entry.joined_to.iter_mut() {
                if *slot == Some(self.id) {
                    *slot = Some(new_id);
                }
            }
            for (slot, r_slot) in entry.joined_to.iter_mut().zip(r_joined.iter()) {
                if slot.is_none() {
                    *slot = *r_slot;
                }
            }
            new_id
        });
        Relation {
            session: self.session.clone(),
            id: new_id,
        }
    }

    pub fn and(&self, other: &Relation) -> Relation {
        self.combine(other, BinOp::And)
    }

    pub fn or(&self, other: &Relation) -> Relation {
        self.combine(other, BinOp::Or)
    }

    pub fn and_not(&self, other: &Relation) -> Relation {
        self.combine(other, BinOp::AndNot)
    }

    /// `(L | R) - (L & R)` (spec §4.3).
    pub fn symmetric_difference(&self, other: &Relation) -> Relation {
        let union = self.or(other);
        let inter = self.and(other);
        union.and_not(&inter)
    }

    /// Whole-subtree negation (spec §4.3, §9): a new instance sharing this
    /// one's set-op root and joins, with `negated` flipped.
    pub fn negate(&self) -> Relation {
        let new_id = self.with_arena_mut(|arena| {
            let mut new_inst = arena.get(self.id).clone();
            new_inst.negated = !new_inst.negated;
            arena.push(new_inst)
        });
        Relation {
            session: self.session.clone(),
            id: new_id,
        }
    }

    /// Casts this relation into another relation type, carrying over the set
    /// (value, comp) pairs whose field names match on the target (spec §4.4
    /// design notes, §9 "Instance identity as alias"). The cast instance's
    /// alias resolves through to this instance during compilation.
    pub fn cast(&self, target_fqrn: &str) -> Result<Relation> {
        let target = self.session.relation(target_fqrn)?;
        for (name, value, comp) in self.to_dict() {
            target.set_comp(&name, value, Some(comp))?;
        }
        target.with_arena_mut(|arena| arena.get_mut(target.id).id_cast = Some(self.id));
        Ok(target)
    }

    pub fn select(&self, columns: Option<&[&str]>) -> Result<CompiledQuery> {
        self.with_arena(|arena| compiler::compile_select(arena, self.id, columns))
    }

    pub fn count(&self) -> Result<CompiledQuery> {
        self.with_arena(|arena| compiler::compile_count(arena, self.id))
    }

    pub fn update(&self, set: &[(&str, Value)], all: bool) -> Result<CompiledQuery> {
        let compiled = self.with_arena(|arena| compiler::compile_update(arena, self.id, set, all))?;
        for (name, value) in set {
            self.set(name, value.clone())?;
        }
        Ok(compiled)
    }

    pub fn delete(&self, all: bool) -> Result<CompiledQuery> {
        self.with_arena(|arena| compiler::compile_delete(arena, self.id, all))
    }

    pub fn insert(&self) -> Result<CompiledQuery> {
        self.with_arena(|arena| compiler::compile_insert(arena, self.id))
    }

    /// Executes this instance's SELECT and constructs one fresh relation
    /// instance per returned row (spec §4.7 `get()`).
    pub async fn get(&self, executor: &dyn Executor) -> Result<Vec<Relation>> {
        let compiled = self.select(None)?;
        let rows = executor.query(&compiled).await?;
        rows.into_iter().map(|row| self.instance_from_row(row)).collect()
    }

    /// Like [`Relation::get`], but requires exactly one row (spec §4.7
    /// `get_one()`, `not-a-singleton`).
    pub async fn get_one(&self, executor: &dyn Executor) -> Result<Relation> {
        let mut instances = self.get(executor).await?;
        if instances.len() != 1 {
            return Err(Error::new(ErrorKind::NotASingleton(instances.len())));
        }
        Ok(instances.remove(0))
    }

    fn instance_from_row(&self, row: Row) -> Result<Relation> {
        let fqrn = self.fqrn();
        let fresh = self.session.relation(&fqrn)?;
        for (column, value) in row {
            if fresh.with_arena(|arena| arena.get(fresh.id).meta.field_position(&column)).is_some() {
                fresh.set(&column, value)?;
            }
        }
        Ok(fresh)
    }

    /// `L ⊆ R` (spec §4.3): true iff `len(L - R) == 0`.
    pub async fn is_subset_of(&self, other: &Relation, executor: &dyn Executor) -> Result<bool> {
        let diff = self.and_not(other);
        let compiled = diff.count()?;
        Ok(executor.count(&compiled).await? == 0)
    }

    /// `L == R` (spec §4.3): true iff `L ⊆ R ∧ R ⊆ L`.
    pub async fn set_eq(&self, other: &Relation, executor: &dyn Executor) -> Result<bool> {
        Ok(self.is_subset_of(other, executor).await? && other.is_subset_of(self, executor).await?)
    }
}

impl ForeignKey {
    pub fn def(&self) -> ForeignKeyDef {
        self.relation
            .with_arena(|arena| arena.get(self.relation.id).meta.fkeys[self.index].clone())
    }

    /// Binds the far-side constraining relation instance (spec §4.2).
    pub fn set(&self, partner: &Relation) -> Result<()> {
        assert!(
            Rc::ptr_eq(&self.relation.session().arena_rc(), &partner.session().arena_rc()),
            "cannot join a relation instance from a different session"
        );
        self.relation.with_arena_mut(|arena| {
            arena.get_mut(self.relation.id).joined_to[self.index] = Some(partner.id);
        });
        Ok(())
    }

    pub fn partner(&self) -> Option<Relation> {
        let id = self
            .relation
            .with_arena(|arena| arena.get(self.relation.id).joined_to[self.index]);
        id.map(|id| Relation {
            session: self.relation.session.clone(),
            id,
        })
    }
}

impl Session {
    pub(crate) fn arena_rc(&self) -> Rc<RefCell<Arena>> {
        self.arena.clone()
    }
}

/// Recursive `is_set()`, exposed for the compiler's fkey-derived `IN (…)`
/// predicates (spec §4.5 step 5/6: "for each fkey whose constraining partner
/// `is_set()`").
pub(crate) fn instance_is_set(arena: &Arena, id: RelationId) -> bool {
    is_set_rec(arena, id, &mut HashSet::new())
}

fn is_set_rec(arena: &Arena, id: RelationId, visited: &mut HashSet<RelationId>) -> bool {
    if !visited.insert(id) {
        return false;
    }
    let inst = arena.get(id);
    if inst.negated {
        return true;
    }
    let own_fields_set = inst.fields.iter().any(|f| f.is_set());
    let joined = inst
        .joined_to
        .iter()
        .flatten()
        .any(|pid| is_set_rec(arena, *pid, visited));
    let op_nonleaf = matches!(inst.set_op, SetOp::Binary(..));
    own_fields_set || joined || op_nonleaf
}
