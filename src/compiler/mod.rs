//! The SQL compiler (spec §4.5): turns a relation instance's set-op tree and
//! join graph into one parameterized statement.
//!
//! Aliasing, the WHERE walk, and the join walk are kept as free functions
//! over `&Arena` rather than methods on `RelationInstance`, following spec
//! §9's "per-instance query scratch state" design note: all compile-scoped
//! mutable state (the alias map, the values vector, the join cycle guard)
//! lives in [`CompileContext`], not on the instances themselves, so two
//! concurrent compiles never collide.

use crate::arena::{Arena, RelationId};
use crate::error::{Error, ErrorKind, Result};
use crate::relation::instance_is_set;
use crate::value::Value;
use std::collections::{HashMap, HashSet};

/// A compiled statement: positional `$N` placeholders (tokio-postgres; see
/// `SPEC_FULL.md` §6 for why this engine departs from the source's `%s`
/// style) and the values bound to them, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    pub sql: String,
    pub values: Vec<Value>,
}

/// Per-compile scratch state (spec §9 "Per-instance query scratch state").
struct CompileContext {
    alias_of: HashMap<RelationId, u32>,
    next_alias: u32,
    visited_joins: HashSet<(RelationId, usize)>,
    values: Vec<Value>,
}

impl CompileContext {
    fn new() -> Self {
        Self {
            alias_of: HashMap::new(),
            next_alias: 0,
            visited_joins: HashSet::new(),
            values: Vec::new(),
        }
    }

    /// Assigns (or looks up) a stable sequential alias for `id`, following
    /// `id_cast` to the pre-cast instance first — "the `id_cast` mechanism
    /// becomes 'use the pre-cast instance's assigned number'" (spec §9).
    fn alias_for(&mut self, arena: &Arena, id: RelationId) -> u32 {
        let resolved = resolve_identity(arena, id);
        if let Some(alias) = self.alias_of.get(&resolved) {
            return *alias;
        }
        let alias = self.next_alias;
        self.next_alias += 1;
        self.alias_of.insert(resolved, alias);
        alias
    }

    fn push_value(&mut self, value: Value) -> usize {
        self.values.push(value);
        self.values.len()
    }
}

fn resolve_identity(arena: &Arena, id: RelationId) -> RelationId {
    match arena.get(id).id_cast() {
        Some(orig) => resolve_identity(arena, orig),
        None => id,
    }
}

/// Pre-order (left before right) collection of the set-op tree's leaves
/// (spec §5: "SetOp tree walk is strictly pre-order"). Each distinct leaf is
/// one table occurrence in the FROM list; `Binary` nodes themselves never
/// appear in FROM, only their leaves do. The same instance can legally
/// appear twice in the tree (`A | A`); it gets one FROM occurrence, not two
/// (Postgres rejects the same alias declared twice in one FROM list), so the
/// WHERE walk simply re-renders that leaf's predicate under its one alias
/// wherever the tree repeats it.
fn collect_leaves(arena: &Arena, id: RelationId, out: &mut Vec<RelationId>) {
    use crate::setop::SetOp;
    match arena.get(id).set_op() {
        SetOp::Leaf => {
            if !out.contains(&id) {
                out.push(id);
            }
        }
        SetOp::Binary(_, l, r) => {
            collect_leaves(arena, l, out);
            collect_leaves(arena, r, out);
        }
    }
}

/// WHERE construction (spec §4.5 step 1). Recurses the set-op tree rooted at
/// `id`; each instance's own `negated` flag wraps its own subtree in
/// `not (…)`, which is what makes `--A` a no-op (double toggle) rather than
/// requiring a distinct `Not` tree node (spec §9 Open Questions).
fn walk_where(ctx: &mut CompileContext, arena: &Arena, id: RelationId) -> String {
    use crate::setop::SetOp;
    let inst = arena.get(id);
    let inner = match inst.set_op() {
        SetOp::Leaf => leaf_fragment(ctx, arena, id),
        SetOp::Binary(op, l, r) => {
            format!("({} {} {})", walk_where(ctx, arena, l), op.sql_token(), walk_where(ctx, arena, r))
        }
    };
    if arena.get(id).negated() {
        format!("not ({})", inner)
    } else {
        inner
    }
}

fn leaf_fragment(ctx: &mut CompileContext, arena: &Arena, id: RelationId) -> String {
    let inst = arena.get(id);
    let alias = ctx.alias_for(arena, id);
    let set_fields: Vec<_> = inst.fields().iter().filter(|f| f.is_set()).collect();
    if set_fields.is_empty() {
        return "(1 = 1)".to_string();
    }
    let parts: Vec<String> = set_fields
        .into_iter()
        .map(|f| {
            let n = ctx.push_value(f.value().cloned().expect("set field has a value"));
            let placeholder = format!("${}", n);
            f.where_repr(false, alias, &placeholder)
        })
        .collect();
    format!("({})", parts.join(" and "))
}

/// Join walk (spec §4.4): depth-first over `joined_to`, cycle-broken on
/// `(partner_id, fkey)` so a self-referencing fkey followed by its reverse
/// terminates (spec §8 invariant 7).
fn walk_joins(ctx: &mut CompileContext, arena: &Arena, near_id: RelationId, join_lines: &mut Vec<String>) {
    let inst = arena.get(near_id);
    let near_alias = ctx.alias_for(arena, near_id);
    for (idx, slot) in inst.joined_to().iter().enumerate() {
        let Some(partner_id) = slot else { continue };
        let partner_id = *partner_id;
        if !ctx.visited_joins.insert((partner_id, idx)) {
            continue;
        }
        // A back-edge to a table that already has an alias (another leaf, or
        // a partner reached via a different path) needs no second `join …`
        // line — that would re-declare the same alias as a join LHS, which
        // is both invalid SQL and what spec §8 invariant 6 forbids. Keep
        // walking past it so a longer cycle still terminates.
        if ctx.alias_of.contains_key(&resolve_identity(arena, partner_id)) {
            ctx.alias_for(arena, partner_id);
            walk_joins(ctx, arena, partner_id, join_lines);
            continue;
        }
        let fkey = inst.meta().fkeys[idx].clone();
        let partner_alias = ctx.alias_for(arena, partner_id);
        let on: Vec<String> = fkey
            .local_fields
            .iter()
            .zip(fkey.remote_fields.iter())
            .map(|(local, remote)| format!("r{}.\"{}\" = r{}.\"{}\"", partner_alias, remote, near_alias, local))
            .collect();
        let partner_where = walk_where(ctx, arena, partner_id);
        let partner_fqrn = arena.get(partner_id).meta().fqrn.normalized();
        join_lines.push(format!(
            "join {} as r{} on {} and {}",
            partner_fqrn,
            partner_alias,
            on.join(" and "),
            partner_where
        ));
        walk_joins(ctx, arena, partner_id, join_lines);
    }
}

/// Collapses textually-duplicate `join … as rN on …` lines (same alias, same
/// target) into one line with `and`-conjoined predicates — a diamond in the
/// join graph reaching the same partner via two fkeys (spec §4.4
/// Deduplication; spec §8 invariant 6: no alias appears twice as a join LHS).
fn dedup_joins(lines: Vec<String>) -> Vec<String> {
    let mut order = Vec::new();
    let mut predicates: HashMap<String, Vec<String>> = HashMap::new();
    for line in lines {
        let Some(split) = line.find(" on ") else {
            order.push(line.clone());
            predicates.entry(line).or_default();
            continue;
        };
        let prefix = line[..split].to_string();
        let predicate = line[split + 4..].to_string();
        if !predicates.contains_key(&prefix) {
            order.push(prefix.clone());
        }
        predicates.entry(prefix).or_default().push(predicate);
    }
    order
        .into_iter()
        .map(|prefix| match predicates.get(&prefix) {
            Some(preds) if !preds.is_empty() => format!("{} on {}", prefix, preds.join(" and ")),
            _ => prefix,
        })
        .collect()
}

fn build_from(ctx: &mut CompileContext, arena: &Arena, leaves: &[RelationId], join_lines: &[String]) -> String {
    let tables: Vec<String> = leaves
        .iter()
        .map(|&id| {
            let inst = arena.get(id);
            let alias = ctx.alias_for(arena, id);
            format!(
                "{}{} as r{}",
                if inst.only() { "only " } else { "" },
                inst.meta().fqrn.normalized(),
                alias
            )
        })
        .collect();
    if join_lines.is_empty() {
        tables.join(", ")
    } else {
        format!("{} {}", tables.join(", "), join_lines.join(" "))
    }
}

/// Root setup shared by every verb: assign leaf aliases pre-order, then walk
/// joins from every leaf depth-first (spec §5 ordering rules), collecting
/// join-derived values ahead of the root WHERE values (spec §4.5 "Binding
/// order").
fn prepare(ctx: &mut CompileContext, arena: &Arena, root_id: RelationId) -> (Vec<RelationId>, String) {
    let mut leaves = Vec::new();
    collect_leaves(arena, root_id, &mut leaves);
    for &leaf in &leaves {
        ctx.alias_for(arena, leaf);
    }
    let mut join_lines = Vec::new();
    for &leaf in &leaves {
        walk_joins(ctx, arena, leaf, &mut join_lines);
    }
    let from_clause = build_from(ctx, arena, &leaves, &dedup_joins(join_lines));
    (leaves, from_clause)
}

/// fkey-derived `(col, …) IN (select …)` predicates for every fkey whose
/// constraining partner is itself constrained (spec §4.5 step 5/6).
fn fkey_in_predicates(ctx: &mut CompileContext, arena: &Arena, inst_id: RelationId) -> Vec<String> {
    let inst = arena.get(inst_id);
    let mut out = Vec::new();
    for (idx, fkey) in inst.meta().fkeys.iter().enumerate() {
        let Some(partner_id) = inst.joined_to()[idx] else { continue };
        if !instance_is_set(arena, partner_id) {
            continue;
        }
        let partner_alias = ctx.alias_for(arena, partner_id);
        let local_cols: Vec<String> = fkey.local_fields.iter().map(|f| format!("\"{f}\"")).collect();
        let remote_cols: Vec<String> = fkey
            .remote_fields
            .iter()
            .map(|f| format!("r{}.\"{}\"", partner_alias, f))
            .collect();
        let partner_where = walk_where(ctx, arena, partner_id);
        let partner_fqrn = arena.get(partner_id).meta().fqrn.normalized();
        out.push(format!(
            "({}) in (select {} from {} as r{} where {})",
            local_cols.join(", "),
            remote_cols.join(", "),
            partner_fqrn,
            partner_alias,
            partner_where
        ));
    }
    out
}

pub fn compile_select(arena: &Arena, root_id: RelationId, columns: Option<&[&str]>) -> Result<CompiledQuery> {
    let mut ctx = CompileContext::new();
    let (leaves, from_clause) = prepare(&mut ctx, arena, root_id);
    let where_clause = walk_where(&mut ctx, arena, root_id);
    let root_alias = ctx.alias_for(arena, leaves[0]);

    let projection = match columns {
        None => format!("distinct r{root_alias}.*"),
        Some(cols) => format!(
            "distinct {}",
            cols.iter().map(|c| format!("r{}.\"{}\"", root_alias, c)).collect::<Vec<_>>().join(", ")
        ),
    };

    let mut sql = format!("select {projection} from {from_clause} where {where_clause}");
    let params = arena.get(root_id).select_params();
    if let Some(order_by) = &params.order_by {
        sql.push_str(&format!(" order by {order_by}"));
    }
    if let Some(limit) = params.limit {
        sql.push_str(&format!(" limit {limit}"));
    }
    if let Some(offset) = params.offset {
        sql.push_str(&format!(" offset {offset}"));
    }
    Ok(CompiledQuery { sql, values: ctx.values })
}

/// `count(distinct …)` needs a column list — Postgres rejects
/// `count(distinct *)` — so this uses the anchor relation's primary key
/// columns when it has any, falling back to a plain `count(*)` otherwise.
pub fn compile_count(arena: &Arena, root_id: RelationId) -> Result<CompiledQuery> {
    let mut ctx = CompileContext::new();
    let (leaves, from_clause) = prepare(&mut ctx, arena, root_id);
    let where_clause = walk_where(&mut ctx, arena, root_id);
    let root_alias = ctx.alias_for(arena, leaves[0]);

    let pkey_cols: Vec<String> = arena
        .get(leaves[0])
        .meta()
        .fields
        .iter()
        .filter(|f| f.pkey)
        .map(|f| format!("r{}.\"{}\"", root_alias, f.name))
        .collect();
    let projection = if pkey_cols.is_empty() {
        "count(*)".to_string()
    } else {
        format!("count(distinct {})", pkey_cols.join(", "))
    };

    let sql = format!("select {projection} from {from_clause} where {where_clause}");
    Ok(CompiledQuery { sql, values: ctx.values })
}

pub fn compile_insert(arena: &Arena, root_id: RelationId) -> Result<CompiledQuery> {
    let mut ctx = CompileContext::new();
    ctx.alias_for(arena, root_id);
    let inst = arena.get(root_id);

    let mut columns = Vec::new();
    let mut placeholders = Vec::new();
    for field in inst.fields().iter().filter(|f| f.is_set()) {
        columns.push(format!("\"{}\"", field.name()));
        let n = ctx.push_value(field.value().cloned().expect("set field has a value"));
        placeholders.push(format!("${n}"));
    }

    let fkey_conditions = fkey_in_predicates(&mut ctx, arena, root_id);

    let mut sql = format!(
        "insert into {} ({}) select {}",
        inst.meta().fqrn.normalized(),
        columns.join(", "),
        placeholders.join(", ")
    );
    if !fkey_conditions.is_empty() {
        sql.push_str(&format!(" where {}", fkey_conditions.join(" and ")));
    }
    sql.push_str(" returning *");
    Ok(CompiledQuery { sql, values: ctx.values })
}

/// Unlike the other verbs, UPDATE's `SET` clause is rendered before its
/// `WHERE` clause no matter what (SQL grammar leaves no choice), so its
/// values are pushed first here — ahead of the fkey/root-WHERE values — to
/// keep the bindings vector in the same order the placeholders read left to
/// right in the emitted text (spec §8 scenario S5: `bindings ('X', '_a%')`,
/// `SET` value before the `WHERE` value). This is the one verb where the
/// literal value-push order departs from the "join, then root WHERE" rule
/// spec §4.5 states for SELECT/INSERT/DELETE.
pub fn compile_update(arena: &Arena, root_id: RelationId, set: &[(&str, Value)], all: bool) -> Result<CompiledQuery> {
    let mut ctx = CompileContext::new();
    let mut leaves = Vec::new();
    collect_leaves(arena, root_id, &mut leaves);
    for &leaf in &leaves {
        ctx.alias_for(arena, leaf);
    }
    let root_alias = ctx.alias_for(arena, leaves[0]);

    let mut set_fragments = Vec::new();
    for (name, value) in set {
        let n = ctx.push_value(value.clone());
        set_fragments.push(format!("\"{name}\" = ${n}"));
    }

    // No FROM/join clause in the emitted text — the join graph's constraints
    // reach the statement only through `fkey_in_predicates`'s `IN (select …)`
    // subqueries, so the join walk itself is never run here (it would push
    // each set partner's WHERE values a second time with nothing in the text
    // to bind them to).
    let fkey_conditions = fkey_in_predicates(&mut ctx, arena, root_id);
    let where_clause = walk_where(&mut ctx, arena, root_id);

    let has_constraint = where_clause != "(1 = 1)" || !fkey_conditions.is_empty();
    if !has_constraint && !all {
        return Err(Error::new(ErrorKind::MissingWhere));
    }

    let mut predicates = vec![where_clause];
    predicates.extend(fkey_conditions);

    let sql = format!(
        "update {} as r{} set {} where {}",
        arena.get(root_id).meta().fqrn.normalized(),
        root_alias,
        set_fragments.join(", "),
        predicates.join(" and ")
    );
    Ok(CompiledQuery { sql, values: ctx.values })
}

pub fn compile_delete(arena: &Arena, root_id: RelationId, all: bool) -> Result<CompiledQuery> {
    let mut ctx = CompileContext::new();
    let mut leaves = Vec::new();
    collect_leaves(arena, root_id, &mut leaves);
    for &leaf in &leaves {
        ctx.alias_for(arena, leaf);
    }
    // No FROM/join clause in the emitted text, same reasoning as
    // `compile_update`: fkey constraints are carried solely by
    // `fkey_in_predicates`'s `IN (select …)` subqueries.
    let where_clause = walk_where(&mut ctx, arena, root_id);
    let fkey_conditions = fkey_in_predicates(&mut ctx, arena, root_id);
    let has_constraint = where_clause != "(1 = 1)" || !fkey_conditions.is_empty();
    if !has_constraint && !all {
        return Err(Error::new(ErrorKind::MissingWhere));
    }
    let root_alias = ctx.alias_for(arena, leaves[0]);

    let mut predicates = vec![where_clause];
    predicates.extend(fkey_conditions);

    let sql = format!(
        "delete from {} as r{} where {}",
        arena.get(root_id).meta().fqrn.normalized(),
        root_alias,
        predicates.join(" and ")
    );
    Ok(CompiledQuery { sql, values: ctx.values })
}
