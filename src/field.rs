//! Per-instance column constraints (spec §4.1).

use crate::error::{Error, ErrorKind, Result};
use crate::value::Value;
use std::fmt;

/// Comparator token applied between a qualified column and its bound value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Comparator {
    Eq,
    Like,
    ILike,
    Is,
    IsNot,
    Lt,
    Gt,
    Le,
    Ge,
    Ne,
    /// Any other comparator token the caller wants to pass through verbatim
    /// (the engine does not parse SQL, per spec non-goals).
    Custom(String),
}

impl Comparator {
    fn is_null_compatible(&self) -> bool {
        matches!(self, Comparator::Is | Comparator::IsNot)
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = match self {
            Comparator::Eq => "=",
            Comparator::Like => "like",
            Comparator::ILike => "ilike",
            Comparator::Is => "is",
            Comparator::IsNot => "is not",
            Comparator::Lt => "<",
            Comparator::Gt => ">",
            Comparator::Le => "<=",
            Comparator::Ge => ">=",
            Comparator::Ne => "<>",
            Comparator::Custom(tok) => tok.as_str(),
        };
        f.write_str(token)
    }
}

impl From<&str> for Comparator {
    fn from(token: &str) -> Self {
        match token {
            "=" => Comparator::Eq,
            "like" => Comparator::Like,
            "ilike" => Comparator::ILike,
            "is" => Comparator::Is,
            "is not" => Comparator::IsNot,
            "<" => Comparator::Lt,
            ">" => Comparator::Gt,
            "<=" => Comparator::Le,
            ">=" => Comparator::Ge,
            "<>" | "!=" => Comparator::Ne,
            other => Comparator::Custom(other.to_string()),
        }
    }
}

/// Metadata flags carried over from the catalog for one column.
#[derive(Debug, Clone)]
pub struct FieldMeta {
    pub name: String,
    pub type_name: String,
    pub pkey: bool,
    pub unique: bool,
    pub notnull: bool,
}

/// A single column's constraint state on one relation instance.
///
/// Created unset when a relation instance is built; mutated by the user or
/// by verbs taking `field = value` kwargs. Never reset except by creating a
/// fresh relation instance (spec §4.1 lifecycle).
#[derive(Debug, Clone)]
pub struct Field {
    meta: FieldMeta,
    is_set: bool,
    value: Option<Value>,
    comp: Comparator,
}

impl Field {
    pub fn new(meta: FieldMeta) -> Self {
        Self {
            meta,
            is_set: false,
            value: None,
            comp: Comparator::Eq,
        }
    }

    pub fn name(&self) -> &str {
        &self.meta.name
    }

    pub fn meta(&self) -> &FieldMeta {
        &self.meta
    }

    pub fn is_set(&self) -> bool {
        self.is_set
    }

    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    pub fn comp(&self) -> &Comparator {
        &self.comp
    }

    /// Applies the (value, comparator) invariants from spec §3:
    /// - a null value requires `is` / `is not`
    /// - a non-null value with no comparator defaults to `=`
    ///
    /// Idempotent: replaces any prior (value, comp) pair atomically.
    pub fn set(&mut self, value: Value, comp: Option<Comparator>) -> Result<()> {
        let comp = match comp {
            Some(c) => c,
            None if value.is_null() => Comparator::Is,
            None => Comparator::Eq,
        };
        if value.is_null() && !comp.is_null_compatible() {
            return Err(Error::new(ErrorKind::InvalidComparator {
                comp: comp.to_string(),
                context: format!("field `{}`", self.meta.name),
            }));
        }
        self.value = Some(value);
        self.comp = comp;
        self.is_set = true;
        Ok(())
    }

    pub fn unset(&mut self) {
        self.is_set = false;
        self.value = None;
        self.comp = Comparator::Eq;
    }

    /// `r{id}."{name}" {comp} $n` for SELECT/UPDATE/DELETE, or bare `"{name}"`
    /// for an INSERT column list (spec §4.1).
    pub fn where_repr(&self, for_insert: bool, alias: u32, placeholder: &str) -> String {
        if for_insert {
            format!("\"{}\"", self.meta.name)
        } else {
            format!("r{}.\"{}\" {} {}", alias, self.meta.name, self.comp, placeholder)
        }
    }
}
