//! FQRN/QRN normalization (spec §4.6, §6).
//!
//! `<db>.<schema>.<name>` or already-quoted `"<db>"."<schema>"."<name>"`.
//! The schema segment may itself contain dots and must be treated as one
//! segment; db and name may not contain dots.

use crate::error::{Error, ErrorKind, Result};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fqrn {
    pub db: String,
    pub schema: String,
    pub name: String,
}

impl Fqrn {
    /// Parses either `db.schema.name` or `"db"."schema"."name"` (schema may
    /// contain dots only in the quoted form, per spec §6).
    pub fn parse(input: &str) -> Result<Self> {
        if input.contains('"') {
            return Self::parse_quoted(input);
        }
        let unquoted = input.replace('"', "");
        let mut parts = unquoted.splitn(2, '.');
        let db = parts
            .next()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| Error::new(ErrorKind::UnknownRelation(input.to_string())))?;
        let rest = parts
            .next()
            .ok_or_else(|| Error::new(ErrorKind::UnknownRelation(input.to_string())))?;
        let (schema, name) = rest
            .rsplit_once('.')
            .ok_or_else(|| Error::new(ErrorKind::UnknownRelation(input.to_string())))?;
        Ok(Fqrn {
            db: db.to_string(),
            schema: schema.to_string(),
            name: name.to_string(),
        })
    }

    fn parse_quoted(input: &str) -> Result<Self> {
        let segments: Vec<&str> = input
            .trim_matches('"')
            .split("\".\"")
            .collect();
        if segments.len() != 3 {
            return Err(Error::new(ErrorKind::UnknownRelation(input.to_string())));
        }
        Ok(Fqrn {
            db: segments[0].to_string(),
            schema: segments[1].to_string(),
            name: segments[2].to_string(),
        })
    }

    /// `"db"."schema"."name"`, with every segment double-quoted.
    pub fn normalized(&self) -> String {
        format!("\"{}\".\"{}\".\"{}\"", self.db, self.schema, self.name)
    }

    /// The FQRN without the database segment: `"schema"."name"`.
    pub fn qrn(&self) -> String {
        format!("\"{}\".\"{}\"", self.schema, self.name)
    }

    /// A deterministic identifier-safe token: dots in any segment become
    /// underscores. Used to synthesize reverse foreign key names.
    pub fn path_token(&self) -> String {
        format!("{}_{}_{}", self.db, self.schema.replace('.', "_"), self.name)
    }
}

impl fmt::Display for Fqrn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.normalized())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_fqrn() {
        let f = Fqrn::parse("db.actor.person").unwrap();
        assert_eq!(f.db, "db");
        assert_eq!(f.schema, "actor");
        assert_eq!(f.name, "person");
        assert_eq!(f.normalized(), "\"db\".\"actor\".\"person\"");
    }

    #[test]
    fn parses_quoted_fqrn_with_dotted_schema() {
        let f = Fqrn::parse(r#""db"."access.role"."acces""#).unwrap();
        assert_eq!(f.schema, "access.role");
        assert_eq!(f.normalized(), r#""db"."access.role"."acces""#);
    }

    #[test]
    fn path_token_replaces_dots() {
        let f = Fqrn::parse(r#""db"."access.role"."acces""#).unwrap();
        assert_eq!(f.path_token(), "db_access_role_acces");
    }
}
