//! Worked scenarios S1, S3, S4, S5: single-table predicates, a joined
//! partner, set-algebra OR, and a constrained UPDATE, with `$N` placeholders
//! in place of `%s` (`SPEC_FULL.md` §6).

use super::fixtures;
use crate::error::ErrorKind;
use crate::field::Comparator;
use crate::value::Value;

#[test]
fn s1_single_table_where() {
    let session = fixtures::session();
    let person = session.relation(fixtures::PERSON).unwrap();
    person.set("last_name", "Lagaffe").unwrap();

    let query = person.select(None).unwrap();
    assert_eq!(
        query.sql,
        r#"select distinct r0.* from "db"."actor"."person" as r0 where (r0."last_name" = $1)"#
    );
    assert_eq!(query.values, vec![Value::text("Lagaffe")]);
}

#[test]
fn s2_like_comparator() {
    let session = fixtures::session();
    let person = session.relation(fixtures::PERSON).unwrap();
    person.set_comp("first_name", "_o__o", Some(Comparator::Like)).unwrap();

    let query = person.select(None).unwrap();
    assert!(query.sql.contains(r#"(r0."first_name" like $1)"#));
    assert_eq!(query.values, vec![Value::text("_o__o")]);
}

#[test]
fn s3_join_via_foreign_key() {
    let session = fixtures::session();
    let gaston = session.relation(fixtures::PERSON).unwrap();
    gaston.set("first_name", "Gaston").unwrap();

    let comment = session.relation(fixtures::BLOG_COMMENT).unwrap();
    comment.set_comp("content", "%m'enfin%", Some(Comparator::ILike)).unwrap();
    comment.fkey("author").unwrap().set(&gaston).unwrap();

    let query = comment.select(None).unwrap();
    assert!(query
        .sql
        .contains(r#"join "db"."actor"."person" as r1 on r1."id" = r0."author_id" and (r1."first_name" = $1)"#));
    assert!(query.sql.ends_with(r#"where (r0."content" ilike $2)"#));
    assert_eq!(query.values, vec![Value::text("Gaston"), Value::text("%m'enfin%")]);
}

#[test]
fn s4_set_algebra_or() {
    let session = fixtures::session();
    let a = session.relation(fixtures::PERSON).unwrap();
    a.set_comp("last_name", "_a%", Some(Comparator::Like)).unwrap();
    let b = session.relation(fixtures::PERSON).unwrap();
    b.set_comp("last_name", "_A%", Some(Comparator::Like)).unwrap();

    let combined = a.or(&b);
    let query = combined.select(None).unwrap();
    assert!(query.sql.contains(r#""db"."actor"."person" as r0, "db"."actor"."person" as r1"#));
    assert!(query
        .sql
        .ends_with(r#"where ((r0."last_name" like $1) or (r1."last_name" like $2))"#));
    assert_eq!(query.values, vec![Value::text("_a%"), Value::text("_A%")]);
}

#[test]
fn s5_update_with_constraint() {
    let session = fixtures::session();
    let person = session.relation(fixtures::PERSON).unwrap();
    person.set_comp("last_name", "_a%", Some(Comparator::Like)).unwrap();

    let query = person.update(&[("last_name", Value::text("X"))], false).unwrap();
    assert_eq!(
        query.sql,
        r#"update "db"."actor"."person" as r0 set "last_name" = $1 where (r0."last_name" like $2)"#
    );
    assert_eq!(query.values, vec![Value::text("X"), Value::text("_a%")]);
}

#[test]
fn s5_update_without_constraint_fails() {
    let session = fixtures::session();
    let person = session.relation(fixtures::PERSON).unwrap();
    let err = person.update(&[("last_name", Value::text("X"))], false).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::MissingWhere));
}

#[test]
fn s5_update_all_escape_hatch_bypasses_missing_where() {
    let session = fixtures::session();
    let person = session.relation(fixtures::PERSON).unwrap();
    let query = person.update(&[("last_name", Value::text("X"))], true).unwrap();
    assert_eq!(
        query.sql,
        r#"update "db"."actor"."person" as r0 set "last_name" = $1 where (1 = 1)"#
    );
}

#[test]
fn s6_cycle_terminates_with_one_join_line_per_partner() {
    let session = fixtures::session();
    let a = session.relation(fixtures::PERSON).unwrap();
    a.set("first_name", "A").unwrap();
    let b = session.relation(fixtures::PERSON).unwrap();
    b.set("first_name", "B").unwrap();
    a.fkey("manager").unwrap().set(&b).unwrap();

    let query = a.select(None).unwrap();
    assert_eq!(query.sql.matches("join \"db\".\"actor\".\"person\" as r1").count(), 1);
}

#[test]
fn mutual_self_join_terminates() {
    let session = fixtures::session();
    let a = session.relation(fixtures::PERSON).unwrap();
    a.set("first_name", "A").unwrap();
    let b = session.relation(fixtures::PERSON).unwrap();
    b.set("first_name", "B").unwrap();
    a.fkey("manager").unwrap().set(&b).unwrap();
    b.fkey("manager").unwrap().set(&a).unwrap();

    // Must return at all (invariant 7); must not re-declare r0 as a join LHS.
    let query = a.select(None).unwrap();
    assert!(!query.sql.contains("join \"db\".\"actor\".\"person\" as r0 on"));
}

#[test]
fn insert_derives_fkey_subselect_from_set_partner() {
    let session = fixtures::session();
    let gaston = session.relation(fixtures::PERSON).unwrap();
    gaston.set("first_name", "Gaston").unwrap();

    let comment = session.relation(fixtures::BLOG_COMMENT).unwrap();
    comment.set("content", "hello").unwrap();
    comment.fkey("author").unwrap().set(&gaston).unwrap();

    let query = comment.insert().unwrap();
    assert!(query.sql.starts_with(r#"insert into "db"."actor"."blog_comment" ("content") select $1"#));
    assert!(query.sql.contains(r#"("author_id") in (select r1."id" from "db"."actor"."person" as r1 where (r1."first_name" = $2))"#));
    assert!(query.sql.ends_with("returning *"));
}

#[test]
fn update_through_fkey_binds_each_partner_value_once() {
    let session = fixtures::session();
    let gaston = session.relation(fixtures::PERSON).unwrap();
    gaston.set("first_name", "Gaston").unwrap();

    let comment = session.relation(fixtures::BLOG_COMMENT).unwrap();
    comment.fkey("author").unwrap().set(&gaston).unwrap();

    let query = comment.update(&[("content", Value::text("edited"))], false).unwrap();
    assert_eq!(
        query.sql,
        r#"update "db"."actor"."blog_comment" as r0 set "content" = $1 where (1 = 1) and ("author_id") in (select r1."id" from "db"."actor"."person" as r1 where (r1."first_name" = $2))"#
    );
    assert_eq!(query.values, vec![Value::text("edited"), Value::text("Gaston")]);
}

#[test]
fn delete_through_fkey_binds_each_partner_value_once() {
    let session = fixtures::session();
    let gaston = session.relation(fixtures::PERSON).unwrap();
    gaston.set("first_name", "Gaston").unwrap();

    let comment = session.relation(fixtures::BLOG_COMMENT).unwrap();
    comment.fkey("author").unwrap().set(&gaston).unwrap();

    let query = comment.delete(false).unwrap();
    assert_eq!(
        query.sql,
        r#"delete from "db"."actor"."blog_comment" as r0 where (1 = 1) and ("author_id") in (select r1."id" from "db"."actor"."person" as r1 where (r1."first_name" = $1))"#
    );
    assert_eq!(query.values, vec![Value::text("Gaston")]);
}

#[test]
fn compile_is_deterministic() {
    let session = fixtures::session();
    let person = session.relation(fixtures::PERSON).unwrap();
    person.set("last_name", "Lagaffe").unwrap();
    let first = person.select(None).unwrap();
    let second = person.select(None).unwrap();
    assert_eq!(first, second);
}
