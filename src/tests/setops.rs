//! Invariants from spec §8 that don't require a live database: double
//! negation, `is_set()`, and compile determinism across clones.

use super::fixtures;
use crate::field::Comparator;

#[test]
fn double_negation_cancels_at_the_root() {
    let session = fixtures::session();
    let person = session.relation(fixtures::PERSON).unwrap();
    person.set("last_name", "Lagaffe").unwrap();

    let twice_negated = person.negate().negate();
    assert_eq!(person.select(None).unwrap(), twice_negated.select(None).unwrap());
}

#[test]
fn single_negation_wraps_in_not() {
    let session = fixtures::session();
    let person = session.relation(fixtures::PERSON).unwrap();
    person.set("last_name", "Lagaffe").unwrap();

    let negated = person.negate();
    let query = negated.select(None).unwrap();
    assert!(query.sql.contains(r#"not ((r0."last_name" = $1))"#));
}

#[test]
fn fresh_instance_is_not_set() {
    let session = fixtures::session();
    let person = session.relation(fixtures::PERSON).unwrap();
    assert!(!person.is_set());
}

#[test]
fn setting_a_field_marks_the_instance_set() {
    let session = fixtures::session();
    let person = session.relation(fixtures::PERSON).unwrap();
    person.set("last_name", "Lagaffe").unwrap();
    assert!(person.is_set());
}

#[test]
fn joining_a_partner_marks_the_instance_set_even_with_no_own_fields() {
    let session = fixtures::session();
    let a = session.relation(fixtures::PERSON).unwrap();
    let b = session.relation(fixtures::PERSON).unwrap();
    b.set("first_name", "B").unwrap();
    a.fkey("manager").unwrap().set(&b).unwrap();
    assert!(a.is_set());
}

#[test]
fn combining_an_instance_with_itself_reuses_one_from_entry() {
    let session = fixtures::session();
    let a = session.relation(fixtures::PERSON).unwrap();
    a.set_comp("last_name", "_a%", Some(Comparator::Like)).unwrap();

    // A | A must not declare the same alias twice in FROM (invalid SQL);
    // both sides of the OR render under the one r0 occurrence.
    let combined = a.or(&a);
    let query = combined.select(None).unwrap();
    assert_eq!(query.sql.matches(r#""db"."actor"."person" as r0"#).count(), 1);
    assert!(query
        .sql
        .ends_with(r#"where ((r0."last_name" like $1) or (r0."last_name" like $2))"#));
}

#[test]
fn symmetric_difference_compiles_as_and_not_of_or_and_and() {
    let session = fixtures::session();
    let a = session.relation(fixtures::PERSON).unwrap();
    a.set("first_name", "A").unwrap();
    let b = session.relation(fixtures::PERSON).unwrap();
    b.set("first_name", "B").unwrap();

    let xor = a.symmetric_difference(&b);
    let query = xor.select(None).unwrap();
    assert!(query.sql.contains(" and not "));
    assert!(query.sql.contains(" or "));
}
