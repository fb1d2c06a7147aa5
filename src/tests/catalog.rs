//! Catalog & factory tests (spec §4.2, §4.6): reverse fkey synthesis and
//! the FQRN lookup/caching contract.

use super::fixtures;
use crate::error::ErrorKind;

#[test]
fn synthesizes_a_reverse_fkey_for_every_forward_fkey() {
    let session = fixtures::session();
    let person = session.relation(fixtures::PERSON).unwrap();
    let meta = person.with_arena(|arena| arena.get(person.id()).meta().clone());

    assert!(meta.fkey_position("manager").is_some());
    assert!(meta.fkey_position("_reverse_fkey_db_actor_person_manager_id").is_some());
    assert!(meta.fkey_position("_reverse_fkey_db_actor_blog_comment_author_id").is_some());
}

#[test]
fn unknown_relation_fails_with_unknown_relation() {
    let session = fixtures::session();
    let err = session.relation(r#""db"."actor"."no_such_table""#).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::UnknownRelation(_)));
}

#[test]
fn unknown_field_fails_with_unknown_attribute() {
    let session = fixtures::session();
    let person = session.relation(fixtures::PERSON).unwrap();
    let err = person.set("not_a_field", "x").unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::UnknownAttribute(_)));
}

#[test]
fn null_value_requires_is_comparator() {
    use crate::field::Comparator;
    use crate::value::Value;

    let session = fixtures::session();
    let person = session.relation(fixtures::PERSON).unwrap();
    let err = person.set_comp("manager_id", Value::null_int32(), Some(Comparator::Eq)).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::InvalidComparator { .. }));

    person.set_comp("manager_id", Value::null_int32(), Some(Comparator::Is)).unwrap();
    assert!(person.field("manager_id").unwrap().is_set());
}
