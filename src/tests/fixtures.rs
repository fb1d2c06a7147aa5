use crate::catalog::static_provider::StaticCatalog;
use crate::catalog::Catalog;
use crate::relation::Session;
use std::sync::Arc;

pub const PERSON: &str = r#""db"."actor"."person""#;
pub const BLOG_COMMENT: &str = r#""db"."actor"."blog_comment""#;

pub fn session() -> Session {
    let provider = StaticCatalog::test_fixture();
    let catalog = Catalog::build(&provider, "db").expect("fixture catalog builds");
    Session::new(Arc::new(catalog))
}
