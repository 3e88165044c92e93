//! End-to-end result-mapping and cache scenarios (spec.md §8 "Result
//! mapping scenarios" and the L2/transactional-cache properties), driven
//! through `SqlSession` against `test_driver`'s scripted fake connection
//! rather than a real database.

use std::sync::Arc;

use sqlmapper_core::cache::CacheConfig;
use sqlmapper_core::{Result, Value};
use sqlmapper_helpers::IndexMap;

use crate::config::{ConfigurationBuilder, Environment, TransactionManagerKind};
use crate::driver::RowBounds;
use crate::mapped_statement::{KeyGenerator, MappedStatement, StatementKind, StatementStrategy};
use crate::result_map::{Discriminator, ResultMap, ResultMapping};
use crate::session::{ExecutorKind, SqlSession};
use crate::test_driver::{FakeDataSource, FakeResponse};

fn row(pairs: &[(&str, Value)]) -> Value {
    let mut map = IndexMap::default();
    for (key, value) in pairs {
        map.insert((*key).to_string(), value.clone());
    }
    Value::Map(map)
}

fn select_statement(id: &str, sql: &str, result_map_id: &str) -> MappedStatement {
    MappedStatement {
        id: id.to_string(),
        kind: StatementKind::Select,
        strategy: StatementStrategy::Prepared,
        sql_source: sqlmapper_core::SqlSource::from_text(sql),
        result_map_ids: vec![result_map_id.to_string()],
        result_sets: vec![None],
        namespace_cache: None,
        key_generator: KeyGenerator::NoOp,
        flush_cache: false,
        use_cache: true,
        timeout: None,
        result_ordered: false,
        row_bounds: RowBounds::NO_BOUNDS,
    }
}

fn write_statement(id: &str, kind: StatementKind, sql: &str, flush_cache: bool) -> MappedStatement {
    MappedStatement {
        id: id.to_string(),
        kind,
        strategy: StatementStrategy::Prepared,
        sql_source: sqlmapper_core::SqlSource::from_text(sql),
        result_map_ids: Vec::new(),
        result_sets: Vec::new(),
        namespace_cache: None,
        key_generator: KeyGenerator::NoOp,
        flush_cache,
        use_cache: false,
        timeout: None,
        result_ordered: false,
        row_bounds: RowBounds::NO_BOUNDS,
    }
}

fn open_session(builder: ConfigurationBuilder, data_source: FakeDataSource) -> Result<SqlSession> {
    let builder = builder.environment(
        Environment {
            id: "default".to_string(),
            transaction_manager: TransactionManagerKind::Jdbc,
            data_source: Arc::new(data_source),
        },
        true,
    );
    let config = Arc::new(builder.build()?);
    SqlSession::open(config, ExecutorKind::Simple)
}

#[test]
fn scenario_1_flat_row_maps_to_object() -> Result<()> {
    let post_map = ResultMap::new(
        "postMap",
        "Post",
        vec![
            ResultMapping {
                roles: [crate::result_map::MappingRole::Id].into_iter().collect(),
                ..ResultMapping::simple("id", "post_id")
            },
            ResultMapping::simple("subject", "post_subject"),
        ],
        None,
    )?;

    let builder = ConfigurationBuilder::new()
        .register_result_map(post_map)
        .register_mapped_statement(select_statement("test.findPost", "select post_id, post_subject from post", "postMap"))?;

    let data_source = FakeDataSource::new().on(
        "select post_id, post_subject from post",
        FakeResponse::Rows(vec![row(&[("post_id", Value::Int(1)), ("post_subject", Value::from("hi"))])]),
    );

    let session = open_session(builder, data_source)?;
    let rows = session.select_list("test.findPost", Value::Null)?;
    assert_eq!(rows.len(), 1);
    let Value::Map(post) = &rows[0] else { panic!("expected a mapped object") };
    assert_eq!(post.get("id"), Some(&Value::Int(1)));
    assert_eq!(post.get("subject"), Some(&Value::from("hi")));
    Ok(())
}

#[test]
fn scenario_2_nested_collection_groups_joined_rows() -> Result<()> {
    let comment_map = ResultMap::new(
        "commentMap",
        "Comment",
        vec![
            ResultMapping {
                roles: [crate::result_map::MappingRole::Id].into_iter().collect(),
                ..ResultMapping::simple("id", "comment_id")
            },
            ResultMapping::simple("text", "comment_text"),
        ],
        None,
    )?;
    let post_map = ResultMap::new(
        "postWithCommentsMap",
        "Post",
        vec![
            ResultMapping {
                roles: [crate::result_map::MappingRole::Id].into_iter().collect(),
                ..ResultMapping::simple("id", "post_id")
            },
            ResultMapping::simple("subject", "post_subject"),
            ResultMapping {
                nested_result_map_id: Some("commentMap".to_string()),
                collection: true,
                not_null_columns: vec!["comment_id".to_string()],
                column: None,
                ..ResultMapping::simple("comments", "unused")
            },
        ],
        None,
    )?;

    let builder = ConfigurationBuilder::new()
        .register_result_map(comment_map)
        .register_result_map(post_map)
        .register_mapped_statement(select_statement("test.findPostsWithComments", "select joined", "postWithCommentsMap"))?;

    let joined_rows = vec![
        row(&[
            ("post_id", Value::Int(1)),
            ("post_subject", Value::from("a")),
            ("comment_id", Value::Int(10)),
            ("comment_text", Value::from("x")),
        ]),
        row(&[
            ("post_id", Value::Int(1)),
            ("post_subject", Value::from("a")),
            ("comment_id", Value::Int(11)),
            ("comment_text", Value::from("y")),
        ]),
        row(&[
            ("post_id", Value::Int(2)),
            ("post_subject", Value::from("b")),
            ("comment_id", Value::Int(12)),
            ("comment_text", Value::from("z")),
        ]),
    ];
    let data_source = FakeDataSource::new().on("select joined", FakeResponse::Rows(joined_rows));

    let session = open_session(builder, data_source)?;
    let rows = session.select_list("test.findPostsWithComments", Value::Null)?;
    assert_eq!(rows.len(), 2);

    let Value::Map(first) = &rows[0] else { panic!("expected object") };
    assert_eq!(first.get("id"), Some(&Value::Int(1)));
    let Some(Value::List(comments)) = first.get("comments") else { panic!("expected comment list") };
    assert_eq!(comments.len(), 2);

    let Value::Map(second) = &rows[1] else { panic!("expected object") };
    assert_eq!(second.get("id"), Some(&Value::Int(2)));
    let Some(Value::List(comments)) = second.get("comments") else { panic!("expected comment list") };
    assert_eq!(comments.len(), 1);
    Ok(())
}

#[test]
fn scenario_3_discriminator_picks_the_case_result_map() -> Result<()> {
    let draft_post_map = ResultMap::new(
        "draftPostMap",
        "DraftPost",
        vec![
            ResultMapping {
                roles: [crate::result_map::MappingRole::Id].into_iter().collect(),
                ..ResultMapping::simple("id", "post_id")
            },
            ResultMapping::simple("reason", "draft_reason"),
        ],
        None,
    )?;
    let mut cases = IndexMap::default();
    cases.insert("1".to_string(), "draftPostMap".to_string());
    let post_map = ResultMap::new(
        "postMap3",
        "Post",
        vec![ResultMapping {
            roles: [crate::result_map::MappingRole::Id].into_iter().collect(),
            ..ResultMapping::simple("id", "post_id")
        }],
        Some(Discriminator {
            column: "draft".to_string(),
            jdbc_type: None,
            cases,
        }),
    )?;

    let builder = ConfigurationBuilder::new()
        .register_result_map(draft_post_map)
        .register_result_map(post_map)
        .register_mapped_statement(select_statement("test.findEitherPost", "select either", "postMap3"))?;

    let data_source = FakeDataSource::new().on(
        "select either",
        FakeResponse::Rows(vec![
            row(&[("post_id", Value::Int(1)), ("draft", Value::Int(1)), ("draft_reason", Value::from("wip"))]),
            row(&[("post_id", Value::Int(2)), ("draft", Value::Int(0))]),
        ]),
    );

    let session = open_session(builder, data_source)?;
    let rows = session.select_list("test.findEitherPost", Value::Null)?;
    assert_eq!(rows.len(), 2);

    let Value::Map(draft) = &rows[0] else { panic!("expected object") };
    assert_eq!(draft.get("reason"), Some(&Value::from("wip")));

    let Value::Map(published) = &rows[1] else { panic!("expected object") };
    assert_eq!(published.get("reason"), None);
    Ok(())
}

#[test]
fn scenario_4_flush_cache_clears_the_namespace_entry() -> Result<()> {
    let post_map = ResultMap::new(
        "postMap4",
        "Post",
        vec![ResultMapping {
            roles: [crate::result_map::MappingRole::Id].into_iter().collect(),
            ..ResultMapping::simple("id", "post_id")
        }],
        None,
    )?;

    let builder = ConfigurationBuilder::new()
        .register_result_map(post_map)
        .register_mapped_statement(select_statement("test.cached", "select cached", "postMap4"))?
        .register_mapped_statement(write_statement("test.flush", StatementKind::Update, "update post set x = 1", true))?
        .declare_cache("test", CacheConfig::default());

    let data_source = FakeDataSource::new()
        .on("select cached", FakeResponse::Rows(vec![row(&[("post_id", Value::Int(1))])]))
        .on("update post set x = 1", FakeResponse::Update(1));

    let config = {
        let builder = builder.environment(
            Environment {
                id: "default".to_string(),
                transaction_manager: TransactionManagerKind::Jdbc,
                data_source: Arc::new(data_source),
            },
            true,
        );
        Arc::new(builder.build()?)
    };

    let populate = SqlSession::open(config.clone(), ExecutorKind::Simple)?;
    populate.select_list("test.cached", Value::Null)?;
    populate.commit()?;
    assert_eq!(config.namespace_cache("test").unwrap().size(), 1);

    let flusher = SqlSession::open(config.clone(), ExecutorKind::Simple)?;
    let mut parameter = Value::Null;
    flusher.update("test.flush", &mut parameter)?;
    flusher.commit()?;
    assert_eq!(config.namespace_cache("test").unwrap().size(), 0);
    Ok(())
}

#[test]
fn scenario_5_rolled_back_write_does_not_flush_other_sessions_view() -> Result<()> {
    let post_map = ResultMap::new(
        "postMap5",
        "Post",
        vec![ResultMapping {
            roles: [crate::result_map::MappingRole::Id].into_iter().collect(),
            ..ResultMapping::simple("id", "post_id")
        }],
        None,
    )?;

    let builder = ConfigurationBuilder::new()
        .register_result_map(post_map)
        .register_mapped_statement(select_statement("test.cached5", "select cached5", "postMap5"))?
        .register_mapped_statement(write_statement("test.insert5", StatementKind::Insert, "insert into post(x)", true))?
        .declare_cache("test", CacheConfig::default());

    let data_source = FakeDataSource::new()
        .on("select cached5", FakeResponse::Rows(vec![row(&[("post_id", Value::Int(1))])]))
        .on("insert into post(x)", FakeResponse::Update(1));

    let config = {
        let builder = builder.environment(
            Environment {
                id: "default".to_string(),
                transaction_manager: TransactionManagerKind::Jdbc,
                data_source: Arc::new(data_source),
            },
            true,
        );
        Arc::new(builder.build()?)
    };

    let populate = SqlSession::open(config.clone(), ExecutorKind::Simple)?;
    populate.select_list("test.cached5", Value::Null)?;
    populate.commit()?;
    assert_eq!(config.namespace_cache("test").unwrap().size(), 1);

    let s1 = SqlSession::open(config.clone(), ExecutorKind::Simple)?;
    let mut parameter = Value::Null;
    s1.insert("test.insert5", &mut parameter)?;
    s1.rollback()?;

    // S1's flush-cache was staged but discarded by rollback; the shared
    // namespace cache still holds the entry S2 should see.
    assert_eq!(config.namespace_cache("test").unwrap().size(), 1);
    let s2 = SqlSession::open(config, ExecutorKind::Simple)?;
    assert_eq!(s2.select_list("test.cached5", Value::Null)?.len(), 1);
    Ok(())
}

#[test]
fn scenario_6_scalar_return_shape_errors_on_multiple_rows() -> Result<()> {
    let post_map = ResultMap::new(
        "postMap6",
        "Post",
        vec![ResultMapping {
            roles: [crate::result_map::MappingRole::Id].into_iter().collect(),
            ..ResultMapping::simple("id", "post_id")
        }],
        None,
    )?;

    let builder = ConfigurationBuilder::new()
        .register_result_map(post_map)
        .register_mapped_statement(select_statement("test.zero", "select zero", "postMap6"))?
        .register_mapped_statement(select_statement("test.one", "select one", "postMap6"))?
        .register_mapped_statement(select_statement("test.many", "select many", "postMap6"))?;

    let data_source = FakeDataSource::new()
        .on("select zero", FakeResponse::Rows(Vec::new()))
        .on("select one", FakeResponse::Rows(vec![row(&[("post_id", Value::Int(1))])]))
        .on(
            "select many",
            FakeResponse::Rows(vec![row(&[("post_id", Value::Int(1))]), row(&[("post_id", Value::Int(2))])]),
        );

    let session = open_session(builder, data_source)?;
    assert_eq!(session.select_one("test.zero", Value::Null)?, Value::Null);
    assert!(matches!(session.select_one("test.one", Value::Null)?, Value::Map(_)));
    assert!(session.select_one("test.many", Value::Null).is_err());
    Ok(())
}

#[test]
fn scenario_7_cursor_streams_flat_rows_one_at_a_time() -> Result<()> {
    let post_map = ResultMap::new(
        "postMap7",
        "Post",
        vec![
            ResultMapping {
                roles: [crate::result_map::MappingRole::Id].into_iter().collect(),
                ..ResultMapping::simple("id", "post_id")
            },
            ResultMapping::simple("subject", "post_subject"),
        ],
        None,
    )?;

    let builder = ConfigurationBuilder::new()
        .register_result_map(post_map)
        .register_mapped_statement(select_statement("test.cursor", "select posts", "postMap7"))?;

    let data_source = FakeDataSource::new().on(
        "select posts",
        FakeResponse::Rows(vec![
            row(&[("post_id", Value::Int(1)), ("post_subject", Value::from("a"))]),
            row(&[("post_id", Value::Int(2)), ("post_subject", Value::from("b"))]),
            row(&[("post_id", Value::Int(3)), ("post_subject", Value::from("c"))]),
        ]),
    );

    let session = open_session(builder, data_source)?;
    let mut cursor = session.select_cursor("test.cursor", Value::Null)?;

    let first = cursor.next().expect("first row")?;
    let Value::Map(first) = first else { panic!("expected object") };
    assert_eq!(first.get("id"), Some(&Value::Int(1)));

    let second = cursor.next().expect("second row")?;
    let Value::Map(second) = second else { panic!("expected object") };
    assert_eq!(second.get("subject"), Some(&Value::from("b")));

    assert!(cursor.next().is_some());
    assert!(cursor.next().is_none());
    Ok(())
}

#[test]
fn scenario_8_cursor_over_ordered_nested_collection_flushes_on_group_boundary() -> Result<()> {
    let comment_map = ResultMap::new(
        "commentMap8",
        "Comment",
        vec![
            ResultMapping {
                roles: [crate::result_map::MappingRole::Id].into_iter().collect(),
                ..ResultMapping::simple("id", "comment_id")
            },
            ResultMapping::simple("text", "comment_text"),
        ],
        None,
    )?;
    let post_map = ResultMap::new(
        "postWithCommentsMap8",
        "Post",
        vec![
            ResultMapping {
                roles: [crate::result_map::MappingRole::Id].into_iter().collect(),
                ..ResultMapping::simple("id", "post_id")
            },
            ResultMapping::simple("subject", "post_subject"),
            ResultMapping {
                nested_result_map_id: Some("commentMap8".to_string()),
                collection: true,
                not_null_columns: vec!["comment_id".to_string()],
                column: None,
                ..ResultMapping::simple("comments", "unused")
            },
        ],
        None,
    )?;

    let builder = ConfigurationBuilder::new()
        .register_result_map(comment_map)
        .register_result_map(post_map)
        .register_mapped_statement(MappedStatement {
            result_ordered: true,
            ..select_statement("test.cursorNested", "select joined", "postWithCommentsMap8")
        })?;

    let joined_rows = vec![
        row(&[
            ("post_id", Value::Int(1)),
            ("post_subject", Value::from("a")),
            ("comment_id", Value::Int(10)),
            ("comment_text", Value::from("x")),
        ]),
        row(&[
            ("post_id", Value::Int(1)),
            ("post_subject", Value::from("a")),
            ("comment_id", Value::Int(11)),
            ("comment_text", Value::from("y")),
        ]),
        row(&[
            ("post_id", Value::Int(2)),
            ("post_subject", Value::from("b")),
            ("comment_id", Value::Int(12)),
            ("comment_text", Value::from("z")),
        ]),
    ];
    let data_source = FakeDataSource::new().on("select joined", FakeResponse::Rows(joined_rows));

    let session = open_session(builder, data_source)?;
    let mut cursor = session.select_cursor("test.cursorNested", Value::Null)?;

    let first = cursor.next().expect("first group")?;
    let Value::Map(first) = first else { panic!("expected object") };
    assert_eq!(first.get("id"), Some(&Value::Int(1)));
    let Some(Value::List(comments)) = first.get("comments") else { panic!("expected comment list") };
    assert_eq!(comments.len(), 2);

    let second = cursor.next().expect("second group")?;
    let Value::Map(second) = second else { panic!("expected object") };
    assert_eq!(second.get("id"), Some(&Value::Int(2)));
    let Some(Value::List(comments)) = second.get("comments") else { panic!("expected comment list") };
    assert_eq!(comments.len(), 1);

    assert!(cursor.next().is_none());
    Ok(())
}

#[test]
fn scenario_9_cursor_over_unordered_nested_collection_is_rejected() -> Result<()> {
    let comment_map = ResultMap::new(
        "commentMap9",
        "Comment",
        vec![ResultMapping {
            roles: [crate::result_map::MappingRole::Id].into_iter().collect(),
            ..ResultMapping::simple("id", "comment_id")
        }],
        None,
    )?;
    let post_map = ResultMap::new(
        "postWithCommentsMap9",
        "Post",
        vec![
            ResultMapping {
                roles: [crate::result_map::MappingRole::Id].into_iter().collect(),
                ..ResultMapping::simple("id", "post_id")
            },
            ResultMapping {
                nested_result_map_id: Some("commentMap9".to_string()),
                collection: true,
                column: None,
                ..ResultMapping::simple("comments", "unused")
            },
        ],
        None,
    )?;

    let builder = ConfigurationBuilder::new()
        .register_result_map(comment_map)
        .register_result_map(post_map)
        .register_mapped_statement(select_statement("test.cursorUnordered", "select joined", "postWithCommentsMap9"))?;

    let data_source = FakeDataSource::new().on("select joined", FakeResponse::Rows(Vec::new()));
    let session = open_session(builder, data_source)?;

    assert!(session.select_cursor("test.cursorUnordered", Value::Null).is_err());
    Ok(())
}
