//! Integration tests for table introspection, the schema catalog resource and
//! the health check.

use serde_json::{Value as JsonValue, json};
use sql_gate_mcp::config::PoolOptions;
use sql_gate_mcp::db::DbPool;
use sql_gate_mcp::models::{ColumnDescriptor, DescribeOutcome, Role};
use sql_gate_mcp::tools::query::{QueryInput, QueryToolHandler};
use sql_gate_mcp::tools::schema::{DescribeTableInput, PARSE_ERROR, SchemaToolHandler};
use sql_gate_mcp::tools::HealthToolHandler;
use tempfile::TempDir;

async fn setup() -> (TempDir, DbPool) {
    let dir = TempDir::new().unwrap();
    let url = format!("sqlite:{}?mode=rwc", dir.path().join("catalog.db").display());
    let pool = DbPool::connect(&url, &PoolOptions::default()).await.unwrap();

    let handler = QueryToolHandler::new(pool.clone());
    for sql in [
        "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL, age INTEGER)",
        "CREATE TABLE memberships (org TEXT, member INTEGER, PRIMARY KEY (org, member))",
    ] {
        let outcome = handler
            .query(QueryInput::new(sql).with_role(Role::Write))
            .await;
        assert!(!outcome.is_failure(), "setup failed: {outcome:?}");
    }

    (dir, pool)
}

fn column(name: &str, data_type: &str, is_nullable: &str) -> ColumnDescriptor {
    ColumnDescriptor {
        column_name: name.to_string(),
        data_type: data_type.to_string(),
        is_nullable: is_nullable.to_string(),
    }
}

async fn describe(handler: &SchemaToolHandler, payload: JsonValue) -> DescribeOutcome {
    handler.describe_table(DescribeTableInput::new(payload)).await
}

#[tokio::test]
async fn test_describe_users() {
    let (_dir, pool) = setup().await;
    let handler = SchemaToolHandler::new(pool.clone());

    let outcome = describe(&handler, json!({"schema": "public", "table": "users"})).await;
    let DescribeOutcome::Table(table) = outcome else {
        panic!("expected table, got {outcome:?}");
    };
    assert_eq!(
        table.columns,
        vec![
            column("id", "INTEGER", "YES"),
            column("name", "TEXT", "NO"),
            column("age", "INTEGER", "YES"),
        ]
    );
    assert_eq!(table.primary_key, vec!["id".to_string()]);

    pool.close().await;
}

#[tokio::test]
async fn test_composite_primary_key_in_key_order() {
    let (_dir, pool) = setup().await;
    let handler = SchemaToolHandler::new(pool.clone());

    let outcome = describe(&handler, json!({"table": "memberships"})).await;
    let DescribeOutcome::Table(table) = outcome else {
        panic!("expected table, got {outcome:?}");
    };
    assert_eq!(table.primary_key, vec!["org".to_string(), "member".to_string()]);

    pool.close().await;
}

#[tokio::test]
async fn test_malformed_payload_matches_well_formed() {
    let (_dir, pool) = setup().await;
    let handler = SchemaToolHandler::new(pool.clone());

    let expected = describe(&handler, json!({"schema": "public", "table": "users"})).await;
    assert!(!expected.is_failure());

    for payload in [
        "{\"schema\": \"public\", \"table\": \"users\"}",
        "{'schema': 'public', 'table': 'users'}",
        "{schema: public, table: users}",
        "{\"schema\": \"public\", \"table\": \"users\",}",
        "{'table': 'users'}",
    ] {
        let outcome = describe(&handler, json!(payload)).await;
        assert_eq!(outcome, expected, "payload {payload}");
    }

    pool.close().await;
}

#[tokio::test]
async fn test_disallowed_schema_is_rejected() {
    let (_dir, pool) = setup().await;
    let handler = SchemaToolHandler::new(pool.clone());

    let outcome = describe(&handler, json!({"schema": "secret", "table": "users"})).await;
    assert_eq!(
        serde_json::to_value(&outcome).unwrap(),
        json!({"error": "schema 'secret' not allowed."})
    );

    let outcome = describe(&handler, json!("{schema: secret, table: users}")).await;
    assert_eq!(outcome.error(), Some("schema 'secret' not allowed."));

    pool.close().await;
}

#[tokio::test]
async fn test_unparseable_and_invalid_payloads() {
    let (_dir, pool) = setup().await;
    let handler = SchemaToolHandler::new(pool.clone());

    assert_eq!(describe(&handler, json!("")).await.error(), Some(PARSE_ERROR));
    assert_eq!(describe(&handler, json!("users")).await.error(), Some(PARSE_ERROR));
    assert_eq!(describe(&handler, json!(["users"])).await.error(), Some(PARSE_ERROR));

    let outcome = describe(&handler, json!({"schema": "public"})).await;
    let error = outcome.error().unwrap();
    assert!(error.starts_with("invalid payload format: "), "{error}");

    pool.close().await;
}

#[tokio::test]
async fn test_missing_table_describes_as_empty() {
    let (_dir, pool) = setup().await;
    let handler = SchemaToolHandler::new(pool.clone());

    let outcome = describe(&handler, json!({"table": "ghosts"})).await;
    assert_eq!(
        serde_json::to_value(&outcome).unwrap(),
        json!({"columns": [], "primary_key": []})
    );

    pool.close().await;
}

#[tokio::test]
async fn test_public_catalog_lists_every_column() {
    let (_dir, pool) = setup().await;
    let handler = SchemaToolHandler::new(pool.clone());

    let catalog: JsonValue = serde_json::from_str(&handler.public_catalog().await.unwrap()).unwrap();
    let names: Vec<(String, String)> = catalog
        .as_array()
        .unwrap()
        .iter()
        .map(|c| {
            (
                c["table_name"].as_str().unwrap().to_string(),
                c["column_name"].as_str().unwrap().to_string(),
            )
        })
        .collect();
    assert_eq!(
        names,
        vec![
            ("memberships".to_string(), "org".to_string()),
            ("memberships".to_string(), "member".to_string()),
            ("users".to_string(), "id".to_string()),
            ("users".to_string(), "name".to_string()),
            ("users".to_string(), "age".to_string()),
        ]
    );
    assert_eq!(catalog[3]["is_nullable"], json!("NO"));

    pool.close().await;
}

#[tokio::test]
async fn test_ping_and_closed_pool() {
    let (_dir, pool) = setup().await;
    let health = HealthToolHandler::new(pool.clone());

    let status = health.ping().await.unwrap();
    assert!(status.starts_with("ok ("), "{status}");

    pool.close().await;
    assert!(health.ping().await.is_err());

    let schema = SchemaToolHandler::new(pool.clone());
    assert!(schema.public_catalog().await.is_err());
    let outcome = describe(&schema, json!({"table": "users"})).await;
    assert!(outcome.is_failure());
}
