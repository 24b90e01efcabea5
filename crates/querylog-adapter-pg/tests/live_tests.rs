//! Tests against a running PostgreSQL server.
//!
//! Ignored by default. Run with:
//! `QUERYLOG_TEST_DATABASE_URL=postgres://... cargo test -p querylog-adapter-pg -- --ignored`

use querylog_adapter_pg::PostgresAdapter;
use querylog_core::CallContext;
use querylog_runtime::DatabaseAdapter;

async fn connect() -> PostgresAdapter {
    let url = std::env::var("QUERYLOG_TEST_DATABASE_URL")
        .expect("QUERYLOG_TEST_DATABASE_URL must be set for live tests");
    PostgresAdapter::connect(&url).await.unwrap()
}

#[tokio::test]
#[ignore = "needs a PostgreSQL server"]
async fn test_last_insert_id_ignores_earlier_sequence_use() {
    let db = connect().await;
    let ctx = CallContext::default();
    let suffix = std::process::id();
    let serial = format!("ql_serial_{}", suffix);
    let plain = format!("ql_plain_{}", suffix);

    db.execute(
        &ctx,
        &format!("CREATE TABLE {} (id BIGSERIAL PRIMARY KEY, n INT)", serial),
        &[],
    )
    .await
    .unwrap();
    db.execute(&ctx, &format!("CREATE TABLE {} (name TEXT)", plain), &[])
        .await
        .unwrap();

    let id = db
        .execute_last_insert_id(
            &ctx,
            &format!("INSERT INTO {} (n) VALUES (1) RETURNING id", serial),
            &[],
        )
        .await
        .unwrap();
    assert_eq!(id, Some(1));

    // No RETURNING and no sequence: the earlier serial value must not leak.
    let id = db
        .execute_last_insert_id(
            &ctx,
            &format!("INSERT INTO {} (name) VALUES ('x')", plain),
            &[],
        )
        .await
        .unwrap();
    assert_eq!(id, None);

    for table in [&serial, &plain] {
        db.execute(&ctx, &format!("DROP TABLE {}", table), &[])
            .await
            .unwrap();
    }
    db.close().await.unwrap();
}
