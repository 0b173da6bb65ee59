//! Integration tests for the PostgreSQL connection
//!
//! These tests require a running PostgreSQL server.
//! They are ignored by default and can be run with:
//! ```
//! cargo test --package tablesync-driver-postgres --test connection_integration -- --ignored
//! ```
//!
//! To set up a local server for testing:
//! ```
//! docker run -d --name tablesync-pg -e POSTGRES_PASSWORD=postgres -p 5432:5432 postgres:16
//! ```

use tablesync_core::security::{TlsConfig, TlsMode};
use tablesync_core::{Connection, CredentialSet, QueryError, Value};
use tablesync_driver_postgres::{ConnectOptions, PostgresDriver};

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Credentials for the test server, overridable through TABLESYNC_TEST_* variables
fn test_credentials() -> CredentialSet {
    CredentialSet::new(
        env_or("TABLESYNC_TEST_HOST", "localhost"),
        env_or("TABLESYNC_TEST_PORT", "5432").parse().unwrap_or(5432),
        env_or("TABLESYNC_TEST_DATABASE", "postgres"),
        env_or("TABLESYNC_TEST_USER", "postgres"),
        env_or("TABLESYNC_TEST_PASSWORD", "postgres"),
    )
    .with_tls(TlsConfig {
        mode: TlsMode::Disable,
        ca_cert: None,
    })
}

#[tokio::test]
#[ignore = "requires running PostgreSQL server"]
async fn test_loan_payments_extract() {
    let conn = PostgresDriver::new()
        .connect(&test_credentials(), &ConnectOptions::default())
        .await
        .expect("failed to connect to PostgreSQL");

    conn.query("CREATE TEMP TABLE loan_payments (id integer, amount numeric(10, 2))")
        .await
        .expect("failed to create table");
    conn.query("INSERT INTO loan_payments VALUES (1, 100.00), (2, 250.50), (3, NULL)")
        .await
        .expect("failed to insert rows");

    let table = conn
        .query("SELECT * FROM \"loan_payments\"")
        .await
        .expect("query failed");

    assert_eq!(table.column_names(), vec!["id", "amount"]);
    assert_eq!(table.row_count(), 3);
    assert_eq!(
        table.column("id").unwrap().values(),
        &[Value::Int32(1), Value::Int32(2), Value::Int32(3)]
    );
    assert_eq!(
        table.column("amount").unwrap().values(),
        &[
            Value::Decimal("100.00".into()),
            Value::Decimal("250.50".into()),
            Value::Null
        ]
    );
    assert_eq!(
        table.column("amount").unwrap().data_type.as_deref(),
        Some("numeric")
    );

    conn.close().await.expect("failed to close connection");
    assert!(conn.is_closed());
}

#[tokio::test]
#[ignore = "requires running PostgreSQL server"]
async fn test_empty_result_keeps_columns() {
    let conn = PostgresDriver::new()
        .connect(&test_credentials(), &ConnectOptions::default())
        .await
        .expect("failed to connect to PostgreSQL");

    let table = conn
        .query("SELECT 1 AS id, 'x'::text AS label WHERE false")
        .await
        .expect("query failed");
    assert_eq!(table.column_names(), vec!["id", "label"]);
    assert_eq!(table.row_count(), 0);

    conn.close().await.expect("failed to close connection");
}

#[tokio::test]
#[ignore = "requires running PostgreSQL server"]
async fn test_missing_table_is_execution_failure() {
    let conn = PostgresDriver::new()
        .connect(&test_credentials(), &ConnectOptions::default())
        .await
        .expect("failed to connect to PostgreSQL");

    let err = conn
        .query("SELECT * FROM \"tablesync_no_such_table\"")
        .await
        .unwrap_err();
    match err {
        QueryError::ExecutionFailed(message) => assert!(message.contains("does not exist")),
        other => panic!("expected ExecutionFailed, got {:?}", other),
    }

    conn.close().await.expect("failed to close connection");
    let err = conn.query("SELECT 1").await.unwrap_err();
    assert!(matches!(err, QueryError::ConnectionClosed));
}

#[tokio::test]
#[ignore = "requires running PostgreSQL server"]
async fn test_money_and_interval_keep_their_meaning() {
    let conn = PostgresDriver::new()
        .connect(&test_credentials(), &ConnectOptions::default())
        .await
        .expect("failed to connect to PostgreSQL");

    let table = conn
        .query("SELECT '-1.00'::money AS fee, interval '1 day' AS grace, '10.0.0.0/24'::cidr AS net")
        .await
        .expect("query failed");

    assert_eq!(
        table.row(0).unwrap(),
        vec![
            &Value::Decimal("-1.00".into()),
            &Value::String("1 day".into()),
            &Value::String("10.0.0.0/24".into()),
        ]
    );

    let err = conn
        .query("SELECT point(1, 2) AS location")
        .await
        .unwrap_err();
    match err {
        QueryError::ExecutionFailed(message) => {
            assert!(message.contains("unsupported column type `point`"), "{}", message);
        }
        other => panic!("expected ExecutionFailed, got {:?}", other),
    }

    conn.close().await.expect("failed to close connection");
}
