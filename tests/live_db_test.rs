//! Smoke tests against a live SQL Server instance.
//!
//! Prerequisites:
//!   - SQL Server on localhost:1433 with sa/YourPassword123
//!
//! The connect sequence creates the `TitiDataTest` database and its entity
//! tables on first run. All tests are `#[ignore]`d so the default suite
//! needs no server; run them with `cargo test -- --ignored`.

use titi_data::db::gateway::{execute_statement, QueryResult};
use titi_data::db::introspect::{describe_table, list_tables};
use titi_data::db::{ConnectionConfig, ConnectionManager};
use titi_data::entities::product::{self, Product};

fn test_config() -> ConnectionConfig {
    ConnectionConfig {
        server: "localhost".to_string(),
        database: "TitiDataTest".to_string(),
        username: "sa".to_string(),
        password: "YourPassword123".to_string(),
    }
}

async fn connected_manager() -> ConnectionManager {
    let mut manager = ConnectionManager::new();
    manager
        .connect(&test_config())
        .await
        .expect("live SQL Server required, see module docs");
    manager
}

#[tokio::test]
#[ignore]
async fn live_connect_bootstraps_entity_tables() {
    let mut manager = connected_manager().await;
    let session = manager.session().unwrap();

    let tables = list_tables(session).await.unwrap();
    let names: Vec<&str> = tables.iter().map(|t| t.name.as_str()).collect();
    assert!(names.contains(&"Products"));
    assert!(names.contains(&"Users"));

    let columns = describe_table(session, "Products").await.unwrap();
    assert!(columns.iter().any(|c| c.name == "id" && c.is_primary_key));
    assert!(columns.iter().any(|c| c.name == "remainingQuantity"));

    manager.disconnect();
}

#[tokio::test]
#[ignore]
async fn live_gateway_distinguishes_statement_kinds() {
    let mut manager = connected_manager().await;
    let session = manager.session().unwrap();

    let result = execute_statement(session, "SELECT * FROM Products").await.unwrap();
    assert!(matches!(result, QueryResult::Select { .. }));

    let result = execute_statement(session, "DELETE FROM Products WHERE id = 'no-such-row'")
        .await
        .unwrap();
    assert_eq!(result, QueryResult::Mutation { affected_rows: 0 });

    manager.disconnect();
}

#[tokio::test]
#[ignore]
async fn live_product_lifecycle() {
    let mut manager = connected_manager().await;
    let session = manager.session().unwrap();

    let stored = product::insert(
        session,
        Product {
            id: "live-test-1".into(),
            name: "Live Test".into(),
            imported_quantity: Some(10),
            sold_quantity: Some(4),
            ..Product::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(stored.remaining_quantity, Some(6));

    let products = product::list(session).await.unwrap();
    assert!(products.iter().any(|p| p.id == "live-test-1"));

    product::delete_by_id(session, "live-test-1").await.unwrap();
    manager.disconnect();
}
