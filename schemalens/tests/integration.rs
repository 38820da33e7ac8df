//! Live-database tests for the PostgreSQL and MySQL adapters.
//!
//! Each test starts a throwaway server with testcontainers, creates a small
//! users/orders schema and maps it end to end.
//!
//! Prerequisites:
//! - A running Docker daemon
//!
//! Run with: `cargo test -- --ignored`

use std::sync::Arc;

use schemalens::adapter::{Adapter, MySqlAdapter, PostgresAdapter};
use schemalens::manager::AdapterManager;
use schemalens::model::{ConstraintKind, Database, ReferentialAction, TriggerEvent};
use sqlx::Connection;
use testcontainers::runners::AsyncRunner;
use testcontainers_modules::mysql::Mysql;
use testcontainers_modules::postgres::Postgres;
use tokio_postgres::NoTls;

const POSTGRES_FIXTURE: &str = r#"
CREATE TABLE users (
    id    SERIAL PRIMARY KEY,
    email VARCHAR(255) NOT NULL UNIQUE,
    age   INTEGER CHECK (age >= 0)
);
CREATE TABLE orders (
    id      SERIAL,
    user_id INTEGER NOT NULL,
    total   NUMERIC(10, 2),
    PRIMARY KEY (user_id, id),
    CONSTRAINT fk_orders_user FOREIGN KEY (user_id) REFERENCES users (id) ON DELETE CASCADE
);
CREATE INDEX idx_orders_total ON orders (total);
CREATE VIEW adult_users AS SELECT id, email FROM users WHERE age >= 18;
CREATE FUNCTION touch_order() RETURNS trigger LANGUAGE plpgsql AS $$
BEGIN
    RETURN NEW;
END;
$$;
CREATE TRIGGER orders_touch BEFORE INSERT OR UPDATE ON orders
    FOR EACH ROW EXECUTE FUNCTION touch_order();
CREATE PROCEDURE archive_orders(IN cutoff INTEGER) LANGUAGE sql AS $$
    DELETE FROM orders WHERE id < cutoff;
$$;
"#;

const MYSQL_FIXTURE: &[&str] = &[
    "CREATE TABLE users (
        id    INT AUTO_INCREMENT PRIMARY KEY,
        email VARCHAR(255) NOT NULL,
        age   INT,
        CONSTRAINT users_email_key UNIQUE (email),
        CONSTRAINT users_age_check CHECK (age >= 0)
    )",
    "CREATE TABLE orders (
        id      INT NOT NULL,
        user_id INT NOT NULL,
        total   DECIMAL(10, 2),
        PRIMARY KEY (user_id, id),
        CONSTRAINT fk_orders_user FOREIGN KEY (user_id) REFERENCES users (id) ON DELETE CASCADE
    )",
    "CREATE VIEW adult_users AS SELECT id, email FROM users WHERE age >= 18",
    "CREATE TRIGGER orders_touch BEFORE INSERT ON orders FOR EACH ROW SET NEW.total = NEW.total",
];

/// Checks shared by both engines on the users/orders fixture.
fn assert_users_orders(db: &Database, schema: &str) {
    let users = db.table(schema, "users").expect("users table mapped");
    let orders = db.table(schema, "orders").expect("orders table mapped");

    let pk = users.primary_key().expect("users has a primary key");
    let pk_columns: Vec<&str> = pk.columns().iter().map(|c| c.name()).collect();
    assert_eq!(pk_columns, vec!["id"]);
    assert!(
        Arc::ptr_eq(&pk.columns()[0], users.column("id").unwrap()),
        "PK column should be the table's own column"
    );

    let composite: Vec<&str> = orders
        .primary_key()
        .expect("orders has a primary key")
        .columns()
        .iter()
        .map(|c| c.name())
        .collect();
    assert_eq!(composite, vec!["user_id", "id"], "Catalog order is kept");

    let fk = orders
        .foreign_keys()
        .iter()
        .find(|fk| fk.name() == "fk_orders_user")
        .expect("fk_orders_user mapped");
    assert_eq!(fk.referenced_table(), "users");
    assert_eq!(fk.on_delete(), ReferentialAction::Cascade);
    assert_eq!(fk.columns()[0].name(), "user_id");
    assert_eq!(fk.referenced_columns()[0].name(), "id");
    assert!(!Arc::ptr_eq(
        &fk.referenced_columns()[0],
        users.column("id").unwrap()
    ));

    assert!(
        users
            .constraints()
            .iter()
            .any(|c| c.kind() == ConstraintKind::Check),
        "CHECK constraint mapped"
    );
    assert!(
        users
            .constraints()
            .iter()
            .any(|c| c.kind() == ConstraintKind::Unique && c.columns()[0].name() == "email"),
        "UNIQUE constraint mapped"
    );

    let view = db
        .schema(schema)
        .and_then(|s| s.views().get("adult_users"))
        .expect("view mapped");
    let view_columns: Vec<&str> = view.columns().iter().map(|c| c.name()).collect();
    assert_eq!(view_columns, vec!["id", "email"]);

    let trigger = orders
        .triggers()
        .iter()
        .find(|t| t.name() == "orders_touch")
        .expect("trigger mapped");
    assert!(trigger.events().contains(&TriggerEvent::Insert));
}

#[tokio::test]
#[ignore] // Requires Docker
async fn test_postgres_maps_fixture() {
    let node = Postgres::default()
        .start()
        .await
        .expect("Failed to start postgres container");
    let host = node.get_host().await.expect("container host");
    let port = node.get_host_port_ipv4(5432).await.expect("mapped port");
    let conn = format!("postgres://postgres:postgres@{host}:{port}/postgres");

    let (client, connection) = tokio_postgres::connect(&conn, NoTls)
        .await
        .expect("Failed to connect for setup");
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            eprintln!("Connection error: {}", e);
        }
    });
    client
        .batch_execute(POSTGRES_FIXTURE)
        .await
        .expect("Failed to create fixture");

    let mut manager = AdapterManager::new(schemalens::adapter::default_adapters());
    let adapter = manager.connect(&conn).await.expect("manager should connect");
    assert_eq!(adapter.identity().signature(), "PostgreSQL-v1");

    let mapped = adapter.map_database().await.expect("mapping should succeed");
    assert!(mapped.errors.is_empty(), "Unexpected errors: {:?}", mapped.errors);
    assert_eq!(mapped.database.name(), "postgres");
    assert_users_orders(&mapped.database, "public");

    let public = mapped.database.schema("public").unwrap();
    let orders = public.table("orders").unwrap();
    let trigger = &orders.triggers()[0];
    assert!(trigger.events().contains(&TriggerEvent::Update));
    assert_eq!(trigger.function(), Some("touch_order"), "Trigger linked to its function");
    assert!(
        orders.indexes().iter().any(|i| i.name() == "idx_orders_total" && !i.is_unique()),
        "Secondary index mapped"
    );
    assert!(public.sequences().contains_key("users_id_seq"));
    assert!(public.functions().contains_key("touch_order"));
    let procedure = public
        .procedures()
        .get("archive_orders")
        .expect("procedure mapped");
    assert_eq!(procedure.parameters()[0].name(), "cutoff");

    manager.close().await.expect("close should succeed");
    assert!(manager.active_adapter().is_none());
}

#[tokio::test]
#[ignore] // Requires Docker
async fn test_mysql_maps_fixture() {
    let node = Mysql::default()
        .start()
        .await
        .expect("Failed to start mysql container");
    let host = node.get_host().await.expect("container host");
    let port = node.get_host_port_ipv4(3306).await.expect("mapped port");
    let conn = format!("mysql://root@{host}:{port}/test");

    let mut setup = sqlx::MySqlConnection::connect(&conn)
        .await
        .expect("Failed to connect for setup");
    for statement in MYSQL_FIXTURE {
        sqlx::query(*statement)
            .execute(&mut setup)
            .await
            .expect("Failed to create fixture");
    }
    setup.close().await.ok();

    let mut adapter = MySqlAdapter::new();
    assert!(adapter.is_compatible(&conn));
    adapter.connect(&conn).await.expect("adapter should connect");

    let mapped = adapter.map_database().await.expect("mapping should succeed");
    assert!(mapped.errors.is_empty(), "Unexpected errors: {:?}", mapped.errors);
    assert_eq!(mapped.database.name(), "test");
    assert_users_orders(&mapped.database, "test");

    let users = mapped.database.table("test", "users").unwrap();
    assert!(
        users
            .constraints()
            .iter()
            .any(|c| c.kind() == ConstraintKind::NotNull && c.name() == "users_email_not_null"),
        "NOT NULL synthesized from column nullability"
    );

    adapter.close().await.expect("close should succeed");
    assert!(!adapter.is_connected());
}

#[test]
fn test_adapters_reject_each_other() {
    let pg = PostgresAdapter::new();
    let my = MySqlAdapter::new();

    assert!(pg.is_compatible("postgres://app@localhost/shop"));
    assert!(!my.is_compatible("postgres://app@localhost/shop"));
    assert!(my.is_compatible("root:pw@tcp(localhost:3306)/shop"));
    assert!(!pg.is_compatible("root:pw@tcp(localhost:3306)/shop"));
}
