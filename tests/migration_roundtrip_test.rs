//! Every migration's `down` must restore the schema its `up` started from.

mod common;

use catstore::db;
use migrations::Migrator;
use sea_orm::{ConnectionTrait, DatabaseConnection, DbBackend, Statement};
use sea_orm_migration::MigratorTrait;

const HISTORY_LEN: u32 = 5;

/// Tables with their columns, foreign keys and indexes, in a stable order.
#[derive(Debug, PartialEq, Eq)]
struct TableShape {
    name: String,
    columns: Vec<(String, String, bool, bool)>,
    foreign_keys: Vec<(String, String, String, String)>,
    indexes: Vec<(bool, Vec<String>)>,
}

async fn rows(db: &DatabaseConnection, sql: String) -> Vec<sea_orm::QueryResult> {
    db.query_all(Statement::from_string(DbBackend::Sqlite, sql))
        .await
        .expect("schema query")
}

async fn snapshot(db: &DatabaseConnection) -> Vec<TableShape> {
    let tables = rows(
        db,
        "SELECT name FROM sqlite_master WHERE type = 'table' \
         AND name NOT LIKE 'sqlite_%' AND name != 'seaql_migrations' ORDER BY name"
            .to_string(),
    )
    .await;

    let mut shapes = Vec::new();
    for table in tables {
        let name: String = table.try_get("", "name").unwrap();

        let mut columns: Vec<_> = rows(db, format!("PRAGMA table_info(\"{name}\")"))
            .await
            .iter()
            .map(|c| {
                (
                    c.try_get::<String>("", "name").unwrap(),
                    c.try_get::<String>("", "type").unwrap().to_lowercase(),
                    c.try_get::<i32>("", "notnull").unwrap() != 0,
                    c.try_get::<i32>("", "pk").unwrap() != 0,
                )
            })
            .collect();
        columns.sort();

        let mut foreign_keys: Vec<_> = rows(db, format!("PRAGMA foreign_key_list(\"{name}\")"))
            .await
            .iter()
            .map(|fk| {
                (
                    fk.try_get::<String>("", "from").unwrap(),
                    fk.try_get::<String>("", "table").unwrap(),
                    fk.try_get::<String>("", "to").unwrap(),
                    fk.try_get::<String>("", "on_delete").unwrap(),
                )
            })
            .collect();
        foreign_keys.sort();

        let mut indexes = Vec::new();
        for index in rows(db, format!("PRAGMA index_list(\"{name}\")")).await {
            let index_name: String = index.try_get("", "name").unwrap();
            let unique = index.try_get::<i32>("", "unique").unwrap() != 0;
            let columns = rows(db, format!("PRAGMA index_info(\"{index_name}\")"))
                .await
                .iter()
                .map(|c| c.try_get::<String>("", "name").unwrap())
                .collect();
            indexes.push((unique, columns));
        }
        indexes.sort();

        shapes.push(TableShape {
            name,
            columns,
            foreign_keys,
            indexes,
        });
    }
    shapes
}

#[tokio::test]
async fn each_step_rolls_back_to_the_previous_schema() {
    let db = db::establish_connection("sqlite::memory:").await.unwrap();
    let mut before = snapshot(&db).await;
    assert!(before.is_empty());

    for step in 1..=HISTORY_LEN {
        Migrator::up(&db, Some(1)).await.unwrap();
        let after = snapshot(&db).await;
        assert_ne!(after, before, "step {step} changed nothing");

        Migrator::down(&db, Some(1)).await.unwrap();
        assert_eq!(snapshot(&db).await, before, "step {step} did not roll back cleanly");

        Migrator::up(&db, Some(1)).await.unwrap();
        assert_eq!(snapshot(&db).await, after, "step {step} is not repeatable");
        before = after;
    }
}

#[tokio::test]
async fn full_history_rolls_back_to_an_empty_schema() {
    let db = common::migrated_db().await;
    let migrated = snapshot(&db).await;
    let names: Vec<&str> = migrated.iter().map(|t| t.name.as_str()).collect();
    for table in [
        "appointment",
        "cat_breed",
        "cat_info",
        "cat_order",
        "commodity",
        "commodity_order",
        "order_item",
        "purchase_order",
        "purchase_order_item",
        "roles",
        "user_roles",
        "users",
    ] {
        assert!(names.contains(&table), "missing table {table}");
    }

    db::rollback_migrations(&db, None).await.unwrap();
    assert!(snapshot(&db).await.is_empty());

    db::run_migrations(&db).await.unwrap();
    assert_eq!(snapshot(&db).await, migrated);
}

#[tokio::test]
async fn failed_breed_step_leaves_the_schema_untouched() {
    let db = db::establish_connection("sqlite::memory:").await.unwrap();
    Migrator::up(&db, Some(HISTORY_LEN - 1)).await.unwrap();
    db.execute_unprepared(
        "INSERT INTO cat_info (name, gender, cat_breed, birthday, cat_state) \
         VALUES ('橘子', 1, 5, '2023-03-01', 0)",
    )
    .await
    .unwrap();
    let before = snapshot(&db).await;

    assert!(Migrator::up(&db, Some(1)).await.is_err());

    assert_eq!(snapshot(&db).await, before);
    let applied = Migrator::get_applied_migrations(&db).await.unwrap();
    assert_eq!(applied.len() as u32, HISTORY_LEN - 1);
    let cat_info = before.iter().find(|t| t.name == "cat_info").unwrap();
    assert!(cat_info.columns.iter().any(|c| c.0 == "cat_breed"));
    assert!(!before.iter().any(|t| t.name == "cat_breed" || t.name == "appointment"));

    db.execute_unprepared("DELETE FROM cat_info").await.unwrap();
    Migrator::up(&db, Some(1)).await.unwrap();
    let applied = Migrator::get_applied_migrations(&db).await.unwrap();
    assert_eq!(applied.len() as u32, HISTORY_LEN);
}

#[tokio::test]
async fn failed_item_id_step_keeps_integer_ids() {
    let db = db::establish_connection("sqlite::memory:").await.unwrap();
    Migrator::up(&db, Some(2)).await.unwrap();
    db.execute_unprepared("PRAGMA foreign_keys = OFF").await.unwrap();
    db.execute_unprepared(
        "INSERT INTO order_item (commodity_id, quantity, order_id) VALUES (42, 1, 42)",
    )
    .await
    .unwrap();
    db.execute_unprepared("PRAGMA foreign_keys = ON").await.unwrap();
    let before = snapshot(&db).await;

    assert!(Migrator::up(&db, Some(1)).await.is_err());

    assert_eq!(snapshot(&db).await, before);
    assert_eq!(Migrator::get_applied_migrations(&db).await.unwrap().len(), 2);
    let item_ids: Vec<i64> = rows(&db, "SELECT item_id FROM order_item".to_string())
        .await
        .iter()
        .map(|r| r.try_get("", "item_id").unwrap())
        .collect();
    assert_eq!(item_ids, vec![1]);
}

#[tokio::test]
async fn money_columns_use_real_affinity_on_sqlite() {
    let db = common::migrated_db().await;
    let shapes = snapshot(&db).await;
    for (table, column) in [
        ("cat_order", "amount"),
        ("commodity_order", "total_amount"),
        ("purchase_order", "total_amount"),
    ] {
        let shape = shapes.iter().find(|t| t.name == table).unwrap();
        let (_, kind, not_null, _) = shape.columns.iter().find(|c| c.0 == column).unwrap();
        assert!(kind.starts_with("real"), "{table}.{column} is {kind}");
        assert!(not_null);
    }
}
