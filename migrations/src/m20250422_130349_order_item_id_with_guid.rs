use sea_orm_migration::{prelude::*, sea_orm::DatabaseBackend};

use crate::m20250421_054537_initial_create::{
    line_item_indexes, line_item_table, ItemIdKind, ORDER_ITEM, PURCHASE_ORDER_ITEM,
};
use crate::sqlite_rebuild::{atomic, rebuild_table, same, scratch_name, TableRebuild};

#[derive(DeriveMigrationName)]
pub struct Migration;

const ITEM_TABLES: [(&str, &str); 2] = [
    (ORDER_ITEM, "commodity_order"),
    (PURCHASE_ORDER_ITEM, "purchase_order"),
];

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        atomic(manager, |step| Box::pin(change_item_ids(step, ItemIdKind::Uuid))).await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        atomic(manager, |step| {
            Box::pin(change_item_ids(step, ItemIdKind::Sequential))
        })
        .await
    }
}

async fn change_item_ids(manager: &SchemaManager<'_>, to: ItemIdKind) -> Result<(), DbErr> {
    for (table, parent) in ITEM_TABLES {
        change_item_id(manager, table, parent, to).await?;
    }
    Ok(())
}

async fn change_item_id(
    manager: &SchemaManager<'_>,
    table: &'static str,
    parent: &'static str,
    to: ItemIdKind,
) -> Result<(), DbErr> {
    match manager.get_database_backend() {
        DatabaseBackend::Sqlite => {
            // existing rows cannot keep their integer ids, they get fresh ones
            let item_id = match to {
                ItemIdKind::Uuid => "randomblob(16)".to_string(),
                ItemIdKind::Sequential => "NULL".to_string(),
            };
            rebuild_table(
                manager,
                TableRebuild {
                    table,
                    create: line_item_table(table, parent, scratch_name(table), to),
                    columns: vec![
                        ("item_id", item_id),
                        ("commodity_id", same("commodity_id")),
                        ("quantity", same("quantity")),
                        ("order_id", same("order_id")),
                    ],
                    indexes: line_item_indexes(table),
                },
            )
            .await
        }
        DatabaseBackend::Postgres => {
            let sequence = format!("{table}_item_id_seq");
            let statements = match to {
                ItemIdKind::Uuid => vec![
                    format!("ALTER TABLE \"{table}\" ALTER COLUMN \"item_id\" DROP DEFAULT"),
                    format!(
                        "ALTER TABLE \"{table}\" ALTER COLUMN \"item_id\" TYPE uuid USING gen_random_uuid()"
                    ),
                    format!("DROP SEQUENCE IF EXISTS \"{sequence}\""),
                ],
                ItemIdKind::Sequential => vec![
                    format!("CREATE SEQUENCE \"{sequence}\" OWNED BY \"{table}\".\"item_id\""),
                    format!(
                        "ALTER TABLE \"{table}\" ALTER COLUMN \"item_id\" TYPE integer USING nextval('{sequence}')"
                    ),
                    format!(
                        "ALTER TABLE \"{table}\" ALTER COLUMN \"item_id\" SET DEFAULT nextval('{sequence}')"
                    ),
                ],
            };
            let db = manager.get_connection();
            for statement in statements {
                db.execute_unprepared(&statement).await?;
            }
            Ok(())
        }
        backend => Err(DbErr::Migration(format!(
            "changing item ids is not supported on {backend:?}"
        ))),
    }
}
