use sea_orm_migration::{prelude::*, sea_orm::DbBackend};

#[derive(DeriveMigrationName)]
pub struct Migration;

pub(crate) const ORDER_ITEM: &str = "order_item";
pub(crate) const PURCHASE_ORDER_ITEM: &str = "purchase_order_item";

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let backend = manager.get_database_backend();
        manager
            .create_table(
                Table::create()
                    .table(CatInfo::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CatInfo::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(CatInfo::Name).string_len(10).not_null())
                    .col(ColumnDef::new(CatInfo::Gender).boolean().not_null())
                    .col(ColumnDef::new(CatInfo::CatBreed).integer().not_null())
                    .col(ColumnDef::new(CatInfo::Birthday).date().not_null())
                    .col(ColumnDef::new(CatInfo::CatState).integer().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Commodity::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Commodity::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Commodity::Brand).string_len(50).not_null())
                    .col(ColumnDef::new(Commodity::CommodityType).integer().not_null())
                    .col(ColumnDef::new(Commodity::Name).string_len(50).not_null())
                    .col(
                        ColumnDef::new(Commodity::QuantityInStock)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Commodity::Unit).string_len(10).not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CommodityOrder::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CommodityOrder::OrderId)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(CommodityOrder::CustomerPhone)
                            .string_len(11)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CommodityOrder::TransactionTime)
                            .date_time()
                            .not_null(),
                    )
                    .col(money(backend, CommodityOrder::TotalAmount))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PurchaseOrder::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PurchaseOrder::OrderId)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrder::SupplierPhone)
                            .string_len(11)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrder::TransactionTime)
                            .date_time()
                            .not_null(),
                    )
                    .col(money(backend, PurchaseOrder::TotalAmount))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CatOrder::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CatOrder::OrderId)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(CatOrder::CustomerPhone)
                            .string_len(11)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CatOrder::TransactionTime)
                            .date_time()
                            .not_null(),
                    )
                    .col(money(backend, CatOrder::Amount))
                    .col(ColumnDef::new(CatOrder::CatInfoId).integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_cat_order_cat_info_cat_info_id")
                            .from(CatOrder::Table, CatOrder::CatInfoId)
                            .to(CatInfo::Table, CatInfo::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(line_item_table(
                ORDER_ITEM,
                "commodity_order",
                Alias::new(ORDER_ITEM),
                ItemIdKind::Sequential,
            ))
            .await?;
        manager
            .create_table(line_item_table(
                PURCHASE_ORDER_ITEM,
                "purchase_order",
                Alias::new(PURCHASE_ORDER_ITEM),
                ItemIdKind::Sequential,
            ))
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("ix_cat_info_name")
                    .table(CatInfo::Table)
                    .col(CatInfo::Name)
                    .unique()
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("ix_commodity_name")
                    .table(Commodity::Table)
                    .col(Commodity::Name)
                    .unique()
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("ix_cat_order_cat_info_id")
                    .table(CatOrder::Table)
                    .col(CatOrder::CatInfoId)
                    .to_owned(),
            )
            .await?;

        for index in line_item_indexes(ORDER_ITEM)
            .into_iter()
            .chain(line_item_indexes(PURCHASE_ORDER_ITEM))
        {
            manager.create_index(index).await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for table in [ORDER_ITEM, PURCHASE_ORDER_ITEM] {
            manager
                .drop_table(Table::drop().table(Alias::new(table)).to_owned())
                .await?;
        }
        manager
            .drop_table(Table::drop().table(CatOrder::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(CatInfo::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(CommodityOrder::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PurchaseOrder::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Commodity::Table).to_owned())
            .await
    }
}

/// Two-decimal money column. SQLite stores it with REAL affinity, which caps the precision it
/// accepts at 16 digits.
fn money<T: IntoIden>(backend: DbBackend, name: T) -> ColumnDef {
    let mut column = ColumnDef::new(name);
    match backend {
        DbBackend::Sqlite => column.decimal_len(16, 2),
        _ => column.decimal_len(18, 2),
    };
    column.not_null();
    column
}

/// How a line item table keys its rows.
#[derive(Clone, Copy, Debug)]
pub(crate) enum ItemIdKind {
    /// Per-table integer sequence.
    Sequential,
    /// Globally unique identifier assigned by the application.
    Uuid,
}

/// Shape shared by `order_item` and `purchase_order_item`. `create_as` names the created table,
/// which differs from `table` when a rebuild stages the new shape under a scratch name.
pub(crate) fn line_item_table(
    table: &'static str,
    parent: &'static str,
    create_as: Alias,
    id: ItemIdKind,
) -> TableCreateStatement {
    let mut item_id = ColumnDef::new(LineItem::ItemId);
    match id {
        ItemIdKind::Sequential => {
            item_id.integer().not_null().auto_increment().primary_key();
        }
        ItemIdKind::Uuid => {
            item_id.uuid().not_null().primary_key();
        }
    }

    Table::create()
        .table(create_as)
        .if_not_exists()
        .col(&mut item_id)
        .col(ColumnDef::new(LineItem::CommodityId).integer().not_null())
        .col(ColumnDef::new(LineItem::Quantity).integer().not_null())
        .col(ColumnDef::new(LineItem::OrderId).integer().not_null())
        .foreign_key(
            ForeignKey::create()
                .name(format!("fk_{table}_{parent}_order_id"))
                .from(Alias::new(table), LineItem::OrderId)
                .to(Alias::new(parent), LineItem::OrderId)
                .on_delete(ForeignKeyAction::Cascade),
        )
        .foreign_key(
            ForeignKey::create()
                .name(format!("fk_{table}_commodity_commodity_id"))
                .from(Alias::new(table), LineItem::CommodityId)
                .to(Commodity::Table, Commodity::Id)
                .on_delete(ForeignKeyAction::Restrict),
        )
        .to_owned()
}

pub(crate) fn line_item_indexes(table: &'static str) -> Vec<IndexCreateStatement> {
    vec![
        Index::create()
            .name(format!("ix_{table}_commodity_id"))
            .table(Alias::new(table))
            .col(LineItem::CommodityId)
            .to_owned(),
        Index::create()
            .name(format!("ix_{table}_order_id"))
            .table(Alias::new(table))
            .col(LineItem::OrderId)
            .to_owned(),
    ]
}

#[derive(DeriveIden)]
enum CatInfo {
    Table,
    Id,
    Name,
    Gender,
    CatBreed,
    Birthday,
    CatState,
}

#[derive(DeriveIden)]
enum Commodity {
    Table,
    Id,
    Brand,
    CommodityType,
    Name,
    QuantityInStock,
    Unit,
}

#[derive(DeriveIden)]
enum CommodityOrder {
    Table,
    OrderId,
    CustomerPhone,
    TransactionTime,
    TotalAmount,
}

#[derive(DeriveIden)]
enum PurchaseOrder {
    Table,
    OrderId,
    SupplierPhone,
    TransactionTime,
    TotalAmount,
}

#[derive(DeriveIden)]
enum CatOrder {
    Table,
    OrderId,
    CustomerPhone,
    TransactionTime,
    Amount,
    CatInfoId,
}

#[derive(DeriveIden)]
enum LineItem {
    ItemId,
    CommodityId,
    Quantity,
    OrderId,
}
