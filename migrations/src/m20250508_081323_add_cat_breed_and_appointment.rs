use sea_orm_migration::{prelude::*, sea_orm::DatabaseBackend};

use crate::sqlite_rebuild::{atomic, rebuild_table, same, scratch_name, TableRebuild};

#[derive(DeriveMigrationName)]
pub struct Migration;

const CAT_BREED_FK: &str = "fk_cat_info_cat_breed_cat_breed_id";

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        atomic(manager, |step| Box::pin(add_breeds(step))).await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        atomic(manager, |step| Box::pin(remove_breeds(step))).await
    }
}

async fn add_breeds(manager: &SchemaManager<'_>) -> Result<(), DbErr> {
    manager
        .alter_table(
            Table::alter()
                .table(CatInfo::Table)
                .rename_column(CatInfo::CatBreed, CatInfo::CatBreedId)
                .to_owned(),
        )
        .await?;

    manager
        .create_table(
            Table::create()
                .table(Appointment::Table)
                .if_not_exists()
                .col(
                    ColumnDef::new(Appointment::Id)
                        .integer()
                        .not_null()
                        .auto_increment()
                        .primary_key(),
                )
                .col(
                    ColumnDef::new(Appointment::CustomerName)
                        .string_len(10)
                        .not_null(),
                )
                .col(
                    ColumnDef::new(Appointment::ArrivalDateTime)
                        .date_time()
                        .not_null(),
                )
                .col(ColumnDef::new(Appointment::Remark).string_len(50).null())
                .to_owned(),
        )
        .await?;

    manager
        .create_table(
            Table::create()
                .table(CatBreed::Table)
                .if_not_exists()
                .col(
                    ColumnDef::new(CatBreed::Id)
                        .integer()
                        .not_null()
                        .auto_increment()
                        .primary_key(),
                )
                .col(ColumnDef::new(CatBreed::BreedName).string_len(10).not_null())
                .col(ColumnDef::new(CatBreed::Remark).string_len(50).null())
                .to_owned(),
        )
        .await?;

    manager.create_index(cat_breed_id_index()).await?;
    manager
        .create_index(
            Index::create()
                .name("ix_cat_breed_breed_name")
                .table(CatBreed::Table)
                .col(CatBreed::BreedName)
                .unique()
                .to_owned(),
        )
        .await?;

    match manager.get_database_backend() {
        DatabaseBackend::Sqlite => rebuild_cat_info(manager, true).await,
        _ => {
            manager
                .create_foreign_key(
                    ForeignKey::create()
                        .name(CAT_BREED_FK)
                        .from(CatInfo::Table, CatInfo::CatBreedId)
                        .to(CatBreed::Table, CatBreed::Id)
                        .on_delete(ForeignKeyAction::Cascade)
                        .to_owned(),
                )
                .await
        }
    }
}

async fn remove_breeds(manager: &SchemaManager<'_>) -> Result<(), DbErr> {
    match manager.get_database_backend() {
        DatabaseBackend::Sqlite => rebuild_cat_info(manager, false).await?,
        _ => {
            manager
                .drop_foreign_key(
                    ForeignKey::drop()
                        .name(CAT_BREED_FK)
                        .table(CatInfo::Table)
                        .to_owned(),
                )
                .await?
        }
    }

    manager
        .drop_table(Table::drop().table(Appointment::Table).to_owned())
        .await?;
    manager
        .drop_table(Table::drop().table(CatBreed::Table).to_owned())
        .await?;

    manager
        .drop_index(
            Index::drop()
                .name("ix_cat_info_cat_breed_id")
                .table(CatInfo::Table)
                .to_owned(),
        )
        .await?;

    manager
        .alter_table(
            Table::alter()
                .table(CatInfo::Table)
                .rename_column(CatInfo::CatBreedId, CatInfo::CatBreed)
                .to_owned(),
        )
        .await
}

fn cat_breed_id_index() -> IndexCreateStatement {
    Index::create()
        .name("ix_cat_info_cat_breed_id")
        .table(CatInfo::Table)
        .col(CatInfo::CatBreedId)
        .to_owned()
}

/// Recreates `cat_info` with or without the breed foreign key. Rows whose `cat_breed_id` has no
/// matching breed fail the surrounding step when the key is being added.
async fn rebuild_cat_info(manager: &SchemaManager<'_>, with_breed_fk: bool) -> Result<(), DbErr> {
    let mut create = Table::create()
        .table(scratch_name("cat_info"))
        .col(
            ColumnDef::new(CatInfo::Id)
                .integer()
                .not_null()
                .auto_increment()
                .primary_key(),
        )
        .col(ColumnDef::new(CatInfo::Name).string_len(10).not_null())
        .col(ColumnDef::new(CatInfo::Gender).boolean().not_null())
        .col(ColumnDef::new(CatInfo::CatBreedId).integer().not_null())
        .col(ColumnDef::new(CatInfo::Birthday).date().not_null())
        .col(ColumnDef::new(CatInfo::CatState).integer().not_null())
        .to_owned();
    if with_breed_fk {
        create.foreign_key(
            ForeignKey::create()
                .name(CAT_BREED_FK)
                .from(CatInfo::Table, CatInfo::CatBreedId)
                .to(CatBreed::Table, CatBreed::Id)
                .on_delete(ForeignKeyAction::Cascade),
        );
    }

    rebuild_table(
        manager,
        TableRebuild {
            table: "cat_info",
            create,
            columns: ["id", "name", "gender", "cat_breed_id", "birthday", "cat_state"]
                .into_iter()
                .map(|column| (column, same(column)))
                .collect(),
            indexes: vec![
                Index::create()
                    .name("ix_cat_info_name")
                    .table(CatInfo::Table)
                    .col(CatInfo::Name)
                    .unique()
                    .to_owned(),
                cat_breed_id_index(),
            ],
        },
    )
    .await
}

#[derive(DeriveIden)]
enum CatInfo {
    Table,
    Id,
    Name,
    Gender,
    CatBreed,
    CatBreedId,
    Birthday,
    CatState,
}

#[derive(DeriveIden)]
enum CatBreed {
    Table,
    Id,
    BreedName,
    Remark,
}

#[derive(DeriveIden)]
enum Appointment {
    Table,
    Id,
    CustomerName,
    ArrivalDateTime,
    Remark,
}
