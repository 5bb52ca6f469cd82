//! Atomic steps and table rebuilds for SQLite.
//!
//! sea-orm-migration runs SQLite steps in autocommit mode, so [`atomic`] wraps a whole step in one
//! transaction with foreign key enforcement switched off. `PRAGMA foreign_key_check` must come
//! back clean before the commit; otherwise every statement of the step is rolled back.
//!
//! SQLite's `ALTER TABLE` cannot change a column type or add and drop foreign keys. Those steps
//! create the new shape under a scratch name, copy the rows across, drop the old table and rename
//! the new one into place with [`rebuild_table`], inside an [`atomic`] step.

use std::future::Future;
use std::pin::Pin;

use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::{DbBackend, Statement, TransactionTrait};
use sea_orm_migration::SchemaManagerConnection;

pub type StepFuture<'a> = Pin<Box<dyn Future<Output = Result<(), DbErr>> + Send + 'a>>;

/// Description of one table rebuild.
pub struct TableRebuild {
    /// Name of the table being replaced.
    pub table: &'static str,
    /// Definition of the replacement. Build it with [`scratch_name`] as the table name.
    pub create: TableCreateStatement,
    /// `(target column, source expression)` pairs used by the copy.
    pub columns: Vec<(&'static str, String)>,
    /// Indexes to recreate once the replacement carries the original name.
    pub indexes: Vec<IndexCreateStatement>,
}

pub fn scratch_name(table: &str) -> Alias {
    Alias::new(scratch_table(table))
}

fn scratch_table(table: &str) -> String {
    format!("__rebuild_{table}")
}

/// Quoted column reference, for copying a column unchanged.
pub fn same(column: &str) -> String {
    format!("\"{column}\"")
}

/// Runs `step` so that it is applied completely or not at all.
///
/// Postgres steps already run inside the migrator's transaction and are passed through.
pub async fn atomic<F>(manager: &SchemaManager<'_>, step: F) -> Result<(), DbErr>
where
    F: for<'a> FnOnce(&'a SchemaManager<'a>) -> StepFuture<'a>,
{
    if manager.get_database_backend() != DbBackend::Sqlite {
        return step(manager).await;
    }

    // the pragma is a no-op inside a transaction, so it has to be set first
    let db = manager.get_connection();
    db.execute_unprepared("PRAGMA foreign_keys = OFF").await?;
    let result = in_transaction(db, step).await;
    let restored = db.execute_unprepared("PRAGMA foreign_keys = ON").await;

    result?;
    restored?;
    Ok(())
}

async fn in_transaction<F>(db: &SchemaManagerConnection<'_>, step: F) -> Result<(), DbErr>
where
    F: for<'a> FnOnce(&'a SchemaManager<'a>) -> StepFuture<'a>,
{
    let txn = db.begin().await?;
    let outcome = {
        let manager = SchemaManager::new(&txn);
        match step(&manager).await {
            Ok(()) => foreign_key_check(&manager).await,
            Err(err) => Err(err),
        }
    };

    match outcome {
        Ok(()) => txn.commit().await,
        Err(err) => {
            // the original error matters more than a failed rollback
            let _ = txn.rollback().await;
            Err(err)
        }
    }
}

async fn foreign_key_check(manager: &SchemaManager<'_>) -> Result<(), DbErr> {
    let violations = manager
        .get_connection()
        .query_all(Statement::from_string(
            DbBackend::Sqlite,
            "PRAGMA foreign_key_check".to_string(),
        ))
        .await?;
    let Some(first) = violations.first() else {
        return Ok(());
    };

    let table: String = first.try_get("", "table")?;
    Err(DbErr::Migration(format!(
        "{} row(s) violate a foreign key, starting with table {table}",
        violations.len()
    )))
}

/// Swaps `rebuild.table` for its new shape. Call it from inside an [`atomic`] step.
pub async fn rebuild_table(manager: &SchemaManager<'_>, rebuild: TableRebuild) -> Result<(), DbErr> {
    let db = manager.get_connection();
    manager.create_table(rebuild.create.clone()).await?;

    let targets = rebuild
        .columns
        .iter()
        .map(|(target, _)| format!("\"{target}\""))
        .collect::<Vec<_>>()
        .join(", ");
    let sources = rebuild
        .columns
        .iter()
        .map(|(_, source)| source.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    db.execute_unprepared(&format!(
        "INSERT INTO \"{}\" ({targets}) SELECT {sources} FROM \"{}\"",
        scratch_table(rebuild.table),
        rebuild.table
    ))
    .await?;

    manager
        .drop_table(Table::drop().table(Alias::new(rebuild.table)).to_owned())
        .await?;
    manager
        .rename_table(
            Table::rename()
                .table(scratch_name(rebuild.table), Alias::new(rebuild.table))
                .to_owned(),
        )
        .await?;

    for index in &rebuild.indexes {
        manager.create_index(index.clone()).await?;
    }

    Ok(())
}
