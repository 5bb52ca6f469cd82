pub use sea_orm_migration::prelude::*;

mod m20250421_000001_create_identity_tables;
mod m20250421_054537_initial_create;
mod m20250422_130349_order_item_id_with_guid;
mod m20250423_133737_add_nickname;
mod m20250508_081323_add_cat_breed_and_appointment;
mod sqlite_rebuild;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250421_000001_create_identity_tables::Migration),
            Box::new(m20250421_054537_initial_create::Migration),
            Box::new(m20250422_130349_order_item_id_with_guid::Migration),
            Box::new(m20250423_133737_add_nickname::Migration),
            Box::new(m20250508_081323_add_cat_breed_and_appointment::Migration),
        ]
    }
}
