use sea_orm_migration::prelude::*;

#[async_std::main]
async fn main() {
    if std::env::var("DATABASE_URL").is_err() {
        std::env::set_var("DATABASE_URL", "sqlite://catstore.db?mode=rwc");
    }

    cli::run_cli(migrations::Migrator).await;
}
