use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use serde::Serialize;

use catstore::{
    auth::IdentityStore,
    config::{self, AppConfig},
    db::{self, DbPool},
    seed,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let context = CliContext::initialize().await?;

    match cli.command {
        Commands::Migrate(command) => handle_migrate_command(&context, command, cli.json).await?,
        Commands::Seed => handle_seed(&context, cli.json).await?,
    }

    db::close_pool(context.into_pool()).await?;
    Ok(())
}

#[derive(Parser)]
#[command(name = "catstore-cli", about = "Cat store maintenance: schema migrations and seed data", version)]
struct Cli {
    #[arg(
        long,
        global = true,
        action = ArgAction::SetTrue,
        help = "Render command output as pretty JSON"
    )]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(subcommand)]
    Migrate(MigrateCommands),
    /// Fill empty tables with the demonstration data and accounts
    Seed,
}

#[derive(Subcommand)]
enum MigrateCommands {
    /// Apply pending migrations
    Up(StepsArgs),
    /// Roll back applied migrations
    Down(StepsArgs),
    /// List applied and pending migrations
    Status,
}

#[derive(Args)]
struct StepsArgs {
    #[arg(long, help = "Number of migrations to apply or roll back; all when omitted")]
    steps: Option<u32>,
}

struct CliContext {
    _config: AppConfig,
    db: Arc<DbPool>,
}

impl CliContext {
    async fn initialize() -> Result<Self> {
        let config = config::load_config().context("failed to load application config")?;
        config::init_tracing(config.log_level(), config.log_json);

        let db_pool = db::establish_connection_from_app_config(&config)
            .await
            .context("failed to connect to database")?;

        Ok(Self {
            _config: config,
            db: Arc::new(db_pool),
        })
    }

    fn identity(&self) -> IdentityStore {
        IdentityStore::new(self.db.clone())
    }

    fn into_pool(self) -> DbPool {
        Arc::try_unwrap(self.db).unwrap_or_else(|shared| (*shared).clone())
    }
}

#[derive(Serialize)]
struct MigrationStatus {
    applied: Vec<String>,
    pending: Vec<String>,
}

async fn handle_migrate_command(
    context: &CliContext,
    command: MigrateCommands,
    json: bool,
) -> Result<()> {
    match command {
        MigrateCommands::Up(args) => {
            match args.steps {
                None => db::run_migrations(&context.db).await?,
                Some(steps) => db::apply_migrations(&context.db, steps).await?,
            }
            println!("Migrations applied");
        }
        MigrateCommands::Down(args) => {
            db::rollback_migrations(&context.db, args.steps).await?;
            println!("Migrations rolled back");
        }
        MigrateCommands::Status => {
            let (applied, pending) = db::migration_status(&context.db).await?;
            let status = MigrationStatus { applied, pending };
            if json {
                print_json(&status)?;
            } else {
                render_status(&status);
            }
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct SeedSummary {
    business: seed::SeedReport,
    identity: seed::SeedReport,
}

async fn handle_seed(context: &CliContext, json: bool) -> Result<()> {
    let business = seed::ensure_business_data_seeded(&context.db)
        .await
        .context("seeding business data failed")?;
    let identity = seed::ensure_identity_seeded(&context.identity())
        .await
        .context("seeding accounts failed")?;
    let summary = SeedSummary { business, identity };

    if json {
        print_json(&summary)?;
    } else if !summary.business.changed() && !summary.identity.changed() {
        println!("Nothing to seed; every table already has rows");
    } else {
        for table in summary.business.seeded.iter().chain(&summary.identity.seeded) {
            println!("- seeded {}", table);
        }
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn render_status(status: &MigrationStatus) {
    for name in &status.applied {
        println!("[x] {}", name);
    }
    for name in &status.pending {
        println!("[ ] {}", name);
    }
    println!(
        "{} applied, {} pending",
        status.applied.len(),
        status.pending.len()
    );
}
