use crate::config::AppConfig;
use crate::errors::ServiceError;
use metrics::{counter, gauge};
use migrations::Migrator;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbBackend};
use sea_orm_migration::MigratorTrait;
use std::time::Duration;
use tracing::{debug, error, info};

/// Type alias for a database connection pool
pub type DbPool = DatabaseConnection;

/// Configuration for database connection
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Database connection URL
    pub url: String,
    /// Maximum number of connections
    pub max_connections: u32,
    /// Minimum number of connections
    pub min_connections: u32,
    /// Connection timeout duration
    pub connect_timeout: Duration,
    /// Idle timeout duration
    pub idle_timeout: Duration,
    /// Acquire connection timeout
    pub acquire_timeout: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: 10,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            acquire_timeout: Duration::from_secs(8),
        }
    }
}

impl From<&AppConfig> for DbConfig {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            url: cfg.database_url.clone(),
            max_connections: cfg.db_max_connections,
            min_connections: cfg.db_min_connections,
            connect_timeout: Duration::from_secs(cfg.db_connect_timeout_secs),
            idle_timeout: Duration::from_secs(cfg.db_idle_timeout_secs),
            acquire_timeout: Duration::from_secs(cfg.db_acquire_timeout_secs),
        }
    }
}

/// Establishes a connection pool with default tuning.
pub async fn establish_connection(database_url: &str) -> Result<DbPool, ServiceError> {
    let config = DbConfig {
        url: database_url.to_string(),
        ..Default::default()
    };

    establish_connection_with_config(&config).await
}

/// Establishes a connection pool to the database with custom configuration.
///
/// SQLite pools are pinned to a single connection: every in-memory connection is a separate
/// database, and a single writer keeps file databases free of lock contention.
pub async fn establish_connection_with_config(config: &DbConfig) -> Result<DbPool, ServiceError> {
    debug!("Configuring database connection with: {:?}", config);

    let is_sqlite = config.url.starts_with("sqlite:");
    let (max_connections, min_connections) = if is_sqlite {
        (1, 1)
    } else {
        (config.max_connections, config.min_connections)
    };

    let mut opt = ConnectOptions::new(config.url.clone());
    opt.max_connections(max_connections)
        .min_connections(min_connections)
        .connect_timeout(config.connect_timeout)
        .acquire_timeout(config.acquire_timeout)
        .sqlx_logging(true);
    if !is_sqlite {
        opt.idle_timeout(config.idle_timeout);
    }

    gauge!("catstore_db.max_connections", max_connections as f64);

    info!(
        "Connecting to database with max_connections={}",
        max_connections
    );

    let db_pool = Database::connect(opt).await.map_err(|e| {
        counter!("catstore_db.connection_failures", 1);
        error!("Database connection failed: {}", e);
        ServiceError::DatabaseError(e)
    })?;

    if db_pool.get_database_backend() == DbBackend::Sqlite {
        db_pool
            .execute_unprepared("PRAGMA foreign_keys = ON")
            .await
            .map_err(ServiceError::DatabaseError)?;
    }

    info!("Database connection pool established successfully");

    Ok(db_pool)
}

/// Establish DB pool using AppConfig tuning
pub async fn establish_connection_from_app_config(cfg: &AppConfig) -> Result<DbPool, ServiceError> {
    let db_cfg: DbConfig = cfg.into();
    establish_connection_with_config(&db_cfg).await
}

/// Applies every pending migration.
pub async fn run_migrations(pool: &DbPool) -> Result<(), ServiceError> {
    info!("Running database migrations");
    let start = std::time::Instant::now();

    let result = Migrator::up(pool, None)
        .await
        .map_err(|e| ServiceError::MigrationError(e.to_string()));

    let elapsed = start.elapsed();
    match &result {
        Ok(_) => info!(
            "Database migrations completed successfully in {:?}",
            elapsed
        ),
        Err(e) => {
            counter!("catstore_db.migration_failures", 1);
            error!("Database migrations failed after {:?}: {}", elapsed, e)
        }
    }

    result
}

/// Applies at most `steps` pending migrations.
pub async fn apply_migrations(pool: &DbPool, steps: u32) -> Result<(), ServiceError> {
    info!(steps, "Applying database migrations");
    Migrator::up(pool, Some(steps))
        .await
        .map_err(|e| ServiceError::MigrationError(e.to_string()))
}

/// Rolls back the last `steps` applied migrations, or all of them when `steps` is `None`.
pub async fn rollback_migrations(pool: &DbPool, steps: Option<u32>) -> Result<(), ServiceError> {
    info!(?steps, "Rolling back database migrations");
    Migrator::down(pool, steps)
        .await
        .map_err(|e| ServiceError::MigrationError(e.to_string()))
}

/// Names of applied and pending migrations, in history order.
pub async fn migration_status(pool: &DbPool) -> Result<(Vec<String>, Vec<String>), ServiceError> {
    let to_names = |migrations: Vec<sea_orm_migration::Migration>| {
        migrations
            .iter()
            .map(|m| m.name().to_string())
            .collect::<Vec<_>>()
    };

    let applied = Migrator::get_applied_migrations(pool)
        .await
        .map_err(|e| ServiceError::MigrationError(e.to_string()))?;
    let pending = Migrator::get_pending_migrations(pool)
        .await
        .map_err(|e| ServiceError::MigrationError(e.to_string()))?;
    Ok((to_names(applied), to_names(pending)))
}

/// Checks if the database connection is active
pub async fn check_connection(pool: &DbPool) -> Result<(), ServiceError> {
    debug!("Checking database connection");
    let start = std::time::Instant::now();

    let result = pool.ping().await.map_err(ServiceError::DatabaseError);

    let elapsed = start.elapsed();
    match &result {
        Ok(_) => {
            debug!("Database connection check successful in {:?}", elapsed);
            gauge!("catstore_db.connection_latency", elapsed.as_millis() as f64);
        }
        Err(e) => {
            error!(
                "Database connection check failed after {:?}: {}",
                elapsed, e
            );
            counter!("catstore_db.connection_failures", 1);
        }
    }

    result
}

/// Closes the database connection pool
pub async fn close_pool(pool: DbPool) -> Result<(), ServiceError> {
    info!("Closing database connection pool");

    pool.close().await.map_err(ServiceError::DatabaseError)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_database_migrates_and_answers_pings() {
        let pool = establish_connection("sqlite::memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();
        assert!(check_connection(&pool).await.is_ok());

        let (applied, pending) = migration_status(&pool).await.unwrap();
        assert_eq!(applied.len(), 5);
        assert!(pending.is_empty());
    }

    #[tokio::test]
    async fn rollback_by_steps_leaves_earlier_migrations() {
        let pool = establish_connection("sqlite::memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();
        rollback_migrations(&pool, Some(2)).await.unwrap();

        let (applied, pending) = migration_status(&pool).await.unwrap();
        assert_eq!(applied.len(), 3);
        assert_eq!(
            pending,
            vec![
                "m20250423_133737_add_nickname".to_string(),
                "m20250508_081323_add_cat_breed_and_appointment".to_string()
            ]
        );
    }

    #[tokio::test]
    async fn stepped_apply_stops_early() {
        let pool = establish_connection("sqlite::memory:").await.unwrap();
        apply_migrations(&pool, 1).await.unwrap();

        let (applied, pending) = migration_status(&pool).await.unwrap();
        assert_eq!(applied.len(), 1);
        assert_eq!(pending.len(), 4);
    }
}
