use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use tokio::signal;
use tracing::{error, info, warn};

use catstore as app;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = app::config::load_config().context("failed to load configuration")?;
    app::config::init_tracing(cfg.log_level(), cfg.log_json);
    app::handlers::health::init_start_time();
    if cfg.is_production() && !cfg.cookie_secure {
        warn!("session cookies are sent without the Secure flag in production");
    }

    let db_pool = app::db::establish_connection_from_app_config(&cfg)
        .await
        .context("failed to connect to the database")?;
    if cfg.auto_migrate {
        app::db::run_migrations(&db_pool).await.map_err(|e| {
            error!("Failed running migrations: {}", e);
            e
        })?;
    }

    let db = Arc::new(db_pool);
    let state = app::AppState::new(db.clone(), cfg.clone());

    if cfg.seed_on_startup {
        let business = app::seed::ensure_business_data_seeded(&db)
            .await
            .context("seeding business data failed")?;
        let identity = app::seed::ensure_identity_seeded(state.auth.identity())
            .await
            .context("seeding accounts failed")?;
        info!(
            business_tables = ?business.seeded,
            identity_tables = ?identity.seeded,
            "startup seed finished"
        );
    } else {
        warn!("startup seeding disabled");
    }

    let access_logger = app::logging::setup_logger(app::logging::LoggerConfig::default());
    let router = app::build_router(state, access_logger);

    let addr: SocketAddr = format!("{}:{}", cfg.host, cfg.port)
        .parse()
        .with_context(|| format!("invalid listen address {}:{}", cfg.host, cfg.port))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("catstore listening on http://{}", addr);

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    if let Ok(pool) = Arc::try_unwrap(db) {
        app::db::close_pool(pool).await?;
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
