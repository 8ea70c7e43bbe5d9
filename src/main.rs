use anyhow::Context;
use school_erp::{
    build_router,
    config::Config,
    services::{email, jobs, scheduler},
    state::AppState,
};
use sqlx::postgres::PgPoolOptions;
use std::{sync::Arc, time::Duration};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ─── Logging ──────────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("school_erp=debug,tower_http=info")),
        )
        .init();

    // ─── Config ───────────────────────────────────────────────────────────────
    let config = Arc::new(Config::from_env()?);
    let addr = config.server_addr();

    // ─── Database ─────────────────────────────────────────────────────────────
    let db = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&config.database_url)
        .await
        .context("Failed to connect to Postgres")?;

    sqlx::migrate!("./migrations")
        .run(&db)
        .await
        .context("Failed to run database migrations")?;

    info!("Database connected and migrations applied");

    // ─── Background work ──────────────────────────────────────────────────────
    let mailer = email::build_mailer(&config).context("Failed to configure the mailer")?;

    let (reports, rx) = jobs::ReportQueue::new();
    jobs::spawn_workers(db.clone(), config.clone(), reports.clone(), rx);
    let resumed = jobs::resume_pending(&db, &reports).await?;
    if resumed > 0 {
        info!(resumed, "pending report jobs re-queued");
    }

    let state = AppState::new(db, config.clone(), reports, mailer);

    if config.scheduler_enabled {
        tokio::spawn(scheduler::run_background_scheduler(state.clone()));
    } else {
        info!("background scheduler disabled");
    }

    // ─── Start Server ─────────────────────────────────────────────────────────
    let app = build_router(state);

    info!("School ERP API listening on http://{}", addr);
    info!("Swagger UI:  http://{}/docs", addr);
    info!("Health:      http://{}/health", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    axum::serve(listener, app).await.context("Server failed")?;
    Ok(())
}
