// Main entry point for API server

use std::sync::Arc;

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use extraction::HttpPageFetcher;
use groq_client::GroqClient;
use server_core::domains::analysis::{
    AnalysisPipeline, AnalysisWorker, BaseJobStore, JobController, MemoryJobStore, PgJobStore,
};
use server_core::domains::auth::SessionStore;
use server_core::kernel::scoring::{BiasScorer, BiasScorerConfig};
use server_core::server::build_app;
use server_core::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,server_core=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Political Bias Analyzer API");

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!("Configuration loaded");

    // Job store: Postgres when configured, in-memory otherwise
    let store: Arc<dyn BaseJobStore> = match &config.database_url {
        Some(database_url) => {
            tracing::info!("Connecting to database...");
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .connect(database_url)
                .await
                .context("Failed to connect to database")?;
            tracing::info!("Database connected");

            tracing::info!("Running database migrations...");
            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .context("Failed to run migrations")?;
            tracing::info!("Migrations complete");

            Arc::new(PgJobStore::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set; jobs will not survive a restart");
            Arc::new(MemoryJobStore::new())
        }
    };

    // Scoring model client
    let mut groq = GroqClient::new(&config.groq_api_key);
    if let Some(base_url) = &config.groq_base_url {
        groq = groq.with_base_url(base_url.clone());
    }
    let scorer = BiasScorer::with_config(
        Arc::new(groq),
        BiasScorerConfig {
            model: config.bias_model.clone(),
            ..BiasScorerConfig::default()
        },
    );

    // Pipeline, controller, and the background worker
    let pipeline = Arc::new(AnalysisPipeline::new(
        Arc::new(HttpPageFetcher::new()),
        scorer,
        &config.bias_model,
    ));
    let wake = Arc::new(Notify::new());
    let cancel = CancellationToken::new();
    let controller = Arc::new(JobController::new(
        pipeline.clone(),
        store.clone(),
        wake.clone(),
    ));
    let worker = AnalysisWorker::new(pipeline, store, wake, cancel.clone()).spawn();

    let sessions = Arc::new(SessionStore::new());
    let app = build_app(controller, sessions);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Starting server on {}", addr);
    tracing::info!("Health check: http://localhost:{}/health", config.port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // Drain in-flight analyses before exiting
    cancel.cancel();
    if let Err(e) = worker.await {
        tracing::error!(error = %e, "Worker task failed during shutdown");
    }
    tracing::info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => tracing::error!(error = %e, "Failed to listen for SIGTERM"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    tracing::info!("Shutdown signal received");
}
