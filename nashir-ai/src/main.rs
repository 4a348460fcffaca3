//! AI Assist (nashir-ai) - Main entry point
//!
//! This is the assistant microservice for Nashir: LLM-backed editorial
//! tools plus the deterministic reader aids, sharing nashir.db with
//! the content server for sessions, settings and article data.

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use nashir_ai::{build_router, AppState};
use nashir_common::config::{get_setting_i64, load_module_config, RootFolderInitializer, RootFolderResolver};
use nashir_common::db::init::init_database;

/// Command-line arguments for nashir-ai
#[derive(Parser, Debug)]
#[command(name = "nashir-ai")]
#[command(about = "AI Assist microservice for Nashir")]
#[command(version)]
struct Args {
    /// Root folder containing nashir.db (overrides config and default)
    #[arg(short, long, env = "NASHIR_ROOT_FOLDER")]
    root_folder: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nashir_ai=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Log build identification before any database work
    info!(
        "Starting Nashir AI Assist (nashir-ai) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let args = Args::parse();

    let resolver = RootFolderResolver::new("ai-assist").with_cli_arg(args.root_folder);
    let root_folder = resolver.resolve();

    let initializer = RootFolderInitializer::new(root_folder);
    initializer.ensure_directory_exists()?;

    let db_path = initializer.database_path();
    info!("Database path: {}", db_path.display());

    let pool = init_database(&db_path)
        .await
        .context("Failed to initialize database")?;
    info!("✓ Database initialized");

    let config = load_module_config(&pool, "ai_assist")
        .await
        .context("Failed to load ai_assist config")?;

    let requests_per_minute = get_setting_i64(&pool, "ai_requests_per_minute", 30)
        .await
        .context("Failed to read rate limit setting")?;

    if std::env::var("ANTHROPIC_API_KEY").is_err() && std::env::var("OPENAI_API_KEY").is_err() {
        info!("No provider API key in environment; assistant endpoints will answer 502");
    }

    let state = AppState::new(pool, requests_per_minute)?;
    let app = build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("nashir-ai listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
