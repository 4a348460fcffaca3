//! Content Server (nashir-cms) - Main entry point
//!
//! This is the publishing microservice for Nashir: articles, feeds,
//! curation, newsroom tasks and chat, reader preferences and
//! publishing analytics over the shared nashir.db.

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use nashir_cms::{build_router, AppState};
use nashir_common::auth::ensure_admin_user;
use nashir_common::config::{load_module_config, RootFolderInitializer, RootFolderResolver};
use nashir_common::db::init::init_database;

/// Command-line arguments for nashir-cms
#[derive(Parser, Debug)]
#[command(name = "nashir-cms")]
#[command(about = "Content Server microservice for Nashir")]
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
                .unwrap_or_else(|_| "nashir_cms=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Log build identification before any database work
    info!(
        "Starting Nashir Content Server (nashir-cms) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let args = Args::parse();

    let resolver = RootFolderResolver::new("content-server").with_cli_arg(args.root_folder);
    let root_folder = resolver.resolve();

    let initializer = RootFolderInitializer::new(root_folder);
    initializer.ensure_directory_exists()?;

    let db_path = initializer.database_path();
    info!("Database path: {}", db_path.display());

    let pool = init_database(&db_path)
        .await
        .context("Failed to initialize database")?;
    info!("✓ Database initialized");

    // First run creates an admin account and logs its password
    ensure_admin_user(&pool)
        .await
        .context("Failed to ensure admin user")?;

    let config = load_module_config(&pool, "content_server")
        .await
        .context("Failed to load content_server config")?;

    let state = AppState::new(pool);
    let app = build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("nashir-cms listening on http://{}", addr);
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
