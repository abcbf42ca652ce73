//! git-web - serve read-only HTML views of git repositories
//!
//! # Usage
//! ```bash
//! git-web                           # Read ./config.json
//! git-web /etc/git-web.json         # Explicit configuration file
//! git-web config.json --listen 0.0.0.0:8080
//! ```

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use git_web::config::Config;
use git_web::registry::Registry;
use git_web::routes::{self, AppState};

/// Serve read-only HTML views of git repositories
#[derive(Parser)]
#[command(name = "git-web")]
#[command(about = "A read-only git repository web viewer", long_about = None)]
struct Cli {
    /// Path to the JSON configuration file
    #[arg(value_name = "CONFIG", default_value = "config.json")]
    config: PathBuf,

    /// Address to listen on, overriding the configuration file
    #[arg(short, long)]
    listen: Option<String>,
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    let registry = Registry::from_config(&config).context("invalid repository configuration")?;
    tracing::info!(repositories = registry.len(), "loaded configuration");

    let app = routes::create_router(AppState::new(registry)).layer(TraceLayer::new_for_http());

    let addr = cli.listen.unwrap_or(config.listen);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!(%addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
