//! Todo HTTP server.
//!
//! # Configuration
//!
//! See [`todo_server::config`] for the YAML format. Environment variables:
//! - `TODO_LISTEN_ADDR`: bind address (default: 127.0.0.1:8080)
//! - `TODO_BACKEND`: `snapshot` or `sqlite` (default: snapshot)
//! - `TODO_SNAPSHOT_PATH`, `TODO_DATABASE_PATH`: backing files
//! - `TODO_LOG_LEVEL`, `TODO_LOG_DIR`: logging

use clap::Parser;
use log::{info, warn};
use std::path::PathBuf;
use todo_core::{flush_logging, init_logging, TodoService};
use todo_server::config::{Backend, Config};
use todo_server::{app, open_store};
use tokio::net::TcpListener;

#[derive(Parser)]
#[command(name = "todo-server")]
#[command(version)]
#[command(about = "HTTP CRUD service for todo items", long_about = None)]
struct Cli {
    /// Path to YAML config file
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Storage backend, overrides config and environment
    #[arg(long, value_enum)]
    backend: Option<Backend>,

    /// Bind address, overrides config and environment
    #[arg(long)]
    listen: Option<String>,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        flush_logging();
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    config.apply_env(|key| std::env::var(key).ok())?;
    if let Some(backend) = cli.backend {
        config.backend = backend;
    }
    if let Some(listen) = cli.listen {
        config.listen_addr = listen;
    }

    let log_dir = config
        .log_dir
        .as_ref()
        .map(|dir| dir.to_string_lossy().into_owned());
    init_logging(&config.log_level, log_dir.as_deref())?;

    let store = open_store(&config)?;
    let listener = TcpListener::bind(&config.listen_addr).await?;
    info!(
        "event=server_start module=server status=ok addr={} backend={}",
        listener.local_addr()?,
        config.backend
    );

    axum::serve(listener, app(TodoService::new(store)))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // The router, and with it the last store handle, is dropped once serve returns.
    info!(
        "event=server_stop module=server status=ok backend={}",
        config.backend
    );
    flush_logging();
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("event=shutdown_signal module=server status=error error={err}");
        std::future::pending::<()>().await;
    }
}
