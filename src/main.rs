use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use forgeboard_lib::config::{merge_config, ConfigManager};
use forgeboard_lib::file_storage::{global_forgeboard_dir, lock::LockManager};
use forgeboard_lib::server::{self, AppState};
use forgeboard_lib::shutdown::{register_signal_handlers, ShutdownState};

/// Forgeboard - concurrent-safe metadata store and workflow server
#[derive(Parser, Debug)]
#[command(name = "forgeboard")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Port to bind the server to (overrides config file)
    #[arg(long)]
    port: Option<u16>,

    /// Address to bind the server to (overrides config file)
    #[arg(long)]
    bind: Option<String>,

    /// Directory for the instance registry and config file
    /// (defaults to ~/.forgeboard)
    #[arg(long, env = "FORGEBOARD_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Allowed CORS origin, repeatable; when absent any origin is allowed
    #[arg(long = "cors-origin")]
    cors_origins: Vec<String>,

    /// Explicit config file (defaults to <data-dir>/config.yaml)
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // The config file lives in the data dir, so resolve that first
    let config_root = cli
        .data_dir
        .clone()
        .unwrap_or_else(global_forgeboard_dir);

    let config_manager = match &cli.config {
        Some(path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(&config_root),
    };
    let file_config = match config_manager.read() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let config = merge_config(
        &file_config,
        cli.port,
        cli.bind.as_deref(),
        cli.data_dir.as_deref(),
        &cli.cors_origins,
    );

    let data_dir = config.data_dir.clone().unwrap_or(config_root);

    let locks = Arc::new(LockManager::with_timeouts(
        Duration::from_millis(config.lock_acquire_timeout_ms),
        Duration::from_millis(config.lock_stale_after_ms),
    ));

    let shutdown_state = ShutdownState::new();
    if let Err(e) = register_signal_handlers(shutdown_state.clone()) {
        log::warn!("Failed to register signal handlers: {}", e);
    }

    let state = AppState::new(data_dir, locks, shutdown_state.clone());

    let cors_origins = if config.cors_origins.is_empty() {
        None
    } else {
        Some(config.cors_origins.clone())
    };

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create tokio runtime: {}", e);
            std::process::exit(1);
        }
    };

    rt.block_on(async {
        if let Err(e) = server::run_server(config.port, &config.bind, state, cors_origins).await {
            eprintln!("Server error: {}", e);
            std::process::exit(1);
        }
    });

    // run_server only returns after graceful shutdown completed
    shutdown_state.mark_drained();
    log::info!("Server drained, exiting");
}
