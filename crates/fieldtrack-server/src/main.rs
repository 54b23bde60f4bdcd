//! fieldtrack server binary.
//!
//! Reads `config.toml` (or the path given with `--config`) plus
//! `FIELDTRACK_*` environment overrides, opens the SQLite store, and serves
//! the JSON API over HTTP.
//!
//! ```
//! FIELDTRACK_JWT_SECRET=change-me cargo run -p fieldtrack-server
//! ```

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::Parser;
use fieldtrack_api::AppState;
use fieldtrack_auth::AuthService;
use fieldtrack_server::{Dispatcher, ServerConfig, config};
use fieldtrack_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "fieldtrack location tracking server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Print a commented default configuration and exit.
  #[arg(long)]
  print_default_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  if cli.print_default_config {
    print!("{}", config::DEFAULT_CONFIG);
    return Ok(());
  }

  let server_cfg = ServerConfig::load(&cli.config)?;
  let store_path = config::expand_tilde(&server_cfg.store_path);
  if let Some(parent) = store_path.parent().filter(|p| !p.as_os_str().is_empty()) {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("failed to create {parent:?}"))?;
  }

  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;
  let store = Arc::new(store);

  let dispatcher = Dispatcher::from_config(&server_cfg)?;
  if !dispatcher.has_mail() {
    tracing::warn!("no [mail] transport configured; verification links go to the log");
  }
  if !dispatcher.has_sms() {
    tracing::warn!("no [sms] transport configured; one-time codes go to the log");
  }

  let auth = AuthService::new(Arc::clone(&store), dispatcher, server_cfg.auth_config());
  let app = fieldtrack_api::api_router(AppState::new(store, auth));
  let address = server_cfg.address();

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}
