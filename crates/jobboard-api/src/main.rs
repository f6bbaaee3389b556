//! jobboard server binary.
//!
//! Reads `config.toml` (or the path given with `--config`) and `JOBBOARD_*`
//! environment variables, opens the SQLite store and serves the JSON API.
//!
//! Nested keys use a double underscore in the environment, e.g.
//! `JOBBOARD_MAIL__RELAY_URL`.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::{Context as _, bail};
use clap::Parser;
use jobboard_api::{
  AppState, Environment, ServerConfig,
  mail::MailTransport,
  session::HmacSessions,
  uploads::FileStore,
};
use jobboard_core::{lifecycle::Lifecycle, session::SessionIssuer};
use jobboard_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Job board API server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,
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

  // Load configuration.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(
      config::Environment::with_prefix("JOBBOARD")
        .prefix_separator("_")
        .separator("__"),
    )
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  let sessions: Arc<dyn SessionIssuer> = if server_cfg.session_secret.is_empty() {
    if server_cfg.environment == Environment::Production {
      bail!("session_secret must be set in production");
    }
    tracing::warn!("no session_secret configured; sessions will not survive a restart");
    Arc::new(HmacSessions::ephemeral())
  } else {
    Arc::new(HmacSessions::new(server_cfg.session_secret.clone()))
  };

  let store_path = expand_tilde(&server_cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  let upload_dir = expand_tilde(&server_cfg.upload_dir);
  tokio::fs::create_dir_all(&upload_dir)
    .await
    .with_context(|| format!("failed to create upload directory {upload_dir:?}"))?;

  let mailer = MailTransport::from_config(&server_cfg.mail).context("failed to build mail client")?;
  if matches!(mailer, MailTransport::Log(_)) {
    tracing::warn!("no mail relay configured; verification emails will only be logged");
  }

  let lifecycle = Lifecycle::new(
    Arc::new(store),
    Arc::new(mailer),
    sessions,
    server_cfg.policy(),
  );
  let state = AppState {
    lifecycle: Arc::new(lifecycle),
    files:     Arc::new(FileStore::new(upload_dir)),
    config:    Arc::new(server_cfg.clone()),
  };

  let app = jobboard_api::router(state);
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!(environment = ?server_cfg.environment, "Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
