//! Subcommand implementations and the plumbing they share.

mod add_source;
mod plan;
mod sources;
mod sync;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tokio::runtime::Runtime;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::task::JoinHandle;

use lakesync_lib::catalog::{HttpCatalog, HttpCatalogConfig, RetryingCatalog};
use lakesync_lib::config::Config;
use lakesync_lib::consts::TOKEN_ENV;
use lakesync_lib::platform::paths::default_config_path;
use lakesync_lib::reconcile::{EventKind, ReconcileEvent, Reconciler};

use crate::output::{OutputFormat, print_progress, symbols};

pub use add_source::{NewSource, cmd_add_source};
pub use plan::cmd_plan;
pub use sources::cmd_sources;
pub use sync::{SyncMode, cmd_sync};

/// Flags accepted by every subcommand.
pub struct GlobalArgs {
  pub config: Option<PathBuf>,
  pub token: Option<String>,
  pub format: OutputFormat,
  pub verbose: bool,
}

impl GlobalArgs {
  pub fn config_path(&self) -> PathBuf {
    self.config.clone().unwrap_or_else(default_config_path)
  }
}

pub(crate) type LiveReconciler = Reconciler<RetryingCatalog<HttpCatalog>>;

pub(crate) fn load_config(path: &Path) -> Result<Config> {
  Config::load(path).with_context(|| format!("Failed to load config: {}", path.display()))
}

/// Token from `--token`, falling back to the environment.
fn resolve_token(flag: Option<&str>) -> Result<String> {
  let token = match flag {
    Some(token) => token.to_string(),
    None => std::env::var(TOKEN_ENV).unwrap_or_default(),
  };
  if token.trim().is_empty() {
    bail!("No API token provided (use --token or set {})", TOKEN_ENV);
  }
  Ok(token)
}

/// A runtime plus a reconciler wired to the live catalog.
///
/// In text mode, progress events are printed to stderr by a background task
/// until [`Session::finish`] is called.
pub(crate) struct Session {
  pub rt: Runtime,
  pub reconciler: LiveReconciler,
  progress: Option<JoinHandle<()>>,
}

impl Session {
  pub fn open(config: &Config, global: &GlobalArgs) -> Result<Self> {
    let base_url = config.base_url()?.to_string();
    let token = resolve_token(global.token.as_deref())?;

    let rt = Runtime::new().context("Failed to create async runtime")?;
    let catalog = HttpCatalog::new(HttpCatalogConfig {
      base_url,
      token,
      timeout: config.api.timeout(),
    })
    .context("Failed to create catalog client")?;
    let catalog = RetryingCatalog::new(catalog, config.engine.retry_policy());

    let mut reconciler = Reconciler::from_config(catalog, config);
    let mut progress = None;
    if !global.format.is_json() {
      let (tx, rx) = mpsc::unbounded_channel();
      reconciler = reconciler.with_events(tx);
      progress = Some(rt.spawn(print_events(rx)));
    }

    Ok(Self {
      rt,
      reconciler,
      progress,
    })
  }

  /// Drop the reconciler and wait for the progress printer to drain.
  pub fn finish(self) -> Result<()> {
    let Session {
      rt,
      reconciler,
      progress,
    } = self;
    drop(reconciler);
    if let Some(handle) = progress {
      rt.block_on(handle).context("Progress printer failed")?;
    }
    Ok(())
  }
}

async fn print_events(mut rx: UnboundedReceiver<ReconcileEvent>) {
  while let Some(event) = rx.recv().await {
    let table = event.table.as_deref().unwrap_or_default();
    match event.kind {
      EventKind::SourceStarted => print_progress(symbols::ARROW, &event.source),
      EventKind::Created => print_progress(symbols::ADD, &format!("{}/{} created", event.source, table)),
      EventKind::AlreadyPresent => print_progress(
        symbols::SKIP,
        &format!("{}/{} already present", event.source, table),
      ),
      EventKind::Skipped => print_progress(symbols::SKIP, &format!("{}/{} exists", event.source, table)),
      EventKind::Failed { kind, message } => print_progress(
        symbols::ERROR,
        &format!("{}/{} failed ({}): {}", event.source, table, kind, message),
      ),
      EventKind::SourceFailed { kind, message } => print_progress(
        symbols::ERROR,
        &format!("{} failed ({}): {}", event.source, kind, message),
      ),
      EventKind::SourceFinished => {}
    }
  }
}
