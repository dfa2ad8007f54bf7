mod cmd;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::output::OutputFormat;

/// lakesync - keep a collection's shortcuts in line with its sources
#[derive(Parser)]
#[command(name = "lakesync")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Path to the config file (default: $XDG_CONFIG_HOME/lakesync/lakesync.toml)
  #[arg(short, long, global = true)]
  config: Option<PathBuf>,

  /// Bearer token for the catalog API (default: $LAKESYNC_TOKEN)
  #[arg(long, global = true)]
  token: Option<String>,

  /// Output format
  #[arg(long, global = true, value_enum, default_value_t)]
  format: OutputFormat,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Create shortcuts for every configured source in a fresh target
  Setup {
    /// Exit non-zero when any shortcut or source failed
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    fail_on_error: bool,
  },

  /// Reconcile every configured source again, creating only what is missing
  Refresh {
    /// Exit non-zero when any shortcut or source failed
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    fail_on_error: bool,
  },

  /// Reconcile one new source against the existing target
  AddSource {
    /// Key identifying the source (must not already be configured)
    key: String,

    /// Workspace holding the source collection
    #[arg(long)]
    workspace_id: String,

    /// Source collection
    #[arg(long)]
    collection_id: String,

    /// Target schema for the source's shortcuts
    #[arg(long)]
    schema: String,

    /// Table to include (repeatable; default: all tables)
    #[arg(long = "table")]
    tables: Vec<String>,

    /// Exit non-zero when any shortcut failed
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    fail_on_error: bool,
  },

  /// Show what a refresh would create, without creating anything
  Plan,

  /// List configured sources
  Sources,
}

fn init_tracing(verbose: bool) {
  let default = if verbose {
    "warn,lakesync_lib=debug,lakesync=debug"
  } else {
    "warn"
  };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .without_time()
    .with_writer(std::io::stderr)
    .init();
}

fn main() -> Result<()> {
  let cli = Cli::parse();
  init_tracing(cli.verbose);

  let global = cmd::GlobalArgs {
    config: cli.config,
    token: cli.token,
    format: cli.format,
    verbose: cli.verbose,
  };

  match cli.command {
    Commands::Setup { fail_on_error } => cmd::cmd_sync(&global, cmd::SyncMode::Setup, fail_on_error),
    Commands::Refresh { fail_on_error } => cmd::cmd_sync(&global, cmd::SyncMode::Refresh, fail_on_error),
    Commands::AddSource {
      key,
      workspace_id,
      collection_id,
      schema,
      tables,
      fail_on_error,
    } => cmd::cmd_add_source(
      &global,
      &key,
      cmd::NewSource {
        workspace_id,
        collection_id,
        schema,
        tables,
      },
      fail_on_error,
    ),
    Commands::Plan => cmd::cmd_plan(&global),
    Commands::Sources => cmd::cmd_sources(&global),
  }
}
