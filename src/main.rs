use clap::{Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;

use ghkanban::app::{Action, App};
use ghkanban::config;
use ghkanban::logging;

#[derive(Parser, Debug)]
#[command(name = "ghkanban")]
#[command(about = "A Kanban view of GitHub Projects boards")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/ghkanban/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Project node id to use
  #[arg(short, long)]
  project: Option<String>,

  #[command(subcommand)]
  command: Option<CommandArg>,
}

#[derive(Subcommand, Debug)]
enum CommandArg {
  /// Print the board
  Board {
    /// Print JSON instead of text
    #[arg(long)]
    json: bool,
    /// Keep running and re-print after every sync
    #[arg(short, long)]
    watch: bool,
  },
  /// Move a card to another column
  Move {
    /// Item node id
    item: String,
    /// Target column id or name
    column: String,
  },
  /// Discard local edits and reload the board
  Refresh,
}

impl From<CommandArg> for Action {
  fn from(command: CommandArg) -> Self {
    match command {
      CommandArg::Board { json, watch } => Action::Board { json, watch },
      CommandArg::Move { item, column } => Action::Move { item, column },
      CommandArg::Refresh => Action::Refresh,
    }
  }
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;
  let _log_guard = logging::init()?;

  let args = Args::parse();

  // Load configuration
  let config = config::Config::load(args.config.as_deref())?;

  // Command line wins over the configured project
  let project = args
    .project
    .or_else(|| config.project.clone())
    .ok_or_else(|| eyre!("No project given. Pass --project or set `project` in the config file."))?;

  let action = args
    .command
    .map(Action::from)
    .unwrap_or(Action::Board {
      json: false,
      watch: false,
    });

  let mut app = App::new(config, project)?;
  app.run(action).await?;

  Ok(())
}
