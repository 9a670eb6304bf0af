use std::sync::{Arc, Mutex};

use color_eyre::{eyre::eyre, Result};
use tokio::sync::mpsc;
use tracing::info;

use crate::board::{Channel, ProjectModel};
use crate::cache::Cache;
use crate::config::Config;
use crate::github::GitHubClient;
use crate::render;
use crate::sync::{Notice, NoticeLevel, Notifier, SyncCoordinator, SyncOptions, SyncOutcome};

/// What the user asked the binary to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
  /// Print the board, optionally re-printing after every sync
  Board { json: bool, watch: bool },
  /// Move a card to a column (id or name)
  Move { item: String, column: String },
  /// Drop local edits and reload from GitHub
  Refresh,
}

/// Prints notices to stderr, next to the board on stdout.
struct StderrNotifier;

impl Notifier for StderrNotifier {
  fn notify(&self, notice: Notice) {
    match notice.level {
      NoticeLevel::Info => eprintln!("{}", notice.message),
      NoticeLevel::Warning => eprintln!("warning: {}", notice.message),
      NoticeLevel::Error => eprintln!("error: {}", notice.message),
    }
  }
}

/// Command-line host around one project's sync coordinator
pub struct App {
  config: Config,
  coordinator: SyncCoordinator,
}

impl App {
  pub fn new(config: Config, project_id: String) -> Result<Self> {
    let client = GitHubClient::new(&config)?;
    let cache = Arc::new(Cache::new().with_ttl(config.sync.cache_ttl()));
    let model = Arc::new(Mutex::new(ProjectModel::with_status_field(
      config.board.status_field.clone(),
    )));

    let coordinator = SyncCoordinator::new(
      project_id,
      Arc::new(client),
      cache,
      model,
      SyncOptions {
        max_push_failures: config.sync.max_push_failures,
        notifier: Arc::new(StderrNotifier),
      },
    );

    Ok(Self {
      config,
      coordinator,
    })
  }

  pub async fn run(&mut self, action: Action) -> Result<()> {
    self.coordinator.load_project().await?;

    let result = match action {
      Action::Board { json, watch: false } => self.print_board(json),
      Action::Board { json, watch: true } => self.watch(json).await,
      Action::Move { item, column } => self.move_card(&item, &column).await,
      Action::Refresh => self.refresh().await,
    };

    self.coordinator.destroy();
    result
  }

  fn print_board(&self, json: bool) -> Result<()> {
    let pending = self.coordinator.pending_updates();
    let output = self.coordinator.with_model(|model| {
      if json {
        render::render_board_json(model, &pending)
          .map_err(|e| eyre!("Failed to encode board: {}", e))
      } else {
        Ok(render::render_board(model, &pending))
      }
    })?;
    println!("{}", output);
    Ok(())
  }

  async fn watch(&self, json: bool) -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel();

    let subscriptions = self.coordinator.with_model(|model| {
      [Channel::ItemsUpdated, Channel::CardMoved]
        .into_iter()
        .map(|channel| {
          let tx = tx.clone();
          model.subscribe(channel, move |_| {
            let _ = tx.send(());
          })
        })
        .collect::<Vec<_>>()
    });

    self
      .coordinator
      .start_auto_sync(self.config.sync.interval_seconds);
    self.print_board(json)?;

    loop {
      tokio::select! {
        _ = tokio::signal::ctrl_c() => break,
        Some(()) = rx.recv() => self.print_board(json)?,
      }
    }

    self.coordinator.stop_auto_sync();
    for subscription in subscriptions {
      subscription.unsubscribe();
    }
    Ok(())
  }

  async fn move_card(&self, item: &str, column: &str) -> Result<()> {
    let handle = self
      .coordinator
      .move_card(item, column)
      .ok_or_else(|| eyre!("Cannot move {} to {}: unknown card or column", item, column))?;

    let report = handle.await?;
    if report.failed > 0 {
      return Err(eyre!("GitHub did not accept the move of {}", item));
    }

    info!(item, column, "Card moved");
    self.print_board(false)
  }

  async fn refresh(&self) -> Result<()> {
    match self.coordinator.force_refresh().await? {
      SyncOutcome::Synced { items } => info!(items, "Refreshed"),
      SyncOutcome::Skipped => {}
    }
    self.print_board(false)
  }
}
