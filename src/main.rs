mod app;
mod catalog;
mod config;
mod constants;
mod disclosure;
mod error;
mod filter;
mod input;
mod keymap;
mod linear;
mod logging;
mod navigation;
mod progress;
mod theme;
mod ui;
mod viewer;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use clap_complete::Shell;
use ratatui::{
  DefaultTerminal,
  crossterm::event::{self, Event, KeyEventKind},
};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

use app::{App, Options};
use catalog::Catalog;
use config::Config;
use constants::constants;
use progress::{JsonFileStorage, MemoryStorage, ProgressStorage};

// --- CLI ---

#[derive(Parser, Debug)]
#[command(author, version = env!("CARGO_PKG_VERSION"), about, long_about = None)]
struct Args {
  /// Catalog JSON file (`[{ "topicName": .., "videos": [..] }]`); defaults to the built-in catalog
  #[arg(short, long)]
  catalog: Option<PathBuf>,

  /// Keep progress in memory only; nothing is written to disk
  #[arg(long)]
  ephemeral: bool,

  /// Allow only one topic to be expanded at a time
  #[arg(long)]
  single_open: bool,

  /// Never start the external player; selections only update progress
  #[arg(long)]
  no_viewer: bool,

  /// Print shell completions and exit
  #[arg(long, value_name = "SHELL")]
  completions: Option<Shell>,
}

fn open_storage(ephemeral: bool) -> Result<Box<dyn ProgressStorage>> {
  if ephemeral {
    return Ok(Box::new(MemoryStorage::default()));
  }
  let storage = JsonFileStorage::in_data_dir().context("Failed to locate progress storage")?;
  info!(path = %storage.path().display(), "progress: using file storage");
  Ok(Box::new(storage))
}

// --- Main ---

#[tokio::main]
async fn main() -> Result<()> {
  let args = Args::parse();

  if let Some(shell) = args.completions {
    clap_complete::generate(shell, &mut Args::command(), &constants().app_name, &mut std::io::stdout());
    return Ok(());
  }

  let _log_guard = match logging::init_logging() {
    Ok(guard) => Some(guard),
    Err(e) => {
      eprintln!("warning: logging disabled: {:#}", e);
      None
    }
  };

  let catalog = match &args.catalog {
    Some(path) => Catalog::load(path).with_context(|| format!("Failed to load catalog {}", path.display()))?,
    None => Catalog::embedded().context("Built-in catalog is invalid")?,
  };
  let storage = open_storage(args.ephemeral)?;
  let config = Config::load();
  let options = Options { single_open: args.single_open, viewer_enabled: !args.no_viewer };
  let mut app = App::new(catalog, storage, &config, options);

  let default_hook = std::panic::take_hook();
  std::panic::set_hook(Box::new(move |info| {
    ratatui::restore();
    default_hook(info);
  }));

  let mut terminal = ratatui::init();
  app.start_session();
  let result = run(&mut terminal, &mut app).await;
  app.end_session().await;
  ratatui::restore();
  if let Err(ref e) = result {
    warn!(err = %format!("{:#}", e), "session ended with error");
  }
  info!("session ended");
  result
}

async fn run(terminal: &mut DefaultTerminal, app: &mut App) -> Result<()> {
  let tick = Duration::from_millis(constants().tick_millis);
  loop {
    app.expire_error();
    app.sync_viewer().await;
    app.poll_viewer();

    terminal.draw(|frame| ui::ui(frame, app))?;

    if event::poll(tick)? {
      match event::read()? {
        Event::Key(key) if key.kind == KeyEventKind::Press => {
          input::handle_key_event(app, key).await.context("Failed to handle key event")?;
        }
        _ => {}
      }
    }

    if app.should_quit {
      break;
    }
  }
  Ok(())
}
