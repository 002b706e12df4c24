mod access;
mod app;
mod backend;
mod config;
mod constants;
mod input;
mod matcher;
mod models;
mod pagination;
mod search;
mod session;
mod theme;
mod ui;
mod youtube;

use anyhow::{Context, Result, bail};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use directories::ProjectDirs;
use ratatui::{
  DefaultTerminal,
  crossterm::event::{self, Event, KeyEventKind},
};
use std::io::{BufRead, Write};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;

use app::App;
use backend::{AccountStatus, BackendClient, CheckoutOutcome};
use config::Config;
use constants::constants;
use session::{SessionStore, token_from_redirect};

/// Environment variable holding the log filter directive.
const LOG_ENV: &str = "YC_LOG";

// --- CLI ---

#[derive(Parser, Debug)]
#[command(author, version = env!("CARGO_PKG_VERSION"), about, long_about = None)]
struct Args {
  /// Backend base URL (overrides YC_BACKEND_URL and the config file)
  #[arg(long, global = true)]
  backend_url: Option<String>,

  /// YouTube URL or video id to open right away
  video: Option<String>,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Store an access token; without one, open the sign-in page and read it from stdin
  Login {
    /// Token or the full redirect URL shown after signing in
    token: Option<String>,
  },
  /// Forget the stored access token
  Logout,
  /// Show the backend, session, and subscription tier
  Status,
  /// Open a checkout page to upgrade to Pro
  Upgrade,
  /// Print shell completions
  Completions { shell: Shell },
}

// --- Logging ---

/// Log to a daily file under the data directory; stdout belongs to the TUI.
fn init_tracing() -> Option<WorkerGuard> {
  let dir = ProjectDirs::from("", "", "yc")?.data_dir().join("logs");
  let appender = RollingFileAppender::builder()
    .rotation(Rotation::DAILY)
    .filename_prefix(constants().log_file_prefix.as_str())
    .build(&dir)
    .ok()?;
  let (writer, guard) = tracing_appender::non_blocking(appender);
  let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
  tracing_subscriber::fmt().with_env_filter(filter).with_writer(writer).with_ansi(false).init();
  Some(guard)
}

// --- Subcommands ---

fn login(store: &SessionStore, backend: &BackendClient, token: Option<String>) -> Result<()> {
  let raw = match token {
    Some(t) => t,
    None => {
      let url = backend.login_url();
      if app::open_in_browser(&url).is_err() {
        println!("Open this URL to sign in: {}", url);
      }
      print!("Paste the redirect URL (or token) shown after signing in: ");
      std::io::stdout().flush().context("Failed to flush stdout")?;
      let mut line = String::new();
      std::io::stdin().lock().read_line(&mut line).context("Failed to read token from stdin")?;
      line
    }
  };
  let Some(token) = token_from_redirect(&raw) else { bail!("No access token found in the input") };
  store.set(&token)?;
  println!("Signed in.");
  Ok(())
}

async fn status(store: &SessionStore, backend: &BackendClient) -> Result<()> {
  println!("Backend:  {}", backend.base_url());
  if let Some(path) = store.path() {
    println!("Session:  {}", path.display());
  }
  let tier = backend.user_status(store.get().as_deref()).await?;
  println!("Account:  {}", tier.label());
  Ok(())
}

async fn upgrade(store: &SessionStore, backend: &BackendClient) -> Result<()> {
  let Some(token) = store.get() else { bail!("Sign in first with `yc login`") };
  if backend.user_status(Some(&token)).await? == AccountStatus::Pro {
    println!("Already on Pro.");
    return Ok(());
  }
  match backend.create_checkout_session(Some(&token)).await? {
    CheckoutOutcome::Redirect(url) => {
      if app::open_in_browser(&url).is_err() {
        println!("Open this URL to complete the purchase: {}", url);
      }
      Ok(())
    }
    CheckoutOutcome::AuthRequired => bail!("The stored session has expired; run `yc login` again"),
  }
}

// --- Main ---

#[tokio::main]
async fn main() -> Result<()> {
  let args = Args::parse();
  let _log_guard = init_tracing();

  let config = Config::load();
  let backend_url = config.backend_url(args.backend_url.as_deref());
  let backend = BackendClient::new(&backend_url).with_remote_timeout(config.remote_timeout());
  let store = SessionStore::open();
  info!(backend = %backend_url, "yc starting");

  match args.command {
    Some(Command::Login { token }) => return login(&store, &backend, token),
    Some(Command::Logout) => {
      store.clear()?;
      println!("Signed out.");
      return Ok(());
    }
    Some(Command::Status) => return status(&store, &backend).await,
    Some(Command::Upgrade) => return upgrade(&store, &backend).await,
    Some(Command::Completions { shell }) => {
      clap_complete::generate(shell, &mut Args::command(), "yc", &mut std::io::stdout());
      return Ok(());
    }
    None => {}
  }

  let default_hook = std::panic::take_hook();
  std::panic::set_hook(Box::new(move |info| {
    ratatui::restore();
    default_hook(info);
  }));

  let mut app = App::new(config, Arc::new(backend), store);
  let mut terminal = ratatui::init();
  let result = run(&mut terminal, &mut app, args.video).await;
  ratatui::restore();
  result
}

async fn run(terminal: &mut DefaultTerminal, app: &mut App, video: Option<String>) -> Result<()> {
  app.refresh_account();
  if let Some(video) = video {
    app.input = video;
    app.cursor_position = app.input.chars().count();
    app.trigger_fetch();
  }

  loop {
    app.check_pending();
    app.expire_error();

    terminal.draw(|frame| ui::ui(frame, app)).context("Failed to draw frame")?;

    if event::poll(Duration::from_millis(100))? {
      match event::read()? {
        Event::Key(key) if key.kind == KeyEventKind::Press => input::handle_key_event(app, key),
        _ => {}
      }
    }

    // Yield so spawned fetch and search tasks make progress between frames.
    tokio::task::yield_now().await;

    if app.should_quit {
      break;
    }
  }

  app.search.clear();
  info!("yc exiting");
  Ok(())
}
