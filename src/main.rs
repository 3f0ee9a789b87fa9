mod action;
mod app;
mod config;
mod error;
mod event;
mod github;
mod pagination;
mod store;
mod sync;
mod transport;
mod tui;
mod types;
mod ui;

use std::panic;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use clap::Parser;
use tokio::sync::mpsc;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::action::Action;
use crate::app::App;
use crate::config::{Config, Overrides};
use crate::event::Event;
use crate::github::GitHub;
use crate::transport::HttpTransport;
use crate::tui::EventHandler;

/// Browse a GitHub account's repositories with approximate activity counts.
#[derive(Parser, Debug)]
#[command(name = "ghscope", version, about)]
struct Cli {
    /// Account whose repositories to list (default: $GITHUB_USER, then config)
    user: Option<String>,

    /// GitHub API base URL, e.g. for GitHub Enterprise
    #[arg(long)]
    api_url: Option<String>,

    /// Merge all count estimates at once instead of as each repository resolves
    #[arg(long)]
    batch_counts: bool,

    /// Maximum repositories estimated concurrently
    #[arg(long)]
    concurrency: Option<usize>,

    /// Config file (default: ~/.config/ghscope/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging();

    let config = Config::load(cli.config.as_deref())?
        .with_env(|key| std::env::var(key).ok())
        .with_overrides(&Overrides {
            user: cli.user,
            api_url: cli.api_url,
            batch_counts: cli.batch_counts,
            concurrency: cli.concurrency,
        });

    let token = config.resolve_token(|key| std::env::var(key).ok());
    if token.is_none() {
        tracing::info!("no token found, using anonymous access");
    }

    let transport = HttpTransport::new(token, config.network.timeout())?;
    let github = GitHub::new(Arc::new(transport), config.github.api_url.clone());

    // Set up panic hook to restore terminal
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        let _ = tui::restore();
        original_hook(panic_info);
    }));

    let result = run(github, config).await;

    tui::restore()?;

    result
}

/// Log to a file under the cache dir so output does not tear the TUI.
fn init_logging() {
    let log_file = dirs::cache_dir()
        .map(|dir| dir.join("ghscope"))
        .and_then(|dir| {
            std::fs::create_dir_all(&dir).ok()?;
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(dir.join("ghscope.log"))
                .ok()
        });

    let writer = match log_file {
        Some(file) => BoxMakeWriter::new(Mutex::new(file)),
        None => BoxMakeWriter::new(std::io::stderr),
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false),
        )
        .init();
}

async fn run(github: GitHub, config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let mut terminal = tui::init()?;

    let (action_tx, mut action_rx) = mpsc::unbounded_channel::<Action>();

    let mut app = App::new(github, config.github.user.clone(), config.sync, action_tx.clone());

    let tick_rate = Duration::from_millis(100);
    let render_rate = Duration::from_millis(33);
    let mut events = EventHandler::new(tick_rate, render_rate);

    // The list loads first; counts follow once it is in place.
    action_tx.send(Action::LoadRepos)?;

    loop {
        tokio::select! {
            Some(event) = events.next() => {
                match event {
                    Event::Render => {
                        terminal.draw(|frame| ui::render(frame, &app))?;
                    }
                    _ => {
                        let action = app.handle_event(event);
                        if !matches!(action, Action::None) {
                            action_tx.send(action)?;
                        }
                    }
                }
            }
            Some(action) = action_rx.recv() => {
                app.update(action);
            }
            else => break,
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}
