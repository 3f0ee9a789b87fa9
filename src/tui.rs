use std::io::{self, Stdout};
use std::time::Duration;

use crossterm::cursor::{Hide, Show};
use crossterm::event::{Event as CrosstermEvent, EventStream, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use futures::StreamExt;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::task::JoinHandle;
use tokio::time::interval;
use tokio_util::sync::CancellationToken;

use crate::event::Event;

pub type Tui = Terminal<CrosstermBackend<Stdout>>;

pub fn init() -> io::Result<Tui> {
    enable_raw_mode()?;
    execute!(io::stdout(), EnterAlternateScreen, Hide)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(io::stdout()))?;
    terminal.clear()?;
    Ok(terminal)
}

/// Leave the alternate screen. Safe to call more than once.
pub fn restore() -> io::Result<()> {
    execute!(io::stdout(), Show, LeaveAlternateScreen)?;
    disable_raw_mode()
}

/// Terminal input plus tick and render heartbeats, as one stream of [`Event`]s.
pub struct EventHandler {
    rx: mpsc::UnboundedReceiver<Event>,
    cancel: CancellationToken,
    pump: JoinHandle<()>,
}

impl EventHandler {
    pub fn new(tick_rate: Duration, render_rate: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let pump = tokio::spawn(pump(tx, cancel.clone(), tick_rate, render_rate));
        Self { rx, cancel, pump }
    }

    pub async fn next(&mut self) -> Option<Event> {
        self.rx.recv().await
    }
}

impl Drop for EventHandler {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.pump.abort();
    }
}

async fn pump(
    tx: UnboundedSender<Event>,
    cancel: CancellationToken,
    tick_rate: Duration,
    render_rate: Duration,
) {
    let mut input = EventStream::new();
    let mut ticks = interval(tick_rate);
    let mut frames = interval(render_rate);

    loop {
        let event = tokio::select! {
            _ = cancel.cancelled() => return,
            _ = ticks.tick() => Event::Tick,
            _ = frames.tick() => Event::Render,
            next = input.next() => match next {
                Some(Ok(CrosstermEvent::Key(key))) if key.kind == KeyEventKind::Press => {
                    Event::Key(key)
                }
                // Redraw right away instead of waiting for the next frame.
                Some(Ok(CrosstermEvent::Resize(_, _))) => Event::Render,
                Some(Ok(_)) => continue,
                Some(Err(e)) => {
                    tracing::warn!(error = %e, "terminal input failed");
                    return;
                }
                None => return,
            },
        };

        if tx.send(event).is_err() {
            return;
        }
    }
}
