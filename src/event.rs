use crossterm::event::KeyEvent;

#[derive(Debug, Clone)]
pub enum Event {
    /// Periodic heartbeat that drives the loading spinner.
    Tick,
    Render,
    Key(KeyEvent),
}
