use std::time::Duration;

use crossterm::event::{self, Event as CrosstermEvent, KeyEvent, KeyEventKind, MouseEvent};
use tokio::sync::mpsc;

use crate::error::{FennError, Result};
use crate::selection::ToggleOutcome;
use crate::workspace::{ReloadReport, StatusReport};

/// Completion of a background workspace operation.
#[derive(Debug)]
pub enum TaskResult {
    Mounted(Result<ReloadReport>),
    Reloaded(Result<ReloadReport>),
    Toggled {
        path: String,
        result: Result<ToggleOutcome>,
    },
    Cleared(Result<()>),
    Refreshed {
        scope: Option<String>,
        report: StatusReport,
    },
}

/// Application events.
#[derive(Debug)]
pub enum Event {
    Key(KeyEvent),
    Mouse(MouseEvent),
    /// A periodic tick for rendering.
    Tick,
    Resize(u16, u16),
    /// A spawned workspace operation finished.
    Task(TaskResult),
}

/// Polls crossterm events on a background task and forwards them, together
/// with task completions, through one channel.
pub struct EventHandler {
    rx: mpsc::UnboundedReceiver<Event>,
    tx: mpsc::UnboundedSender<Event>,
}

impl EventHandler {
    pub fn new(tick_rate: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let event_tx = tx.clone();

        tokio::spawn(async move {
            loop {
                let forwarded = match event::poll(tick_rate) {
                    Ok(true) => match event::read() {
                        // Windows reports releases too; act on presses only.
                        Ok(CrosstermEvent::Key(key)) if key.kind == KeyEventKind::Press => {
                            event_tx.send(Event::Key(key))
                        }
                        Ok(CrosstermEvent::Mouse(mouse)) => event_tx.send(Event::Mouse(mouse)),
                        Ok(CrosstermEvent::Resize(w, h)) => event_tx.send(Event::Resize(w, h)),
                        Ok(_) => Ok(()),
                        Err(e) => {
                            tracing::warn!(error = %e, "terminal event read failed");
                            Ok(())
                        }
                    },
                    Ok(false) => event_tx.send(Event::Tick),
                    Err(e) => {
                        tracing::error!(error = %e, "terminal event poll failed");
                        break;
                    }
                };
                if forwarded.is_err() {
                    break;
                }
            }
        });

        Self { rx, tx }
    }

    /// Sender for background tasks to report completion.
    pub fn sender(&self) -> mpsc::UnboundedSender<Event> {
        self.tx.clone()
    }

    /// Receive the next event.
    pub async fn next(&mut self) -> Result<Event> {
        self.rx
            .recv()
            .await
            .ok_or_else(|| FennError::Terminal("Event channel closed".into()))
    }
}
