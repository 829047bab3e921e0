//! Event types and the main event loop driver for the Nimbus TUI.
//!
//! This module defines the [`Event`] enum (keyboard input, ticks and fetch
//! results) and the [`EventHandler`], which runs a background task that polls
//! crossterm for key events and emits periodic [`Event::Tick`]s. Fetch tasks
//! spawned by `main.rs` report back through [`EventHandler::tx`].

use crate::error::WeatherError;
use crate::models::{CurrentWeather, Forecast};
use crossterm::event::{self, Event as CrosstermEvent, KeyEvent, KeyEventKind};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::error;

/// Events processed by the application event loop.
pub enum Event {
    /// Periodic tick used for UI refresh.
    Tick,
    /// User key press from the terminal.
    Input(KeyEvent),
    /// Outcome of one fetch task.
    WeatherFetched {
        /// City name as it was requested; empty for the current location.
        request: String,
        current: Result<CurrentWeather, WeatherError>,
        forecast: Result<Forecast, WeatherError>,
    },
}

/// Multiplexes terminal input and ticks into a single event stream.
///
/// The sender ([`tx`](EventHandler::tx)) is cloned into every fetch task,
/// while the receiver is consumed by [`next`](EventHandler::next) in the main
/// loop.
pub struct EventHandler {
    /// Sender for posting events (e.g. from fetch tasks).
    pub tx: mpsc::UnboundedSender<Event>,
    rx: mpsc::UnboundedReceiver<Event>,
}

impl EventHandler {
    /// Creates a new event handler and spawns the input/tick task.
    ///
    /// crossterm's `poll` blocks, so the task runs on the blocking pool. It
    /// stops when the terminal can no longer be read or the receiver is gone.
    pub fn new(tick_rate_ms: u64) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let event_tx = tx.clone();

        tokio::task::spawn_blocking(move || {
            let tick_rate = Duration::from_millis(tick_rate_ms);
            let mut last_tick = Instant::now();
            loop {
                let timeout = tick_rate
                    .checked_sub(last_tick.elapsed())
                    .unwrap_or(Duration::from_secs(0));

                match event::poll(timeout) {
                    Ok(true) => match event::read() {
                        // Windows reports releases too; only presses count.
                        Ok(CrosstermEvent::Key(key)) if key.kind == KeyEventKind::Press => {
                            if event_tx.send(Event::Input(key)).is_err() {
                                return;
                            }
                        }
                        Ok(_) => {}
                        Err(e) => {
                            error!("Terminal read failed: {}", e);
                            return;
                        }
                    },
                    Ok(false) => {}
                    Err(e) => {
                        error!("Terminal poll failed: {}", e);
                        return;
                    }
                }

                if last_tick.elapsed() >= tick_rate {
                    if event_tx.send(Event::Tick).is_err() {
                        return;
                    }
                    last_tick = Instant::now();
                }
            }
        });

        Self { tx, rx }
    }

    /// Receives the next event from the channel.
    pub async fn next(&mut self) -> Option<Event> {
        self.rx.recv().await
    }
}
