// src/view/input.rs

//! Keyboard input for the terminal view.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use tokio::sync::mpsc;
use tracing::trace;

use crate::engine::{RunEvent, ViewToggle};

/// Map a key press to a run intent.
///
/// `q`, `esc` and `ctrl+c` cancel; `s`, `t`, `d` and `?` flip the scripts,
/// timer, stdout and help views.
pub fn map_key(key: KeyEvent) -> Option<RunEvent> {
    if key.kind != KeyEventKind::Press {
        return None;
    }

    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            Some(RunEvent::CancelRequested)
        }
        KeyCode::Char('q') | KeyCode::Esc => Some(RunEvent::CancelRequested),
        KeyCode::Char('s') => Some(RunEvent::ToggleView(ViewToggle::Scripts)),
        KeyCode::Char('t') => Some(RunEvent::ToggleView(ViewToggle::Timer)),
        KeyCode::Char('d') => Some(RunEvent::ToggleView(ViewToggle::Stdout)),
        KeyCode::Char('?') => Some(RunEvent::ToggleView(ViewToggle::Help)),
        _ => None,
    }
}

/// Polls the terminal for keys on a dedicated thread and forwards mapped
/// intents to the runtime channel.
pub struct InputReader {
    running: Arc<AtomicBool>,
    handle: Option<std::thread::JoinHandle<()>>,
}

impl InputReader {
    pub fn start(tx: mpsc::Sender<RunEvent>) -> Self {
        let running = Arc::new(AtomicBool::new(true));
        let thread_running = Arc::clone(&running);

        let handle = std::thread::spawn(move || {
            while thread_running.load(Ordering::SeqCst) {
                if !event::poll(Duration::from_millis(100)).unwrap_or(false) {
                    continue;
                }
                let Ok(Event::Key(key)) = event::read() else {
                    continue;
                };
                trace!(?key, "key event");
                if let Some(run_event) = map_key(key) {
                    if tx.blocking_send(run_event).is_err() {
                        break;
                    }
                }
            }
        });

        Self {
            running,
            handle: Some(handle),
        }
    }

    /// Stop polling and wait for the thread to exit.
    pub fn stop(mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for InputReader {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }
}
