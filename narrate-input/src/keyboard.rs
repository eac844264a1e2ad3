use crate::{InputEvent, InputSource};
use async_trait::async_trait;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use narrate_common::{NarrateError, Result};
use std::io::{self, Write};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Line editing over raw key events.
///
/// Echo goes to the writer handed to [`LineEditor::handle_key`] because the
/// terminal does not echo in raw mode.
#[derive(Debug, Default)]
pub struct LineEditor {
    buffer: String,
}

impl LineEditor {
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    pub fn handle_key(&mut self, key: KeyEvent, echo: &mut impl Write) -> Option<InputEvent> {
        match (key.code, key.modifiers) {
            (KeyCode::Char('c'), KeyModifiers::CONTROL)
            | (KeyCode::Char('d'), KeyModifiers::CONTROL) => {
                self.buffer.clear();
                let _ = echo.write_all(b"\r\n");
                Some(InputEvent::Line("exit".to_string()))
            }
            (KeyCode::Enter, _) => {
                let _ = echo.write_all(b"\r\n");
                Some(InputEvent::Line(std::mem::take(&mut self.buffer)))
            }
            (KeyCode::Backspace, _) => {
                if self.buffer.pop().is_some() {
                    let _ = echo.write_all(b"\x08 \x08");
                }
                None
            }
            (KeyCode::Esc, _) => {
                self.buffer.clear();
                let _ = echo.write_all(b"\r\n");
                None
            }
            (KeyCode::Char(' '), _) if self.buffer.is_empty() => Some(InputEvent::RepeatOptions),
            (KeyCode::Char(ch), m) if !m.contains(KeyModifiers::CONTROL) => {
                self.buffer.push(ch);
                let mut utf8 = [0u8; 4];
                let _ = echo.write_all(ch.encode_utf8(&mut utf8).as_bytes());
                None
            }
            _ => None,
        }
    }
}

/// Raw-mode keyboard reader running on a blocking thread.
pub struct KeyboardInput {
    rx: mpsc::Receiver<InputEvent>,
    cancel: CancellationToken,
    worker: Option<JoinHandle<()>>,
    raw: bool,
}

impl KeyboardInput {
    /// Put the terminal in raw mode and start reading keys.
    pub fn spawn() -> Result<Self> {
        enable_raw_mode().map_err(|e| NarrateError::Input(format!("raw mode unavailable: {e}")))?;

        let (tx, rx) = mpsc::channel(32);
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let worker = tokio::task::spawn_blocking(move || read_keys(tx, token));
        tracing::debug!(target: "input", "keyboard.listener.started");

        Ok(Self {
            rx,
            cancel,
            worker: Some(worker),
            raw: true,
        })
    }

    fn restore_terminal(&mut self) {
        self.cancel.cancel();
        self.worker.take();
        if self.raw {
            disable_raw_mode().ok();
            self.raw = false;
            tracing::debug!(target: "input", "keyboard.listener.stopped");
        }
    }
}

fn read_keys(tx: mpsc::Sender<InputEvent>, cancel: CancellationToken) {
    let mut editor = LineEditor::default();
    while !cancel.is_cancelled() {
        match event::poll(POLL_INTERVAL) {
            Ok(false) => continue,
            Ok(true) => {}
            Err(e) => {
                tracing::warn!(target: "input", error = %e, "keyboard.poll.failed");
                let _ = tx.blocking_send(InputEvent::Closed);
                return;
            }
        }
        let key = match event::read() {
            Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => key,
            Ok(_) => continue,
            Err(e) => {
                tracing::warn!(target: "input", error = %e, "keyboard.read.failed");
                let _ = tx.blocking_send(InputEvent::Closed);
                return;
            }
        };

        let mut stdout = io::stdout();
        let produced = editor.handle_key(key, &mut stdout);
        let _ = stdout.flush();
        if let Some(ev) = produced {
            if tx.blocking_send(ev).is_err() {
                return;
            }
        }
    }
}

#[async_trait]
impl InputSource for KeyboardInput {
    async fn next_event(&mut self) -> InputEvent {
        self.rx.recv().await.unwrap_or(InputEvent::Closed)
    }

    fn close(&mut self) {
        self.restore_terminal();
    }
}

impl Drop for KeyboardInput {
    fn drop(&mut self) {
        self.restore_terminal();
    }
}
