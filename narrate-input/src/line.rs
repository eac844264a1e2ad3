use crate::{InputEvent, InputSource};
use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Turn one raw line into an event. A line made only of spaces is the
/// spacebar; anything else is submitted as typed.
pub fn classify_line(raw: &str) -> InputEvent {
    let line = raw.trim_end_matches(['\r', '\n']);
    if !line.is_empty() && line.chars().all(|c| c == ' ') {
        InputEvent::RepeatOptions
    } else {
        InputEvent::Line(line.to_string())
    }
}

/// Cooked line input for pipes, CI and terminals without raw mode.
pub struct LineInput {
    rx: mpsc::Receiver<InputEvent>,
    cancel: CancellationToken,
}

impl LineInput {
    pub fn stdin() -> Self {
        Self::from_reader(BufReader::new(tokio::io::stdin()))
    }

    pub fn from_reader<R>(reader: R) -> Self
    where
        R: AsyncBufRead + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(32);
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        tokio::spawn(async move {
            let mut lines = reader.lines();
            loop {
                let next = tokio::select! {
                    _ = token.cancelled() => break,
                    next = lines.next_line() => next,
                };
                let ev = match next {
                    Ok(Some(line)) => classify_line(&line),
                    Ok(None) => InputEvent::Closed,
                    Err(e) => {
                        tracing::warn!(target: "input", error = %e, "line.read.failed");
                        InputEvent::Closed
                    }
                };
                let closed = ev == InputEvent::Closed;
                if tx.send(ev).await.is_err() || closed {
                    break;
                }
            }
        });
        Self { rx, cancel }
    }
}

#[async_trait]
impl InputSource for LineInput {
    async fn next_event(&mut self) -> InputEvent {
        self.rx.recv().await.unwrap_or(InputEvent::Closed)
    }

    fn close(&mut self) {
        self.cancel.cancel();
    }
}
