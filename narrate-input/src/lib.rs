//! User input for the narrator.
//!
//! Both sources turn what the user types into [`InputEvent`]s delivered over a
//! channel, so the navigation loop only ever awaits one thing:
//!
//! - [`KeyboardInput`]: raw-mode terminal reader; a space on an empty line is
//!   reported immediately as [`InputEvent::RepeatOptions`]
//! - [`LineInput`]: plain line reader for pipes and non-terminal stdin
//! - [`parse_choice`]: classify a submitted line as a [`Choice`]
use async_trait::async_trait;

mod choice;
mod keyboard;
mod line;

pub use choice::{parse_choice, Choice};
pub use keyboard::{KeyboardInput, LineEditor};
pub use line::{classify_line, LineInput};

/// One thing the user did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    /// A submitted line, without its terminator.
    Line(String),
    /// The spacebar side channel: read the current options again.
    RepeatOptions,
    /// No more input will arrive.
    Closed,
}

#[async_trait]
pub trait InputSource: Send {
    /// Wait for the next event. Returns [`InputEvent::Closed`] forever once the
    /// source is exhausted.
    async fn next_event(&mut self) -> InputEvent;

    /// Stop producing events and release the terminal.
    fn close(&mut self);
}
