//! Spoken output for the narrator.
//!
//! - [`SpeechSink`]: fire-and-forget `speak(text)`; never fails
//! - [`Narrator`]: the production sink. Echoes every utterance to stdout, then
//!   speaks it through one backend, restarting the backend once and finally
//!   falling back to a one-shot OS command when it fails
//! - [`backend`]: `espeak` (long-lived process), macOS `say`, console-only
use async_trait::async_trait;

pub mod backend;
pub mod narrator;

pub use backend::{ConsoleBackend, EspeakBackend, OneShotCommand, SayBackend, SpeechBackend};
pub use narrator::Narrator;

/// Longest utterance handed to a backend; longer text is cut.
pub const MAX_UTTERANCE_CHARS: usize = 8_000;

/// Somewhere to send text that should be read aloud.
#[async_trait]
pub trait SpeechSink: Send + Sync {
    /// Speak `text`. Empty or whitespace-only text is ignored and failures are
    /// logged, never returned.
    async fn speak(&self, text: &str);
}

/// Make text safe for a line-oriented speech process.
///
/// Control characters are dropped, line breaks become spaces and the result is
/// trimmed and capped at [`MAX_UTTERANCE_CHARS`]. Returns `None` when nothing
/// speakable is left.
pub fn sanitize_utterance(text: &str) -> Option<String> {
    let cleaned: String = text
        .chars()
        .map(|c| if c == '\n' || c == '\r' || c == '\t' { ' ' } else { c })
        .filter(|c| !c.is_control())
        .take(MAX_UTTERANCE_CHARS)
        .collect();
    let trimmed = cleaned.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_text_is_not_spoken() {
        assert_eq!(sanitize_utterance(""), None);
        assert_eq!(sanitize_utterance("  \n\t "), None);
        assert_eq!(sanitize_utterance("\u{7}"), None);
    }

    #[test]
    fn line_breaks_collapse_to_spaces() {
        assert_eq!(
            sanitize_utterance(" Option 1: Home.\nOption 2: News. ").as_deref(),
            Some("Option 1: Home. Option 2: News.")
        );
    }

    #[test]
    fn long_text_is_capped() {
        let long = "a".repeat(MAX_UTTERANCE_CHARS + 50);
        assert_eq!(
            sanitize_utterance(&long).map(|s| s.chars().count()),
            Some(MAX_UTTERANCE_CHARS)
        );
    }
}
