//! Page convergence and interactive navigation.
//!
//! This crate is the narrator's core. It is written against the
//! [`narrate_drivers::page::BrowserPage`] trait and an injectable [`clock::Clock`],
//! so every wait is a bounded poll and tests run without a browser or real
//! sleeping.
//!
//! - [`extract::ContentExtractor`]: bounded HTML fragment for the summarizer
//! - [`convergence::ConvergenceDetector`]: has the page finished changing?
//! - [`registry::ClickableRegistry`]: deduplicated, paginated options
//! - [`resolver::ElementResolver`]: click an option, re-finding stale elements
//! - [`navigator::Navigator`]: the state machine tying them together
//!
//! ```no_run
//! # async fn demo<P: narrate_drivers::page::BrowserPage>(
//! #     page: P,
//! #     summarizer: std::sync::Arc<dyn narrate_llm::summarizer::PageSummarizer>,
//! #     speech: std::sync::Arc<dyn narrate_speech::SpeechSink>,
//! # ) -> narrate_common::Result<()> {
//! use narrate_nav::clock::TokioClock;
//! use narrate_nav::navigator::{Navigator, NavigatorOptions};
//!
//! let mut input = narrate_input::LineInput::stdin();
//! let mut nav = Navigator::new(page, summarizer, speech, TokioClock, NavigatorOptions::default());
//! nav.run(&mut input).await?;
//! # Ok(()) }
//! ```

pub mod announce;
pub mod clock;
pub mod convergence;
pub mod extract;
pub mod navigator;
pub mod registry;
pub mod resolver;
pub mod session;
