use crate::announce;
use crate::clock::Clock;
use crate::convergence::{ConvergenceDetector, ConvergenceOptions, Settled};
use crate::extract::{ContentExtractor, FragmentSource};
use crate::registry::{discover, RegistryEntry};
use crate::resolver::ElementResolver;
use crate::session::{text_delta, NavState, NavigationSession};
use narrate_common::Result;
use narrate_config::NarrateConfig;
use narrate_drivers::page::{BrowserPage, PageSnapshot};
use narrate_input::{parse_choice, Choice, InputEvent, InputSource};
use narrate_llm::summarizer::{normalize_summary, PageSummarizer};
use narrate_speech::SpeechSink;
use std::sync::Arc;
use std::time::Duration;

/// Most new text blocks read out by the in-place change shortcut.
const DELTA_MAX_LINES: usize = 10;

#[derive(Debug, Clone)]
pub struct NavigatorOptions {
    pub start_url: String,
    pub page_size: usize,
    pub load_timeout: Duration,
    pub click_selector_timeout: Duration,
    /// Read only new text when a click changes the page without navigating.
    pub text_delta_shortcut: bool,
    pub scroll_probe: bool,
    pub convergence: ConvergenceOptions,
}

impl Default for NavigatorOptions {
    fn default() -> Self {
        Self {
            start_url: "https://www.google.com/".to_string(),
            page_size: crate::registry::DEFAULT_PAGE_SIZE,
            load_timeout: Duration::from_secs(10),
            click_selector_timeout: Duration::from_secs(10),
            text_delta_shortcut: false,
            scroll_probe: true,
            convergence: ConvergenceOptions::default(),
        }
    }
}

impl From<&NarrateConfig> for NavigatorOptions {
    fn from(cfg: &NarrateConfig) -> Self {
        Self {
            start_url: cfg.start_url.clone(),
            page_size: cfg.navigation.page_size.max(1),
            load_timeout: Duration::from_secs(cfg.browser.load_timeout_secs),
            click_selector_timeout: Duration::from_secs(cfg.navigation.click_selector_timeout_secs),
            text_delta_shortcut: cfg.navigation.text_delta_shortcut,
            scroll_probe: true,
            convergence: ConvergenceOptions::from(&cfg.navigation),
        }
    }
}

/// Drives one browsing session: load, summarize, list options, follow the
/// user's choices until they exit.
pub struct Navigator<P: BrowserPage, C: Clock> {
    page: P,
    summarizer: Arc<dyn PageSummarizer>,
    speech: Arc<dyn SpeechSink>,
    options: NavigatorOptions,
    extractor: ContentExtractor<C>,
    convergence: ConvergenceDetector<C>,
    resolver: ElementResolver<C>,
    session: NavigationSession<P::Handle>,
}

impl<P: BrowserPage, C: Clock> Navigator<P, C> {
    pub fn new(
        page: P,
        summarizer: Arc<dyn PageSummarizer>,
        speech: Arc<dyn SpeechSink>,
        clock: C,
        options: NavigatorOptions,
    ) -> Self {
        let session = NavigationSession::new(&options.start_url, options.page_size);
        Self {
            page,
            summarizer,
            speech,
            extractor: ContentExtractor::new(clock.clone()).with_scroll_probe(options.scroll_probe),
            convergence: ConvergenceDetector::new(clock.clone(), options.convergence.clone()),
            resolver: ElementResolver::new(clock),
            options,
            session,
        }
    }

    pub fn session(&self) -> &NavigationSession<P::Handle> {
        &self.session
    }

    pub fn page(&self) -> &P {
        &self.page
    }

    /// Run until the user exits or input ends.
    pub async fn run<I: InputSource>(&mut self, input: &mut I) -> Result<()> {
        self.open_start_page().await;

        loop {
            self.enter(NavState::AwaitingChoice);
            match input.next_event().await {
                InputEvent::Closed => {
                    tracing::info!(target: "nav.loop", "input closed");
                    break;
                }
                InputEvent::RepeatOptions => {
                    if self.session.interactive {
                        self.announce_options().await;
                    }
                }
                InputEvent::Line(line) => match parse_choice(&line) {
                    Choice::Exit => break,
                    Choice::NextPage => {
                        self.session.registry.advance();
                        self.announce_options().await;
                    }
                    Choice::Invalid(raw) => {
                        tracing::debug!(target: "nav.loop", %raw, "not a number");
                        self.speech.speak(announce::INVALID_NUMBER).await;
                    }
                    Choice::Option(number) => {
                        let entry = self.session.registry.option(number).cloned();
                        match entry {
                            Some(entry) => self.follow(number - 1, entry).await,
                            None => {
                                tracing::debug!(
                                    target: "nav.loop",
                                    number,
                                    available = self.session.registry.len(),
                                    "option out of range"
                                );
                                self.speech.speak(announce::INVALID_OPTION).await;
                            }
                        }
                    }
                },
            }
        }

        self.session.interactive = false;
        input.close();
        self.enter(NavState::Exited);
        Ok(())
    }

    async fn open_start_page(&mut self) {
        self.enter(NavState::Loading);
        let start_url = self.options.start_url.clone();
        self.speech.speak(&announce::visiting(&self.session.domain)).await;

        if let Err(e) = self.page.goto(&start_url).await {
            tracing::warn!(target: "nav.loop", url = %start_url, error = %e, "initial navigation failed");
        }
        self.convergence
            .await_ready(&self.page, self.options.load_timeout)
            .await;
        self.sync_url().await;

        self.enter(NavState::Summarizing);
        if let Some(html) = self.extract().await {
            let first = self.summarizer.analyze(&html).await;
            let mut summary = normalize_summary(&first.summary);

            let selector = first.click_selector.trim();
            if !selector.is_empty() {
                if let Some(second) = self.follow_suggestion(selector).await {
                    summary = second;
                }
            }
            self.speak_summary(&summary).await;
        }

        self.refresh_registry().await;
        self.announce_options().await;
    }

    /// Click the selector the model suggested and summarize what it reveals.
    async fn follow_suggestion(&mut self, selector: &str) -> Option<String> {
        tracing::info!(target: "nav.loop", selector, "following suggested selector");
        let baseline = self.baseline().await;
        let outcome = self
            .resolver
            .click_selector(&self.page, selector, self.options.click_selector_timeout)
            .await;
        if !outcome.clicked {
            return None;
        }

        self.convergence.await_settled(&self.page, &baseline).await;
        self.sync_url().await;
        let html = self.extract().await?;
        let summary = normalize_summary(&self.summarizer.analyze(&html).await.summary);
        (!summary.trim().is_empty()).then_some(summary)
    }

    async fn follow(&mut self, ordinal: usize, entry: RegistryEntry<P::Handle>) {
        self.enter(NavState::Clicking);
        let baseline = self.baseline().await;
        let outcome = self
            .resolver
            .resolve_and_click(&self.page, &entry.descriptor, entry.hint.as_ref(), ordinal)
            .await;

        if !outcome.clicked {
            self.speech.speak(announce::CLICK_FAILED).await;
            self.refresh_registry().await;
            self.announce_options().await;
            return;
        }

        self.enter(NavState::Settling);
        let settled = self.convergence.await_settled(&self.page, &baseline).await;
        self.sync_url().await;
        self.speech
            .speak(&announce::selected(&entry.descriptor.text, &self.session.domain))
            .await;

        self.enter(NavState::Summarizing);
        let in_place = matches!(settled, Settled::DomChanged(_));
        if !(in_place && self.options.text_delta_shortcut && self.speak_delta().await) {
            if let Some(html) = self.extract().await {
                let analysis = self.summarizer.analyze(&html).await;
                self.speak_summary(&normalize_summary(&analysis.summary)).await;
            }
        }

        self.refresh_registry().await;
        self.announce_options().await;
    }

    /// Speak only text that appeared since the last extraction. Returns
    /// `false` when there is nothing new to say.
    async fn speak_delta(&mut self) -> bool {
        let current = match self.page.visible_content().await {
            Ok(content) => content.texts,
            Err(e) => {
                tracing::debug!(target: "nav.loop", error = %e, "delta unavailable");
                return false;
            }
        };
        let delta = text_delta(&self.session.seen_text, &current);
        if delta.is_empty() {
            tracing::info!(target: "nav.loop", "empty delta; summarizing instead");
            return false;
        }
        tracing::info!(target: "nav.loop", lines = delta.len(), "announcing changed text");
        let lines: Vec<&str> = delta
            .iter()
            .take(DELTA_MAX_LINES)
            .map(|l| l.trim_end_matches('.'))
            .collect();
        self.speech
            .speak(&format!("New content: {}.", lines.join(". ")))
            .await;
        self.session.seen_text = current;
        true
    }

    /// Extract the current page. `None` means nothing usable came back and
    /// the failure has already been announced.
    async fn extract(&mut self) -> Option<String> {
        let fragment = self.extractor.extract(&self.page).await;
        if self.options.text_delta_shortcut {
            if let Ok(content) = self.page.visible_content().await {
                self.session.seen_text = content.texts;
            }
        }
        if fragment.source == FragmentSource::Empty || fragment.html.trim().is_empty() {
            self.speech.speak(announce::EXTRACT_FAILED).await;
            return None;
        }
        tracing::debug!(target: "nav.loop", source = ?fragment.source, len = fragment.html.len(), "extracted");
        Some(fragment.html)
    }

    async fn speak_summary(&self, summary: &str) {
        if summary.trim().is_empty() {
            self.speech.speak(announce::ANALYSIS_FAILED).await;
        } else {
            tracing::info!(target: "nav.loop", %summary, "summary");
            self.speech.speak(summary).await;
        }
    }

    async fn refresh_registry(&mut self) {
        match discover(&self.page, self.options.page_size).await {
            Ok(registry) => self.session.replace_registry(registry),
            Err(e) => {
                tracing::warn!(target: "nav.loop", error = %e, "clickable discovery failed");
                self.speech.speak(announce::DISCOVERY_FAILED).await;
                self.session
                    .replace_registry(crate::registry::ClickableRegistry::empty(self.options.page_size));
            }
        }
        self.session.interactive = true;
    }

    async fn announce_options(&self) {
        self.speech
            .speak(&announce::options(&self.session.registry))
            .await;
    }

    async fn baseline(&self) -> PageSnapshot {
        match self.page.snapshot().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::debug!(target: "nav.loop", error = %e, "baseline snapshot failed");
                PageSnapshot {
                    url: self.session.url.clone(),
                    ..PageSnapshot::default()
                }
            }
        }
    }

    async fn sync_url(&mut self) {
        match self.page.current_url().await {
            Ok(url) => self.session.set_url(url),
            Err(e) => tracing::debug!(target: "nav.loop", error = %e, "current url unavailable"),
        }
    }

    fn enter(&mut self, state: NavState) {
        if self.session.state != state {
            tracing::debug!(target: "nav.loop", from = ?self.session.state, to = ?state, "state");
            self.session.state = state;
        }
    }
}
