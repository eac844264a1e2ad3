#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use narrate_drivers::page::{
    BrowserPage, ElementInfo, ElementQuery, PageSnapshot, VisibleContent, TEXT_SAMPLE_CHARS,
};
use narrate_input::{InputEvent, InputSource};
use narrate_llm::summarizer::{PageAnalysis, PageSummarizer};
use narrate_nav::clock::Clock;
use narrate_nav::registry::CLICKABLE_SELECTORS;
use narrate_nav::resolver::{text_xpath, REFRESH_SELECTOR};
use narrate_speech::SpeechSink;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::{Duration, Instant};

use narrate_common::observability::{LogConfig, LogFormat};

static INIT_PATH: OnceLock<std::path::PathBuf> = OnceLock::new();

pub fn init_test_tracing() {
    let _ = INIT_PATH.get_or_init(|| {
        let config = LogConfig {
            app_name: "narrate-tests",
            emit_stderr: false,
            format: LogFormat::Text,
            default_filter: "debug",
            log_dir: Some(std::env::temp_dir().join("narrate-tests")),
        };
        narrate_common::observability::init_logging(config).unwrap_or_default()
    });
}

// ---------------------------------------------------------------------------
// Fake page
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub enum ClickEffect {
    Nothing,
    Navigate(String),
    /// Same URL, new DOM.
    Rerender(FakeDocument),
    /// Opens `url` in a new window without moving focus.
    OpenWindow(String),
}

#[derive(Debug, Clone)]
pub struct FakeElement {
    pub selectors: Vec<String>,
    pub info: ElementInfo,
    pub html: String,
    pub click_fails: bool,
    pub script_click_fails: bool,
    pub effect: ClickEffect,
}

impl FakeElement {
    pub fn link(text: &str, href: &str) -> Self {
        Self {
            selectors: vec![CLICKABLE_SELECTORS[0].to_string(), REFRESH_SELECTOR.to_string()],
            info: ElementInfo {
                displayed: true,
                tag: "a".into(),
                text: text.into(),
                href: Some(href.into()),
                ..Default::default()
            },
            html: format!("<a href=\"{href}\">{text}</a>"),
            click_fails: false,
            script_click_fails: false,
            effect: ClickEffect::Navigate(href.into()),
        }
    }

    pub fn button(text: &str) -> Self {
        Self {
            selectors: vec![CLICKABLE_SELECTORS[1].to_string(), REFRESH_SELECTOR.to_string()],
            info: ElementInfo {
                displayed: true,
                tag: "button".into(),
                text: text.into(),
                ..Default::default()
            },
            html: format!("<button>{text}</button>"),
            click_fails: false,
            script_click_fails: false,
            effect: ClickEffect::Nothing,
        }
    }

    pub fn container(selector: &str, html: &str) -> Self {
        Self {
            selectors: vec![selector.to_string()],
            info: ElementInfo {
                displayed: true,
                tag: "div".into(),
                ..Default::default()
            },
            html: html.into(),
            click_fails: false,
            script_click_fails: false,
            effect: ClickEffect::Nothing,
        }
    }

    pub fn with_effect(mut self, effect: ClickEffect) -> Self {
        self.effect = effect;
        self
    }

    pub fn with_path(mut self, path: &str) -> Self {
        self.info.path = path.into();
        self
    }

    pub fn unclickable(mut self) -> Self {
        self.click_fails = true;
        self.script_click_fails = true;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.info.displayed = false;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct FakeDocument {
    pub url: String,
    pub elements: Vec<FakeElement>,
    pub visible: VisibleContent,
    pub cleaned_body: String,
    pub source: String,
    pub text: String,
}

impl FakeDocument {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.into(),
            source: format!("<html><body><p>{url}</p></body></html>"),
            text: format!("Page at {url}"),
            ..Default::default()
        }
    }

    pub fn with_element(mut self, mut element: FakeElement) -> Self {
        if element.info.path.is_empty() {
            element.info.path = format!("/html[1]/body[1]/*[{}]", self.elements.len() + 1);
        }
        self.elements.push(element);
        self
    }

    pub fn with_link(self, text: &str, href: &str) -> Self {
        self.with_element(FakeElement::link(text, href))
    }

    pub fn with_container(self, selector: &str, html: &str) -> Self {
        self.with_element(FakeElement::container(selector, html))
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_visible_texts(mut self, texts: &[&str]) -> Self {
        self.visible.texts = texts.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_cleaned_body(mut self, html: &str) -> Self {
        self.cleaned_body = html.into();
        self
    }

    fn snapshot(&self) -> PageSnapshot {
        let interactive = self
            .elements
            .iter()
            .filter(|e| e.selectors.iter().any(|s| s == REFRESH_SELECTOR))
            .count() as u64;
        PageSnapshot {
            url: self.url.clone(),
            window_count: 0,
            text_sample: self.text.chars().take(TEXT_SAMPLE_CHARS).collect(),
            node_count: 40 + self.elements.len() as u64 * 8,
            height: 800 + self.elements.len() as u32 * 60,
            width: 1280,
            interactive_count: interactive,
        }
    }
}

/// Opaque element reference. Goes stale whenever the page re-renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FakeHandle {
    generation: u64,
    index: usize,
}

#[derive(Debug, Default)]
struct FakeState {
    site: HashMap<String, FakeDocument>,
    current: FakeDocument,
    generation: u64,
    windows: usize,
    pending_window: Option<String>,
    clicks: Vec<String>,
    script_clicks: Vec<String>,
    scrolls: usize,
    broken: bool,
}

/// In-memory [`BrowserPage`]: a set of documents keyed by URL, clicks that
/// navigate between them, and handles that go stale on re-render.
#[derive(Debug, Clone, Default)]
pub struct FakePage {
    state: Arc<Mutex<FakeState>>,
}

impl FakePage {
    pub fn new(documents: Vec<FakeDocument>) -> Self {
        let state = FakeState {
            site: documents.into_iter().map(|d| (d.url.clone(), d)).collect(),
            current: FakeDocument::new("about:blank"),
            windows: 1,
            ..Default::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// A page whose every operation fails.
    pub fn broken() -> Self {
        let page = Self::new(Vec::new());
        page.state.lock().unwrap().broken = true;
        page
    }

    /// Show `document` directly, as if it had just loaded.
    pub fn show(&self, document: FakeDocument) {
        let mut s = self.state.lock().unwrap();
        s.current = document;
        s.generation += 1;
    }

    /// Builder form of [`FakePage::show`].
    pub fn showing(self, document: FakeDocument) -> Self {
        self.show(document);
        self
    }

    /// Re-render the current document; existing handles go stale.
    pub fn rerender(&self) {
        self.state.lock().unwrap().generation += 1;
    }

    pub fn handle(&self, index: usize) -> FakeHandle {
        FakeHandle {
            generation: self.state.lock().unwrap().generation,
            index,
        }
    }

    pub fn url(&self) -> String {
        self.state.lock().unwrap().current.url.clone()
    }

    /// Identifiers of elements clicked natively, in order.
    pub fn clicks(&self) -> Vec<String> {
        self.state.lock().unwrap().clicks.clone()
    }

    pub fn script_clicks(&self) -> Vec<String> {
        self.state.lock().unwrap().script_clicks.clone()
    }

    pub fn scrolls(&self) -> usize {
        self.state.lock().unwrap().scrolls
    }

    fn check(&self) -> Result<std::sync::MutexGuard<'_, FakeState>> {
        let s = self.state.lock().unwrap();
        if s.broken {
            return Err(anyhow!("browser session lost"));
        }
        Ok(s)
    }

    fn element(&self, handle: &FakeHandle) -> Result<FakeElement> {
        let s = self.check()?;
        if handle.generation != s.generation {
            return Err(anyhow!("stale element reference"));
        }
        s.current
            .elements
            .get(handle.index)
            .cloned()
            .ok_or_else(|| anyhow!("no such element"))
    }

    fn apply(&self, element: &FakeElement, script: bool) -> Result<()> {
        let fails = if script {
            element.script_click_fails
        } else {
            element.click_fails
        };
        if fails {
            return Err(anyhow!("element click intercepted"));
        }

        let mut s = self.check()?;
        let name = if element.info.text.is_empty() {
            element.info.path.clone()
        } else {
            element.info.text.clone()
        };
        if script {
            s.script_clicks.push(name);
        } else {
            s.clicks.push(name);
        }

        match &element.effect {
            ClickEffect::Nothing => {}
            ClickEffect::Navigate(url) => {
                let next = s
                    .site
                    .get(url)
                    .cloned()
                    .unwrap_or_else(|| FakeDocument::new(url));
                s.current = next;
                s.generation += 1;
            }
            ClickEffect::Rerender(document) => {
                s.current = document.clone();
                s.generation += 1;
            }
            ClickEffect::OpenWindow(url) => {
                s.windows += 1;
                s.pending_window = Some(url.clone());
            }
        }
        Ok(())
    }
}

#[async_trait]
impl BrowserPage for FakePage {
    type Handle = FakeHandle;

    async fn goto(&self, url: &str) -> Result<()> {
        let mut s = self.check()?;
        let next = s
            .site
            .get(url)
            .cloned()
            .ok_or_else(|| anyhow!("net::ERR_NAME_NOT_RESOLVED {url}"))?;
        s.current = next;
        s.generation += 1;
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.check()?.current.url.clone())
    }

    async fn ready_state(&self) -> Result<String> {
        self.check()?;
        Ok("complete".into())
    }

    async fn page_source(&self) -> Result<String> {
        Ok(self.check()?.current.source.clone())
    }

    async fn find_all(&self, query: &ElementQuery) -> Result<Vec<FakeHandle>> {
        let s = self.check()?;
        let generation = s.generation;
        let matches = s
            .current
            .elements
            .iter()
            .enumerate()
            .filter(|(_, el)| match query {
                ElementQuery::Css(selector) => el.selectors.iter().any(|sel| sel == selector),
                ElementQuery::XPath(expr) => {
                    el.info.path == *expr
                        || (!el.info.text.is_empty() && text_xpath(&el.info.tag, &el.info.text) == *expr)
                }
            })
            .map(|(index, _)| FakeHandle { generation, index })
            .collect();
        Ok(matches)
    }

    async fn outer_html(&self, element: &FakeHandle) -> Result<String> {
        Ok(self.element(element)?.html)
    }

    async fn describe(&self, element: &FakeHandle) -> Result<ElementInfo> {
        Ok(self.element(element)?.info)
    }

    async fn scroll_into_view(&self, element: &FakeHandle) -> Result<()> {
        self.element(element).map(|_| ())
    }

    async fn click(&self, element: &FakeHandle) -> Result<()> {
        let el = self.element(element)?;
        self.apply(&el, false)
    }

    async fn script_click(&self, element: &FakeHandle) -> Result<()> {
        let el = self.element(element)?;
        self.apply(&el, true)
    }

    async fn snapshot(&self) -> Result<PageSnapshot> {
        let s = self.check()?;
        let mut snapshot = s.current.snapshot();
        snapshot.window_count = s.windows;
        Ok(snapshot)
    }

    async fn visible_content(&self) -> Result<VisibleContent> {
        Ok(self.check()?.current.visible.clone())
    }

    async fn cleaned_body(&self) -> Result<String> {
        Ok(self.check()?.current.cleaned_body.clone())
    }

    async fn scroll_height(&self) -> Result<u32> {
        Ok(self.check()?.current.snapshot().height)
    }

    async fn scroll_to(&self, _y: u32) -> Result<()> {
        self.check()?.scrolls += 1;
        Ok(())
    }

    async fn scroll_by(&self, _dy: i32) -> Result<()> {
        self.check()?.scrolls += 1;
        Ok(())
    }

    async fn window_count(&self) -> Result<usize> {
        Ok(self.check()?.windows)
    }

    async fn switch_to_newest_window(&self) -> Result<()> {
        let mut s = self.check()?;
        if let Some(url) = s.pending_window.take() {
            let next = s
                .site
                .get(&url)
                .cloned()
                .unwrap_or_else(|| FakeDocument::new(&url));
            s.current = next;
            s.generation += 1;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Collaborators
// ---------------------------------------------------------------------------

/// Clock that advances only when slept on.
#[derive(Debug, Clone)]
pub struct FakeClock {
    base: Instant,
    offset: Arc<Mutex<Duration>>,
}

impl Default for FakeClock {
    fn default() -> Self {
        Self {
            base: Instant::now(),
            offset: Arc::new(Mutex::new(Duration::ZERO)),
        }
    }
}

impl FakeClock {
    pub fn elapsed(&self) -> Duration {
        *self.offset.lock().unwrap()
    }
}

#[async_trait]
impl Clock for FakeClock {
    fn now(&self) -> Instant {
        self.base + *self.offset.lock().unwrap()
    }

    async fn sleep(&self, duration: Duration) {
        *self.offset.lock().unwrap() += duration;
        tokio::task::yield_now().await;
    }
}

#[derive(Debug, Clone, Default)]
pub struct RecordingSpeaker {
    spoken: Arc<Mutex<Vec<String>>>,
}

impl RecordingSpeaker {
    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().unwrap().clone()
    }

    pub fn said(&self, exact: &str) -> bool {
        self.spoken().iter().any(|s| s == exact)
    }

    pub fn said_containing(&self, needle: &str) -> usize {
        self.spoken().iter().filter(|s| s.contains(needle)).count()
    }

    pub fn position(&self, exact: &str) -> Option<usize> {
        self.spoken().iter().position(|s| s == exact)
    }
}

#[async_trait]
impl SpeechSink for RecordingSpeaker {
    async fn speak(&self, text: &str) {
        if !text.trim().is_empty() {
            self.spoken.lock().unwrap().push(text.to_string());
        }
    }
}

/// Returns queued analyses in order, then a fixed fallback.
#[derive(Debug, Default)]
pub struct ScriptedSummarizer {
    replies: Mutex<VecDeque<PageAnalysis>>,
    fragments: Mutex<Vec<String>>,
}

impl ScriptedSummarizer {
    pub fn new(summaries: &[&str]) -> Self {
        let replies = summaries
            .iter()
            .map(|s| PageAnalysis {
                summary: s.to_string(),
                click_selector: String::new(),
            })
            .collect();
        Self {
            replies: Mutex::new(replies),
            fragments: Mutex::new(Vec::new()),
        }
    }

    pub fn with_replies(replies: Vec<PageAnalysis>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            fragments: Mutex::new(Vec::new()),
        }
    }

    pub fn fragments(&self) -> Vec<String> {
        self.fragments.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageSummarizer for ScriptedSummarizer {
    async fn analyze(&self, fragment: &str) -> PageAnalysis {
        self.fragments.lock().unwrap().push(fragment.to_string());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| PageAnalysis {
                summary: "Nothing else to report.".into(),
                click_selector: String::new(),
            })
    }
}

/// Feeds a fixed list of events, then reports closed.
#[derive(Debug, Default)]
pub struct ScriptedInput {
    events: VecDeque<InputEvent>,
    pub closed: bool,
}

impl ScriptedInput {
    pub fn lines(lines: &[&str]) -> Self {
        Self::events(lines.iter().map(|l| InputEvent::Line(l.to_string())).collect())
    }

    pub fn events(events: Vec<InputEvent>) -> Self {
        Self {
            events: events.into(),
            closed: false,
        }
    }
}

#[async_trait]
impl InputSource for ScriptedInput {
    async fn next_event(&mut self) -> InputEvent {
        self.events.pop_front().unwrap_or(InputEvent::Closed)
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

/// HTML large enough to be accepted as a content container.
pub fn article(topic: &str) -> String {
    format!(
        "<article><h1>{topic}</h1><p>{}</p></article>",
        format!("{topic} is described at length here. ").repeat(10)
    )
}
