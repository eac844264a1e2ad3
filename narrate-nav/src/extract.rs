use crate::clock::Clock;
use narrate_drivers::page::{BrowserPage, ElementQuery, VisibleContent};
use std::fmt::Write;
use std::time::Duration;

/// Content containers tried in priority order.
pub const CONTENT_SELECTORS: &[&str] = &[
    "article",
    "main",
    "#content",
    ".content",
    "#main",
    ".main",
    "section",
    "[role='main']",
    ".post",
    ".article",
    ".page-content",
    ".entry-content",
];

/// Smallest container, in characters of serialized HTML, accepted as the
/// page's primary content.
pub const MIN_CONTAINER_CHARS: usize = 200;

const PROBE_MAX_SCROLL_PX: u32 = 1000;
const PROBE_PAUSE: Duration = Duration::from_millis(500);

/// Which strategy produced a fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FragmentSource {
    Container(&'static str),
    VisibleContent,
    CleanedBody,
    PageSource,
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub html: String,
    pub source: FragmentSource,
}

/// Pulls a representative HTML fragment out of the current page.
#[derive(Debug, Clone)]
pub struct ContentExtractor<C> {
    clock: C,
    min_container_chars: usize,
    scroll_probe: bool,
}

impl<C: Clock> ContentExtractor<C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            min_container_chars: MIN_CONTAINER_CHARS,
            scroll_probe: true,
        }
    }

    pub fn with_min_container_chars(mut self, chars: usize) -> Self {
        self.min_container_chars = chars;
        self
    }

    pub fn with_scroll_probe(mut self, enabled: bool) -> Self {
        self.scroll_probe = enabled;
        self
    }

    /// Extract the page's primary content. Always returns a fragment; each
    /// strategy that fails hands over to the next.
    pub async fn extract<P: BrowserPage>(&self, page: &P) -> Fragment {
        if self.scroll_probe {
            self.probe_lazy_content(page).await;
        }

        if let Some(fragment) = self.largest_container(page).await {
            return fragment;
        }

        match page.visible_content().await {
            Ok(content) if !content.is_empty() => {
                tracing::info!(
                    target: "nav.extract",
                    texts = content.texts.len(),
                    links = content.links.len(),
                    "using visible content"
                );
                return Fragment {
                    html: render_visible_content(&content),
                    source: FragmentSource::VisibleContent,
                };
            }
            Ok(_) => tracing::debug!(target: "nav.extract", "no visible content"),
            Err(e) => tracing::debug!(target: "nav.extract", error = %e, "visible content probe failed"),
        }

        match page.cleaned_body().await {
            Ok(html) if !html.trim().is_empty() => {
                tracing::info!(target: "nav.extract", len = html.len(), "using cleaned body");
                return Fragment {
                    html,
                    source: FragmentSource::CleanedBody,
                };
            }
            Ok(_) => {}
            Err(e) => tracing::debug!(target: "nav.extract", error = %e, "cleaned body failed"),
        }

        match page.page_source().await {
            Ok(html) => {
                tracing::info!(target: "nav.extract", len = html.len(), "using full page source");
                Fragment {
                    html,
                    source: FragmentSource::PageSource,
                }
            }
            Err(e) => {
                tracing::warn!(target: "nav.extract", error = %e, "page source unavailable");
                Fragment {
                    html: String::new(),
                    source: FragmentSource::Empty,
                }
            }
        }
    }

    async fn largest_container<P: BrowserPage>(&self, page: &P) -> Option<Fragment> {
        for &selector in CONTENT_SELECTORS {
            let elements = match page.find_all(&ElementQuery::css(selector)).await {
                Ok(found) => found,
                Err(e) => {
                    tracing::debug!(target: "nav.extract", selector, error = %e, "selector lookup failed");
                    continue;
                }
            };

            let mut best = String::new();
            for element in &elements {
                if let Ok(html) = page.outer_html(element).await {
                    if html.len() > best.len() {
                        best = html;
                    }
                }
            }

            if best.chars().count() > self.min_container_chars {
                tracing::info!(target: "nav.extract", selector, len = best.len(), "found content container");
                return Some(Fragment {
                    html: best,
                    source: FragmentSource::Container(selector),
                });
            }
        }
        None
    }

    async fn probe_lazy_content<P: BrowserPage>(&self, page: &P) {
        let height = match page.scroll_height().await {
            Ok(h) => h,
            Err(e) => {
                tracing::debug!(target: "nav.extract", error = %e, "scroll probe skipped");
                return;
            }
        };
        let target = (height / 2).min(PROBE_MAX_SCROLL_PX);
        if target == 0 {
            return;
        }
        if page.scroll_to(target).await.is_ok() {
            self.clock.sleep(PROBE_PAUSE).await;
        }
        let _ = page.scroll_to(0).await;
    }
}

/// Render visible page content as a minimal HTML document.
pub fn render_visible_content(content: &VisibleContent) -> String {
    let mut html = String::from("<html><head>");
    let _ = write!(html, "<title>{}</title>", escape_html(&content.title));
    html.push_str("</head><body>");

    if !content.texts.is_empty() {
        html.push_str("<div class=\"content\">");
        for text in &content.texts {
            let _ = write!(html, "<p>{}</p>", escape_html(text));
        }
        html.push_str("</div>");
    }
    if !content.links.is_empty() {
        html.push_str("<div class=\"links\">");
        for link in &content.links {
            let _ = write!(
                html,
                "<a href=\"{}\">{}</a>",
                escape_html(&link.href),
                escape_html(&link.text)
            );
        }
        html.push_str("</div>");
    }
    if !content.buttons.is_empty() {
        html.push_str("<div class=\"buttons\">");
        for button in &content.buttons {
            let _ = write!(html, "<button>{}</button>", escape_html(button));
        }
        html.push_str("</div>");
    }
    if !content.inputs.is_empty() {
        html.push_str("<div class=\"inputs\">");
        for input in &content.inputs {
            let _ = write!(html, "<input placeholder=\"{}\">", escape_html(input));
        }
        html.push_str("</div>");
    }

    html.push_str("</body></html>");
    html
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
