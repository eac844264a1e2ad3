use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Characters of visible body text captured in a [`PageSnapshot`].
pub const TEXT_SAMPLE_CHARS: usize = 1000;

/// Elements counted as interactive when snapshotting a page.
pub const INTERACTIVE_SELECTOR: &str =
    "a[href], button, [role='button'], input[type='submit'], [onclick], [tabindex]:not([tabindex^='-'])";

/// How to look up elements on the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementQuery {
    Css(String),
    XPath(String),
}

impl ElementQuery {
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    pub fn xpath(expr: impl Into<String>) -> Self {
        Self::XPath(expr.into())
    }
}

/// Everything the registry needs to know about one element, read in a single
/// round trip.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementInfo {
    #[serde(default)]
    pub displayed: bool,
    #[serde(default)]
    pub tag: String,
    /// Rendered text, whitespace-collapsed.
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub aria_label: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
    /// Raw `href` attribute, not the resolved URL.
    #[serde(default)]
    pub href: Option<String>,
    /// XPath that located the element at capture time.
    #[serde(default)]
    pub path: String,
}

/// Cheap fingerprint of the page used to decide whether an action changed it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageSnapshot {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub window_count: usize,
    /// First [`TEXT_SAMPLE_CHARS`] characters of the visible body text.
    #[serde(default)]
    pub text_sample: String,
    #[serde(default)]
    pub node_count: u64,
    #[serde(default)]
    pub height: u32,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub interactive_count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VisibleLink {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub href: String,
}

/// Text the user can currently see, grouped by kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VisibleContent {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub texts: Vec<String>,
    #[serde(default)]
    pub links: Vec<VisibleLink>,
    #[serde(default)]
    pub buttons: Vec<String>,
    #[serde(default)]
    pub inputs: Vec<String>,
}

impl VisibleContent {
    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
            && self.links.is_empty()
            && self.buttons.is_empty()
            && self.inputs.is_empty()
    }
}

/// A live page the narrator can read and act on.
///
/// `Handle` is an opaque reference to an element found on the page. Handles
/// may go stale once the page changes; every call taking one can fail.
#[async_trait]
pub trait BrowserPage: Send + Sync {
    type Handle: Clone + Send + Sync + 'static;

    async fn goto(&self, url: &str) -> Result<()>;
    async fn current_url(&self) -> Result<String>;
    /// `document.readyState` of the current document.
    async fn ready_state(&self) -> Result<String>;
    /// Full serialized HTML of the current document.
    async fn page_source(&self) -> Result<String>;

    async fn find_all(&self, query: &ElementQuery) -> Result<Vec<Self::Handle>>;
    async fn outer_html(&self, element: &Self::Handle) -> Result<String>;
    async fn describe(&self, element: &Self::Handle) -> Result<ElementInfo>;
    /// Scroll so the element sits in the middle of the viewport.
    async fn scroll_into_view(&self, element: &Self::Handle) -> Result<()>;
    /// Native WebDriver click.
    async fn click(&self, element: &Self::Handle) -> Result<()>;
    /// `element.click()` dispatched from page script.
    async fn script_click(&self, element: &Self::Handle) -> Result<()>;

    async fn snapshot(&self) -> Result<PageSnapshot>;
    async fn visible_content(&self) -> Result<VisibleContent>;
    /// Body HTML with scripts, styles and other non-content nodes removed.
    async fn cleaned_body(&self) -> Result<String>;

    async fn scroll_height(&self) -> Result<u32>;
    async fn scroll_to(&self, y: u32) -> Result<()>;
    async fn scroll_by(&self, dy: i32) -> Result<()>;

    async fn window_count(&self) -> Result<usize>;
    /// Move focus to the most recently opened window.
    async fn switch_to_newest_window(&self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn element_info_tolerates_missing_fields() {
        let info: ElementInfo = serde_json::from_value(json!({
            "displayed": true,
            "tag": "a",
            "text": "Docs",
            "href": "/docs",
            "aria_label": null
        }))
        .unwrap();
        assert!(info.displayed);
        assert_eq!(info.href.as_deref(), Some("/docs"));
        assert!(info.aria_label.is_none());
        assert!(info.path.is_empty());
    }

    #[test]
    fn visible_content_emptiness_ignores_title() {
        let content = VisibleContent {
            title: "Only a title".into(),
            ..Default::default()
        };
        assert!(content.is_empty());
    }
}
