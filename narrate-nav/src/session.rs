use crate::announce::domain_of;
use crate::registry::ClickableRegistry;

/// Where the navigation loop is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavState {
    Idle,
    Loading,
    Summarizing,
    AwaitingChoice,
    Clicking,
    Settling,
    Exited,
}

/// Mutable state of one browsing session.
#[derive(Debug)]
pub struct NavigationSession<H> {
    pub url: String,
    pub domain: String,
    pub registry: ClickableRegistry<H>,
    /// Whether the spacebar may repeat the options.
    pub interactive: bool,
    pub state: NavState,
    /// Visible text blocks seen at the last extraction, for change deltas.
    pub(crate) seen_text: Vec<String>,
}

impl<H> NavigationSession<H> {
    pub fn new(start_url: &str, page_size: usize) -> Self {
        Self {
            url: start_url.to_string(),
            domain: domain_of(start_url),
            registry: ClickableRegistry::empty(page_size),
            interactive: false,
            state: NavState::Idle,
            seen_text: Vec::new(),
        }
    }

    pub fn set_url(&mut self, url: String) {
        self.domain = domain_of(&url);
        self.url = url;
    }

    /// Swap in a freshly discovered registry. The old one is discarded whole.
    pub fn replace_registry(&mut self, registry: ClickableRegistry<H>) {
        self.registry = registry;
    }
}

/// Text blocks in `current` that were not in `previous`, in page order.
pub fn text_delta(previous: &[String], current: &[String]) -> Vec<String> {
    current
        .iter()
        .filter(|line| !previous.contains(line))
        .cloned()
        .collect()
}
