use narrate_drivers::page::{BrowserPage, ElementInfo, ElementQuery};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Discovery selectors in priority order. Earlier selectors win ties in
/// announcement order.
pub const CLICKABLE_SELECTORS: &[&str] = &[
    "a[href]:not([href='']):not([href^='#']):not([aria-hidden='true'])",
    "button:not([aria-hidden='true'])",
    "[role='button']",
    "input[type='submit']",
    ".btn",
    "[onclick]",
    "[tabindex]:not([tabindex^='-'])",
];

pub const DEFAULT_PAGE_SIZE: usize = 5;
/// Identifier prefix length used for de-duplication and announcement.
pub const IDENTIFIER_PREFIX: usize = 30;
/// Cap on candidates inspected per discovery pass.
pub const MAX_CANDIDATES: usize = 400;

/// Durable identity for one interactive element.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementDescriptor {
    /// Rendered text, trimmed.
    pub text: String,
    /// First non-empty of aria-label, title, value.
    pub label: String,
    pub tag: String,
    pub href: Option<String>,
    /// XPath recorded at discovery time.
    pub path: String,
}

impl ElementDescriptor {
    /// Build a descriptor, or `None` when the element has nothing to call it by.
    pub fn from_info(info: &ElementInfo) -> Option<Self> {
        let text = info.text.trim().to_string();
        let label = [&info.aria_label, &info.title, &info.value]
            .into_iter()
            .flatten()
            .map(|s| s.trim())
            .find(|s| !s.is_empty())
            .unwrap_or_default()
            .to_string();
        if text.is_empty() && label.is_empty() {
            return None;
        }
        Some(Self {
            text,
            label,
            tag: info.tag.to_ascii_lowercase(),
            href: info
                .href
                .as_ref()
                .map(|h| h.trim().to_string())
                .filter(|h| !h.is_empty()),
            path: info.path.clone(),
        })
    }

    /// What the element is called: its text, else its label.
    pub fn identifier(&self) -> &str {
        if self.text.is_empty() {
            &self.label
        } else {
            &self.text
        }
    }

    /// Case-folded identifier prefix used to spot duplicates.
    pub fn dedup_key(&self) -> String {
        self.identifier()
            .chars()
            .take(IDENTIFIER_PREFIX)
            .collect::<String>()
            .to_lowercase()
    }

    /// Identifier shortened for speech.
    pub fn announce_label(&self) -> String {
        let id = self.identifier();
        if id.chars().count() < IDENTIFIER_PREFIX {
            id.to_string()
        } else {
            let mut short: String = id.chars().take(IDENTIFIER_PREFIX - 3).collect();
            short.push_str("...");
            short
        }
    }
}

/// One registered element: its descriptor plus the handle it was found with.
#[derive(Debug, Clone)]
pub struct RegistryEntry<H> {
    pub descriptor: ElementDescriptor,
    /// Live handle from discovery. May be stale by the time it is used.
    pub hint: Option<H>,
}

/// Drop entries whose identifier prefix was already seen. First seen wins.
pub fn dedup_entries<H>(entries: Vec<RegistryEntry<H>>) -> Vec<RegistryEntry<H>> {
    let mut seen = HashSet::new();
    entries
        .into_iter()
        .filter(|entry| seen.insert(entry.descriptor.dedup_key()))
        .collect()
}

/// The numbered, paginated list of options the user picks from.
#[derive(Debug, Clone)]
pub struct ClickableRegistry<H> {
    entries: Vec<RegistryEntry<H>>,
    page_size: usize,
    current_page: usize,
}

impl<H> Default for ClickableRegistry<H> {
    fn default() -> Self {
        Self::new(Vec::new(), DEFAULT_PAGE_SIZE)
    }
}

impl<H> ClickableRegistry<H> {
    /// Build a registry from discovery-ordered entries, removing duplicates.
    pub fn new(entries: Vec<RegistryEntry<H>>, page_size: usize) -> Self {
        Self {
            entries: dedup_entries(entries),
            page_size: page_size.max(1),
            current_page: 0,
        }
    }

    pub fn empty(page_size: usize) -> Self {
        Self::new(Vec::new(), page_size)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn entries(&self) -> &[RegistryEntry<H>] {
        &self.entries
    }

    /// 0-based index of the active page.
    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn page_count(&self) -> usize {
        self.entries.len().div_ceil(self.page_size)
    }

    pub fn has_next_page(&self) -> bool {
        self.current_page + 1 < self.page_count()
    }

    /// Move to the next page. Returns `false`, leaving the page unchanged, when
    /// already on the last one.
    pub fn advance(&mut self) -> bool {
        if self.has_next_page() {
            self.current_page += 1;
            true
        } else {
            false
        }
    }

    /// Global index of the first item on the active page.
    pub fn page_start(&self) -> usize {
        self.current_page * self.page_size
    }

    /// The active page's slice.
    pub fn current_page_items(&self) -> &[RegistryEntry<H>] {
        let start = self.page_start().min(self.entries.len());
        let end = (start + self.page_size).min(self.entries.len());
        &self.entries[start..end]
    }

    /// "Page X of Y", 1-based.
    pub fn page_marker(&self) -> String {
        format!("Page {} of {}", self.current_page + 1, self.page_count().max(1))
    }

    /// Look up a 1-based option number.
    pub fn option(&self, number: usize) -> Option<&RegistryEntry<H>> {
        number.checked_sub(1).and_then(|i| self.entries.get(i))
    }
}

/// Scan the page for clickable elements and build a fresh registry.
///
/// Candidates that cannot be described, are hidden, or have no identifier are
/// skipped. Fails only when no selector could be queried at all.
pub async fn discover<P: BrowserPage>(
    page: &P,
    page_size: usize,
) -> anyhow::Result<ClickableRegistry<P::Handle>> {
    let mut entries = Vec::new();
    let mut inspected = 0usize;
    let mut failures = 0usize;
    let mut last_error = None;

    'selectors: for &selector in CLICKABLE_SELECTORS {
        let handles = match page.find_all(&ElementQuery::css(selector)).await {
            Ok(found) => found,
            Err(e) => {
                tracing::debug!(target: "nav.registry", selector, error = %e, "selector lookup failed");
                failures += 1;
                last_error = Some(e);
                continue;
            }
        };
        for handle in handles {
            if inspected >= MAX_CANDIDATES {
                break 'selectors;
            }
            inspected += 1;
            let info = match page.describe(&handle).await {
                Ok(info) => info,
                Err(_) => continue,
            };
            if !info.displayed {
                continue;
            }
            if let Some(descriptor) = ElementDescriptor::from_info(&info) {
                entries.push(RegistryEntry {
                    descriptor,
                    hint: Some(handle),
                });
            }
        }
    }

    if failures == CLICKABLE_SELECTORS.len() {
        if let Some(e) = last_error {
            return Err(e);
        }
    }

    let found = entries.len();
    let registry = ClickableRegistry::new(entries, page_size);
    tracing::info!(
        target: "nav.registry",
        inspected,
        visible = found,
        unique = registry.len(),
        "clickable elements discovered"
    );
    Ok(registry)
}
