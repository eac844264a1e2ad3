use crate::clock::{poll_until, Clock};
use crate::registry::ElementDescriptor;
use anyhow::anyhow;
use narrate_drivers::page::{BrowserPage, ElementQuery};
use std::time::Duration;

/// Pause between scrolling an element into view and clicking it.
pub const SETTLE_PAUSE: Duration = Duration::from_millis(500);
/// Generic selector for the last-resort refreshed lookup.
pub const REFRESH_SELECTOR: &str = "a, button";

const SELECTOR_POLL: Duration = Duration::from_millis(250);

/// Which strategy produced the click.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickMethod {
    Direct,
    Script,
    TextMatch,
    Href,
    Path,
    Refreshed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClickOutcome {
    pub clicked: bool,
    pub method: Option<ClickMethod>,
}

impl ClickOutcome {
    fn success(method: ClickMethod) -> Self {
        Self {
            clicked: true,
            method: Some(method),
        }
    }

    fn failure() -> Self {
        Self {
            clicked: false,
            method: None,
        }
    }
}

/// Clicks a registered element, re-finding it when the original handle no
/// longer works.
#[derive(Debug, Clone)]
pub struct ElementResolver<C> {
    clock: C,
}

impl<C: Clock> ElementResolver<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }

    /// Click the element `descriptor` names.
    ///
    /// `hint` is the handle captured at discovery; `ordinal` is the 0-based
    /// position the element had in the registry. Strategies run in order and
    /// each runs only when the previous one failed.
    pub async fn resolve_and_click<P: BrowserPage>(
        &self,
        page: &P,
        descriptor: &ElementDescriptor,
        hint: Option<&P::Handle>,
        ordinal: usize,
    ) -> ClickOutcome {
        if let Some(handle) = hint {
            if let Err(e) = page.scroll_into_view(handle).await {
                tracing::debug!(target: "nav.resolver", error = %e, "scroll into view failed");
            }
            self.clock.sleep(SETTLE_PAUSE).await;

            match page.click(handle).await {
                Ok(()) => return self.done(ClickMethod::Direct),
                Err(e) => tracing::info!(target: "nav.resolver", error = %e, "direct click failed"),
            }
            match page.script_click(handle).await {
                Ok(()) => return self.done(ClickMethod::Script),
                Err(e) => tracing::info!(target: "nav.resolver", error = %e, "script click failed"),
            }
        }

        if !descriptor.text.is_empty() {
            let query = ElementQuery::xpath(text_xpath(&descriptor.tag, &descriptor.text));
            match click_first(page, &query).await {
                Ok(()) => return self.done(ClickMethod::TextMatch),
                Err(e) => tracing::info!(target: "nav.resolver", ?query, error = %e, "text match failed"),
            }
        }

        if let Some(href) = &descriptor.href {
            let query = ElementQuery::css(format!("a[href=\"{}\"]", css_escape(href)));
            match click_first(page, &query).await {
                Ok(()) => return self.done(ClickMethod::Href),
                Err(e) => tracing::info!(target: "nav.resolver", ?query, error = %e, "href match failed"),
            }
        }

        if !descriptor.path.is_empty() {
            let query = ElementQuery::xpath(descriptor.path.clone());
            match click_first(page, &query).await {
                Ok(()) => return self.done(ClickMethod::Path),
                Err(e) => tracing::info!(target: "nav.resolver", ?query, error = %e, "saved path failed"),
            }
        }

        match click_refreshed(page, ordinal).await {
            Ok(()) => self.done(ClickMethod::Refreshed),
            Err(e) => {
                tracing::warn!(target: "nav.resolver", error = %e, "all click strategies failed");
                ClickOutcome::failure()
            }
        }
    }

    /// Wait for a displayed element matching `selector`, then click it.
    pub async fn click_selector<P: BrowserPage>(
        &self,
        page: &P,
        selector: &str,
        timeout: Duration,
    ) -> ClickOutcome {
        let query = ElementQuery::css(selector);
        let found = poll_until(&self.clock, timeout, SELECTOR_POLL, || async {
            let handles = page.find_all(&query).await.ok()?;
            for handle in handles {
                if page.describe(&handle).await.is_ok_and(|info| info.displayed) {
                    return Some(handle);
                }
            }
            None
        })
        .await;

        let Some(handle) = found else {
            tracing::info!(target: "nav.resolver", selector, "suggested selector never became visible");
            return ClickOutcome::failure();
        };

        let _ = page.scroll_into_view(&handle).await;
        self.clock.sleep(SETTLE_PAUSE).await;
        if page.click(&handle).await.is_ok() {
            return self.done(ClickMethod::Direct);
        }
        match page.script_click(&handle).await {
            Ok(()) => self.done(ClickMethod::Script),
            Err(e) => {
                tracing::info!(target: "nav.resolver", selector, error = %e, "suggested selector click failed");
                ClickOutcome::failure()
            }
        }
    }

    fn done(&self, method: ClickMethod) -> ClickOutcome {
        tracing::info!(target: "nav.resolver", ?method, "clicked");
        ClickOutcome::success(method)
    }
}

async fn click_first<P: BrowserPage>(page: &P, query: &ElementQuery) -> anyhow::Result<()> {
    let handle = page
        .find_all(query)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("no element matches"))?;
    page.click(&handle).await
}

async fn click_refreshed<P: BrowserPage>(page: &P, ordinal: usize) -> anyhow::Result<()> {
    let handles = page.find_all(&ElementQuery::css(REFRESH_SELECTOR)).await?;
    let mut visible = 0usize;
    for handle in handles {
        let Ok(info) = page.describe(&handle).await else {
            continue;
        };
        if !info.displayed || info.text.trim().is_empty() {
            continue;
        }
        if visible == ordinal {
            return page.click(&handle).await;
        }
        visible += 1;
    }
    Err(anyhow!("refreshed list has no option {}", ordinal + 1))
}

/// XPath matching a `tag` element whose normalized text contains `text`.
pub fn text_xpath(tag: &str, text: &str) -> String {
    let tag = if !tag.is_empty() && tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        tag
    } else {
        "*"
    };
    let needle = text.split_whitespace().collect::<Vec<_>>().join(" ");
    format!("//{tag}[contains(normalize-space(.), {})]", xpath_literal(&needle))
}

/// Quote `s` as an XPath 1.0 string literal, whatever quotes it contains.
pub fn xpath_literal(s: &str) -> String {
    if !s.contains('\'') {
        return format!("'{s}'");
    }
    if !s.contains('"') {
        return format!("\"{s}\"");
    }
    let parts: Vec<String> = s.split('\'').map(|part| format!("'{part}'")).collect();
    format!("concat({})", parts.join(", \"'\", "))
}

fn css_escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}
