use crate::clock::{poll_until, Clock};
use narrate_drivers::page::{BrowserPage, PageSnapshot};
use std::time::Duration;

/// Element count difference that counts as a change.
pub const NODE_COUNT_THRESHOLD: u64 = 5;
/// Rendered height/width difference, in pixels, that counts as a change.
pub const SIZE_THRESHOLD_PX: u32 = 50;

const READY_POLL: Duration = Duration::from_millis(250);

/// Which comparison between two snapshots tripped first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeSignal {
    Text,
    NodeCount { before: u64, after: u64 },
    Size { before: (u32, u32), after: (u32, u32) },
    InteractiveCount { before: u64, after: u64 },
}

/// Compare two snapshots. Signals are checked in a fixed order and the first
/// one that trips is returned.
pub fn compare_snapshots(before: &PageSnapshot, after: &PageSnapshot) -> Option<ChangeSignal> {
    if before.text_sample != after.text_sample {
        return Some(ChangeSignal::Text);
    }
    if before.node_count.abs_diff(after.node_count) > NODE_COUNT_THRESHOLD {
        return Some(ChangeSignal::NodeCount {
            before: before.node_count,
            after: after.node_count,
        });
    }
    if before.height.abs_diff(after.height) > SIZE_THRESHOLD_PX
        || before.width.abs_diff(after.width) > SIZE_THRESHOLD_PX
    {
        return Some(ChangeSignal::Size {
            before: (before.width, before.height),
            after: (after.width, after.height),
        });
    }
    if before.interactive_count != after.interactive_count {
        return Some(ChangeSignal::InteractiveCount {
            before: before.interactive_count,
            after: after.interactive_count,
        });
    }
    None
}

/// How a page ended up after an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settled {
    /// A new window opened and now has focus.
    NewWindow,
    UrlChanged(String),
    /// Same URL, different content.
    DomChanged(ChangeSignal),
    /// Nothing observable changed before the deadline.
    Unchanged,
}

impl Settled {
    pub fn changed(&self) -> bool {
        !matches!(self, Settled::Unchanged)
    }
}

#[derive(Debug, Clone)]
pub struct ConvergenceOptions {
    pub url_change_timeout: Duration,
    pub settle_timeout: Duration,
    pub poll_interval: Duration,
    /// Pixels scrolled between snapshot polls to wake lazy content.
    pub scroll_nudge_px: i32,
}

impl Default for ConvergenceOptions {
    fn default() -> Self {
        Self {
            url_change_timeout: Duration::from_secs(3),
            settle_timeout: Duration::from_secs(6),
            poll_interval: Duration::from_millis(250),
            scroll_nudge_px: 200,
        }
    }
}

impl From<&narrate_config::NavigationConfig> for ConvergenceOptions {
    fn from(cfg: &narrate_config::NavigationConfig) -> Self {
        Self {
            url_change_timeout: Duration::from_secs(cfg.url_change_timeout_secs),
            settle_timeout: Duration::from_secs(cfg.settle_timeout_secs),
            poll_interval: Duration::from_millis(cfg.poll_interval_ms.max(1)),
            ..Self::default()
        }
    }
}

/// Decides when a page has stopped changing after a load or a click.
#[derive(Debug, Clone)]
pub struct ConvergenceDetector<C> {
    clock: C,
    options: ConvergenceOptions,
}

impl<C: Clock> ConvergenceDetector<C> {
    pub fn new(clock: C, options: ConvergenceOptions) -> Self {
        Self { clock, options }
    }

    /// Wait for the page to diverge from `baseline`.
    ///
    /// Never fails and never waits past `url_change_timeout + settle_timeout`
    /// (plus one poll). Browser errors during polling count as "no change yet".
    pub async fn await_settled<P: BrowserPage>(&self, page: &P, baseline: &PageSnapshot) -> Settled {
        match page.window_count().await {
            Ok(count) if count > baseline.window_count && baseline.window_count > 0 => {
                match page.switch_to_newest_window().await {
                    Ok(()) => {
                        tracing::info!(target: "nav.convergence", windows = count, "switched to new window");
                        return Settled::NewWindow;
                    }
                    Err(e) => {
                        tracing::warn!(target: "nav.convergence", error = %e, "window switch failed");
                    }
                }
            }
            Ok(_) => {}
            Err(e) => tracing::debug!(target: "nav.convergence", error = %e, "window count unavailable"),
        }

        let new_url = poll_until(
            &self.clock,
            self.options.url_change_timeout,
            self.options.poll_interval,
            || async {
                match page.current_url().await {
                    Ok(url) if url != baseline.url => Some(url),
                    _ => None,
                }
            },
        )
        .await;
        if let Some(url) = new_url {
            tracing::info!(target: "nav.convergence", %url, "url changed");
            return Settled::UrlChanged(url);
        }

        let deadline = self.clock.now() + self.options.settle_timeout;
        let mut nudge = self.options.scroll_nudge_px;
        loop {
            match page.snapshot().await {
                Ok(current) => {
                    if let Some(signal) = compare_snapshots(baseline, &current) {
                        tracing::info!(target: "nav.convergence", ?signal, "page content changed");
                        return Settled::DomChanged(signal);
                    }
                }
                Err(e) => tracing::debug!(target: "nav.convergence", error = %e, "snapshot failed"),
            }
            if self.clock.now() >= deadline {
                break;
            }
            self.clock.sleep(self.options.poll_interval).await;
            if nudge != 0 {
                let _ = page.scroll_by(nudge).await;
                nudge = -nudge;
            }
        }

        tracing::info!(target: "nav.convergence", "no change detected; proceeding");
        Settled::Unchanged
    }

    /// Wait for `document.readyState == "complete"`. Returns whether it got there
    /// before `timeout`.
    pub async fn await_ready<P: BrowserPage>(&self, page: &P, timeout: Duration) -> bool {
        let ready = poll_until(&self.clock, timeout, READY_POLL, || async {
            match page.ready_state().await {
                Ok(state) if state == "complete" => Some(()),
                _ => None,
            }
        })
        .await
        .is_some();
        if !ready {
            tracing::warn!(target: "nav.convergence", ?timeout, "page not ready before timeout; proceeding");
        }
        ready
    }
}
