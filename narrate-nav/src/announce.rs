//! Everything the narrator says that is not a page summary.
use crate::registry::ClickableRegistry;
use std::fmt::Write;

pub const INVALID_NUMBER: &str = "Please enter a valid number.";
pub const INVALID_OPTION: &str = "Invalid option number.";
pub const CLICK_FAILED: &str = "Could not click the selected element. Please try another option.";
pub const EXTRACT_FAILED: &str = "There was an error extracting content from the page.";
pub const ANALYSIS_FAILED: &str = "There was an error analyzing the page content.";
pub const DISCOVERY_FAILED: &str = "There was an error identifying clickable elements.";

const OPTIONS_FOOTER: &str = "To exit, say exit. Press the spacebar at any time to repeat these options.";

pub fn visiting(domain: &str) -> String {
    format!("I am currently visiting {domain}, please wait")
}

pub fn selected(option_text: &str, domain: &str) -> String {
    let text = option_text.trim();
    let text = if text.is_empty() { "selected" } else { text };
    format!("You have selected the {text} option, now visiting {domain} page, please wait")
}

/// The spoken menu for the registry's active page.
pub fn options<H>(registry: &ClickableRegistry<H>) -> String {
    if registry.is_empty() {
        return format!("No clickable items detected on this page. {OPTIONS_FOOTER}");
    }

    let mut out = String::from("The following clickable items are available.");
    let start = registry.page_start();
    for (i, entry) in registry.current_page_items().iter().enumerate() {
        let _ = write!(out, " Option {}: {}.", start + i + 1, entry.descriptor.announce_label());
    }
    let _ = write!(out, " To click an item, say its number. {OPTIONS_FOOTER}");
    if registry.page_count() > 1 {
        let _ = write!(out, " {}.", registry.page_marker());
        if registry.has_next_page() {
            out.push_str(" Press enter for more options.");
        }
    }
    out
}

/// Host part of `url`, or the URL itself when it has none.
pub fn domain_of(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| url.to_string())
}
