//! Driver layer for browser automation.
//!
//! The rest of the workspace talks to the browser only through the
//! [`page::BrowserPage`] trait, so the navigation core can run against a real
//! WebDriver session or an in-memory page in tests.
//!
//! - [`page::BrowserPage`]: the page/DOM provider seam and its data types
//! - [`browser::driver::NarrateDriver`]: WebDriver session lifecycle
//! - [`browser::page::WebDriverPage`]: `fantoccini`-backed [`page::BrowserPage`]
//! - [`browser::scripts::PageScripts`]: in-page JavaScript probes
pub mod browser;
pub mod page;
