use crate::browser::page::WebDriverPage;
use anyhow::{Context, Result};
use fantoccini::{Client, ClientBuilder};
use serde_json::json;
use std::collections::HashMap;
use webdriver::capabilities::Capabilities;

/// Default Chromedriver endpoint.
pub const DEFAULT_WEBDRIVER_URL: &str = "http://localhost:9515";

/// Owns one WebDriver session for the lifetime of the narrator.
pub struct NarrateDriver {
    client: Client,
}

impl NarrateDriver {
    /// Connect to a running WebDriver service and open a Chrome session.
    pub async fn connect(webdriver_url: &str, headless: bool) -> Result<Self> {
        let mut caps = Capabilities::new();
        let mut chrome_opts = HashMap::new();

        let mut args = vec![
            json!("--no-first-run"),
            json!("--disable-notifications"),
            json!("--window-size=1366,900"),
        ];
        if headless {
            args.push(json!("--headless"));
            args.push(json!("--disable-gpu"));
        }
        chrome_opts.insert("args".to_string(), json!(args));
        caps.insert("goog:chromeOptions".to_string(), json!(chrome_opts));

        let client = ClientBuilder::native()
            .capabilities(caps)
            .connect(webdriver_url)
            .await
            .with_context(|| format!("failed to start a WebDriver session at {webdriver_url}"))?;

        tracing::info!(target: "nav.loop", %webdriver_url, headless, "webdriver.session.started");
        Ok(Self { client })
    }

    /// Page handle sharing this session.
    pub fn page(&self) -> WebDriverPage {
        WebDriverPage::new(self.client.clone())
    }

    /// Close the browser session.
    pub async fn close(self) -> Result<()> {
        self.client.close().await?;
        tracing::info!(target: "nav.loop", "webdriver.session.closed");
        Ok(())
    }
}
