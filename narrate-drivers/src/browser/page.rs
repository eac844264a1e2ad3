use crate::browser::scripts::PageScripts;
use crate::page::{
    BrowserPage, ElementInfo, ElementQuery, PageSnapshot, VisibleContent, INTERACTIVE_SELECTOR,
};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use fantoccini::{elements::Element, Client, Locator};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

/// [`BrowserPage`] backed by a live `fantoccini` session.
#[derive(Clone)]
pub struct WebDriverPage {
    client: Client,
}

impl WebDriverPage {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn run(&self, script: &str, args: Vec<Value>) -> Result<Value> {
        self.client
            .execute(script, args)
            .await
            .map_err(anyhow::Error::from)
    }

    async fn run_as<T: DeserializeOwned>(&self, script: &str, args: Vec<Value>) -> Result<T> {
        let value = self.run(script, args).await?;
        serde_json::from_value(value).map_err(|e| anyhow!("unexpected script result: {e}"))
    }

    async fn run_on(&self, script: &str, element: &Element) -> Result<Value> {
        self.run(script, vec![serde_json::to_value(element)?]).await
    }
}

#[async_trait]
impl BrowserPage for WebDriverPage {
    type Handle = Element;

    async fn goto(&self, url: &str) -> Result<()> {
        self.client.goto(url).await.map_err(anyhow::Error::from)
    }

    async fn current_url(&self) -> Result<String> {
        self.client
            .current_url()
            .await
            .map(|url| url.to_string())
            .map_err(anyhow::Error::from)
    }

    async fn ready_state(&self) -> Result<String> {
        self.run_as(PageScripts::ready_state(), vec![]).await
    }

    async fn page_source(&self) -> Result<String> {
        self.client.source().await.map_err(anyhow::Error::from)
    }

    async fn find_all(&self, query: &ElementQuery) -> Result<Vec<Element>> {
        let locator = match query {
            ElementQuery::Css(selector) => Locator::Css(selector),
            ElementQuery::XPath(expr) => Locator::XPath(expr),
        };
        self.client
            .find_all(locator)
            .await
            .map_err(anyhow::Error::from)
    }

    async fn outer_html(&self, element: &Element) -> Result<String> {
        element.html(false).await.map_err(anyhow::Error::from)
    }

    async fn describe(&self, element: &Element) -> Result<ElementInfo> {
        let value = self.run_on(PageScripts::describe(), element).await?;
        serde_json::from_value(value).map_err(|e| anyhow!("unexpected element description: {e}"))
    }

    async fn scroll_into_view(&self, element: &Element) -> Result<()> {
        self.run_on(PageScripts::scroll_into_view(), element).await?;
        Ok(())
    }

    async fn click(&self, element: &Element) -> Result<()> {
        element.click().await.map_err(anyhow::Error::from)
    }

    async fn script_click(&self, element: &Element) -> Result<()> {
        self.run_on(PageScripts::script_click(), element).await?;
        Ok(())
    }

    async fn snapshot(&self) -> Result<PageSnapshot> {
        let mut snapshot: PageSnapshot = self
            .run_as(PageScripts::snapshot(), vec![json!(INTERACTIVE_SELECTOR)])
            .await?;
        snapshot.url = self.current_url().await?;
        snapshot.window_count = self.window_count().await?;
        Ok(snapshot)
    }

    async fn visible_content(&self) -> Result<VisibleContent> {
        self.run_as(PageScripts::visible_content(), vec![]).await
    }

    async fn cleaned_body(&self) -> Result<String> {
        self.run_as(PageScripts::cleaned_body(), vec![]).await
    }

    async fn scroll_height(&self) -> Result<u32> {
        self.run_as(PageScripts::scroll_height(), vec![]).await
    }

    async fn scroll_to(&self, y: u32) -> Result<()> {
        self.run(PageScripts::scroll_to(), vec![json!(y)]).await?;
        Ok(())
    }

    async fn scroll_by(&self, dy: i32) -> Result<()> {
        self.run(PageScripts::scroll_by(), vec![json!(dy)]).await?;
        Ok(())
    }

    async fn window_count(&self) -> Result<usize> {
        Ok(self.client.windows().await?.len())
    }

    async fn switch_to_newest_window(&self) -> Result<()> {
        let newest = self
            .client
            .windows()
            .await?
            .pop()
            .ok_or_else(|| anyhow!("no browser windows are open"))?;
        self.client.switch_to_window(newest).await?;
        Ok(())
    }
}
