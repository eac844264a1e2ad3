use anyhow::{Context, Result};
use narrate_config::NarrateConfig;
use narrate_drivers::browser::driver::NarrateDriver;
use narrate_drivers::page::BrowserPage;
use narrate_input::{KeyboardInput, LineInput};
use narrate_llm::summarizer::{LlmSummarizer, PageSummarizer};
use narrate_llm::{ensure_llm_ready, summary_options};
use narrate_nav::clock::{Clock, TokioClock};
use narrate_nav::navigator::{Navigator, NavigatorOptions};
use narrate_speech::Narrator;
use std::io::IsTerminal;
use std::sync::Arc;

/// Start the collaborators, run one session, and release the browser and
/// speech engine whatever way the session ends.
pub async fn run(config: &NarrateConfig) -> Result<()> {
    let client = ensure_llm_ready(&config.llm)
        .await
        .context("language model unavailable")?;
    tracing::info!(target: "llm.summarize", model = client.model_name(), "llm.ready");
    let summarizer: Arc<dyn PageSummarizer> = Arc::new(LlmSummarizer::with_options(
        client,
        summary_options(&config.llm),
    ));

    let narrator = Arc::new(Narrator::from_config(&config.speech).await);

    let driver = match NarrateDriver::connect(
        &config.browser.webdriver_url,
        config.browser.headless,
    )
    .await
    {
        Ok(driver) => driver,
        Err(e) => {
            narrator.shutdown().await;
            return Err(e.context("browser unavailable"));
        }
    };

    let mut navigator = Navigator::new(
        driver.page(),
        summarizer,
        narrator.clone(),
        TokioClock,
        NavigatorOptions::from(config),
    );

    let outcome = tokio::select! {
        result = drive(&mut navigator) => result.map_err(anyhow::Error::from),
        _ = tokio::signal::ctrl_c() => {
            tracing::info!(target: "nav.loop", "interrupted");
            Ok(())
        }
    };
    drop(navigator);

    narrator.shutdown().await;
    if let Err(e) = driver.close().await {
        tracing::warn!(target: "nav.loop", error = %e, "browser session did not close cleanly");
    }
    tracing::info!(target: "nav.loop", "narrate.stopped");
    outcome
}

/// Keys from a terminal, lines from anything else.
async fn drive<P: BrowserPage, C: Clock>(
    navigator: &mut Navigator<P, C>,
) -> narrate_common::Result<()> {
    if std::io::stdin().is_terminal() {
        match KeyboardInput::spawn() {
            Ok(mut keys) => return navigator.run(&mut keys).await,
            Err(e) => tracing::warn!(target: "input", error = %e, "falling back to line input"),
        }
    }
    navigator.run(&mut LineInput::stdin()).await
}
