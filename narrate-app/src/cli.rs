use anyhow::{Context, Result};
use clap::Parser;
use narrate_config::{NarrateConfig, NarrateConfigLoader, default_config_path};
use std::path::PathBuf;

/// Browse the web by ear: spoken page summaries and numbered options.
#[derive(Debug, Parser)]
#[command(name = "narrate", version)]
pub struct Cli {
    /// YAML config file. Defaults to the platform config dir when present.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Page to open first.
    #[arg(long)]
    pub url: Option<String>,

    /// Run the browser without a window.
    #[arg(long, conflicts_with = "headed")]
    pub headless: bool,

    /// Show the browser window.
    #[arg(long)]
    pub headed: bool,

    /// WebDriver endpoint, e.g. a running chromedriver.
    #[arg(long, value_name = "URL")]
    pub webdriver_url: Option<String>,

    /// Model name for the configured provider.
    #[arg(long)]
    pub model: Option<String>,

    /// Copy log events to stderr.
    #[arg(long)]
    pub log_stderr: bool,
}

impl Cli {
    /// File and environment config with this invocation's flags on top.
    pub fn load_config(&self) -> Result<NarrateConfig> {
        let loader = match (&self.config, default_config_path()) {
            (Some(path), _) => NarrateConfigLoader::new().with_file(path),
            (None, Some(path)) => NarrateConfigLoader::new().with_optional_file(path),
            (None, None) => NarrateConfigLoader::new(),
        };
        let mut config = loader.load().context("failed to load configuration")?;
        self.apply(&mut config);
        Ok(config)
    }

    pub fn apply(&self, config: &mut NarrateConfig) {
        if let Some(url) = &self.url {
            config.start_url = url.clone();
        }
        if self.headless {
            config.browser.headless = true;
        }
        if self.headed {
            config.browser.headless = false;
        }
        if let Some(endpoint) = &self.webdriver_url {
            config.browser.webdriver_url = endpoint.clone();
        }
        if let Some(model) = &self.model {
            config.llm.set_model(model.clone());
        }
        if self.log_stderr {
            config.logging.emit_stderr = true;
        }
    }
}
