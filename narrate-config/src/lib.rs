//! Loader for `narrate.yaml` with environment overlays.
//!
//! Sources are merged in order: an optional YAML file (or inline snippet),
//! then `NARRATE__`-prefixed environment variables using `__` as the nesting
//! separator (`NARRATE__BROWSER__HEADLESS=false`). After merging, `${VAR}`
//! placeholders in string values are expanded recursively. Every field has a
//! default, so an empty configuration is valid.
use config::{Config, ConfigError, Environment, File, FileFormat};
use narrate_common::observability::LogFormat;
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;
const OPENAI_KEY_ENV: &str = "OPENAI_API_KEY";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NarrateConfig {
    /// First page visited when the session starts.
    pub start_url: String,
    pub browser: BrowserConfig,
    pub llm: LlmConfig,
    pub speech: SpeechConfig,
    pub navigation: NavigationConfig,
    pub logging: LoggingConfig,
}

impl Default for NarrateConfig {
    fn default() -> Self {
        Self {
            start_url: "https://www.google.com/".into(),
            browser: BrowserConfig::default(),
            llm: LlmConfig::default(),
            speech: SpeechConfig::default(),
            navigation: NavigationConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub webdriver_url: String,
    pub headless: bool,
    pub load_timeout_secs: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            webdriver_url: "http://localhost:9515".into(),
            headless: true,
            load_timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "provider", rename_all = "lowercase")]
pub enum LlmConfig {
    Openai {
        #[serde(default = "default_openai_model")]
        model: String,
        #[serde(default)]
        auth_token: String,
        #[serde(default)]
        temperature: Option<f32>,
        #[serde(default)]
        max_tokens: Option<u32>,
        #[serde(default = "default_openai_endpoint")]
        endpoint: String,
    },
    Ollama {
        #[serde(default = "default_ollama_model")]
        model: String,
        #[serde(default = "default_ollama_endpoint")]
        endpoint: String,
        #[serde(default)]
        temperature: Option<f32>,
        #[serde(default)]
        max_tokens: Option<u32>,
    },
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self::Openai {
            model: default_openai_model(),
            auth_token: String::new(),
            temperature: None,
            max_tokens: None,
            endpoint: default_openai_endpoint(),
        }
    }
}

impl LlmConfig {
    /// The configured OpenAI token, falling back to `OPENAI_API_KEY`.
    ///
    /// Returns `None` for providers that do not authenticate.
    pub fn openai_token(&self) -> Option<String> {
        match self {
            Self::Openai { auth_token, .. } if !auth_token.trim().is_empty() => {
                Some(auth_token.clone())
            }
            Self::Openai { .. } => std::env::var(OPENAI_KEY_ENV).ok(),
            Self::Ollama { .. } => None,
        }
    }

    pub fn model(&self) -> &str {
        match self {
            Self::Openai { model, .. } | Self::Ollama { model, .. } => model,
        }
    }

    pub fn set_model(&mut self, new_model: String) {
        match self {
            Self::Openai { model, .. } | Self::Ollama { model, .. } => *model = new_model,
        }
    }
}

fn default_openai_model() -> String {
    "gpt-4o".into()
}
fn default_openai_endpoint() -> String {
    "https://api.openai.com/v1/".into()
}
fn default_ollama_model() -> String {
    "llama3.2:3b".into()
}
fn default_ollama_endpoint() -> String {
    "http://localhost:11434".into()
}

/// Which speech backend to start.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeechEngineKind {
    /// `say` on macOS, `espeak-ng`/`espeak` elsewhere.
    #[default]
    Auto,
    Say,
    Espeak,
    /// Print only; useful without audio hardware.
    Console,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    pub engine: SpeechEngineKind,
    pub voice: Option<String>,
    /// Words per minute.
    pub rate: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NavigationConfig {
    /// Options announced per page.
    pub page_size: usize,
    pub settle_timeout_secs: u64,
    pub url_change_timeout_secs: u64,
    pub poll_interval_ms: u64,
    pub click_selector_timeout_secs: u64,
    /// Announce only the changed text when a click mutates the page in place.
    pub text_delta_shortcut: bool,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            page_size: 5,
            settle_timeout_secs: 6,
            url_change_timeout_secs: 3,
            poll_interval_ms: 250,
            click_selector_timeout_secs: 10,
            text_delta_shortcut: false,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: LogFormat,
    pub dir: Option<PathBuf>,
    pub emit_stderr: bool,
}

/// `~/.config/narrate/narrate.yaml` (platform equivalent), if a config dir exists.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("narrate").join("narrate.yaml"))
}

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
                    let expanded = match shellexpand::env(&cur) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => cur.clone(),
                    };
                    if expanded == cur {
                        break;
                    }
                    cur = expanded;
                }
                *s = cur;
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

/// Builder hiding the `config` crate wiring (YAML + env overrides).
pub struct NarrateConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
}

impl Default for NarrateConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl NarrateConfigLoader {
    /// Start with no file sources; `NARRATE__` environment overrides are
    /// always applied last.
    ///
    /// ```
    /// use narrate_config::NarrateConfigLoader;
    ///
    /// let config = NarrateConfigLoader::new()
    ///     .with_yaml_str("start_url: 'https://example.org/'")
    ///     .load()
    ///     .expect("valid config");
    ///
    /// assert_eq!(config.start_url, "https://example.org/");
    /// assert_eq!(config.navigation.page_size, 5);
    /// ```
    pub fn new() -> Self {
        Self {
            builder: Config::builder(),
        }
    }

    /// Attach a required YAML/TOML/JSON file; the format is inferred by suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Attach a file that is silently skipped when missing.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(false));
        self
    }

    /// Merge an inline YAML snippet.
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(yaml, FileFormat::Yaml));
        self
    }

    /// Merge all sources, expand `${VAR}` placeholders and deserialize.
    ///
    /// ```
    /// use narrate_config::{LlmConfig, NarrateConfigLoader};
    ///
    /// unsafe { std::env::set_var("NARRATE_DOC_TOKEN", "injected-from-env"); }
    ///
    /// let config = NarrateConfigLoader::new()
    ///     .with_yaml_str(r#"
    /// llm:
    ///   provider: "openai"
    ///   model: "gpt-4o-mini"
    ///   auth_token: "${NARRATE_DOC_TOKEN}"
    /// "#)
    ///     .load()
    ///     .expect("valid configuration");
    ///
    /// match &config.llm {
    ///     LlmConfig::Openai { model, auth_token, endpoint, .. } => {
    ///         assert_eq!(model, "gpt-4o-mini");
    ///         assert_eq!(auth_token, "injected-from-env");
    ///         assert_eq!(endpoint, "https://api.openai.com/v1/");
    ///     }
    ///     _ => panic!("expected OpenAI configuration"),
    /// }
    ///
    /// unsafe { std::env::remove_var("NARRATE_DOC_TOKEN"); }
    /// ```
    pub fn load(self) -> Result<NarrateConfig, ConfigError> {
        let cfg = self
            .builder
            .add_source(
                Environment::with_prefix("NARRATE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut v: Value = cfg.try_deserialize()?;
        // An empty source set deserializes to unit rather than an object.
        if v.is_null() {
            v = Value::Object(Default::default());
        }
        expand_env_in_value(&mut v);

        serde_json::from_value(v).map_err(|e| ConfigError::Message(e.to_string()))
    }
}
