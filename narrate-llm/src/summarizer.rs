//! Page summarization with size governance.
//!
//! [`LlmSummarizer`] turns an HTML fragment into a [`PageAnalysis`]
//! (`summary` + optional `click_selector`). It never fails: oversized
//! fragments are cut in the middle before sending, a context overflow gets
//! one retry with a much smaller cut, and everything else degrades to a canned
//! summary so the navigation session keeps going.

use crate::traits::{LlmClient, LlmError};
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use std::borrow::Cow;
use std::sync::{Arc, OnceLock};

/// Largest fragment sent on the first attempt (roughly 30k tokens).
pub const FRAGMENT_BUDGET: usize = 60_000;
/// Largest fragment sent on the single context-overflow retry.
pub const RETRY_BUDGET: usize = 30_000;

pub const TRUNCATION_MARKER: &str = "\n...[CONTENT TRUNCATED]...\n";
pub const HEAVY_TRUNCATION_MARKER: &str = "\n...[CONTENT HEAVILY TRUNCATED]...\n";

pub const TOO_LARGE_SUMMARY: &str =
    "Web content too large to analyze. This may be a complex page.";
pub const ANALYSIS_FAILED_SUMMARY: &str =
    "Error occurred while analyzing the page. Please try another action.";

const SYSTEM_PROMPT: &str =
    "You are an intelligent assistant helping visually impaired users navigate web content.";

/// What the model made of a page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageAnalysis {
    pub summary: String,
    /// CSS selector worth clicking to reveal more content; empty when none.
    pub click_selector: String,
}

impl PageAnalysis {
    fn canned(summary: &str) -> Self {
        Self {
            summary: summary.to_string(),
            click_selector: String::new(),
        }
    }

    /// Whether this is one of the fixed fallback summaries.
    pub fn is_degraded(&self) -> bool {
        self.summary == TOO_LARGE_SUMMARY || self.summary == ANALYSIS_FAILED_SUMMARY
    }
}

/// Anything that can turn an HTML fragment into a [`PageAnalysis`].
#[async_trait]
pub trait PageSummarizer: Send + Sync {
    async fn analyze(&self, fragment: &str) -> PageAnalysis;
}

#[derive(Debug, Clone)]
pub struct SummaryOptions {
    pub budget: usize,
    pub retry_budget: usize,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for SummaryOptions {
    fn default() -> Self {
        Self {
            budget: FRAGMENT_BUDGET,
            retry_budget: RETRY_BUDGET,
            max_tokens: 500,
            temperature: 0.2,
        }
    }
}

pub struct LlmSummarizer {
    client: Arc<dyn LlmClient>,
    options: SummaryOptions,
}

impl LlmSummarizer {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self::with_options(client, SummaryOptions::default())
    }

    pub fn with_options(client: Arc<dyn LlmClient>, options: SummaryOptions) -> Self {
        Self { client, options }
    }

    async fn request(&self, html: &str) -> Result<PageAnalysis, LlmError> {
        let prompt = build_prompt(html);
        let response = self
            .client
            .generate(
                &prompt,
                Some(SYSTEM_PROMPT),
                Some(self.options.max_tokens),
                Some(self.options.temperature),
            )
            .await?;
        Ok(parse_analysis(&response.text))
    }
}

#[async_trait]
impl PageSummarizer for LlmSummarizer {
    async fn analyze(&self, fragment: &str) -> PageAnalysis {
        let original_len = fragment.chars().count();
        let bounded = truncate_middle(fragment, self.options.budget, (2, 3), TRUNCATION_MARKER);
        if let Cow::Owned(ref cut) = bounded {
            tracing::info!(
                target: "llm.summarize",
                original_len,
                truncated_len = cut.chars().count(),
                "fragment over budget; truncated"
            );
        }

        let err = match self.request(&bounded).await {
            Ok(analysis) => return analysis,
            Err(err) => err,
        };

        match err {
            LlmError::ContextTooLarge(msg) => {
                tracing::warn!(target: "llm.summarize", %msg, "context too large");
                if bounded.chars().count() <= self.options.retry_budget {
                    return PageAnalysis::canned(TOO_LARGE_SUMMARY);
                }
                let smaller = truncate_middle(
                    &bounded,
                    self.options.retry_budget,
                    (1, 2),
                    HEAVY_TRUNCATION_MARKER,
                );
                tracing::info!(
                    target: "llm.summarize",
                    retry_len = smaller.chars().count(),
                    "retrying with heavier truncation"
                );
                match self.request(&smaller).await {
                    Ok(analysis) => analysis,
                    Err(LlmError::ContextTooLarge(msg)) => {
                        tracing::warn!(target: "llm.summarize", %msg, "still too large after retry");
                        PageAnalysis::canned(TOO_LARGE_SUMMARY)
                    }
                    Err(e) => {
                        tracing::warn!(target: "llm.summarize", error = %e, "retry failed");
                        PageAnalysis::canned(ANALYSIS_FAILED_SUMMARY)
                    }
                }
            }
            other => {
                tracing::warn!(target: "llm.summarize", error = %other, "LLM API error");
                PageAnalysis::canned(ANALYSIS_FAILED_SUMMARY)
            }
        }
    }
}

fn build_prompt(html: &str) -> String {
    format!(
        "1. Based on the HTML content below, extract the main topic and key information, and provide a concise summary.\n\
         2. If further clicks are needed to reveal more content, return 'click_selector': CSS selector; otherwise, return empty string.\n\n\
         --- HTML START ---\n{html}\n--- HTML END ---\n\n\
         Output JSON: {{\"summary\": \"...\", \"click_selector\": \"...\"}}"
    )
}

/// Keep the start and end of `text` so the result is at most `budget` chars.
///
/// `head_ratio` is the share of the kept characters taken from the start;
/// `marker` is spliced between head and tail and counts toward the budget.
pub fn truncate_middle<'a>(
    text: &'a str,
    budget: usize,
    head_ratio: (usize, usize),
    marker: &str,
) -> Cow<'a, str> {
    let len = text.chars().count();
    if len <= budget {
        return Cow::Borrowed(text);
    }
    let keep = budget.saturating_sub(marker.chars().count());
    let head = keep * head_ratio.0 / head_ratio.1.max(1);
    let tail = keep - head;

    let head_end = byte_offset(text, head);
    let tail_start = byte_offset(text, len - tail);

    let mut out = String::with_capacity(head_end + marker.len() + (text.len() - tail_start));
    out.push_str(&text[..head_end]);
    out.push_str(marker);
    out.push_str(&text[tail_start..]);
    Cow::Owned(out)
}

fn byte_offset(text: &str, chars: usize) -> usize {
    text.char_indices()
        .nth(chars)
        .map(|(i, _)| i)
        .unwrap_or(text.len())
}

#[derive(Deserialize)]
struct RawAnalysis {
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    click_selector: Option<String>,
}

/// Parse a model reply permissively: JSON (optionally fenced) when possible,
/// otherwise the whole reply is the summary.
pub fn parse_analysis(text: &str) -> PageAnalysis {
    let trimmed = text.trim();
    let candidate = extract_json_block(trimmed).unwrap_or(trimmed);
    match serde_json::from_str::<RawAnalysis>(candidate) {
        Ok(raw) => PageAnalysis {
            summary: raw.summary.unwrap_or_default(),
            click_selector: raw.click_selector.unwrap_or_default().trim().to_string(),
        },
        Err(_) => PageAnalysis {
            summary: text.to_string(),
            click_selector: String::new(),
        },
    }
}

/// Try a ```json fenced block first, then the outermost `{...}`.
fn extract_json_block(text: &str) -> Option<&str> {
    static FENCE: OnceLock<Option<Regex>> = OnceLock::new();
    let fence = FENCE
        .get_or_init(|| Regex::new(r"(?s)```(?:json)?\s*(\{.*?\})\s*```").ok())
        .as_ref()?;
    if let Some(m) = fence.captures(text).and_then(|caps| caps.get(1)) {
        return Some(m.as_str());
    }
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Prepare a summary for speech: drop code fences, unwrap a JSON `summary`
/// field when present, and keep at most two sentences.
pub fn normalize_summary(summary: &str) -> String {
    let raw = summary.trim();
    let body = if raw.starts_with("```") {
        match (raw.find('{'), raw.rfind('}')) {
            (Some(start), Some(end)) if end > start => &raw[start..=end],
            _ => strip_fences(raw),
        }
    } else {
        raw
    };

    let text = match serde_json::from_str::<serde_json::Value>(body) {
        Ok(serde_json::Value::Object(map)) => match map.get("summary") {
            Some(serde_json::Value::String(s)) => s.clone(),
            _ => body.to_string(),
        },
        _ => body.to_string(),
    };

    truncate_sentences(&text, 2)
}

fn strip_fences(raw: &str) -> &str {
    let without_open = raw
        .strip_prefix("```")
        .map(|rest| rest.split_once('\n').map(|(_, body)| body).unwrap_or(""))
        .unwrap_or(raw);
    without_open
        .trim_end()
        .strip_suffix("```")
        .unwrap_or(without_open)
        .trim()
}

/// Keep the first `max` pieces of `text` split on `". "`.
///
/// Blank pieces do not count. Text with at most `max` pieces comes back
/// unchanged; otherwise the kept pieces are re-joined with `". "` and a
/// trailing period is ensured.
pub fn truncate_sentences(text: &str, max: usize) -> String {
    let parts: Vec<&str> = text
        .split(". ")
        .filter(|part| !part.trim().is_empty())
        .collect();
    if parts.len() <= max {
        return text.to_string();
    }
    let mut out = parts[..max].join(". ").trim().to_string();
    if !out.ends_with('.') {
        out.push('.');
    }
    out
}
