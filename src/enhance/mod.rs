// src/enhance/mod.rs
//! Optional enhancement capability: semantic merging of near-duplicate
//! bullets by a language model. Modeled as a capability with an explicit
//! disabled variant, so the deterministic tier-1 path is structurally
//! guaranteed to run whenever this one yields nothing.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::EnhancerConfig;

/// Enhancer contract: merge semantically identical entries in a bounded
/// batch and return the clearer phrasings. An empty return means "use the
/// deterministic output"; it is never an error for the pipeline.
#[async_trait]
pub trait Enhancer: Send + Sync {
    async fn enhance(&self, bullets: &[String]) -> Vec<String>;
    fn name(&self) -> &'static str;
}

pub type DynEnhancer = Arc<dyn Enhancer>;

/// Returns nothing, synchronously, without touching the network.
pub struct DisabledEnhancer;

#[async_trait]
impl Enhancer for DisabledEnhancer {
    async fn enhance(&self, _bullets: &[String]) -> Vec<String> {
        Vec::new()
    }
    fn name(&self) -> &'static str {
        "disabled"
    }
}

/// OpenAI-backed enhancer (chat completions, newline-delimited bullets).
pub struct OpenAiEnhancer {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl OpenAiEnhancer {
    pub fn new(api_key: String, model_override: Option<&str>) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("gameday-briefing/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(10))
            .build()
            .expect("reqwest client");
        Self {
            http,
            api_key,
            model: model_override.unwrap_or("gpt-4o-mini").to_string(),
        }
    }
}

const SYSTEM_PROMPT: &str = "You merge duplicate sports news bullets. Given a numbered list, \
merge entries that state the same fact, keep the clearer phrasing, preserve any trailing \
source citation in parentheses, and return one bullet per line with no numbering. \
Never invent facts.";

#[async_trait]
impl Enhancer for OpenAiEnhancer {
    async fn enhance(&self, bullets: &[String]) -> Vec<String> {
        if self.api_key.is_empty() || bullets.is_empty() {
            return Vec::new();
        }

        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: &'a str,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            messages: Vec<Msg<'a>>,
            temperature: f32,
            max_tokens: u32,
        }
        #[derive(Deserialize)]
        struct Resp {
            choices: Vec<Choice>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMsg,
        }
        #[derive(Deserialize)]
        struct ChoiceMsg {
            content: String,
        }

        let user = bullets
            .iter()
            .enumerate()
            .map(|(i, b)| format!("{}. {b}", i + 1))
            .collect::<Vec<_>>()
            .join("\n");
        let req = Req {
            model: &self.model,
            messages: vec![
                Msg {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                Msg {
                    role: "user",
                    content: &user,
                },
            ],
            temperature: 0.2,
            max_tokens: 800,
        };

        let resp = match self
            .http
            .post("https://api.openai.com/v1/chat/completions")
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await
        {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                tracing::warn!(status = r.status().as_u16(), "enhancer non-success status");
                return Vec::new();
            }
            Err(e) => {
                tracing::warn!(error = ?e, "enhancer request failed");
                return Vec::new();
            }
        };

        let body: Resp = match resp.json().await {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!(error = ?e, "enhancer response unparsable");
                return Vec::new();
            }
        };
        let content = body
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .unwrap_or("");
        parse_bullet_lines(content)
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

/// Model output is untrusted free text: split into lines, strip stray
/// numbering/dashes, collapse whitespace, drop empties.
pub fn parse_bullet_lines(content: &str) -> Vec<String> {
    content
        .lines()
        .map(|l| {
            l.trim()
                .trim_start_matches(['-', '*', '\u{2022}'])
                .trim_start_matches(|c: char| c.is_ascii_digit())
                .trim_start_matches(['.', ')', ':'])
                .trim()
        })
        .filter(|l| !l.is_empty())
        .map(|l| l.split_whitespace().collect::<Vec<_>>().join(" "))
        .collect()
}

/// Wraps any enhancer with the per-run call budget and the hard timeout that
/// covers model latency. Both failure modes degrade to an empty result.
pub struct BudgetedEnhancer {
    inner: DynEnhancer,
    budget_max: u32,
    used: AtomicU32,
    timeout: Duration,
}

impl BudgetedEnhancer {
    pub fn new(inner: DynEnhancer, budget_max: u32, timeout: Duration) -> Self {
        Self {
            inner,
            budget_max,
            used: AtomicU32::new(0),
            timeout,
        }
    }

    /// Call once per aggregation run, before any enhancement.
    pub fn reset_budget(&self) {
        self.used.store(0, Ordering::Relaxed);
    }

    pub fn calls_used(&self) -> u32 {
        self.used.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Enhancer for BudgetedEnhancer {
    async fn enhance(&self, bullets: &[String]) -> Vec<String> {
        if bullets.is_empty() {
            return Vec::new();
        }
        let used = self.used.fetch_add(1, Ordering::Relaxed);
        if used >= self.budget_max {
            tracing::debug!(used, max = self.budget_max, "enhancer budget exhausted");
            return Vec::new();
        }
        match tokio::time::timeout(self.timeout, self.inner.enhance(bullets)).await {
            Ok(out) => out,
            Err(_) => {
                tracing::warn!(timeout_ms = self.timeout.as_millis() as u64, "enhancer timed out");
                Vec::new()
            }
        }
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}

/// Factory: disabled config or a missing credential (when not enforced at
/// startup) yields the disabled variant.
pub fn build_enhancer(cfg: &EnhancerConfig) -> Arc<BudgetedEnhancer> {
    let timeout = Duration::from_secs(cfg.timeout_secs);
    if !cfg.enabled {
        return Arc::new(BudgetedEnhancer::new(
            Arc::new(DisabledEnhancer),
            cfg.run_budget,
            timeout,
        ));
    }
    let inner: DynEnhancer = match cfg.provider.as_deref() {
        Some("openai") => match cfg.resolve_api_key() {
            Ok(key) => Arc::new(OpenAiEnhancer::new(key, None)),
            Err(e) => {
                tracing::warn!(error = %e, "enhancer credential missing, running disabled");
                Arc::new(DisabledEnhancer)
            }
        },
        _ => Arc::new(DisabledEnhancer),
    };
    Arc::new(BudgetedEnhancer::new(inner, cfg.run_budget, timeout))
}
