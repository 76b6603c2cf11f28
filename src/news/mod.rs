// src/news/mod.rs
//! News collection, classification, and two-tier deduplication.

pub mod classify;
pub mod clean;
pub mod dedupe;
pub mod feeds;

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;
use serde::Serialize;

use crate::config::NewsConfig;
use crate::enhance::{BudgetedEnhancer, Enhancer};
use crate::queue::{FetchRequest, RequestQueue};
use classify::{classify, Category};
use clean::{clean_text, trim_at_sentence};
use dedupe::simple_dedupe;

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("news_items_total", "Feed items parsed across all feeds.");
        describe_counter!("news_excerpts_total", "Excerpts kept after cleaning and lookback.");
        describe_counter!("news_classified_total", "Excerpts assigned a category.");
        describe_counter!("news_dedup_total", "Bullets removed by rule-based dedup.");
        describe_counter!("news_feed_errors_total", "Feed fetch/parse errors.");
    });
}

/// A cleaned, length-bounded unit of source text.
#[derive(Debug, Clone, Serialize)]
pub struct Excerpt {
    pub source: String,
    pub title: Option<String>,
    pub url: Option<String>,
    pub body: String,
    pub tag: Option<String>,
    pub published_at: u64,
}

/// The deduplicated, capped set of bullets for one category in one run.
/// Rebuilt from scratch each run; no cross-run state.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryBucket {
    pub category: Category,
    pub bullets: Vec<String>,
    pub total_count: usize,
    pub truncated_count: usize,
    pub provenance: Vec<String>,
}

pub struct NewsAggregator {
    queue: Arc<RequestQueue>,
    enhancer: Arc<BudgetedEnhancer>,
    enhancer_batch_cap: usize,
    cfg: NewsConfig,
}

impl NewsAggregator {
    pub fn new(
        queue: Arc<RequestQueue>,
        enhancer: Arc<BudgetedEnhancer>,
        enhancer_batch_cap: usize,
        cfg: NewsConfig,
    ) -> Self {
        ensure_metrics_described();
        Self {
            queue,
            enhancer,
            enhancer_batch_cap,
            cfg,
        }
    }

    /// Fetch configured feeds (global plus subject-specific) and produce
    /// cleaned excerpts within the lookback window. When the first pass is
    /// sparse the lookback widens once to the fallback value; the widened
    /// pass re-filters the already-fetched items, it does not re-fetch.
    pub async fn collect(&self, subject: Option<&str>, lookback_hours: i64) -> Vec<Excerpt> {
        let now = chrono::Utc::now().timestamp().max(0) as u64;
        let mut raw: Vec<Excerpt> = Vec::new();

        let mut first = true;
        for feed in &self.cfg.feeds {
            let applies = match (&feed.subject, subject) {
                (None, _) => true,
                (Some(fs), Some(s)) => fs.eq_ignore_ascii_case(s),
                (Some(_), None) => false,
            };
            if !applies {
                continue;
            }
            if !first {
                tokio::time::sleep(Duration::from_millis(self.cfg.inter_item_delay_ms)).await;
            }
            first = false;

            let mut req = FetchRequest::new(&feed.url, &feed.source).deferrable();
            if let Some(s) = subject {
                req = req.with_subject(s);
            }
            let body = match self.queue.submit(req).await {
                Ok(Some(b)) => b,
                Ok(None) => continue,
                Err(e) => {
                    counter!("news_feed_errors_total").increment(1);
                    tracing::warn!(feed = %feed.url, error = ?e, "feed fetch failed");
                    continue;
                }
            };
            let items = match feeds::parse_rss(&body) {
                Ok(i) => i,
                Err(e) => {
                    counter!("news_feed_errors_total").increment(1);
                    tracing::warn!(feed = %feed.url, error = ?e, "feed parse failed");
                    continue;
                }
            };
            counter!("news_items_total").increment(items.len() as u64);

            for item in items {
                let body = trim_at_sentence(&clean_text(&item.body), self.cfg.excerpt_max_chars);
                if body.is_empty() {
                    continue;
                }
                raw.push(Excerpt {
                    source: feed.source.clone(),
                    title: item.title,
                    url: item.link,
                    body,
                    tag: subject.map(|s| s.to_string()),
                    published_at: item.published_at,
                });
            }
        }

        let mut kept = filter_lookback(&raw, now, lookback_hours);
        if kept.len() < self.cfg.min_items && self.cfg.fallback_lookback_hours > lookback_hours {
            tracing::info!(
                kept = kept.len(),
                min = self.cfg.min_items,
                fallback_hours = self.cfg.fallback_lookback_hours,
                "sparse collection, widening lookback once"
            );
            kept = filter_lookback(&raw, now, self.cfg.fallback_lookback_hours);
        }

        counter!("news_excerpts_total").increment(kept.len() as u64);
        kept
    }

    /// Classify excerpts and build one bucket per category, in fixed
    /// category order. Buckets for empty categories are still emitted.
    pub async fn build_buckets(&self, excerpts: &[Excerpt]) -> Vec<CategoryBucket> {
        let mut out = Vec::with_capacity(Category::ALL.len());
        for category in Category::ALL {
            let mut bullets = Vec::new();
            let mut sources: BTreeSet<String> = BTreeSet::new();
            for ex in excerpts {
                if classify(&ex.body) == Some(category) {
                    bullets.push(self.format_bullet(ex));
                    sources.insert(ex.source.clone());
                    counter!("news_classified_total").increment(1);
                }
            }
            let bucket = self
                .dedupe_and_cap(category, bullets, sources.into_iter().collect())
                .await;
            out.push(bucket);
        }
        out
    }

    /// Tier-1 rule-based dedup always runs; tier-2 semantic merging is a
    /// bounded, best-effort refinement on top of it.
    async fn dedupe_and_cap(
        &self,
        category: Category,
        bullets: Vec<String>,
        provenance: Vec<String>,
    ) -> CategoryBucket {
        let tier1 = simple_dedupe(&bullets);
        counter!("news_dedup_total").increment((bullets.len() - tier1.len()) as u64);

        let batch_len = tier1.len().min(self.enhancer_batch_cap);
        let (batch, overflow) = tier1.split_at(batch_len);
        let enhanced = self.enhancer.enhance(batch).await;

        let merged: Vec<String> = if enhanced.is_empty() {
            tier1.clone()
        } else {
            // Enhancer output is untrusted: re-bound, re-attribute, and make
            // sure its merging did not reintroduce duplicates. Bullets past
            // the batch cap are appended unmodified.
            let mut combined: Vec<String> = enhanced
                .into_iter()
                .map(|b| self.bound_bullet(&ensure_attribution(b, "enhanced")))
                .collect();
            combined.extend(overflow.iter().cloned());
            simple_dedupe(&combined)
        };

        let total_count = merged.len();
        let mut kept = merged;
        kept.truncate(self.cfg.max_bullets_per_category);
        let truncated_count = total_count - kept.len();

        tracing::debug!(
            category = %category,
            total = total_count,
            truncated = truncated_count,
            "category bucket built"
        );
        CategoryBucket {
            category,
            bullets: kept,
            total_count,
            truncated_count,
            provenance,
        }
    }

    fn format_bullet(&self, excerpt: &Excerpt) -> String {
        let attributed = ensure_attribution(excerpt.body.clone(), &excerpt.source);
        self.bound_bullet(&attributed)
    }

    /// Soft length cap preferring a sentence boundary, always preserving a
    /// trailing source citation fragment.
    fn bound_bullet(&self, text: &str) -> String {
        let max = self.cfg.bullet_max_chars;
        if text.chars().count() <= max {
            return text.to_string();
        }
        match split_trailing_citation(text) {
            Some((body, citation)) => {
                let budget = max.saturating_sub(citation.chars().count() + 1);
                let trimmed = trim_at_sentence(body.trim_end(), budget);
                format!("{trimmed} {citation}")
            }
            None => trim_at_sentence(text, max),
        }
    }
}

fn filter_lookback(excerpts: &[Excerpt], now: u64, lookback_hours: i64) -> Vec<Excerpt> {
    let cutoff = now.saturating_sub((lookback_hours.max(0) as u64) * 3600);
    excerpts
        .iter()
        // Undated items (published_at == 0) pass through; the feed itself is
        // the freshness signal for those.
        .filter(|e| e.published_at == 0 || e.published_at >= cutoff)
        .cloned()
        .collect()
}

/// A bullet is never emitted without some source attribution.
fn ensure_attribution(text: String, fallback_source: &str) -> String {
    if split_trailing_citation(&text).is_some() {
        return text;
    }
    let label = fallback_source.trim();
    if label.is_empty() {
        format!("{text} (source unverified)")
    } else {
        format!("{text} ({label})")
    }
}

/// Split "body ... (Citation)" into body and citation, if one is present.
fn split_trailing_citation(text: &str) -> Option<(&str, &str)> {
    let trimmed = text.trim_end();
    if !trimmed.ends_with(')') {
        return None;
    }
    let open = trimmed.rfind('(')?;
    let citation = &trimmed[open..];
    // Citations are short labels, not parenthetical sentences.
    if citation.len() > 42 || citation.len() < 3 {
        return None;
    }
    Some((&trimmed[..open], citation))
}
