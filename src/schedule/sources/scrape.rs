// src/schedule/sources/scrape.rs
//! Fallback sources: HTML schedule pages parsed with an ordered strategy
//! cascade. Each strategy is tried until one yields at least one matchup;
//! a looser pattern only runs when the stricter one found nothing.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use once_cell::sync::OnceCell;
use regex::Regex;

use crate::queue::{FetchRequest, RequestQueue};
use crate::schedule::sources::ScheduleSource;
use crate::schedule::timeparse::{parse_kickoff, KickoffBand};
use crate::schedule::window::ScheduleWindow;
use crate::schedule::Game;

#[derive(Clone, Copy)]
pub struct ExtractionStrategy {
    pub name: &'static str,
    matchup: fn() -> &'static Regex,
}

fn re_dashed_matchup() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    // "Wolves at Hawks - Nov 3, 7:30 PM" style rows.
    RE.get_or_init(|| {
        Regex::new(r"(?i)^\s*([A-Z][A-Za-z .'&-]{1,30}?)\s+(?:at|@|vs\.?)\s+([A-Z][A-Za-z .'&-]{1,30}?)\s*[\u{2013}\u{2014}|-]\s*(.+)$")
            .unwrap()
    })
}

fn re_loose_matchup() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    // Last resort: any "X at Y" pair on a line.
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b([A-Z][A-Za-z .'&-]{1,30}?)\s+(?:at|@|vs\.?)\s+([A-Z][A-Za-z .'&-]{1,30})\b")
            .unwrap()
    })
}

pub const STRATEGY_DASHED: ExtractionStrategy = ExtractionStrategy {
    name: "dashed-row",
    matchup: re_dashed_matchup,
};

pub const STRATEGY_LOOSE: ExtractionStrategy = ExtractionStrategy {
    name: "loose-matchup",
    matchup: re_loose_matchup,
};

/// Flatten markup to text lines: block-closing tags become newlines, every
/// other tag is dropped, entities are decoded.
fn markup_to_lines(html: &str) -> Vec<String> {
    static RE_BREAKS: OnceCell<Regex> = OnceCell::new();
    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let re_breaks = RE_BREAKS
        .get_or_init(|| Regex::new(r"(?i)</(tr|li|p|div|h\d)>|<br\s*/?>").unwrap());
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[^>]+>").unwrap());

    let broken = re_breaks.replace_all(html, "\n");
    let stripped = re_tags.replace_all(&broken, " ");
    let decoded = html_escape::decode_html_entities(&stripped).to_string();
    decoded
        .lines()
        .map(|l| l.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|l| !l.is_empty())
        .map(|l| l.to_string())
        .collect()
}

/// Run the strategy cascade over scraped markup. The first strategy that
/// produces at least one game wins.
pub fn extract_games(
    html: &str,
    strategies: &[ExtractionStrategy],
    window: &ScheduleWindow,
    band: KickoffBand,
    source: &str,
) -> Vec<Game> {
    let lines = markup_to_lines(html);
    for strategy in strategies {
        let re = (strategy.matchup)();
        let mut games = Vec::new();
        for line in &lines {
            let Some(caps) = re.captures(line) else {
                continue;
            };
            let away = caps.get(1).map(|m| m.as_str().trim().to_string());
            let home = caps.get(2).map(|m| m.as_str().trim().to_string());
            let (Some(away), Some(home)) = (away, home) else {
                continue;
            };
            if away.is_empty() || home.is_empty() {
                continue;
            }
            // Implausible kickoff times come back as None, sorting last.
            let start_ts = parse_kickoff(line, window.start, band).filter(|ts| window.contains(*ts));
            games.push(Game {
                away_team: away,
                home_team: home,
                start_ts,
                source: source.to_string(),
            });
        }
        if !games.is_empty() {
            tracing::debug!(source, strategy = strategy.name, games = games.len(), "extraction strategy matched");
            return games;
        }
    }
    Vec::new()
}

pub struct ScrapedScheduleSource {
    queue: Arc<RequestQueue>,
    url: String,
    name: &'static str,
    strategies: Vec<ExtractionStrategy>,
    band: KickoffBand,
    timeout: Duration,
}

impl ScrapedScheduleSource {
    /// Secondary source: structured-ish schedule table, strict rows first.
    pub fn secondary(
        queue: Arc<RequestQueue>,
        url: impl Into<String>,
        band: KickoffBand,
        timeout: Duration,
    ) -> Self {
        Self {
            queue,
            url: url.into(),
            name: "scrape-secondary",
            strategies: vec![STRATEGY_DASHED, STRATEGY_LOOSE],
            band,
            timeout,
        }
    }

    /// Tertiary source: loosely formatted score wire, loose pattern only.
    pub fn tertiary(
        queue: Arc<RequestQueue>,
        url: impl Into<String>,
        band: KickoffBand,
        timeout: Duration,
    ) -> Self {
        Self {
            queue,
            url: url.into(),
            name: "scrape-tertiary",
            strategies: vec![STRATEGY_LOOSE],
            band,
            timeout,
        }
    }
}

#[async_trait]
impl ScheduleSource for ScrapedScheduleSource {
    async fn fetch_schedule(&self, window: &ScheduleWindow) -> Result<Vec<Game>> {
        let req = FetchRequest::new(&self.url, self.name)
            .with_timeout(self.timeout)
            .deferrable();
        let Some(body) = self.queue.submit(req).await? else {
            return Ok(Vec::new());
        };
        Ok(extract_games(&body, &self.strategies, window, self.band, self.name))
    }

    fn name(&self) -> &'static str {
        self.name
    }
}
