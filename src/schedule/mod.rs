// src/schedule/mod.rs
//! Multi-source schedule resolution with progressive window expansion.
//!
//! Sources are tried in declared priority order; the first one returning at
//! least one parseable game is accepted. When that source comes back sparse
//! the window is widened and the same source re-queried before falling
//! through. Sparse near-term schedules are a normal condition, not a source
//! failure.

pub mod sources;
pub mod timeparse;
pub mod window;

use std::collections::HashSet;
use std::time::Duration;

use serde::Serialize;

use crate::config::ScheduleConfig;
use sources::ScheduleSource;
use window::ScheduleWindow;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Game {
    pub away_team: String,
    pub home_team: String,
    /// None when no trusted timestamp could be parsed.
    pub start_ts: Option<chrono::DateTime<chrono::Utc>>,
    pub source: String,
}

impl Game {
    /// Identity key for dedup across repeated calls within one resolve.
    fn identity(&self) -> (String, String, Option<i64>) {
        (
            self.away_team.to_lowercase(),
            self.home_team.to_lowercase(),
            self.start_ts.map(|t| t.timestamp()),
        )
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ResolveOutcome {
    pub games: Vec<Game>,
    pub window_used: ScheduleWindow,
    pub expanded: bool,
    pub sources_attempted: Vec<String>,
}

pub struct ScheduleResolver {
    sources: Vec<Box<dyn ScheduleSource>>,
    cfg: ScheduleConfig,
}

impl ScheduleResolver {
    pub fn new(sources: Vec<Box<dyn ScheduleSource>>, cfg: ScheduleConfig) -> Self {
        Self { sources, cfg }
    }

    /// Resolve games for the window. Per-source failures are contained; an
    /// all-sources failure yields an empty outcome, never an error.
    pub async fn resolve(&self, base: &ScheduleWindow) -> ResolveOutcome {
        let mut attempted: Vec<String> = Vec::new();
        let max_span = base.span_days() + self.cfg.max_expansion_days;

        for (i, source) in self.sources.iter().enumerate() {
            if i > 0 {
                // Extra throttle between source attempts, on top of queue pacing.
                tokio::time::sleep(Duration::from_millis(self.cfg.inter_item_delay_ms)).await;
            }
            attempted.push(source.name().to_string());

            let mut games = match source.fetch_schedule(base).await {
                Ok(g) => dedup_games(g),
                Err(e) => {
                    tracing::warn!(source = source.name(), error = ?e, "schedule source failed");
                    continue;
                }
            };
            if games.is_empty() {
                tracing::debug!(source = source.name(), "no parseable games, falling through");
                continue;
            }

            // Chosen source. Widen the window while the result stays sparse.
            let mut window = base.clone();
            while games.len() < self.cfg.min_games && window.span_days() < max_span {
                let step = self
                    .cfg
                    .expansion_step_days
                    .min(max_span - window.span_days());
                window = window.widened_by_days(step);
                tokio::time::sleep(Duration::from_millis(self.cfg.inter_item_delay_ms)).await;
                match source.fetch_schedule(&window).await {
                    Ok(more) => {
                        games.extend(more);
                        games = dedup_games(games);
                    }
                    Err(e) => {
                        tracing::warn!(source = source.name(), error = ?e, "expansion query failed");
                        break;
                    }
                }
            }

            sort_games(&mut games);
            let expanded = window.span_days() > base.span_days();
            tracing::info!(
                source = source.name(),
                games = games.len(),
                expanded,
                window = %window.label,
                "schedule resolved"
            );
            return ResolveOutcome {
                games,
                window_used: window,
                expanded,
                sources_attempted: attempted,
            };
        }

        tracing::warn!(attempted = ?attempted, "all schedule sources failed or returned nothing");
        ResolveOutcome {
            games: Vec::new(),
            window_used: base.clone(),
            expanded: false,
            sources_attempted: attempted,
        }
    }
}

/// Exact duplicates by (away, home, start) are dropped, first-seen wins.
fn dedup_games(games: Vec<Game>) -> Vec<Game> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(games.len());
    for g in games {
        if seen.insert(g.identity()) {
            out.push(g);
        }
    }
    out
}

/// Ascending by timestamp; unparsed timestamps sort last, stably, in
/// original-source order.
fn sort_games(games: &mut [Game]) {
    games.sort_by(|a, b| match (a.start_ts, b.start_ts) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
}
