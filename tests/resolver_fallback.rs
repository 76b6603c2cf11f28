// tests/resolver_fallback.rs
// Fallback-chain and window-expansion behavior of the schedule resolver,
// using in-memory sources.

use std::sync::atomic::{AtomicU32, Ordering};

use anyhow::Result;
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use gameday_briefing::config::ScheduleConfig;
use gameday_briefing::schedule::sources::ScheduleSource;
use gameday_briefing::schedule::window::ScheduleWindow;
use gameday_briefing::schedule::{Game, ScheduleResolver};

fn game(n: u32) -> Game {
    Game {
        away_team: format!("Away{n}"),
        home_team: format!("Home{n}"),
        start_ts: Some(Utc.with_ymd_and_hms(2025, 11, 2 + n, 18, 0, 0).unwrap()),
        source: "static".into(),
    }
}

struct StaticSource {
    name: &'static str,
    games: Vec<Game>,
    calls: AtomicU32,
}

impl StaticSource {
    fn new(name: &'static str, games: Vec<Game>) -> Self {
        Self {
            name,
            games,
            calls: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl ScheduleSource for StaticSource {
    async fn fetch_schedule(&self, _window: &ScheduleWindow) -> Result<Vec<Game>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.games.clone())
    }
    fn name(&self) -> &'static str {
        self.name
    }
}

struct FailingSource;

#[async_trait]
impl ScheduleSource for FailingSource {
    async fn fetch_schedule(&self, _window: &ScheduleWindow) -> Result<Vec<Game>> {
        anyhow::bail!("connection refused")
    }
    fn name(&self) -> &'static str {
        "failing"
    }
}

fn cfg() -> ScheduleConfig {
    ScheduleConfig {
        min_games: 2,
        base_window_days: 7,
        max_expansion_days: 14,
        expansion_step_days: 7,
        inter_item_delay_ms: 1,
        ..ScheduleConfig::default()
    }
}

fn base_window() -> ScheduleWindow {
    let now = Utc.with_ymd_and_hms(2025, 11, 1, 0, 0, 0).unwrap();
    ScheduleWindow::upcoming_days(now, 7)
}

#[tokio::test]
async fn empty_primary_falls_through_to_secondary() {
    let resolver = ScheduleResolver::new(
        vec![
            Box::new(StaticSource::new("primary", Vec::new())),
            Box::new(StaticSource::new(
                "secondary",
                (1..=5).map(game).collect(),
            )),
            Box::new(StaticSource::new("tertiary", vec![game(9)])),
        ],
        cfg(),
    );

    let out = resolver.resolve(&base_window()).await;
    assert_eq!(out.games.len(), 5);
    assert_eq!(out.sources_attempted, vec!["primary", "secondary"]);
    assert!(!out.expanded);
}

#[tokio::test]
async fn sparse_source_triggers_bounded_expansion() {
    let source = Box::new(StaticSource::new("primary", vec![game(1)]));
    let resolver = ScheduleResolver::new(vec![source], cfg());

    let base = base_window();
    let out = resolver.resolve(&base).await;

    // One game is below min_games: the window widens, capped at the
    // configured maximum expansion, and the sparse result is accepted.
    assert!(out.expanded);
    assert_eq!(out.games.len(), 1);
    assert!(out.window_used.span_days() > base.span_days());
    assert!(out.window_used.span_days() <= base.span_days() + 14);
    assert_eq!(out.window_used.start, base.start);
}

#[tokio::test]
async fn duplicate_games_across_expansion_calls_collapse() {
    let games = vec![game(1), game(1), game(2)];
    let resolver = ScheduleResolver::new(
        vec![Box::new(StaticSource::new("primary", games))],
        cfg(),
    );

    let out = resolver.resolve(&base_window()).await;
    assert_eq!(out.games.len(), 2);
    assert!(!out.expanded);
}

#[tokio::test]
async fn erroring_sources_are_contained() {
    let resolver = ScheduleResolver::new(
        vec![
            Box::new(FailingSource),
            Box::new(StaticSource::new("secondary", vec![game(1), game(2)])),
        ],
        cfg(),
    );

    let out = resolver.resolve(&base_window()).await;
    assert_eq!(out.games.len(), 2);
    assert_eq!(out.sources_attempted, vec!["failing", "secondary"]);
}

#[tokio::test]
async fn total_failure_yields_empty_outcome_not_error() {
    let resolver = ScheduleResolver::new(
        vec![Box::new(FailingSource), Box::new(FailingSource)],
        cfg(),
    );

    let out = resolver.resolve(&base_window()).await;
    assert!(out.games.is_empty());
    assert!(!out.expanded);
    assert_eq!(out.sources_attempted.len(), 2);
}

#[tokio::test]
async fn games_sorted_ascending_with_unparsed_last() {
    let mut g_unparsed = game(3);
    g_unparsed.start_ts = None;
    let games = vec![game(5), g_unparsed, game(1)];
    let resolver = ScheduleResolver::new(
        vec![Box::new(StaticSource::new("primary", games))],
        cfg(),
    );

    let out = resolver.resolve(&base_window()).await;
    assert_eq!(out.games.len(), 3);
    assert_eq!(out.games[0].away_team, "Away1");
    assert_eq!(out.games[1].away_team, "Away5");
    assert!(out.games[2].start_ts.is_none());
}
