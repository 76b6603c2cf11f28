// src/briefing.rs
//! Terminal assembly: category buckets and resolved games become an ordered,
//! paginated briefing. Assembly never fails; empty categories are emitted
//! with an explicit marker so downstream renderers keep a consistent layout.

use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;

use crate::config::PagesConfig;
use crate::news::classify::Category;
use crate::news::CategoryBucket;
use crate::schedule::{Game, ResolveOutcome};

pub const NO_ITEMS_MARKER: &str = "no items";

#[derive(Debug, Clone, Serialize)]
pub struct Section {
    pub name: String,
    pub pages: Vec<Vec<String>>,
    pub total_count: usize,
    pub truncated_count: usize,
    pub provenance: Vec<String>,
    /// Present exactly when the section has zero items.
    pub empty_marker: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Briefing {
    pub sections: Vec<Section>,
    pub generated_at: DateTime<Utc>,
}

/// Slice items into pages of `per_page`. The final page holds the remainder
/// and is never padded.
pub fn chunk<T: Clone>(items: &[T], per_page: usize) -> Vec<Vec<T>> {
    assert!(per_page > 0, "page size must be positive");
    items.chunks(per_page).map(|c| c.to_vec()).collect()
}

fn section_from_bucket(bucket: &CategoryBucket, per_page: usize) -> Section {
    let empty = bucket.bullets.is_empty();
    Section {
        name: bucket.category.as_str().to_string(),
        pages: chunk(&bucket.bullets, per_page),
        total_count: bucket.total_count,
        truncated_count: bucket.truncated_count,
        provenance: bucket.provenance.clone(),
        empty_marker: empty.then(|| NO_ITEMS_MARKER.to_string()),
    }
}

fn format_game_line(game: &Game, tz_offset_hours: i32) -> String {
    match game.start_ts {
        Some(ts) => {
            let tz = FixedOffset::east_opt(tz_offset_hours * 3600)
                .unwrap_or_else(|| FixedOffset::east_opt(0).expect("utc offset"));
            let local = ts.with_timezone(&tz);
            format!(
                "{} at {} - {}",
                game.away_team,
                game.home_team,
                local.format("%a %b %-d, %-I:%M %p")
            )
        }
        None => format!("{} at {} - time TBD", game.away_team, game.home_team),
    }
}

fn schedule_section(
    schedule: &ResolveOutcome,
    per_page: usize,
    tz_offset_hours: i32,
) -> Section {
    let lines: Vec<String> = schedule
        .games
        .iter()
        .map(|g| format_game_line(g, tz_offset_hours))
        .collect();

    let provenance = if schedule.games.is_empty() {
        // Total failure of the chain is labeled, not thrown upward.
        schedule
            .sources_attempted
            .iter()
            .map(|s| format!("{s}: unavailable"))
            .collect()
    } else {
        let mut sources: Vec<String> = schedule.games.iter().map(|g| g.source.clone()).collect();
        sources.dedup();
        sources
    };

    let empty = lines.is_empty();
    Section {
        name: "scheduled-games".to_string(),
        total_count: lines.len(),
        truncated_count: 0,
        pages: chunk(&lines, per_page),
        provenance,
        empty_marker: empty.then(|| NO_ITEMS_MARKER.to_string()),
    }
}

pub struct BriefingAssembler {
    pages: PagesConfig,
    tz_offset_hours: i32,
}

impl BriefingAssembler {
    pub fn new(pages: PagesConfig, tz_offset_hours: i32) -> Self {
        Self {
            pages,
            tz_offset_hours,
        }
    }

    fn per_page_for(&self, category: Category) -> usize {
        match category {
            Category::Injuries => self.pages.injuries_per_page,
            Category::RosterMoves => self.pages.roster_moves_per_page,
            Category::BreakingNews => self.pages.breaking_news_per_page,
        }
    }

    /// Fixed output order: injuries, roster moves, scheduled games, breaking
    /// news. Within-section order is whatever the upstream stages produced.
    pub fn assemble(&self, schedule: &ResolveOutcome, buckets: &[CategoryBucket]) -> Briefing {
        let find = |cat: Category| buckets.iter().find(|b| b.category == cat);
        let empty_bucket = |cat: Category| CategoryBucket {
            category: cat,
            bullets: Vec::new(),
            total_count: 0,
            truncated_count: 0,
            provenance: Vec::new(),
        };

        let mut sections = Vec::with_capacity(4);
        for cat in [Category::Injuries, Category::RosterMoves] {
            let owned;
            let bucket = match find(cat) {
                Some(b) => b,
                None => {
                    owned = empty_bucket(cat);
                    &owned
                }
            };
            sections.push(section_from_bucket(bucket, self.per_page_for(cat)));
        }
        sections.push(schedule_section(
            schedule,
            self.pages.schedule_per_page,
            self.tz_offset_hours,
        ));
        {
            let cat = Category::BreakingNews;
            let owned;
            let bucket = match find(cat) {
                Some(b) => b,
                None => {
                    owned = empty_bucket(cat);
                    &owned
                }
            };
            sections.push(section_from_bucket(bucket, self.per_page_for(cat)));
        }

        Briefing {
            sections,
            generated_at: Utc::now(),
        }
    }
}
