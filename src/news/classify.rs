// src/news/classify.rs
//! Rule-based category assignment. Classification is a pure function of the
//! excerpt text: deterministic, idempotent, at most one category.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Injuries,
    RosterMoves,
    BreakingNews,
}

impl Category {
    pub const ALL: [Category; 3] = [
        Category::Injuries,
        Category::RosterMoves,
        Category::BreakingNews,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Injuries => "injuries",
            Category::RosterMoves => "roster-moves",
            Category::BreakingNews => "breaking-news",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// Injury-status vocabulary.
const INJURY_SIGNALS: &[&str] = &[
    "injury",
    "injured",
    "injured reserve",
    "day-to-day",
    "day to day",
    "questionable",
    "doubtful",
    "out for the season",
    "out indefinitely",
    "placed on ir",
    "acl",
    "mcl",
    "hamstring",
    "concussion",
    "ankle",
    "groin",
    "surgery",
    "week-to-week",
];

// Transaction verbs.
const ROSTER_SIGNALS: &[&str] = &[
    "signed",
    "signs",
    "re-signed",
    "traded",
    "trade for",
    "acquired",
    "waived",
    "released",
    "claimed off waivers",
    "promoted",
    "called up",
    "sent down",
    "contract extension",
    "designated for assignment",
    "activated",
];

const BREAKING_SIGNALS: &[&str] = &[
    "breaking",
    "suspended",
    "suspension",
    "fired",
    "hired",
    "retires",
    "retirement",
    "steps down",
    "banned",
    "investigation",
    "lawsuit",
];

fn matches_any(haystack: &str, signals: &[&str]) -> bool {
    signals.iter().any(|s| haystack.contains(s))
}

/// Assign exactly one category or none. Signal precedence is fixed
/// (injuries, then roster moves, then breaking news) so an excerpt matching
/// several vocabularies still lands deterministically.
pub fn classify(text: &str) -> Option<Category> {
    let lower = text.to_lowercase();
    if matches_any(&lower, INJURY_SIGNALS) {
        return Some(Category::Injuries);
    }
    if matches_any(&lower, ROSTER_SIGNALS) {
        return Some(Category::RosterMoves);
    }
    if matches_any(&lower, BREAKING_SIGNALS) {
        return Some(Category::BreakingNews);
    }
    None
}
