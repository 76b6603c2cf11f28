// src/schedule/window.rs

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

/// Query time range for schedule resolution. Derived per invocation, never
/// persisted. Widening keeps the start fixed and pushes the end outward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduleWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub label: String,
}

impl ScheduleWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>, label: impl Into<String>) -> Self {
        Self {
            start,
            end,
            label: label.into(),
        }
    }

    /// Base window of `days` days starting now.
    pub fn upcoming_days(now: DateTime<Utc>, days: i64) -> Self {
        Self::new(now, now + Duration::days(days), format!("next {days} days"))
    }

    pub fn widened_by_days(&self, days: i64) -> Self {
        let end = self.end + Duration::days(days);
        let total = (end - self.start).num_days();
        Self::new(self.start, end, format!("widened to {total} days"))
    }

    pub fn span_days(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.start && ts <= self.end
    }
}
