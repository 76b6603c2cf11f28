// src/schedule/sources/events_api.rs
//! Primary source: structured events API returning JSON.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::queue::{FetchRequest, RequestQueue};
use crate::schedule::sources::ScheduleSource;
use crate::schedule::window::ScheduleWindow;
use crate::schedule::Game;

pub const SOURCE_NAME: &str = "events-api";

#[derive(Debug, Deserialize)]
struct EventsPayload {
    #[serde(default)]
    events: Vec<EventRecord>,
}

#[derive(Debug, Deserialize)]
struct EventRecord {
    home_team: Option<String>,
    away_team: Option<String>,
    start_time: Option<String>,
}

pub struct EventsApiSource {
    queue: Arc<RequestQueue>,
    url: String,
    timeout: Duration,
}

impl EventsApiSource {
    pub fn new(queue: Arc<RequestQueue>, url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            queue,
            url: url.into(),
            timeout,
        }
    }

    fn parse_body(body: &str, window: &ScheduleWindow) -> Vec<Game> {
        // Malformed JSON is "no data from this attempt", never fatal.
        let payload: EventsPayload = match serde_json::from_str(body) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(source = SOURCE_NAME, error = %e, "unparsable events payload");
                return Vec::new();
            }
        };

        let mut out = Vec::with_capacity(payload.events.len());
        for ev in payload.events {
            let (Some(home), Some(away)) = (ev.home_team, ev.away_team) else {
                continue;
            };
            if home.trim().is_empty() || away.trim().is_empty() {
                continue;
            }
            let start_ts = ev
                .start_time
                .as_deref()
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|dt| dt.with_timezone(&Utc))
                .filter(|ts| window.contains(*ts));
            out.push(Game {
                away_team: away.trim().to_string(),
                home_team: home.trim().to_string(),
                start_ts,
                source: SOURCE_NAME.to_string(),
            });
        }
        out
    }
}

#[async_trait]
impl ScheduleSource for EventsApiSource {
    async fn fetch_schedule(&self, window: &ScheduleWindow) -> Result<Vec<Game>> {
        let req = FetchRequest::new(&self.url, SOURCE_NAME)
            .with_query("from", window.start.to_rfc3339())
            .with_query("to", window.end.to_rfc3339())
            .with_timeout(self.timeout)
            .deferrable();

        let Some(body) = self.queue.submit(req).await? else {
            return Ok(Vec::new());
        };
        Ok(Self::parse_body(&body, window))
    }

    fn name(&self) -> &'static str {
        SOURCE_NAME
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn window() -> ScheduleWindow {
        ScheduleWindow::new(
            Utc.with_ymd_and_hms(2025, 11, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 11, 8, 0, 0, 0).unwrap(),
            "test",
        )
    }

    #[test]
    fn parses_events_and_filters_window() {
        let body = r#"{"events": [
            {"home_team": "Hawks", "away_team": "Wolves", "start_time": "2025-11-03T19:30:00-05:00"},
            {"home_team": "Bears", "away_team": "Lions", "start_time": "2025-12-25T13:00:00-05:00"},
            {"home_team": "Sharks", "away_team": "Owls"}
        ]}"#;
        let games = EventsApiSource::parse_body(body, &window());
        assert_eq!(games.len(), 3);
        assert!(games[0].start_ts.is_some());
        // Outside the window: kept as a game but with no trusted timestamp.
        assert!(games[1].start_ts.is_none());
        assert!(games[2].start_ts.is_none());
    }

    #[test]
    fn malformed_json_yields_no_data() {
        assert!(EventsApiSource::parse_body("<html>oops</html>", &window()).is_empty());
        assert!(EventsApiSource::parse_body("{}", &window()).is_empty());
    }

    #[test]
    fn skips_records_missing_teams() {
        let body = r#"{"events": [{"home_team": "Hawks"}, {"away_team": ""}]}"#;
        assert!(EventsApiSource::parse_body(body, &window()).is_empty());
    }
}
