// src/schedule/sources/mod.rs

pub mod events_api;
pub mod scrape;

use anyhow::Result;

use crate::schedule::window::ScheduleWindow;
use crate::schedule::Game;

/// One schedule data source in the fallback chain. Implementations issue
/// every call through the shared `RequestQueue` and return an empty list
/// (not an error) on parse-level "no data".
#[async_trait::async_trait]
pub trait ScheduleSource: Send + Sync {
    async fn fetch_schedule(&self, window: &ScheduleWindow) -> Result<Vec<Game>>;
    fn name(&self) -> &'static str;
}
