// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod api;
pub mod briefing;
pub mod config;
pub mod enhance;
pub mod metrics;
pub mod news;
pub mod pipeline;
pub mod queue;
pub mod schedule;

// ---- Re-exports for stable public API ----
pub use crate::api::create_router;
pub use crate::briefing::{chunk, Briefing, BriefingAssembler, Section};
pub use crate::config::BriefingConfig;
pub use crate::news::{CategoryBucket, Excerpt, NewsAggregator};
pub use crate::pipeline::BriefingPipeline;
pub use crate::queue::{FetchRequest, RequestQueue};
pub use crate::schedule::{Game, ResolveOutcome, ScheduleResolver};
