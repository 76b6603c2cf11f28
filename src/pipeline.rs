// src/pipeline.rs
//! One aggregation run end to end: resolve the schedule, collect and
//! classify news, assemble the paginated briefing. Per-source failures are
//! contained inside each stage; the run itself always completes with a
//! structurally complete briefing.

use std::sync::Arc;
use std::time::Duration;

use sha2::{Digest, Sha256};

use crate::briefing::{Briefing, BriefingAssembler};
use crate::config::BriefingConfig;
use crate::enhance::{build_enhancer, BudgetedEnhancer};
use crate::news::NewsAggregator;
use crate::queue::RequestQueue;
use crate::schedule::sources::events_api::EventsApiSource;
use crate::schedule::sources::scrape::ScrapedScheduleSource;
use crate::schedule::sources::ScheduleSource;
use crate::schedule::timeparse::KickoffBand;
use crate::schedule::window::ScheduleWindow;
use crate::schedule::ScheduleResolver;

pub struct BriefingPipeline {
    queue: Arc<RequestQueue>,
    resolver: ScheduleResolver,
    aggregator: NewsAggregator,
    assembler: BriefingAssembler,
    enhancer: Arc<BudgetedEnhancer>,
    cfg: BriefingConfig,
}

impl BriefingPipeline {
    /// Wire the production pipeline from config. The queue is constructed
    /// once here and injected into every component that issues calls.
    pub fn from_config(cfg: BriefingConfig) -> Self {
        let queue = Arc::new(RequestQueue::new(cfg.queue.clone()));
        Self::with_queue(cfg, queue)
    }

    pub fn with_queue(cfg: BriefingConfig, queue: Arc<RequestQueue>) -> Self {
        let call_timeout = Duration::from_secs(cfg.queue.call_timeout_secs);
        let band = KickoffBand::new(
            cfg.schedule.kickoff_min_hour,
            cfg.schedule.kickoff_max_hour,
            cfg.schedule.tz_offset_hours,
        );
        let sources: Vec<Box<dyn ScheduleSource>> = vec![
            Box::new(EventsApiSource::new(
                queue.clone(),
                &cfg.schedule.events_api_url,
                call_timeout,
            )),
            Box::new(ScrapedScheduleSource::secondary(
                queue.clone(),
                &cfg.schedule.secondary_url,
                band,
                call_timeout,
            )),
            Box::new(ScrapedScheduleSource::tertiary(
                queue.clone(),
                &cfg.schedule.tertiary_url,
                band,
                call_timeout,
            )),
        ];
        let resolver = ScheduleResolver::new(sources, cfg.schedule.clone());

        let enhancer = build_enhancer(&cfg.enhancer);
        let aggregator = NewsAggregator::new(
            queue.clone(),
            enhancer.clone(),
            cfg.enhancer.batch_cap,
            cfg.news.clone(),
        );
        let assembler =
            BriefingAssembler::new(cfg.pages.clone(), cfg.schedule.tz_offset_hours);

        Self {
            queue,
            resolver,
            aggregator,
            assembler,
            enhancer,
            cfg,
        }
    }

    pub fn queue(&self) -> &Arc<RequestQueue> {
        &self.queue
    }

    /// Run once and hand back the briefing. Everything here is per-run
    /// state except the queue's reservoir, stats, and backlog.
    pub async fn run(&self, subject: Option<&str>) -> Briefing {
        let started = std::time::Instant::now();
        self.enhancer.reset_budget();

        let now = chrono::Utc::now();
        let base = ScheduleWindow::upcoming_days(now, self.cfg.schedule.base_window_days);
        let schedule = self.resolver.resolve(&base).await;

        let excerpts = self
            .aggregator
            .collect(subject, self.cfg.news.lookback_hours)
            .await;
        let buckets = self.aggregator.build_buckets(&excerpts).await;

        let briefing = self.assembler.assemble(&schedule, &buckets);

        let run_id = subject
            .map(run_tag)
            .unwrap_or_else(|| run_tag("all"));
        tracing::info!(
            run = %run_id,
            games = schedule.games.len(),
            schedule_expanded = schedule.expanded,
            sources_attempted = ?schedule.sources_attempted,
            excerpts = excerpts.len(),
            enhancer_calls = self.enhancer.calls_used(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "briefing assembled"
        );
        briefing
    }
}

/// Short anonymized tag for log correlation; raw subjects stay out of logs.
fn run_tag(subject: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(subject.as_bytes());
    hasher.update(chrono::Utc::now().timestamp().to_le_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{b:02x}");
    }
    out
}
