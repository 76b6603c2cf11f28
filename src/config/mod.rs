// src/config/mod.rs
//! Runtime configuration for the aggregation pipeline.
//!
//! Everything tunable lives in one TOML file (`config/briefing.toml` by
//! default, override with `BRIEFING_CONFIG_PATH`). Every field has a serde
//! default so a missing file or a partial file still yields a usable config.
//! The numeric thresholds here are empirically tuned knobs, not invariants.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "config/briefing.toml";
pub const ENV_CONFIG_PATH: &str = "BRIEFING_CONFIG_PATH";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BriefingConfig {
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub news: NewsConfig,
    #[serde(default)]
    pub enhancer: EnhancerConfig,
    #[serde(default)]
    pub pages: PagesConfig,
}

impl BriefingConfig {
    /// Load from an explicit path. Fails loudly on unreadable/unparsable TOML.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let cfg: BriefingConfig = toml::from_str(&data)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(cfg)
    }

    /// Load using `$BRIEFING_CONFIG_PATH`, then the default location, then
    /// built-in defaults when no file exists at either.
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            return Self::load_from_file(PathBuf::from(p));
        }
        let default = PathBuf::from(DEFAULT_CONFIG_PATH);
        if default.exists() {
            return Self::load_from_file(&default);
        }
        Ok(Self::default())
    }
}

// ---- Queue ----

fn default_reservoir_capacity() -> u32 {
    30
}
fn default_refill_interval_secs() -> u64 {
    60
}
fn default_min_spacing_ms() -> u64 {
    400
}
fn default_retry_max_attempts() -> u32 {
    3
}
fn default_backoff_base_ms() -> u64 {
    500
}
fn default_backoff_cap_ms() -> u64 {
    8_000
}
fn default_retry_ceiling() -> u32 {
    6
}
fn default_backlog_max() -> usize {
    100
}
fn default_call_timeout_secs() -> u64 {
    10
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Token-bucket capacity per refill window. Ignored when `unlimited`.
    #[serde(default = "default_reservoir_capacity")]
    pub reservoir_capacity: u32,
    #[serde(default = "default_refill_interval_secs")]
    pub refill_interval_secs: u64,
    /// Minimum wall-clock spacing between consecutive outbound calls.
    #[serde(default = "default_min_spacing_ms")]
    pub min_spacing_ms: u64,
    /// Immediate retry attempts before a request is deferred or fails.
    #[serde(default = "default_retry_max_attempts")]
    pub retry_max_attempts: u32,
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
    #[serde(default = "default_backoff_cap_ms")]
    pub backoff_cap_ms: u64,
    /// Absolute attempt ceiling across deferral reprocessing.
    #[serde(default = "default_retry_ceiling")]
    pub retry_ceiling: u32,
    #[serde(default = "default_backlog_max")]
    pub backlog_max: usize,
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,
    /// Disable the reservoir entirely (tests, local runs).
    #[serde(default)]
    pub unlimited: bool,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            reservoir_capacity: default_reservoir_capacity(),
            refill_interval_secs: default_refill_interval_secs(),
            min_spacing_ms: default_min_spacing_ms(),
            retry_max_attempts: default_retry_max_attempts(),
            backoff_base_ms: default_backoff_base_ms(),
            backoff_cap_ms: default_backoff_cap_ms(),
            retry_ceiling: default_retry_ceiling(),
            backlog_max: default_backlog_max(),
            call_timeout_secs: default_call_timeout_secs(),
            unlimited: false,
        }
    }
}

// ---- Schedule ----

fn default_base_window_days() -> i64 {
    7
}
fn default_min_games() -> usize {
    2
}
fn default_max_expansion_days() -> i64 {
    14
}
fn default_expansion_step_days() -> i64 {
    7
}
fn default_inter_item_delay_ms() -> u64 {
    250
}
fn default_tz_offset_hours() -> i32 {
    -5
}
fn default_kickoff_min_hour() -> u32 {
    12
}
fn default_kickoff_max_hour() -> u32 {
    23
}
fn default_events_api_url() -> String {
    "https://api.example-sports.com/v1/events".to_string()
}
fn default_secondary_url() -> String {
    "https://www.example-schedules.com/league/schedule".to_string()
}
fn default_tertiary_url() -> String {
    "https://scores.example-wire.com/upcoming".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_base_window_days")]
    pub base_window_days: i64,
    /// Below this count the resolver widens the window before giving up on a
    /// source. Sparse near-term schedules are normal (bye weeks, off-season).
    #[serde(default = "default_min_games")]
    pub min_games: usize,
    #[serde(default = "default_max_expansion_days")]
    pub max_expansion_days: i64,
    #[serde(default = "default_expansion_step_days")]
    pub expansion_step_days: i64,
    /// Extra throttle between source attempts, on top of queue pacing.
    #[serde(default = "default_inter_item_delay_ms")]
    pub inter_item_delay_ms: u64,
    #[serde(default = "default_tz_offset_hours")]
    pub tz_offset_hours: i32,
    /// Plausible kickoff hours (inclusive, local time). Scraped text outside
    /// this band is treated as unparsed, not trusted.
    #[serde(default = "default_kickoff_min_hour")]
    pub kickoff_min_hour: u32,
    #[serde(default = "default_kickoff_max_hour")]
    pub kickoff_max_hour: u32,
    #[serde(default = "default_events_api_url")]
    pub events_api_url: String,
    #[serde(default = "default_secondary_url")]
    pub secondary_url: String,
    #[serde(default = "default_tertiary_url")]
    pub tertiary_url: String,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            base_window_days: default_base_window_days(),
            min_games: default_min_games(),
            max_expansion_days: default_max_expansion_days(),
            expansion_step_days: default_expansion_step_days(),
            inter_item_delay_ms: default_inter_item_delay_ms(),
            tz_offset_hours: default_tz_offset_hours(),
            kickoff_min_hour: default_kickoff_min_hour(),
            kickoff_max_hour: default_kickoff_max_hour(),
            events_api_url: default_events_api_url(),
            secondary_url: default_secondary_url(),
            tertiary_url: default_tertiary_url(),
        }
    }
}

// ---- News ----

fn default_lookback_hours() -> i64 {
    24
}
fn default_fallback_lookback_hours() -> i64 {
    72
}
fn default_min_items() -> usize {
    3
}
fn default_max_bullets() -> usize {
    8
}
fn default_bullet_max_chars() -> usize {
    280
}
fn default_excerpt_max_chars() -> usize {
    600
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    pub url: String,
    pub source: String,
    /// Subject-specific feeds only run when that subject is collected.
    #[serde(default)]
    pub subject: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsConfig {
    #[serde(default)]
    pub feeds: Vec<FeedConfig>,
    #[serde(default = "default_lookback_hours")]
    pub lookback_hours: i64,
    /// One-shot widened lookback used when the first pass comes back sparse.
    #[serde(default = "default_fallback_lookback_hours")]
    pub fallback_lookback_hours: i64,
    #[serde(default = "default_min_items")]
    pub min_items: usize,
    #[serde(default = "default_max_bullets")]
    pub max_bullets_per_category: usize,
    #[serde(default = "default_bullet_max_chars")]
    pub bullet_max_chars: usize,
    #[serde(default = "default_excerpt_max_chars")]
    pub excerpt_max_chars: usize,
    #[serde(default = "default_inter_item_delay_ms")]
    pub inter_item_delay_ms: u64,
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            feeds: Vec::new(),
            lookback_hours: default_lookback_hours(),
            fallback_lookback_hours: default_fallback_lookback_hours(),
            min_items: default_min_items(),
            max_bullets_per_category: default_max_bullets(),
            bullet_max_chars: default_bullet_max_chars(),
            excerpt_max_chars: default_excerpt_max_chars(),
            inter_item_delay_ms: default_inter_item_delay_ms(),
        }
    }
}

// ---- Enhancer ----

fn default_run_budget() -> u32 {
    3
}
fn default_enhancer_timeout_secs() -> u64 {
    12
}
fn default_batch_cap() -> usize {
    15
}
fn default_api_key() -> String {
    "ENV".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnhancerConfig {
    #[serde(default)]
    pub enabled: bool,
    /// "openai" is the only provider wired today.
    #[serde(default)]
    pub provider: Option<String>,
    /// Calls allowed per aggregation run.
    #[serde(default = "default_run_budget")]
    pub run_budget: u32,
    /// Hard ceiling covering model latency, separate from HTTP timeouts.
    #[serde(default = "default_enhancer_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_batch_cap")]
    pub batch_cap: usize,
    /// "ENV" means: read from OPENAI_API_KEY.
    #[serde(default = "default_api_key")]
    pub api_key: String,
}

impl Default for EnhancerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: None,
            run_budget: default_run_budget(),
            timeout_secs: default_enhancer_timeout_secs(),
            batch_cap: default_batch_cap(),
            api_key: default_api_key(),
        }
    }
}

impl EnhancerConfig {
    /// Resolve the "ENV" sentinel into a concrete key. Missing credentials
    /// for an enabled enhancer are a startup error, not a per-call one.
    pub fn resolve_api_key(&self) -> Result<String> {
        if !self.api_key.trim().eq_ignore_ascii_case("env") {
            return Ok(self.api_key.clone());
        }
        std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow::anyhow!("Missing OPENAI_API_KEY env var"))
    }
}

// ---- Pagination ----

fn default_injuries_per_page() -> usize {
    5
}
fn default_roster_per_page() -> usize {
    5
}
fn default_schedule_per_page() -> usize {
    10
}
fn default_breaking_per_page() -> usize {
    5
}

/// Items-per-page is category-specific: terse schedule lines pack denser
/// than wordy news bullets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagesConfig {
    #[serde(default = "default_injuries_per_page")]
    pub injuries_per_page: usize,
    #[serde(default = "default_roster_per_page")]
    pub roster_moves_per_page: usize,
    #[serde(default = "default_schedule_per_page")]
    pub schedule_per_page: usize,
    #[serde(default = "default_breaking_per_page")]
    pub breaking_news_per_page: usize,
}

impl Default for PagesConfig {
    fn default() -> Self {
        Self {
            injuries_per_page: default_injuries_per_page(),
            roster_moves_per_page: default_roster_per_page(),
            schedule_per_page: default_schedule_per_page(),
            breaking_news_per_page: default_breaking_per_page(),
        }
    }
}
