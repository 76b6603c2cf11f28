// src/queue/mod.rs
//! Rate-limited request queue. Every outbound HTTP call in the process goes
//! through here: token-bucket reservoir, single in-flight call, minimum
//! inter-call spacing, retry-with-backoff on transient errors, and a
//! deferred backlog for requests that exhaust their immediate retries.

pub mod deferred;
pub mod reservoir;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use metrics::{counter, describe_counter, describe_gauge, gauge};
use once_cell::sync::OnceCell;
use serde::Serialize;
use tokio::time::Instant;

use crate::config::QueueConfig;
use deferred::{DeferredBacklog, DeferredItem};
use reservoir::Reservoir;

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("queue_requests_total", "Requests accepted by the queue.");
        describe_counter!("queue_success_total", "Requests that returned a usable result.");
        describe_counter!("queue_retries_total", "Transient failures retried with backoff.");
        describe_counter!("queue_deferred_total", "Requests parked in the deferred backlog.");
        describe_counter!("queue_failed_total", "Requests counted as permanently failed.");
        describe_gauge!("queue_backlog_len", "Current deferred backlog length.");
    });
}

// ---- Request / transport ----

#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub url: String,
    pub query: Vec<(String, String)>,
    pub timeout: Duration,
    /// Logical source name ("events-api", "wire-rss"), used for logging.
    pub source: String,
    pub subject: Option<String>,
    /// When true, exhausted retries park the request in the backlog instead
    /// of surfacing an error to the caller.
    pub defer_on_exhaust: bool,
}

impl FetchRequest {
    pub fn new(url: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            query: Vec::new(),
            timeout: Duration::from_secs(10),
            source: source.into(),
            subject: None,
            defer_on_exhaust: false,
        }
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn deferrable(mut self) -> Self {
        self.defer_on_exhaust = true;
        self
    }
}

#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

#[derive(Debug, Clone)]
pub enum TransportError {
    Timeout,
    Connect(String),
    Other(String),
}

impl TransportError {
    pub fn is_transient(&self) -> bool {
        matches!(self, TransportError::Timeout | TransportError::Connect(_))
    }
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportError::Timeout => write!(f, "timeout"),
            TransportError::Connect(e) => write!(f, "connect: {e}"),
            TransportError::Other(e) => write!(f, "transport: {e}"),
        }
    }
}

impl std::error::Error for TransportError {}

/// The wire itself, abstracted so the queue's pacing and retry behavior can
/// be exercised in tests without a network.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn fetch(&self, req: &FetchRequest) -> Result<TransportResponse, TransportError>;
}

pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .user_agent("gameday-briefing/0.1")
            .connect_timeout(Duration::from_secs(4))
            .build()
            .expect("reqwest client");
        Self { client }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, req: &FetchRequest) -> Result<TransportResponse, TransportError> {
        let resp = self
            .client
            .get(&req.url)
            .query(&req.query)
            .timeout(req.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TransportError::Timeout
                } else if e.is_connect() {
                    TransportError::Connect(e.to_string())
                } else {
                    TransportError::Other(e.to_string())
                }
            })?;

        let status = resp.status().as_u16();
        let body = resp.text().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout
            } else {
                TransportError::Other(e.to_string())
            }
        })?;
        Ok(TransportResponse { status, body })
    }
}

// ---- Stats ----

#[derive(Default)]
pub struct QueueStats {
    total: AtomicU64,
    successful: AtomicU64,
    retried: AtomicU64,
    deferred: AtomicU64,
    failed: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QueueStatsSnapshot {
    pub total_requests: u64,
    pub successful: u64,
    pub retried: u64,
    pub deferred: u64,
    pub failed: u64,
}

impl QueueStats {
    fn snapshot(&self) -> QueueStatsSnapshot {
        QueueStatsSnapshot {
            total_requests: self.total.load(Ordering::Relaxed),
            successful: self.successful.load(Ordering::Relaxed),
            retried: self.retried.load(Ordering::Relaxed),
            deferred: self.deferred.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }

    fn reset(&self) {
        self.total.store(0, Ordering::Relaxed);
        self.successful.store(0, Ordering::Relaxed);
        self.retried.store(0, Ordering::Relaxed);
        self.deferred.store(0, Ordering::Relaxed);
        self.failed.store(0, Ordering::Relaxed);
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct DrainReport {
    pub processed: usize,
    pub successful: usize,
}

// ---- Queue ----

/// Spacing state lives behind the same lock that serializes calls, so the
/// "one in-flight call system-wide" rule and the minimum spacing rule are
/// enforced by a single suspension point.
struct Gate {
    last_call_started: Option<Instant>,
}

enum ExecOutcome {
    Body(String),
    Empty,
    Exhausted { reason: String, attempts_used: u32 },
    Fatal(anyhow::Error),
}

enum CallResult {
    Body(String),
    Empty,
    Transient(String),
    Fatal(anyhow::Error),
}

pub struct RequestQueue {
    transport: Arc<dyn Transport>,
    reservoir: Reservoir,
    backlog: DeferredBacklog,
    stats: QueueStats,
    gate: tokio::sync::Mutex<Gate>,
    cfg: QueueConfig,
}

impl RequestQueue {
    pub fn new(cfg: QueueConfig) -> Self {
        Self::with_transport(cfg, Arc::new(HttpTransport::new()))
    }

    pub fn with_transport(cfg: QueueConfig, transport: Arc<dyn Transport>) -> Self {
        ensure_metrics_described();
        let reservoir = if cfg.unlimited {
            Reservoir::unlimited()
        } else {
            Reservoir::new(
                cfg.reservoir_capacity,
                Duration::from_secs(cfg.refill_interval_secs),
            )
        };
        Self {
            transport,
            reservoir,
            backlog: DeferredBacklog::new(cfg.backlog_max),
            stats: QueueStats::default(),
            gate: tokio::sync::Mutex::new(Gate {
                last_call_started: None,
            }),
            cfg,
        }
    }

    pub fn stats(&self) -> QueueStatsSnapshot {
        self.stats.snapshot()
    }

    /// Operator action only; counters are otherwise monotonic within a run.
    pub fn reset_stats(&self) {
        self.stats.reset();
    }

    pub fn reservoir_available(&self) -> u32 {
        self.reservoir.available()
    }

    pub fn backlog_len(&self) -> usize {
        self.backlog.len()
    }

    /// Issue a request. `Ok(Some(body))` on a usable response, `Ok(None)`
    /// when the source yielded no data (empty body, non-retryable client
    /// error, or the request was parked for deferral). Callers must treat
    /// "no data" as a legitimate outcome of any single source.
    pub async fn submit(&self, req: FetchRequest) -> Result<Option<String>> {
        self.stats.total.fetch_add(1, Ordering::Relaxed);
        counter!("queue_requests_total").increment(1);

        match self.execute(&req, 0).await {
            ExecOutcome::Body(body) => Ok(Some(body)),
            ExecOutcome::Empty => Ok(None),
            ExecOutcome::Exhausted {
                reason,
                attempts_used,
            } => {
                if req.defer_on_exhaust {
                    self.defer(req, attempts_used, reason);
                    Ok(None)
                } else {
                    self.stats.failed.fetch_add(1, Ordering::Relaxed);
                    counter!("queue_failed_total").increment(1);
                    Err(anyhow!("retries exhausted for {}: {}", req.url, reason))
                }
            }
            ExecOutcome::Fatal(e) => {
                self.stats.failed.fetch_add(1, Ordering::Relaxed);
                counter!("queue_failed_total").increment(1);
                Err(e)
            }
        }
    }

    fn defer(&self, req: FetchRequest, attempts: u32, reason: String) {
        let item = DeferredItem {
            request: req,
            attempts,
            next_eligible_unix: now_unix() + self.cfg.backoff_cap_ms / 1000,
            reason,
        };
        let source = item.request.source.clone();
        if self.backlog.push(item) {
            self.stats.deferred.fetch_add(1, Ordering::Relaxed);
            counter!("queue_deferred_total").increment(1);
            tracing::info!(source = %source, backlog = self.backlog.len(), "request deferred");
        } else {
            // Backlog full: the drop is counted, never silent.
            self.stats.failed.fetch_add(1, Ordering::Relaxed);
            counter!("queue_failed_total").increment(1);
            tracing::warn!(source = %source, "backlog full, request dropped as failed");
        }
        gauge!("queue_backlog_len").set(self.backlog.len() as f64);
    }

    /// Reprocess the backlog oldest-first, respecting the same reservoir and
    /// pacing. Items that fail again are re-queued with an incremented
    /// attempt count up to the absolute retry ceiling.
    pub async fn drain_deferred(&self) -> DrainReport {
        let mut processed = 0usize;
        let mut successful = 0usize;
        let snapshot_len = self.backlog.len();

        for _ in 0..snapshot_len {
            let Some(mut item) = self.backlog.pop_front() else {
                break;
            };
            if now_unix() < item.next_eligible_unix {
                // Not eligible yet; keep it for a later drain.
                let _ = self.backlog.push(item);
                continue;
            }
            processed += 1;
            self.stats.total.fetch_add(1, Ordering::Relaxed);
            counter!("queue_requests_total").increment(1);

            match self.execute(&item.request, item.attempts).await {
                ExecOutcome::Body(_) | ExecOutcome::Empty => {
                    successful += 1;
                }
                ExecOutcome::Exhausted {
                    reason,
                    attempts_used,
                } => {
                    item.attempts = attempts_used;
                    item.reason = reason;
                    item.next_eligible_unix = now_unix() + self.cfg.backoff_cap_ms / 1000;
                    let past_ceiling = item.attempts >= self.cfg.retry_ceiling;
                    if past_ceiling || !self.backlog.push(item.clone()) {
                        self.stats.failed.fetch_add(1, Ordering::Relaxed);
                        counter!("queue_failed_total").increment(1);
                        tracing::warn!(
                            url = %item.request.url,
                            attempts = item.attempts,
                            "deferred request dropped after retry ceiling"
                        );
                    }
                }
                ExecOutcome::Fatal(e) => {
                    self.stats.failed.fetch_add(1, Ordering::Relaxed);
                    counter!("queue_failed_total").increment(1);
                    tracing::warn!(url = %item.request.url, error = ?e, "deferred request failed");
                }
            }
        }

        gauge!("queue_backlog_len").set(self.backlog.len() as f64);
        DrainReport {
            processed,
            successful,
        }
    }

    async fn execute(&self, req: &FetchRequest, attempts_already: u32) -> ExecOutcome {
        let mut attempt: u32 = 0;
        loop {
            match self.call_once(req).await {
                CallResult::Body(body) => {
                    self.stats.successful.fetch_add(1, Ordering::Relaxed);
                    counter!("queue_success_total").increment(1);
                    return ExecOutcome::Body(body);
                }
                CallResult::Empty => {
                    // Parse-level "no data" is still a completed call.
                    self.stats.successful.fetch_add(1, Ordering::Relaxed);
                    counter!("queue_success_total").increment(1);
                    return ExecOutcome::Empty;
                }
                CallResult::Transient(reason) => {
                    attempt += 1;
                    if attempt > self.cfg.retry_max_attempts {
                        return ExecOutcome::Exhausted {
                            reason,
                            attempts_used: attempts_already + attempt,
                        };
                    }
                    self.stats.retried.fetch_add(1, Ordering::Relaxed);
                    counter!("queue_retries_total").increment(1);
                    let delay = backoff_delay(
                        self.cfg.backoff_base_ms,
                        self.cfg.backoff_cap_ms,
                        attempt - 1,
                    );
                    tracing::debug!(
                        url = %req.url,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        reason = %reason,
                        "transient failure, backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
                CallResult::Fatal(e) => return ExecOutcome::Fatal(e),
            }
        }
    }

    async fn call_once(&self, req: &FetchRequest) -> CallResult {
        self.reservoir.acquire().await;

        // Single in-flight call: the gate is held across the fetch.
        let mut gate = self.gate.lock().await;
        if let Some(started) = gate.last_call_started {
            let spacing = Duration::from_millis(self.cfg.min_spacing_ms);
            let since = started.elapsed();
            if since < spacing {
                tokio::time::sleep(spacing - since).await;
            }
        }
        gate.last_call_started = Some(Instant::now());

        let result = self.transport.fetch(req).await;
        drop(gate);

        match result {
            Ok(resp) if resp.status == 429 => {
                self.reservoir.release_on_failure();
                CallResult::Transient("http 429".to_string())
            }
            Ok(resp) if (500..600).contains(&resp.status) => {
                self.reservoir.release_on_failure();
                CallResult::Transient(format!("http {}", resp.status))
            }
            Ok(resp) if !(200..300).contains(&resp.status) => {
                tracing::warn!(url = %req.url, status = resp.status, "non-retryable status, treating as no data");
                CallResult::Empty
            }
            Ok(resp) => {
                if resp.body.trim().is_empty() {
                    CallResult::Empty
                } else {
                    CallResult::Body(resp.body)
                }
            }
            Err(e) if e.is_transient() => {
                self.reservoir.release_on_failure();
                CallResult::Transient(e.to_string())
            }
            Err(e) => CallResult::Fatal(anyhow!(e)),
        }
    }
}

fn backoff_delay(base_ms: u64, cap_ms: u64, attempt: u32) -> Duration {
    let exp = base_ms.saturating_mul(1u64 << attempt.min(16));
    Duration::from_millis(exp.min(cap_ms))
}

fn now_unix() -> u64 {
    chrono::Utc::now().timestamp().max(0) as u64
}
