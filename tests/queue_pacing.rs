// tests/queue_pacing.rs
// Pacing and reservoir behavior of the shared request queue, exercised
// against a stub transport so no network is involved.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use gameday_briefing::config::QueueConfig;
use gameday_briefing::queue::{
    FetchRequest, RequestQueue, Transport, TransportError, TransportResponse,
};

struct InstantOk;

#[async_trait]
impl Transport for InstantOk {
    async fn fetch(&self, _req: &FetchRequest) -> Result<TransportResponse, TransportError> {
        Ok(TransportResponse {
            status: 200,
            body: "ok".to_string(),
        })
    }
}

fn cfg_unlimited_with_spacing(ms: u64) -> QueueConfig {
    QueueConfig {
        unlimited: true,
        min_spacing_ms: ms,
        retry_max_attempts: 0,
        ..QueueConfig::default()
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn three_concurrent_submissions_respect_min_spacing() {
    let queue = Arc::new(RequestQueue::with_transport(
        cfg_unlimited_with_spacing(400),
        Arc::new(InstantOk),
    ));

    let t0 = Instant::now();
    let mut handles = Vec::new();
    for i in 0..3 {
        let q = queue.clone();
        handles.push(tokio::spawn(async move {
            q.submit(FetchRequest::new(format!("https://x.test/{i}"), "stub"))
                .await
        }));
    }
    for h in handles {
        h.await.unwrap().unwrap();
    }

    // Single in-flight slot + 400ms spacing: the third call cannot start
    // before 800ms have elapsed.
    assert!(
        t0.elapsed() >= Duration::from_millis(800),
        "elapsed only {:?}",
        t0.elapsed()
    );

    let stats = queue.stats();
    assert_eq!(stats.total_requests, 3);
    assert_eq!(stats.successful, 3);
    assert_eq!(stats.failed, 0);
}

#[tokio::test]
async fn exhausted_reservoir_suspends_the_next_submit() {
    let cfg = QueueConfig {
        unlimited: false,
        reservoir_capacity: 2,
        refill_interval_secs: 300,
        min_spacing_ms: 0,
        retry_max_attempts: 0,
        ..QueueConfig::default()
    };
    let queue = Arc::new(RequestQueue::with_transport(cfg, Arc::new(InstantOk)));

    for i in 0..2 {
        queue
            .submit(FetchRequest::new(format!("https://x.test/{i}"), "stub"))
            .await
            .unwrap();
    }
    assert_eq!(queue.reservoir_available(), 0);

    let pending = queue.submit(FetchRequest::new("https://x.test/blocked", "stub"));
    tokio::pin!(pending);
    tokio::select! {
        _ = &mut pending => panic!("submit proceeded past an empty reservoir"),
        _ = tokio::time::sleep(Duration::from_millis(100)) => {}
    }
}

#[tokio::test]
async fn empty_body_is_a_neutral_result_not_an_error() {
    struct EmptyBody;
    #[async_trait]
    impl Transport for EmptyBody {
        async fn fetch(&self, _req: &FetchRequest) -> Result<TransportResponse, TransportError> {
            Ok(TransportResponse {
                status: 200,
                body: "   ".to_string(),
            })
        }
    }

    let queue = RequestQueue::with_transport(cfg_unlimited_with_spacing(0), Arc::new(EmptyBody));
    let out = queue
        .submit(FetchRequest::new("https://x.test/empty", "stub"))
        .await
        .unwrap();
    assert!(out.is_none());
    assert_eq!(queue.stats().successful, 1);
}

#[tokio::test]
async fn client_error_status_yields_no_data() {
    struct NotFound;
    #[async_trait]
    impl Transport for NotFound {
        async fn fetch(&self, _req: &FetchRequest) -> Result<TransportResponse, TransportError> {
            Ok(TransportResponse {
                status: 404,
                body: "gone".to_string(),
            })
        }
    }

    let queue = RequestQueue::with_transport(cfg_unlimited_with_spacing(0), Arc::new(NotFound));
    let out = queue
        .submit(FetchRequest::new("https://x.test/missing", "stub"))
        .await
        .unwrap();
    assert!(out.is_none());
}
