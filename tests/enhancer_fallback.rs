// tests/enhancer_fallback.rs
// Tier-2 semantic merging is best-effort: its output refines tier-1 when
// present and is ignored entirely when absent, late, or over budget.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use gameday_briefing::config::{FeedConfig, NewsConfig, QueueConfig};
use gameday_briefing::enhance::{BudgetedEnhancer, DisabledEnhancer, Enhancer};
use gameday_briefing::news::classify::Category;
use gameday_briefing::news::NewsAggregator;
use gameday_briefing::queue::{
    FetchRequest, RequestQueue, Transport, TransportError, TransportResponse,
};

struct FeedServer {
    bodies: HashMap<String, String>,
}

#[async_trait]
impl Transport for FeedServer {
    async fn fetch(&self, req: &FetchRequest) -> Result<TransportResponse, TransportError> {
        match self.bodies.get(&req.url) {
            Some(body) => Ok(TransportResponse {
                status: 200,
                body: body.clone(),
            }),
            None => Ok(TransportResponse {
                status: 404,
                body: String::new(),
            }),
        }
    }
}

/// Counts invocations; returns a fixed merged list.
struct Merging {
    calls: Arc<AtomicU32>,
    merged: Vec<String>,
}

#[async_trait]
impl Enhancer for Merging {
    async fn enhance(&self, _bullets: &[String]) -> Vec<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.merged.clone()
    }
    fn name(&self) -> &'static str {
        "merging-stub"
    }
}

fn rss(titles: &[&str]) -> String {
    let mut xml = String::from(r#"<?xml version="1.0"?><rss version="2.0"><channel>"#);
    for t in titles {
        xml.push_str("<item><title>");
        xml.push_str(t);
        xml.push_str("</title></item>");
    }
    xml.push_str("</channel></rss>");
    xml
}

fn build(
    titles: &[&str],
    enhancer: Arc<BudgetedEnhancer>,
    batch_cap: usize,
) -> NewsAggregator {
    let mut bodies = HashMap::new();
    bodies.insert("https://wire.test/rss".to_string(), rss(titles));
    let queue = Arc::new(RequestQueue::with_transport(
        QueueConfig {
            unlimited: true,
            min_spacing_ms: 0,
            ..QueueConfig::default()
        },
        Arc::new(FeedServer { bodies }),
    ));
    let cfg = NewsConfig {
        feeds: vec![FeedConfig {
            url: "https://wire.test/rss".to_string(),
            source: "AP".to_string(),
            subject: None,
        }],
        min_items: 1,
        inter_item_delay_ms: 1,
        ..NewsConfig::default()
    };
    NewsAggregator::new(queue, enhancer, batch_cap, cfg)
}

const INJURY_TITLES: [&str; 3] = [
    "Adams suffered a concussion in practice (AP)",
    "Baker left with a hamstring strain (AP)",
    "Carter is questionable for Sunday (AP)",
];

#[tokio::test]
async fn enhanced_output_replaces_batch_and_keeps_overflow() {
    let calls = Arc::new(AtomicU32::new(0));
    let enhancer = Arc::new(BudgetedEnhancer::new(
        Arc::new(Merging {
            calls: calls.clone(),
            merged: vec!["Adams and Baker both hurt in practice (AP)".to_string()],
        }),
        3,
        Duration::from_secs(1),
    ));
    // Batch cap of 2: the third bullet overflows and must survive unmodified.
    let agg = build(&INJURY_TITLES, enhancer, 2);

    let excerpts = agg.collect(None, 24).await;
    let buckets = agg.build_buckets(&excerpts).await;
    let injuries = buckets
        .iter()
        .find(|b| b.category == Category::Injuries)
        .unwrap();

    assert_eq!(injuries.bullets.len(), 2);
    assert_eq!(
        injuries.bullets[0],
        "Adams and Baker both hurt in practice (AP)"
    );
    assert_eq!(
        injuries.bullets[1],
        "Carter is questionable for Sunday (AP)"
    );
    // One category with bullets = one enhancer call.
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn empty_enhancer_output_falls_back_to_rule_based() {
    let calls = Arc::new(AtomicU32::new(0));
    let enhancer = Arc::new(BudgetedEnhancer::new(
        Arc::new(Merging {
            calls: calls.clone(),
            merged: Vec::new(),
        }),
        3,
        Duration::from_secs(1),
    ));
    let agg = build(&INJURY_TITLES, enhancer, 15);

    let excerpts = agg.collect(None, 24).await;
    let buckets = agg.build_buckets(&excerpts).await;
    let injuries = buckets
        .iter()
        .find(|b| b.category == Category::Injuries)
        .unwrap();

    // Tier-1 output, untouched.
    assert_eq!(injuries.bullets.len(), 3);
    assert_eq!(injuries.bullets[0], INJURY_TITLES[0]);
}

#[tokio::test]
async fn disabled_enhancer_still_yields_deduplicated_bullets() {
    let enhancer = Arc::new(BudgetedEnhancer::new(
        Arc::new(DisabledEnhancer),
        3,
        Duration::from_secs(1),
    ));
    let agg = build(
        &[
            "Adams suffered a concussion (AP)",
            "adams suffered a concussion! (ap)",
        ],
        enhancer,
        15,
    );

    let excerpts = agg.collect(None, 24).await;
    let buckets = agg.build_buckets(&excerpts).await;
    let injuries = buckets
        .iter()
        .find(|b| b.category == Category::Injuries)
        .unwrap();
    assert_eq!(injuries.bullets.len(), 1);
}

#[tokio::test]
async fn slow_enhancer_times_out_and_tier_one_wins() {
    struct Slow;
    #[async_trait]
    impl Enhancer for Slow {
        async fn enhance(&self, _b: &[String]) -> Vec<String> {
            tokio::time::sleep(Duration::from_secs(10)).await;
            vec!["too late (AP)".to_string()]
        }
        fn name(&self) -> &'static str {
            "slow"
        }
    }

    let enhancer = Arc::new(BudgetedEnhancer::new(
        Arc::new(Slow),
        3,
        Duration::from_millis(50),
    ));
    let agg = build(&INJURY_TITLES, enhancer, 15);

    let excerpts = agg.collect(None, 24).await;
    let buckets = agg.build_buckets(&excerpts).await;
    let injuries = buckets
        .iter()
        .find(|b| b.category == Category::Injuries)
        .unwrap();
    assert_eq!(injuries.bullets.len(), 3);
}
