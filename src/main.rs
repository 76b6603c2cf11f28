//! Gameday Briefing Service: binary entrypoint.
//! Boots the Axum HTTP server around the aggregation pipeline.

use std::sync::Arc;

use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use gameday_briefing::config::BriefingConfig;
use gameday_briefing::metrics::Metrics;
use gameday_briefing::pipeline::BriefingPipeline;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("gameday_briefing=info,warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = BriefingConfig::load_default().expect("Failed to load briefing config");

    // Fail fast at startup on a missing credential for an enabled enhancer;
    // the pipeline itself assumes valid configuration per call.
    if cfg.enhancer.enabled {
        cfg.enhancer
            .resolve_api_key()
            .expect("Enhancer enabled but credential missing");
    }

    let metrics = Metrics::init(cfg.queue.reservoir_capacity);
    let pipeline = Arc::new(BriefingPipeline::from_config(cfg));

    let router = gameday_briefing::api::create_router(pipeline).merge(metrics.router());
    Ok(router.into())
}
