// src/api.rs
//! Thin HTTP surface over the pipeline: trigger a run, inspect queue stats,
//! drain the deferred backlog. Delivery formatting is someone else's job;
//! this only hands out the assembled briefing as JSON.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;

use crate::briefing::Briefing;
use crate::pipeline::BriefingPipeline;
use crate::queue::{DrainReport, QueueStatsSnapshot};

#[derive(Clone)]
pub struct AppState {
    pipeline: Arc<BriefingPipeline>,
}

pub fn create_router(pipeline: Arc<BriefingPipeline>) -> Router {
    let state = AppState { pipeline };

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/briefing", post(run_briefing))
        .route("/queue/stats", get(queue_stats))
        .route("/queue/drain", post(queue_drain))
        .route("/queue/reset-stats", post(queue_reset_stats))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

async fn run_briefing(
    State(state): State<AppState>,
    Query(q): Query<HashMap<String, String>>,
) -> Json<Briefing> {
    let subject = q.get("subject").map(|s| s.as_str());
    let briefing = state.pipeline.run(subject).await;
    Json(briefing)
}

async fn queue_stats(State(state): State<AppState>) -> Json<QueueStatsSnapshot> {
    Json(state.pipeline.queue().stats())
}

async fn queue_drain(State(state): State<AppState>) -> Json<DrainReport> {
    Json(state.pipeline.queue().drain_deferred().await)
}

async fn queue_reset_stats(State(state): State<AppState>) -> &'static str {
    state.pipeline.queue().reset_stats();
    "reset"
}
