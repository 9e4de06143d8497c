use axum::{extract::State, Json};
use serde::Serialize;

use crate::admin::AdminState;
use crate::load_balancer::WorkerStatus;

#[derive(Debug, Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub workers: usize,
    pub eligible_workers: usize,
    pub failure_limit: u32,
    pub window_secs: f64,
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    let pool = state.handler.pool();
    let now = state.handler.clock().now();
    let eligible = pool.eligible_count(now);

    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: if eligible > 0 { "operational" } else { "exhausted" },
        workers: pool.workers().len(),
        eligible_workers: eligible,
        failure_limit: pool.settings().failure_limit(),
        window_secs: pool.settings().window().as_secs_f64(),
    })
}

pub async fn get_workers(State(state): State<AdminState>) -> Json<Vec<WorkerStatus>> {
    let now = state.handler.clock().now();
    Json(state.handler.pool().snapshot(now))
}
