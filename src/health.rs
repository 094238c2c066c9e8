//! `GET /health` endpoint handler.
//!
//! Returns a [`HealthResponse`] JSON payload containing the server
//! version, uptime, config source metadata, connection pool usage, and
//! cumulative request statistics.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::server::AppState;

#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub commit: String,
    pub uptime_seconds: u64,
    pub config: ConfigHealth,
    pub pool: PoolHealth,
    pub stats: StatsResponse,
}

#[derive(Serialize, Deserialize)]
pub struct ConfigHealth {
    pub source: String,
    pub version: String,
    pub path: String,
}

#[derive(Serialize, Deserialize)]
pub struct PoolHealth {
    pub in_flight: usize,
    pub max_total: usize,
    pub max_per_host: usize,
    pub routes: usize,
}

#[derive(Serialize, Deserialize)]
pub struct StatsResponse {
    pub requests_forwarded: u64,
    pub requests_rejected: u64,
    pub requests_failed: u64,
}

pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let pool = &state.pool;
    let status = if pool.is_closed() { "stopping" } else { "healthy" };

    Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        commit: env!("FERRY_GIT_SHORT").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        config: ConfigHealth {
            source: state.config_source.clone(),
            version: state.config_version.short().to_string(),
            path: state.proxy.path.clone(),
        },
        pool: PoolHealth {
            in_flight: pool.in_flight(),
            max_total: pool.config().max_total,
            max_per_host: pool.config().max_per_host,
            routes: pool.tracked_routes(),
        },
        stats: StatsResponse {
            requests_forwarded: state.stats.forwarded.load(Ordering::Relaxed),
            requests_rejected: state.stats.rejected.load(Ordering::Relaxed),
            requests_failed: state.stats.failed.load(Ordering::Relaxed),
        },
    })
}
