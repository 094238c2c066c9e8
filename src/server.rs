//! Axum server setup, shared application state, and graceful shutdown.
//!
//! Contains [`AppState`] (the `Arc`-shared state holding the upstream
//! pool, proxy settings, config metadata, stats, and uptime),
//! [`build_router`] for mounting the ingress and health endpoints, and
//! [`shutdown_signal`] for SIGTERM / Ctrl+C handling.

use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::time::Instant;

use axum::http::HeaderValue;
use axum::routing::{any, get};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::config::model::{Config, ProxySettings};
use crate::config::validation::validate;
use crate::config::ConfigVersion;
use crate::error::FerryError;
use crate::health::health_handler;
use crate::pool::UpstreamPool;
use crate::proxy;

#[derive(Debug)]
pub struct Stats {
    pub forwarded: AtomicU64,
    pub rejected: AtomicU64,
    pub failed: AtomicU64,
}

impl Default for Stats {
    fn default() -> Self {
        Self::new()
    }
}

impl Stats {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            forwarded: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        }
    }
}

pub struct AppState {
    pub pool: UpstreamPool,
    pub proxy: ProxySettings,
    pub proxied_by: HeaderValue,
    pub config_source: String,
    pub config_version: ConfigVersion,
    pub start_time: Instant,
    pub stats: Stats,
}

impl AppState {
    /// Validate `config` and build the process-wide pool from it.
    pub fn new(
        config: Config,
        source_name: impl Into<String>,
        version: ConfigVersion,
    ) -> Result<Self, FerryError> {
        if let Err(errors) = validate(&config) {
            return Err(FerryError::ConfigValidation { errors });
        }

        // validate() has already rejected values that are not legal header values
        let proxied_by = HeaderValue::from_str(&config.proxy.proxied_by)
            .unwrap_or_else(|_| HeaderValue::from_static("ferry"));

        Ok(Self {
            pool: UpstreamPool::new(&config.pool),
            proxy: config.proxy,
            proxied_by,
            config_source: source_name.into(),
            config_version: version,
            start_time: Instant::now(),
            stats: Stats::new(),
        })
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let ingress = state.proxy.path.clone();
    Router::new()
        .route("/health", get(health_handler))
        .route(&ingress, any(proxy::proxy_handler))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received Ctrl+C"),
        () = terminate => tracing::info!("received SIGTERM"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::model::PoolConfig;

    #[test]
    fn state_rejects_invalid_config() {
        let config = Config {
            pool: PoolConfig {
                max_total: 0,
                ..PoolConfig::default()
            },
            ..Config::default()
        };
        let result = AppState::new(config, "test", ConfigVersion::Defaults);
        assert!(matches!(result, Err(FerryError::ConfigValidation { .. })));
    }

    #[test]
    fn state_carries_marker_value() {
        let mut config = Config::default();
        config.proxy.proxied_by = "edge-7".into();
        let state = AppState::new(config, "test", ConfigVersion::Defaults).unwrap();
        assert_eq!(state.proxied_by, "edge-7");
        assert_eq!(state.pool.in_flight(), 0);
    }
}
