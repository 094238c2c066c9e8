//! Core HTTP forwarding handler.
//!
//! The [`proxy_handler`] function is mounted on the ingress path for every
//! method. Each request makes a single pass: translate (validate the `url`
//! parameter and build the outbound request), execute through the shared
//! pool, relay the response. Submodules hold each step: [`translate`] and
//! [`headers`] build the request, [`executor`] runs and relays it,
//! [`body`] streams both directions with an idle timeout, and [`error`]
//! maps failures to caller-facing payloads.
//!
//! A failure after the response head has been sent cannot be turned into
//! an error payload: the stream is aborted and the caller sees a truncated
//! body on a reset connection.

pub mod body;
pub mod error;
pub mod executor;
pub mod headers;
pub mod translate;

use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::{ConnectInfo, Request, State};
use axum::response::{IntoResponse, Response};

use crate::server::AppState;
use error::{error_chain, ProxyError};
use translate::InboundRequest;

pub async fn proxy_handler(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request,
) -> Response {
    let start = Instant::now();
    let correlation_id = request
        .headers()
        .get("x-correlation-id")
        .and_then(|v| v.to_str().ok())
        .map_or_else(|| uuid::Uuid::new_v4().to_string(), String::from);

    let inbound = InboundRequest::new(request, addr);
    let method = inbound.method.clone();

    let outbound = match translate::translate(inbound, &state.proxy) {
        Ok(outbound) => outbound,
        Err(e) => {
            state.stats.rejected.fetch_add(1, Ordering::Relaxed);
            let reason = match &e {
                ProxyError::InvalidUrl { reason, .. } => reason.as_str(),
                _ => "",
            };
            tracing::warn!(
                correlation_id = %correlation_id,
                method = %method,
                client = %addr,
                error = %e,
                reason = %reason,
                "rejected proxy request"
            );
            return e.to_payload().into_response();
        }
    };

    let target = outbound.target.clone();
    tracing::info!(
        correlation_id = %correlation_id,
        method = %method,
        target = %target,
        client = %addr,
        "forwarding request"
    );

    match executor::execute(&state.pool, outbound).await {
        Ok(upstream) => {
            state.stats.forwarded.fetch_add(1, Ordering::Relaxed);
            tracing::info!(
                correlation_id = %correlation_id,
                target = %target,
                status = upstream.status().as_u16(),
                latency_ms = elapsed_ms(start),
                "upstream responded"
            );
            executor::relay(upstream, &state.proxied_by)
        }
        Err(e) => {
            state.stats.failed.fetch_add(1, Ordering::Relaxed);
            tracing::error!(
                correlation_id = %correlation_id,
                target = %target,
                kind = e.kind(),
                error = %error_chain(&e),
                latency_ms = elapsed_ms(start),
                "upstream request failed"
            );
            ProxyError::from(e).to_payload().into_response()
        }
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}
