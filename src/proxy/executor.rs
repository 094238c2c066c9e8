//! Outbound execution and response relay.
//!
//! [`execute`] takes a pool permit for the target route, sends the request
//! through the shared client, and waits for the response head. Connecting
//! is bounded by the connector's own timeout. While the caller's body is
//! still streaming up, each stretch without upload progress is bounded by
//! the socket timeout; once the body has been handed over in full, the
//! target gets one more socket timeout to produce its head.
//!
//! [`relay`] turns the upstream response into the caller's response: status
//! and headers verbatim, plus the `Proxied-By` marker, with the body
//! streamed as it arrives.

use std::future::Future;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, HeaderValue};
use axum::response::Response;

use super::body::{Direction, IdleTimeout, RelayBody, UploadProgress};
use super::error::UpstreamError;
use super::headers::PROXIED_BY;
use super::translate::OutboundRequest;
use crate::pool::UpstreamPool;

pub async fn execute(
    pool: &UpstreamPool,
    outbound: OutboundRequest,
) -> Result<hyper::Response<RelayBody>, UpstreamError> {
    let permit = pool.acquire(&outbound.route).await?;
    let config = pool.config();
    let socket_timeout = config.socket_timeout();

    if let Some(charset) = outbound.charset.as_deref() {
        tracing::debug!(charset = %charset, "forwarding caller-declared charset");
    }

    let (request, progress) = outbound.into_request(socket_timeout);
    let sent = pool.client().request(request);
    let response = await_head(sent, progress, config.response_timeout(), socket_timeout)
        .await?
        .map_err(UpstreamError::Client)?;

    Ok(response.map(|body| {
        IdleTimeout::new(body, socket_timeout, Direction::Response).holding(permit)
    }))
}

/// Race the response head against upload progress. The first window also
/// covers connecting, so it is `connect + socket`; later ones are `socket`.
async fn await_head<F: Future>(
    response: F,
    mut progress: UploadProgress,
    first_window: Duration,
    socket_timeout: Duration,
) -> Result<F::Output, UpstreamError> {
    tokio::pin!(response);
    let mut window = first_window;

    loop {
        tokio::select! {
            result = &mut response => return Ok(result),
            changed = tokio::time::timeout(window, progress.changed()) => match changed {
                Ok(Ok(())) => window = socket_timeout,
                Ok(Err(_)) => break,
                Err(_) => {
                    return Err(UpstreamError::BodyStalled {
                        direction: Direction::Request,
                        after: window,
                    })
                }
            },
        }
    }

    tracing::trace!("request body sent, waiting for response head");
    tokio::time::timeout(socket_timeout, response)
        .await
        .map_err(|_| UpstreamError::ResponseTimeout(socket_timeout))
}

pub fn relay(upstream: hyper::Response<RelayBody>, proxied_by: &HeaderValue) -> Response {
    let (parts, body) = upstream.into_parts();

    if let Some(encoding) = parts.headers.get(header::CONTENT_ENCODING) {
        tracing::debug!(content_encoding = ?encoding, "relaying encoded body untouched");
    }

    let mut response = Response::new(Body::new(body));
    *response.status_mut() = parts.status;
    *response.headers_mut() = parts.headers;
    response
        .headers_mut()
        .insert(PROXIED_BY.clone(), proxied_by.clone());
    response
}
