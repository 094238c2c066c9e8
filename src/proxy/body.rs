//! Streaming body wrapper with an idle timeout.
//!
//! [`IdleTimeout`] forwards frames from an inner body untouched and fails
//! the stream when the inner body stays pending for longer than the socket
//! timeout. The clock is armed on the first `Pending` after a frame, so
//! neither a slow but steady transfer nor a consumer that pauses polling
//! (backpressure) is ever cut off.
//!
//! It wraps both directions of an exchange: the caller's body on its way
//! upstream ([`OutboundBody`]) and the target's body on its way back
//! ([`RelayBody`]). The upstream side reports progress through an
//! [`UploadProgress`] receiver so the executor can tell a live upload from
//! a stalled one. The relay side owns the [`ConnectionPermit`], which is
//! released the moment the body ends, fails, or is dropped because the
//! caller went away.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use hyper::body::{Body, Frame, Incoming, SizeHint};
use tokio::sync::watch;
use tokio::time::{Instant, Sleep};

use super::error::UpstreamError;
use crate::pool::ConnectionPermit;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Caller body streamed to the target.
pub type OutboundBody = IdleTimeout<axum::body::Body>;

/// Target body streamed back to the caller.
pub type RelayBody = IdleTimeout<Incoming>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Request,
    Response,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Request => "request",
            Self::Response => "response",
        })
    }
}

/// Frames handed to the transport so far. The channel closes once the body
/// has ended, failed, or been dropped by the transport.
pub type UploadProgress = watch::Receiver<u64>;

pub struct IdleTimeout<B> {
    inner: B,
    timeout: Duration,
    direction: Direction,
    deadline: Option<Pin<Box<Sleep>>>,
    armed: bool,
    permit: Option<ConnectionPermit>,
    progress: Option<watch::Sender<u64>>,
}

impl<B> IdleTimeout<B> {
    pub const fn new(inner: B, timeout: Duration, direction: Direction) -> Self {
        Self {
            inner,
            timeout,
            direction,
            deadline: None,
            armed: false,
            permit: None,
            progress: None,
        }
    }

    /// Keep `permit` alive until this body is finished or dropped.
    #[must_use]
    pub fn holding(mut self, permit: ConnectionPermit) -> Self {
        self.permit = Some(permit);
        self
    }

    /// Report every frame on the returned channel.
    pub fn track_progress(&mut self) -> UploadProgress {
        let (tx, rx) = watch::channel(0);
        self.progress = Some(tx);
        rx
    }

    fn finish(&mut self) {
        self.permit = None;
        self.progress = None;
    }

    /// Start the idle window unless one is already running.
    fn arm(&mut self) -> &mut Pin<Box<Sleep>> {
        let until = Instant::now() + self.timeout;
        let armed = std::mem::replace(&mut self.armed, true);
        let deadline = self
            .deadline
            .get_or_insert_with(|| Box::pin(tokio::time::sleep_until(until)));
        if !armed {
            deadline.as_mut().reset(until);
        }
        deadline
    }
}

impl<B> Body for IdleTimeout<B>
where
    B: Body + Unpin,
    B::Error: Into<BoxError>,
{
    type Data = B::Data;
    type Error = BoxError;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();

        match Pin::new(&mut this.inner).poll_frame(cx) {
            Poll::Ready(Some(Ok(frame))) => {
                this.armed = false;
                if let Some(progress) = &this.progress {
                    progress.send_modify(|frames| *frames += 1);
                }
                Poll::Ready(Some(Ok(frame)))
            }
            Poll::Ready(Some(Err(e))) => {
                let error = e.into();
                tracing::warn!(
                    direction = %this.direction,
                    error = %error,
                    "body stream failed mid-transfer"
                );
                this.finish();
                Poll::Ready(Some(Err(error)))
            }
            Poll::Ready(None) => {
                this.finish();
                Poll::Ready(None)
            }
            Poll::Pending => {
                let timeout = this.timeout;
                if this.arm().as_mut().poll(cx).is_pending() {
                    return Poll::Pending;
                }
                tracing::warn!(
                    direction = %this.direction,
                    idle_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                    "body stream stalled"
                );
                this.finish();
                Poll::Ready(Some(Err(Box::new(UpstreamError::BodyStalled {
                    direction: this.direction,
                    after: timeout,
                }))))
            }
        }
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}
