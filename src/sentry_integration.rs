//! Optional Sentry error tracking.
//!
//! Upstream failures are logged at `error` level by the proxy handler, and
//! the `sentry-tracing` layer installed in [`logging`](crate::logging)
//! turns those events into Sentry issues. Hold the returned guard for the
//! life of the process so buffered events are flushed on exit.

pub fn init(dsn: &str, environment: Option<&str>) -> sentry::ClientInitGuard {
    let parsed_dsn = match dsn.parse() {
        Ok(d) => Some(d),
        Err(e) => {
            tracing::warn!(error = %e, "invalid Sentry DSN, error tracking disabled");
            None
        }
    };

    let guard = sentry::init(sentry::ClientOptions {
        dsn: parsed_dsn,
        environment: environment.map(|e| e.to_string().into()),
        release: sentry::release_name!(),
        attach_stacktrace: true,
        ..Default::default()
    });

    sentry::configure_scope(|scope| {
        scope.set_tag("commit", env!("FERRY_GIT_SHORT"));
    });

    guard
}
