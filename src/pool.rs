//! Process-wide pooled outbound HTTP client.
//!
//! [`UpstreamPool`] wraps the hyper-util connection-pooled client with the
//! bounds the proxy enforces on top of it: a cap on concurrent outbound
//! connections overall and per target route, a bounded wait to obtain
//! one, and connect / idle timeouts on the connector. It is created once at
//! startup, shared through [`AppState`](crate::server::AppState), and closed
//! at shutdown.
//!
//! A route is `scheme://host:port`. Every in-flight exchange holds a
//! [`ConnectionPermit`] until its response body is finished or dropped;
//! with HTTP/1 each exchange occupies one connection, so the permits bound
//! the number of live upstream connections.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::{TokioExecutor, TokioTimer};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use url::Url;

use crate::config::model::PoolConfig;
use crate::proxy::body::OutboundBody;
use crate::proxy::error::UpstreamError;

pub type HttpsConnector = hyper_rustls::HttpsConnector<HttpConnector>;
pub type HttpClient = Client<HttpsConnector, OutboundBody>;

/// Idle per-host semaphores are pruned once the map grows past this size.
const ROUTE_PRUNE_THRESHOLD: usize = 1024;

/// Pool key for a target URL: `scheme://host:port`.
#[must_use]
pub fn route_key(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port_or_known_default() {
        Some(port) => format!("{}://{host}:{port}", url.scheme()),
        None => format!("{}://{host}", url.scheme()),
    }
}

/// Holds one slot of the total cap and one of the route's cap.
#[derive(Debug)]
pub struct ConnectionPermit {
    _route: OwnedSemaphorePermit,
    _total: OwnedSemaphorePermit,
}

pub struct UpstreamPool {
    client: HttpClient,
    config: PoolConfig,
    total: Arc<Semaphore>,
    routes: Mutex<HashMap<String, Arc<Semaphore>>>,
}

impl UpstreamPool {
    #[must_use]
    pub fn new(config: &PoolConfig) -> Self {
        Self {
            client: build_http_client(config),
            config: config.clone(),
            total: Arc::new(Semaphore::new(
                config.max_total.min(Semaphore::MAX_PERMITS),
            )),
            routes: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub const fn client(&self) -> &HttpClient {
        &self.client
    }

    #[must_use]
    pub const fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Wait for a free slot on `route`, giving up after the configured
    /// acquisition timeout.
    pub async fn acquire(&self, route: &str) -> Result<ConnectionPermit, UpstreamError> {
        let route_semaphore = self.route_semaphore(route);
        let total = Arc::clone(&self.total);

        // Route first so a saturated host never parks a global slot.
        let acquire = async move {
            let route = route_semaphore.acquire_owned().await?;
            let total = total.acquire_owned().await?;
            Ok::<_, tokio::sync::AcquireError>(ConnectionPermit {
                _route: route,
                _total: total,
            })
        };

        match tokio::time::timeout(self.config.acquire_timeout(), acquire).await {
            Ok(Ok(permit)) => Ok(permit),
            Ok(Err(_)) => Err(UpstreamError::PoolClosed),
            Err(_) => Err(UpstreamError::PoolTimeout {
                route: route.to_string(),
                waited: self.config.acquire_timeout(),
            }),
        }
    }

    /// Exchanges currently holding a permit.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.config
            .max_total
            .min(Semaphore::MAX_PERMITS)
            .saturating_sub(self.total.available_permits())
    }

    /// Routes with a live semaphore.
    #[must_use]
    pub fn tracked_routes(&self) -> usize {
        self.routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Refuse new acquisitions. Exchanges already holding a permit finish
    /// normally; idle connections go away with the client.
    pub fn close(&self) {
        self.total.close();
        let routes = self.routes.lock().unwrap_or_else(PoisonError::into_inner);
        for semaphore in routes.values() {
            semaphore.close();
        }
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.total.is_closed()
    }

    fn route_semaphore(&self, route: &str) -> Arc<Semaphore> {
        let mut routes = self.routes.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(existing) = routes.get(route) {
            return Arc::clone(existing);
        }

        let max = self.config.max_per_host.min(Semaphore::MAX_PERMITS);
        if routes.len() >= ROUTE_PRUNE_THRESHOLD {
            routes.retain(|_, s| Arc::strong_count(s) > 1 || s.available_permits() < max);
        }

        let semaphore = Arc::new(Semaphore::new(max));
        if self.total.is_closed() {
            semaphore.close();
        }
        routes.insert(route.to_string(), Arc::clone(&semaphore));
        semaphore
    }
}

fn build_http_client(config: &PoolConfig) -> HttpClient {
    // When multiple rustls crypto providers are compiled in (e.g. `--all-features`
    // enables both `ring` and `aws-lc-rs`), rustls cannot auto-detect which one
    // to use. Explicitly install `ring` as the default provider.
    let _ = rustls::crypto::ring::default_provider().install_default();

    let mut http = HttpConnector::new();
    http.enforce_http(false);
    http.set_nodelay(true);
    http.set_connect_timeout(Some(config.connect_timeout()));

    let https = hyper_rustls::HttpsConnectorBuilder::new()
        .with_webpki_roots()
        .https_or_http()
        .enable_http1()
        .wrap_connector(http);

    // Connections idle past the revalidation threshold are evicted instead
    // of reused; hyper also discards any pooled connection the peer closed.
    // Redirects are never followed: the legacy client has no such layer.
    Client::builder(TokioExecutor::new())
        .pool_idle_timeout(config.validate_after_inactivity())
        .pool_max_idle_per_host(config.max_per_host)
        .pool_timer(TokioTimer::new())
        .build(https)
}
