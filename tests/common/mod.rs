//! Shared helpers: a loopback target server and a proxy instance.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::response::IntoResponse;
use axum::routing::{any, get};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use ferry::config::model::{Config, PoolConfig};
use ferry::config::ConfigVersion;
use ferry::server::{self, AppState};

/// What the target saw, as returned by `/echo`.
#[derive(Debug, Serialize, Deserialize)]
pub struct Echo {
    pub method: String,
    pub uri: String,
    pub headers: BTreeMap<String, Vec<String>>,
    pub body: String,
}

impl Echo {
    pub fn header(&self, name: &str) -> Option<&[String]> {
        self.headers.get(name).map(Vec::as_slice)
    }
}

async fn echo(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Json<Echo> {
    let mut seen: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, value) in &headers {
        seen.entry(name.as_str().to_string())
            .or_default()
            .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
    }
    Json(Echo {
        method: method.to_string(),
        uri: uri.to_string(),
        headers: seen,
        body: String::from_utf8_lossy(&body).into_owned(),
    })
}

async fn slow(uri: Uri) -> &'static str {
    let ms = url::form_urlencoded::parse(uri.query().unwrap_or("").as_bytes())
        .find(|(key, _)| key == "ms")
        .and_then(|(_, v)| v.parse().ok())
        .unwrap_or(1_000);
    tokio::time::sleep(Duration::from_millis(ms)).await;
    "done"
}

/// Start a target server on an ephemeral loopback port.
pub async fn start_target() -> SocketAddr {
    let router = Router::new()
        .route("/hello", get(|| async { ([("x-test", "abc")], "hello") }))
        .route(
            "/missing",
            get(|| async { (StatusCode::NOT_FOUND, "not here") }),
        )
        .route(
            "/redirect",
            get(|| async { (StatusCode::FOUND, [(header::LOCATION, "/hello")]) }),
        )
        .route(
            "/cookies",
            get(|| async {
                let mut headers = HeaderMap::new();
                headers.append(header::SET_COOKIE, "a=1".parse().unwrap());
                headers.append(header::SET_COOKIE, "b=2".parse().unwrap());
                (headers, "cookies").into_response()
            }),
        )
        .route("/big", get(|| async { vec![b'x'; 1 << 20] }))
        .route("/slow", get(slow))
        .route("/echo", any(echo));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

/// How a [`start_partial_target`] connection ends once its chunks are sent.
#[derive(Debug, Clone, Copy)]
pub enum Ending {
    /// Keep the socket open without sending anything else.
    Hold,
    /// Close the socket.
    Close,
}

/// Bytes a [`start_partial_target`] response promises in `Content-Length`.
pub const PROMISED_LEN: usize = 1_000;

/// Start a raw target that answers every request with a 200 head promising
/// [`PROMISED_LEN`] bytes, then sends `chunks` five-byte `hello` chunks
/// `interval` apart and ends as `ending` says, short of the promise.
pub async fn start_partial_target(
    chunks: usize,
    interval: Duration,
    ending: Ending,
) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else {
                return;
            };
            tokio::spawn(async move {
                if read_until(&mut stream, b"\r\n\r\n").await.is_none() {
                    return;
                }
                let head =
                    format!("HTTP/1.1 200 OK\r\ncontent-length: {PROMISED_LEN}\r\n\r\n");
                if stream.write_all(head.as_bytes()).await.is_err() {
                    return;
                }
                for _ in 0..chunks {
                    if stream.write_all(b"hello").await.is_err() {
                        return;
                    }
                    tokio::time::sleep(interval).await;
                }
                if let Ending::Hold = ending {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                }
            });
        }
    });
    addr
}

/// Read from `stream` until `needle` shows up. Returns everything read, or
/// `None` if the peer went away first.
pub async fn read_until(stream: &mut TcpStream, needle: &[u8]) -> Option<Vec<u8>> {
    let mut seen = Vec::new();
    let mut buf = [0u8; 4096];
    while !seen.windows(needle.len()).any(|w| w == needle) {
        match stream.read(&mut buf).await {
            Ok(0) | Err(_) => return None,
            Ok(n) => seen.extend_from_slice(&buf[..n]),
        }
    }
    Some(seen)
}

/// Read until the peer closes or resets, keeping whatever arrived.
pub async fn read_to_close(stream: &mut TcpStream) -> String {
    let mut seen = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        match stream.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => seen.extend_from_slice(&buf[..n]),
        }
    }
    String::from_utf8_lossy(&seen).into_owned()
}

/// A loopback address nothing is listening on.
pub async fn refused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// Pool bounds small enough for failure tests to finish quickly.
pub fn test_config() -> Config {
    Config {
        pool: PoolConfig {
            max_total: 16,
            max_per_host: 4,
            acquire_timeout_ms: 200,
            connect_timeout_ms: 500,
            socket_timeout_ms: 500,
            ..PoolConfig::default()
        },
        ..Config::default()
    }
}

pub struct TestProxy {
    pub addr: SocketAddr,
    pub state: Arc<AppState>,
    shutdown: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestProxy {
    /// `http://<proxy>/proxy?url=<target>` with the target percent-encoded.
    pub fn url_for(&self, target: &str) -> String {
        format!("http://{}{}", self.addr, self.path_for(target))
    }

    /// `/proxy?url=<target>`, for callers writing requests by hand.
    pub fn path_for(&self, target: &str) -> String {
        let encoded: String = url::form_urlencoded::byte_serialize(target.as_bytes()).collect();
        format!("{}?url={encoded}", self.state.proxy.path)
    }

    /// Open a raw connection to the proxy and send `head` as is.
    pub async fn raw(&self, head: &str) -> TcpStream {
        let mut stream = TcpStream::connect(self.addr).await.unwrap();
        stream.write_all(head.as_bytes()).await.unwrap();
        stream
    }

    /// In-flight permits once the server has dropped finished bodies.
    pub async fn settled_in_flight(&self) -> usize {
        for _ in 0..150 {
            if self.state.pool.in_flight() == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        self.state.pool.in_flight()
    }

    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for TestProxy {
    fn drop(&mut self) {
        self.shutdown();
    }
}

pub async fn start_proxy(config: Config) -> TestProxy {
    let version = ConfigVersion::Hash("test-hash".into());
    let state = Arc::new(AppState::new(config, "test", version).unwrap());
    let router = server::build_router(Arc::clone(&state));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    tokio::spawn(async move {
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async {
            let _ = shutdown_rx.await;
        })
        .await
        .unwrap();
    });

    TestProxy {
        addr,
        state,
        shutdown: Some(shutdown_tx),
    }
}

/// Caller that never follows redirects, so 3xx answers are observable.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}
