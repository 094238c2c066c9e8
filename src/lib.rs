//! Ferry is a single-endpoint HTTP forwarding proxy.
//!
//! A caller sends any request to the ingress path with a `url` query
//! parameter naming an absolute target URL. Ferry replays the method,
//! headers and body against that target through a bounded, pooled
//! outbound client and streams the target's status, headers and body back
//! unchanged, tagged with a `Proxied-By` marker. Failures are answered
//! with a small JSON error document.
//!
//! # Architecture
//!
//! - [`cli`] -- Command-line argument parsing with clap derive macros.
//! - [`cmd`] -- Subcommand dispatch and execution (run, init, validate, health).
//! - [`config`] -- Static configuration loading and validation via the
//!   [`ConfigSource`](config::ConfigSource) trait.
//! - [`error`] -- Process-level error types using `thiserror`.
//! - [`health`] -- `GET /health` endpoint handler returning runtime diagnostics.
//! - [`logging`] -- Structured tracing setup with JSON and pretty-print output.
//! - [`pool`] -- The process-wide outbound client with total and per-route
//!   connection caps.
//! - [`proxy`] -- Request translation, header policy, upstream execution,
//!   response relay and the error document.
//! - [`server`] -- Axum router, shared application state and graceful
//!   shutdown.
//!
//! # Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `yaml` | YAML config file support _(enabled by default)_ |
//! | `json` | JSON config file support |
//! | `toml` | TOML config file support |
//! | `sentry-integration` | Sentry error tracking |
//! | `file-backends` | All file format backends |
//! | `full` | All features |

// Binary crate — public functions are internal, not consumed by external users.
#![allow(clippy::missing_errors_doc)]

pub mod cli;
pub mod cmd;
pub mod config;
pub mod error;
pub mod health;
pub mod logging;
pub mod pool;
pub mod proxy;
pub mod server;

#[cfg(feature = "sentry-integration")]
pub mod sentry_integration;
