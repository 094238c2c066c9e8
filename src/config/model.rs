//! Serde data structures for the Ferry configuration file.
//!
//! Contains [`Config`] (the root), [`ProxySettings`] for the ingress
//! endpoint and header policy, and [`PoolConfig`] for the outbound
//! connection pool bounds. Every field has a default so an empty file (or
//! no file at all) yields a working proxy. All types use
//! `deny_unknown_fields` for strict parsing.

use std::time::Duration;

use serde::{Deserialize, Serialize};

fn default_path() -> String {
    "/proxy".to_string()
}

fn default_proxied_by() -> String {
    "ferry".to_string()
}

const fn default_true() -> bool {
    true
}

const fn default_max_total() -> usize {
    1000
}

const fn default_max_per_host() -> usize {
    100
}

const fn default_validate_after_inactivity_ms() -> u64 {
    10_000
}

const fn default_acquire_timeout_ms() -> u64 {
    5_000
}

const fn default_connect_timeout_ms() -> u64 {
    10_000
}

const fn default_socket_timeout_ms() -> u64 {
    10_000
}

fn is_true(v: &bool) -> bool {
    *v
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default, skip_serializing_if = "ProxySettings::is_default")]
    pub proxy: ProxySettings,

    #[serde(default, skip_serializing_if = "PoolConfig::is_default")]
    pub pool: PoolConfig,
}

/// How `X-Forwarded-For` is produced on the outbound request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ForwardedFor {
    /// Replace any inbound value with the caller's address.
    #[default]
    Overwrite,
    /// Append the caller's address to the inbound chain.
    Append,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ProxySettings {
    /// Ingress path the forwarding endpoint is mounted on.
    #[serde(default = "default_path")]
    pub path: String,

    /// Value of the `Proxied-By` marker header added to relayed responses.
    #[serde(default = "default_proxied_by")]
    pub proxied_by: String,

    #[serde(default)]
    pub forwarded_for: ForwardedFor,

    /// Rewrite `Host` to the target authority instead of forwarding the
    /// caller's `Host` (which names this proxy).
    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub rewrite_host: bool,
}

impl Default for ProxySettings {
    fn default() -> Self {
        Self {
            path: default_path(),
            proxied_by: default_proxied_by(),
            forwarded_for: ForwardedFor::default(),
            rewrite_host: default_true(),
        }
    }
}

impl ProxySettings {
    fn is_default(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PoolConfig {
    #[serde(default = "default_max_total")]
    pub max_total: usize,

    #[serde(default = "default_max_per_host")]
    pub max_per_host: usize,

    #[serde(default = "default_validate_after_inactivity_ms")]
    pub validate_after_inactivity_ms: u64,

    #[serde(default = "default_acquire_timeout_ms")]
    pub acquire_timeout_ms: u64,

    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    #[serde(default = "default_socket_timeout_ms")]
    pub socket_timeout_ms: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_total: default_max_total(),
            max_per_host: default_max_per_host(),
            validate_after_inactivity_ms: default_validate_after_inactivity_ms(),
            acquire_timeout_ms: default_acquire_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            socket_timeout_ms: default_socket_timeout_ms(),
        }
    }
}

impl PoolConfig {
    fn is_default(&self) -> bool {
        *self == Self::default()
    }

    #[must_use]
    pub const fn validate_after_inactivity(&self) -> Duration {
        Duration::from_millis(self.validate_after_inactivity_ms)
    }

    #[must_use]
    pub const fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }

    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    #[must_use]
    pub const fn socket_timeout(&self) -> Duration {
        Duration::from_millis(self.socket_timeout_ms)
    }

    /// First window while waiting for response headers: dialing plus one
    /// socket-timeout window for the upload to start or the target to answer.
    #[must_use]
    pub const fn response_timeout(&self) -> Duration {
        Duration::from_millis(
            self.connect_timeout_ms
                .saturating_add(self.socket_timeout_ms),
        )
    }
}
