//! Configuration validation with detailed error reporting.
//!
//! The [`validate`] function checks a parsed [`Config`] for values the
//! proxy cannot run with: a malformed ingress path, a marker header value
//! that is not a legal header, zero-sized or oversized pools, a per-host
//! cap above the total cap, and zero timeouts. Returns a list of [`ValidationError`]
//! values with per-field suggestions.

use axum::http::HeaderValue;
use tokio::sync::Semaphore;

use super::model::Config;
use crate::error::ValidationError;

/// Validate the ingress path. Returns `Ok(())` or a human-readable error.
pub fn validate_path(path: &str) -> Result<(), String> {
    if path.is_empty() {
        return Err("path cannot be empty".into());
    }
    if !path.starts_with('/') {
        return Err("path must start with '/'".into());
    }
    if path == "/" || path == "/health" {
        return Err(format!("path '{path}' is reserved"));
    }
    if path.contains(['*', '{', '}', '?', '#']) {
        return Err(format!("path '{path}' must be a literal path"));
    }
    Ok(())
}

fn error(section: &str, field: &str, message: impl Into<String>) -> ValidationError {
    ValidationError {
        section: section.into(),
        field: field.into(),
        message: message.into(),
        suggestion: None,
    }
}

pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let proxy = &config.proxy;
    let pool = &config.pool;

    if let Err(msg) = validate_path(&proxy.path) {
        errors.push(ValidationError {
            suggestion: if !proxy.path.is_empty() && !proxy.path.starts_with('/') {
                Some(format!("did you mean '/{}'?", proxy.path))
            } else {
                None
            },
            ..error("proxy", "path", msg)
        });
    }

    if proxy.proxied_by.is_empty() {
        errors.push(error("proxy", "proxied_by", "marker value cannot be empty"));
    } else if HeaderValue::from_str(&proxy.proxied_by).is_err() {
        errors.push(error(
            "proxy",
            "proxied_by",
            format!("'{}' is not a valid header value", proxy.proxied_by),
        ));
    }

    if pool.max_total == 0 {
        errors.push(error("pool", "max_total", "must be greater than 0"));
    }
    if pool.max_per_host == 0 {
        errors.push(error("pool", "max_per_host", "must be greater than 0"));
    }
    for (field, value) in [
        ("max_total", pool.max_total),
        ("max_per_host", pool.max_per_host),
    ] {
        if value > Semaphore::MAX_PERMITS {
            errors.push(ValidationError {
                suggestion: Some(format!("use at most {}", Semaphore::MAX_PERMITS)),
                ..error(
                    "pool",
                    field,
                    format!("{value} connections is more than a pool can track"),
                )
            });
        }
    }
    if pool.max_per_host > pool.max_total && pool.max_total > 0 {
        errors.push(ValidationError {
            suggestion: Some(format!("set max_per_host to at most {}", pool.max_total)),
            ..error(
                "pool",
                "max_per_host",
                format!(
                    "per-host cap {} exceeds the total cap {}",
                    pool.max_per_host, pool.max_total
                ),
            )
        });
    }

    for (field, value) in [
        ("acquire_timeout_ms", pool.acquire_timeout_ms),
        ("connect_timeout_ms", pool.connect_timeout_ms),
        ("socket_timeout_ms", pool.socket_timeout_ms),
    ] {
        if value == 0 {
            errors.push(ValidationError {
                suggestion: Some("timeouts must be bounded; use a positive value".into()),
                ..error("pool", field, "must be greater than 0")
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[must_use]
pub fn format_validation_report(path: &str, config: &Config) -> String {
    let proxy = &config.proxy;
    let pool = &config.pool;
    let lines = [
        format!("  ingress: {} (Proxied-By: {})", proxy.path, proxy.proxied_by),
        format!(
            "  x-forwarded-for: {:?}, rewrite host: {}",
            proxy.forwarded_for, proxy.rewrite_host
        ),
        format!(
            "  pool: {} total, {} per host",
            pool.max_total, pool.max_per_host
        ),
        format!(
            "  timeouts: acquire {}ms, connect {}ms, socket {}ms, revalidate after {}ms idle",
            pool.acquire_timeout_ms,
            pool.connect_timeout_ms,
            pool.socket_timeout_ms,
            pool.validate_after_inactivity_ms
        ),
    ];

    format!("{path} is valid\n{}", lines.join("\n"))
}
