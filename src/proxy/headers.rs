//! Outbound header construction.
//!
//! [`build_forwarded_headers`] copies the caller's headers onto the
//! outbound request with one value per name (repeated values joined with
//! `,`), drops `Content-Length` so the transport recomputes it from the
//! streamed body, optionally rewrites `Host` to the target, and stamps
//! `X-Forwarded-For` with the caller's address.

use axum::http::header::{self, GetAll};
use axum::http::{HeaderMap, HeaderName, HeaderValue};

use crate::config::model::{ForwardedFor, ProxySettings};

/// Marker header added to every relayed response.
pub const PROXIED_BY: HeaderName = HeaderName::from_static("proxied-by");

pub const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");

pub fn build_forwarded_headers(
    original: &HeaderMap,
    client_ip: &str,
    target_url: &url::Url,
    settings: &ProxySettings,
) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(original.keys_len() + 1);

    for name in original.keys() {
        if name == header::CONTENT_LENGTH {
            continue;
        }
        match join_values(original.get_all(name)) {
            Some(value) => {
                headers.insert(name.clone(), value);
            }
            None => {
                tracing::warn!(header = %name, "joined header value is invalid, skipping");
            }
        }
    }

    if settings.rewrite_host {
        if let Some(host) = target_url.host_str() {
            let host_value = target_url
                .port()
                .map_or_else(|| host.to_string(), |port| format!("{host}:{port}"));
            if let Ok(val) = HeaderValue::from_str(&host_value) {
                headers.insert(header::HOST, val);
            }
        }
    }

    let xff = match settings.forwarded_for {
        ForwardedFor::Overwrite => client_ip.to_string(),
        ForwardedFor::Append => headers
            .get(&X_FORWARDED_FOR)
            .and_then(|v| v.to_str().ok())
            .filter(|existing| !existing.trim().is_empty())
            .map_or_else(
                || client_ip.to_string(),
                |existing| format!("{existing}, {client_ip}"),
            ),
    };
    if let Ok(val) = HeaderValue::from_str(&xff) {
        headers.insert(X_FORWARDED_FOR.clone(), val);
    }

    headers
}

fn join_values(values: GetAll<'_, HeaderValue>) -> Option<HeaderValue> {
    let mut joined = Vec::new();
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            joined.push(b',');
        }
        joined.extend_from_slice(value.as_bytes());
    }
    HeaderValue::from_bytes(&joined).ok()
}

/// `charset` parameter of a `Content-Type` header, if declared.
#[must_use]
pub fn declared_charset(headers: &HeaderMap) -> Option<String> {
    let content_type = headers.get(header::CONTENT_TYPE)?.to_str().ok()?;
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches('"').to_string())
            .filter(|v| !v.is_empty())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target() -> url::Url {
        url::Url::parse("http://backend:9090/path").unwrap()
    }

    #[test]
    fn drops_content_length() {
        let mut original = HeaderMap::new();
        original.insert("content-length", "999".parse().unwrap());
        original.insert("content-type", "text/plain".parse().unwrap());

        let result =
            build_forwarded_headers(&original, "10.0.0.1", &target(), &ProxySettings::default());

        assert!(result.get("content-length").is_none());
        assert_eq!(result.get("content-type").unwrap(), "text/plain");
    }

    #[test]
    fn joins_repeated_values_with_comma() {
        let mut original = HeaderMap::new();
        original.append("accept", "text/html".parse().unwrap());
        original.append("accept", "application/json".parse().unwrap());

        let result =
            build_forwarded_headers(&original, "10.0.0.1", &target(), &ProxySettings::default());

        let values: Vec<_> = result.get_all("accept").iter().collect();
        assert_eq!(values, vec!["text/html,application/json"]);
    }

    #[test]
    fn overwrites_x_forwarded_for_by_default() {
        let mut original = HeaderMap::new();
        original.insert("x-forwarded-for", "1.2.3.4".parse().unwrap());

        let result =
            build_forwarded_headers(&original, "10.0.0.1", &target(), &ProxySettings::default());

        assert_eq!(result.get("x-forwarded-for").unwrap(), "10.0.0.1");
    }

    #[test]
    fn appends_x_forwarded_for_when_configured() {
        let mut original = HeaderMap::new();
        original.insert("x-forwarded-for", "1.2.3.4".parse().unwrap());
        let settings = ProxySettings {
            forwarded_for: ForwardedFor::Append,
            ..ProxySettings::default()
        };

        let result = build_forwarded_headers(&original, "10.0.0.1", &target(), &settings);

        assert_eq!(result.get("x-forwarded-for").unwrap(), "1.2.3.4, 10.0.0.1");
    }

    #[test]
    fn append_mode_without_chain_sets_client_ip() {
        let settings = ProxySettings {
            forwarded_for: ForwardedFor::Append,
            ..ProxySettings::default()
        };

        let result = build_forwarded_headers(&HeaderMap::new(), "10.0.0.1", &target(), &settings);

        assert_eq!(result.get("x-forwarded-for").unwrap(), "10.0.0.1");
    }

    #[test]
    fn rewrites_host() {
        let mut original = HeaderMap::new();
        original.insert("host", "proxy.local:3000".parse().unwrap());

        let result =
            build_forwarded_headers(&original, "10.0.0.1", &target(), &ProxySettings::default());

        assert_eq!(result.get("host").unwrap(), "backend:9090");
    }

    #[test]
    fn keeps_caller_host_when_rewrite_disabled() {
        let mut original = HeaderMap::new();
        original.insert("host", "proxy.local:3000".parse().unwrap());
        let settings = ProxySettings {
            rewrite_host: false,
            ..ProxySettings::default()
        };

        let result = build_forwarded_headers(&original, "10.0.0.1", &target(), &settings);

        assert_eq!(result.get("host").unwrap(), "proxy.local:3000");
    }

    #[test]
    fn reads_declared_charset() {
        let mut headers = HeaderMap::new();
        assert_eq!(declared_charset(&headers), None);

        headers.insert(
            "content-type",
            "text/plain; Charset=\"ISO-8859-1\"".parse().unwrap(),
        );
        assert_eq!(declared_charset(&headers).as_deref(), Some("ISO-8859-1"));

        headers.insert("content-type", "application/json".parse().unwrap());
        assert_eq!(declared_charset(&headers), None);
    }
}
