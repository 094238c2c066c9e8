//! Inbound request to outbound request translation.
//!
//! [`translate`] is pure: it validates the `url` query parameter, builds the
//! outbound header map, and hands the caller's body over as a stream. It
//! never touches the connection pool, so a rejected request costs nothing
//! upstream.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use axum::body::Body;
use axum::extract::Request;
use axum::http::{HeaderMap, Method, Uri};
use url::Url;

use super::body::{Direction, IdleTimeout, OutboundBody, UploadProgress};
use super::error::ProxyError;
use super::headers::{build_forwarded_headers, declared_charset};
use crate::config::model::ProxySettings;
use crate::pool::route_key;

/// Query parameter naming the target.
pub const URL_PARAM: &str = "url";

/// The caller's request as received on the ingress endpoint.
pub struct InboundRequest {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub body: Body,
    pub remote_addr: IpAddr,
}

impl InboundRequest {
    #[must_use]
    pub fn new(request: Request, remote: SocketAddr) -> Self {
        let (parts, body) = request.into_parts();
        Self {
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
            body,
            remote_addr: remote.ip(),
        }
    }

    /// Percent-decoded value of the first `url` query parameter.
    #[must_use]
    pub fn target_param(&self) -> Option<String> {
        let query = self.uri.query()?;
        url::form_urlencoded::parse(query.as_bytes())
            .find(|(key, _)| key == URL_PARAM)
            .map(|(_, value)| value.into_owned())
    }
}

/// Everything needed to issue the request against the target.
pub struct OutboundRequest {
    pub method: Method,
    pub target: Url,
    pub uri: Uri,
    /// Pool key, see [`route_key`].
    pub route: String,
    pub headers: HeaderMap,
    /// Character encoding declared by the caller, kept on `Content-Type`.
    pub charset: Option<String>,
    pub body: Body,
}

impl OutboundRequest {
    /// Assemble the hyper request; the body stalls out after `idle`. The
    /// receiver tracks how far the upload has got.
    #[must_use]
    pub fn into_request(
        self,
        idle: Duration,
    ) -> (hyper::Request<OutboundBody>, UploadProgress) {
        let mut body = IdleTimeout::new(self.body, idle, Direction::Request);
        let progress = body.track_progress();
        let mut request = hyper::Request::new(body);
        *request.method_mut() = self.method;
        *request.uri_mut() = self.uri;
        *request.headers_mut() = self.headers;
        (request, progress)
    }
}

/// Validate a raw target: absolute, `http` or `https`, with a host.
pub fn parse_target(raw: &str) -> Result<Url, ProxyError> {
    let invalid = |reason: String| ProxyError::InvalidUrl {
        url: raw.to_string(),
        reason,
    };

    let mut url = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!(
            "unsupported scheme '{}' (expected http or https)",
            url.scheme()
        )));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(invalid("missing host".into()));
    }
    url.set_fragment(None);
    Ok(url)
}

pub fn translate(
    inbound: InboundRequest,
    settings: &ProxySettings,
) -> Result<OutboundRequest, ProxyError> {
    let raw = inbound.target_param().ok_or(ProxyError::MissingParameter)?;
    let target = parse_target(&raw)?;
    let uri: Uri = target.as_str().parse().map_err(|e: axum::http::uri::InvalidUri| {
        ProxyError::InvalidUrl {
            url: raw.clone(),
            reason: e.to_string(),
        }
    })?;

    let client_ip = inbound.remote_addr.to_string();
    let headers = build_forwarded_headers(&inbound.headers, &client_ip, &target, settings);
    let charset = declared_charset(&inbound.headers);

    Ok(OutboundRequest {
        method: inbound.method,
        route: route_key(&target),
        target,
        uri,
        headers,
        charset,
        body: inbound.body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inbound(uri: &str) -> InboundRequest {
        let request = axum::http::Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header("content-length", "5")
            .header("content-type", "text/plain; charset=UTF-8")
            .header("x-forwarded-for", "6.6.6.6")
            .body(Body::from("hello"))
            .unwrap();
        InboundRequest::new(request, "192.168.1.7:51000".parse().unwrap())
    }

    #[test]
    fn missing_parameter() {
        let result = translate(inbound("/proxy?other=1"), &ProxySettings::default());
        assert!(matches!(result, Err(ProxyError::MissingParameter)));

        let result = translate(inbound("/proxy"), &ProxySettings::default());
        assert!(matches!(result, Err(ProxyError::MissingParameter)));
    }

    #[test]
    fn malformed_urls_are_rejected() {
        for raw in ["not%20a%20url", "", "ftp%3A%2F%2Fhost%2Ffile", "http%3A%2F%2F"] {
            let result = translate(
                inbound(&format!("/proxy?url={raw}")),
                &ProxySettings::default(),
            );
            assert!(
                matches!(result, Err(ProxyError::InvalidUrl { .. })),
                "{raw} should be rejected"
            );
        }
    }

    #[test]
    fn builds_outbound_descriptor() {
        let outbound = translate(
            inbound("/proxy?url=http%3A%2F%2Fbackend%3A8080%2Fitems%3Fpage%3D2%23top"),
            &ProxySettings::default(),
        )
        .unwrap();

        assert_eq!(outbound.method, Method::POST);
        assert_eq!(outbound.uri, "http://backend:8080/items?page=2");
        assert_eq!(outbound.route, "http://backend:8080");
        assert_eq!(outbound.charset.as_deref(), Some("UTF-8"));
        assert!(outbound.headers.get("content-length").is_none());
        assert_eq!(outbound.headers.get("x-forwarded-for").unwrap(), "192.168.1.7");
        assert_eq!(
            outbound.headers.get("content-type").unwrap(),
            "text/plain; charset=UTF-8"
        );
    }

    #[test]
    fn first_url_parameter_wins() {
        let inbound = inbound("/proxy?url=http%3A%2F%2Fa%2F&url=http%3A%2F%2Fb%2F");
        assert_eq!(inbound.target_param().as_deref(), Some("http://a/"));
    }

    #[test]
    fn into_request_keeps_method_uri_and_headers() {
        let outbound = translate(
            inbound("/proxy?url=https%3A%2F%2Fexample.com%2F"),
            &ProxySettings::default(),
        )
        .unwrap();

        let (request, _progress) = outbound.into_request(Duration::from_secs(1));
        assert_eq!(request.method(), Method::POST);
        assert_eq!(request.uri(), "https://example.com/");
        assert_eq!(request.headers().get("host").unwrap(), "example.com");
    }
}
