//! Cross-origin protection for action requests.

use axum::http::header::{HOST, ORIGIN};
use axum::http::{HeaderMap, HeaderName};
use url::Url;

use crate::error::ActionError;

const X_FORWARDED_HOST: HeaderName = HeaderName::from_static("x-forwarded-host");

/// Host (with port) the request was addressed to, preferring the first forwarded host.
fn served_host(headers: &HeaderMap) -> Option<String> {
    headers
        .get(X_FORWARDED_HOST)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .or_else(|| headers.get(HOST).and_then(|v| v.to_str().ok()))
        .map(|v| v.trim().to_ascii_lowercase())
        .filter(|v| !v.is_empty())
}

/// `host[:port]` of an origin header value.
fn origin_host(origin: &str) -> Option<String> {
    let url = Url::parse(origin).ok()?;
    let host = url.host_str()?.to_ascii_lowercase();
    Some(match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host,
    })
}

/// Match `host` against exact hosts and `*.domain` wildcards.
fn is_allowed(host: &str, allowed: &[String]) -> bool {
    allowed.iter().any(|pattern| {
        let pattern = pattern.to_ascii_lowercase();
        match pattern.strip_prefix("*.") {
            Some(domain) => host
                .strip_suffix(domain)
                .is_some_and(|sub| sub.len() > 1 && sub.ends_with('.')),
            None => host == pattern,
        }
    })
}

/// Reject action requests whose `origin` does not match the host they were sent to.
pub fn verify_origin(headers: &HeaderMap, allowed: &[String]) -> Result<(), ActionError> {
    let Some(origin) = headers
        .get(ORIGIN)
        .and_then(|v| v.to_str().ok())
        .filter(|v| *v != "null")
    else {
        tracing::warn!("Missing `origin` header on server action request");
        return Ok(());
    };

    let host = served_host(headers);
    // An unparseable origin is compared verbatim, which never matches a host.
    let origin_host = origin_host(origin).unwrap_or_else(|| origin.to_string());

    if host.as_deref() == Some(origin_host.as_str()) || is_allowed(&origin_host, allowed) {
        return Ok(());
    }

    tracing::error!(
        origin,
        host = host.as_deref().unwrap_or("<none>"),
        "`origin` header does not match the forwarded or served host; rejecting server action"
    );
    Err(ActionError::ForbiddenOrigin {
        origin: origin.to_string(),
        host,
    })
}
