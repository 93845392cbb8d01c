//! Header names used by action dispatch and the forwarded-header merge.

use axum::http::header::{self, HeaderName, HeaderValue};
use axum::http::HeaderMap;

use crate::store::cookies::{parse_cookie_header, ResponseCookie};

/// Identifies a fetch action and names the action to run.
pub const ACTION_ID: HeaderName = HeaderName::from_static("x-action-id");

/// Marks a request that expects a structured render payload.
pub const RSC: HeaderName = HeaderName::from_static("rsc");

/// Client router state; stripped so a probed target renders in full.
pub const ROUTER_STATE_TREE: HeaderName = HeaderName::from_static("router-state-tree");

/// Tags revalidated by the action, forwarded to the probed target.
pub const REVALIDATED_TAGS: HeaderName = HeaderName::from_static("x-revalidated-tags");

pub const REVALIDATE_TAG_TOKEN: HeaderName = HeaderName::from_static("x-revalidate-tag-token");

/// `[[], tagRevalidated, cookieRevalidated]` summary.
pub const ACTION_REVALIDATED: HeaderName = HeaderName::from_static("x-action-revalidated");

/// Redirect target consumed by the client router after a fetch action.
pub const ACTION_REDIRECT: HeaderName = HeaderName::from_static("x-action-redirect");

pub const NO_STORE: HeaderValue =
    HeaderValue::from_static("no-cache, no-store, max-age=0, must-revalidate");

/// Headers never forwarded to the probe target or copied back from it.
const FORBIDDEN: [&str; 9] = [
    "accept-encoding",
    "keepalive",
    "keep-alive",
    "content-encoding",
    "transfer-encoding",
    "connection",
    "expect",
    "content-length",
    "x-action-id",
];

/// True for hop-by-hop and action-internal headers.
pub fn is_forbidden(name: &HeaderName) -> bool {
    FORBIDDEN.contains(&name.as_str())
}

/// Merge inbound request headers with the response headers written so far into one
/// forwardable set.
///
/// Response headers win on collision. Cookies set on the response are folded into the
/// `cookie` header as bare `name=value` pairs, replacing request cookies of the same name.
pub fn forwarded_headers(request: &HeaderMap, response: &HeaderMap) -> HeaderMap {
    let mut cookies = parse_cookie_header(request);

    for set_cookie in response.get_all(header::SET_COOKIE) {
        let Some(cookie) = set_cookie.to_str().ok().and_then(ResponseCookie::parse) else {
            continue;
        };
        match cookies.iter_mut().find(|(name, _)| name == cookie.name()) {
            Some(existing) => existing.1 = cookie.value().to_string(),
            None => cookies.push((cookie.name().to_string(), cookie.value().to_string())),
        }
    }

    let mut merged = request.clone();
    for name in response.keys() {
        merged.remove(name);
        for value in response.get_all(name) {
            merged.append(name.clone(), value.clone());
        }
    }

    let forbidden: Vec<HeaderName> = merged.keys().filter(|n| is_forbidden(n)).cloned().collect();
    for name in forbidden {
        merged.remove(name);
    }
    merged.remove(header::SET_COOKIE);
    merged.remove(header::COOKIE);

    if !cookies.is_empty() {
        let joined = cookies
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; ");
        match HeaderValue::from_str(&joined) {
            Ok(value) => {
                merged.insert(header::COOKIE, value);
            }
            Err(err) => tracing::warn!(error = %err, "Dropping unrepresentable merged cookie header"),
        }
    }

    merged
}
