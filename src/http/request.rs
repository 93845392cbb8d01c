//! Request classification.
//!
//! # Responsibilities
//! - Decide whether a request is a server action at all
//! - Pick the dispatch mode and body encoding from method, content type and action id
//!
//! # Design Decisions
//! - Classification reads headers only; the body is untouched until decoding
//! - Exactly one encoding applies to any classified request

use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, HeaderName, Method};

use crate::http::headers::ACTION_ID;

/// Correlation header set on every request and echoed on the response.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

const URL_ENCODED: &str = "application/x-www-form-urlencoded";
const MULTIPART_PREFIX: &str = "multipart/form-data";

/// How the action body is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyEncoding {
    /// Structured reply text.
    Text,
    UrlEncoded,
    Multipart,
}

/// Which kind of action invocation this is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    /// Client-side call identified by the action id header; expects a structured result.
    FetchAction,
    UrlEncodedFormAction,
    MultipartFormAction,
}

impl DispatchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DispatchMode::FetchAction => "fetch",
            DispatchMode::UrlEncodedFormAction => "urlencoded",
            DispatchMode::MultipartFormAction => "multipart",
        }
    }
}

/// A request recognised as a server action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRequest {
    pub mode: DispatchMode,
    pub encoding: BodyEncoding,
    pub action_id: Option<String>,
}

impl ActionRequest {
    /// `None` when the request is not an action request.
    pub fn classify(method: &Method, headers: &HeaderMap) -> Option<Self> {
        if method != Method::POST {
            return None;
        }

        let content_type = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        let encoding = if content_type == URL_ENCODED {
            BodyEncoding::UrlEncoded
        } else if content_type.starts_with(MULTIPART_PREFIX) {
            BodyEncoding::Multipart
        } else {
            BodyEncoding::Text
        };

        let action_id = headers
            .get(ACTION_ID)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let mode = match (&action_id, encoding) {
            (Some(_), _) => DispatchMode::FetchAction,
            (None, BodyEncoding::UrlEncoded) => DispatchMode::UrlEncodedFormAction,
            (None, BodyEncoding::Multipart) => DispatchMode::MultipartFormAction,
            (None, BodyEncoding::Text) => return None,
        };

        Some(Self {
            mode,
            encoding,
            action_id,
        })
    }

    pub fn is_fetch(&self) -> bool {
        self.mode == DispatchMode::FetchAction
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(content_type: Option<&'static str>, action_id: Option<&'static str>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(ct) = content_type {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(ct));
        }
        if let Some(id) = action_id {
            headers.insert(ACTION_ID, HeaderValue::from_static(id));
        }
        headers
    }

    #[test]
    fn test_fetch_action_any_content_type() {
        for ct in [None, Some("text/plain;charset=UTF-8"), Some(URL_ENCODED)] {
            let request = ActionRequest::classify(&Method::POST, &headers(ct, Some("abc"))).unwrap();
            assert_eq!(request.mode, DispatchMode::FetchAction);
            assert_eq!(request.action_id.as_deref(), Some("abc"));
        }

        let request = ActionRequest::classify(
            &Method::POST,
            &headers(Some("multipart/form-data; boundary=x"), Some("abc")),
        )
        .unwrap();
        assert!(request.is_fetch());
        assert_eq!(request.encoding, BodyEncoding::Multipart);
    }

    #[test]
    fn test_form_actions() {
        let request = ActionRequest::classify(&Method::POST, &headers(Some(URL_ENCODED), None)).unwrap();
        assert_eq!(request.mode, DispatchMode::UrlEncodedFormAction);

        let request = ActionRequest::classify(
            &Method::POST,
            &headers(Some("multipart/form-data; boundary=----x"), None),
        )
        .unwrap();
        assert_eq!(request.mode, DispatchMode::MultipartFormAction);
        assert!(!request.is_fetch());
    }

    #[test]
    fn test_not_an_action() {
        assert!(ActionRequest::classify(&Method::GET, &headers(None, Some("abc"))).is_none());
        assert!(ActionRequest::classify(&Method::POST, &headers(Some("application/json"), None)).is_none());
        // Only the exact url-encoded type qualifies.
        assert!(ActionRequest::classify(
            &Method::POST,
            &headers(Some("application/x-www-form-urlencoded; charset=utf-8"), None)
        )
        .is_none());
    }
}
