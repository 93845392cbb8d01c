//! Streaming redirect probe.
//!
//! After a fetch action redirects to a relative path, the target is requested from this
//! same server with the action's cookies applied. When it answers with a structured render
//! payload, that payload is streamed back as the action response, saving the client a
//! second round trip. Every failure degrades to a plain redirect.

use axum::body::Body;
use axum::http::header::{CONTENT_TYPE, HOST};
use axum::http::{HeaderMap, HeaderValue, Method, Request, StatusCode};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use url::Url;

use crate::config::ProbeConfig;
use crate::http::headers::{
    forwarded_headers, is_forbidden, REVALIDATED_TAGS, REVALIDATE_TAG_TOKEN, ROUTER_STATE_TREE, RSC,
};
use crate::observability::metrics;
use crate::render::FLIGHT_CONTENT_TYPE;

/// Why the probe did not produce a payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeFallback {
    Disabled,
    /// The target is absolute or on another origin.
    Absolute,
    /// No usable origin to send the probe to.
    NoOrigin,
    Request(String),
    Status(StatusCode),
    ContentType(Option<String>),
}

impl ProbeFallback {
    pub fn label(&self) -> &'static str {
        match self {
            ProbeFallback::Disabled => "disabled",
            ProbeFallback::Absolute => "absolute",
            ProbeFallback::NoOrigin => "no_origin",
            ProbeFallback::Request(_) => "request_error",
            ProbeFallback::Status(_) => "status",
            ProbeFallback::ContentType(_) => "content_type",
        }
    }
}

/// Result of probing a redirect target.
#[derive(Debug)]
pub enum ProbeOutcome {
    /// The target's payload, streamed, with the headers to copy onto the response.
    Rendered { headers: HeaderMap, body: Body },
    Fallback(ProbeFallback),
}

/// Inputs taken from the action request and the response head built so far.
#[derive(Debug, Clone, Copy)]
pub struct ProbeRequest<'a> {
    pub target: &'a str,
    pub request_headers: &'a HeaderMap,
    pub response_headers: &'a HeaderMap,
    pub revalidated_tags: &'a [String],
}

/// Issues HEAD then GET against redirect targets on this server.
#[derive(Clone)]
pub struct RedirectProbe {
    client: Client<HttpConnector, Body>,
    config: ProbeConfig,
    base_path: String,
}

impl RedirectProbe {
    pub fn new(config: ProbeConfig, base_path: impl Into<String>) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self {
            client,
            config,
            base_path: base_path.into(),
        }
    }

    /// Absolute URL of a relative redirect target. Targets that are not same-origin
    /// are rejected with [`ProbeFallback::Absolute`].
    pub fn target_url(&self, request_headers: &HeaderMap, target: &str) -> Result<Url, ProbeFallback> {
        if target.starts_with("//") || Url::parse(target).is_ok() {
            return Err(ProbeFallback::Absolute);
        }

        let origin = match &self.config.origin {
            Some(origin) => origin.clone(),
            None => {
                let host = request_headers
                    .get(HOST)
                    .and_then(|v| v.to_str().ok())
                    .ok_or(ProbeFallback::NoOrigin)?;
                format!("http://{host}")
            }
        };
        let origin = Url::parse(&origin).map_err(|_| ProbeFallback::NoOrigin)?;

        let url = origin
            .join(&format!("{}{}", self.base_path, target))
            .map_err(|_| ProbeFallback::Absolute)?;
        if url.origin() != origin.origin() {
            return Err(ProbeFallback::Absolute);
        }
        Ok(url)
    }

    pub async fn probe(&self, request: ProbeRequest<'_>) -> ProbeOutcome {
        let outcome = self.run(request).await;
        let result = match &outcome {
            ProbeOutcome::Rendered { .. } => "rendered",
            ProbeOutcome::Fallback(fallback) => {
                tracing::debug!(redirect = request.target, reason = ?fallback, "Redirect probe fell back");
                fallback.label()
            }
        };
        metrics::record_probe(result);
        outcome
    }

    async fn run(&self, request: ProbeRequest<'_>) -> ProbeOutcome {
        if !self.config.enabled {
            return ProbeOutcome::Fallback(ProbeFallback::Disabled);
        }
        let url = match self.target_url(request.request_headers, request.target) {
            Ok(url) => url,
            Err(fallback) => return ProbeOutcome::Fallback(fallback),
        };
        let headers = self.forward_headers(&request);

        let head = match self.send(Method::HEAD, &url, &headers).await {
            Ok(response) => response,
            Err(fallback) => return ProbeOutcome::Fallback(fallback),
        };
        let content_type = head
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        if !content_type
            .as_deref()
            .is_some_and(|ct| ct.starts_with(FLIGHT_CONTENT_TYPE))
        {
            return ProbeOutcome::Fallback(ProbeFallback::ContentType(content_type));
        }

        let response = match self.send(Method::GET, &url, &headers).await {
            Ok(response) => response,
            Err(fallback) => return ProbeOutcome::Fallback(fallback),
        };
        let (parts, body) = response.into_parts();

        let mut copied = HeaderMap::new();
        for (name, value) in parts.headers.iter() {
            if !is_forbidden(name) {
                copied.append(name.clone(), value.clone());
            }
        }

        tracing::debug!(url = %url, "Streaming redirect target payload");
        ProbeOutcome::Rendered {
            headers: copied,
            body: Body::new(body),
        }
    }

    fn forward_headers(&self, request: &ProbeRequest<'_>) -> HeaderMap {
        let mut headers = forwarded_headers(request.request_headers, request.response_headers);
        headers.remove(HOST);
        headers.remove(ROUTER_STATE_TREE);
        headers.remove(CONTENT_TYPE);
        headers.insert(RSC, HeaderValue::from_static("1"));

        if !request.revalidated_tags.is_empty() {
            if let Ok(tags) = HeaderValue::from_str(&request.revalidated_tags.join(",")) {
                headers.insert(REVALIDATED_TAGS, tags);
            }
            if let Some(token) = self
                .config
                .revalidate_tag_token
                .as_deref()
                .and_then(|t| HeaderValue::from_str(t).ok())
            {
                headers.insert(REVALIDATE_TAG_TOKEN, token);
            }
        }
        headers
    }

    async fn send(
        &self,
        method: Method,
        url: &Url,
        headers: &HeaderMap,
    ) -> Result<hyper::Response<hyper::body::Incoming>, ProbeFallback> {
        let mut request = Request::builder()
            .method(method)
            .uri(url.as_str())
            .body(Body::empty())
            .map_err(|err| ProbeFallback::Request(err.to_string()))?;
        *request.headers_mut() = headers.clone();

        let response = self
            .client
            .request(request)
            .await
            .map_err(|err| ProbeFallback::Request(err.to_string()))?;
        if !response.status().is_success() {
            return Err(ProbeFallback::Status(response.status()));
        }
        Ok(response)
    }
}
