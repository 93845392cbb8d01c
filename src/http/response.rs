//! Response composition for action outcomes.
//!
//! # Responsibilities
//! - Accumulate the response head (status, cache headers, cookies) while dispatching
//! - Build structured payload responses for fetch actions
//! - Build redirects: streamed via the probe for fetch actions, 303 for form posts
//!
//! # Design Decisions
//! - The probe body is passed through as a stream, never buffered
//! - A failed probe degrades to an empty payload plus the redirect header

use std::sync::Arc;

use axum::body::Body;
use axum::http::header::{CONTENT_TYPE, LOCATION, SET_COOKIE};
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderValue, Response, StatusCode};

use crate::error::ActionError;
use crate::http::headers::ACTION_REDIRECT;
use crate::http::probe::{ProbeOutcome, ProbeRequest, RedirectProbe};
use crate::render::{FlightOptions, FlightRenderer, FLIGHT_CONTENT_TYPE};

/// Status and headers collected before the response body is known.
#[derive(Debug, Clone, Default)]
pub struct ResponseHead {
    pub status: Option<StatusCode>,
    pub headers: HeaderMap,
}

impl ResponseHead {
    /// Write the head onto `response`. `set-cookie` values are appended, other headers replace.
    pub fn apply(self, response: &mut Response<Body>) {
        if let Some(status) = self.status {
            *response.status_mut() = status;
        }
        merge_headers(response.headers_mut(), self.headers);
    }

    fn into_response(self, body: Body) -> Response<Body> {
        let mut response = Response::new(body);
        self.apply(&mut response);
        response
    }
}

fn merge_headers(target: &mut HeaderMap, source: HeaderMap) {
    let mut current = None;
    for (name, value) in source {
        // `None` names continue the previous header's values.
        if let Some(name) = name {
            if name != SET_COOKIE {
                target.remove(&name);
            }
            current = Some(name);
        }
        if let Some(name) = &current {
            target.append(name.clone(), value);
        }
    }
}

/// Builds the HTTP response for an action outcome.
#[derive(Clone)]
pub struct ResponseComposer {
    flight: Arc<dyn FlightRenderer>,
    probe: RedirectProbe,
}

impl ResponseComposer {
    pub fn new(flight: Arc<dyn FlightRenderer>, probe: RedirectProbe) -> Self {
        Self { flight, probe }
    }

    /// Structured payload carrying a settled action result.
    pub async fn fetch_result(
        &self,
        parts: &Parts,
        mut head: ResponseHead,
        options: FlightOptions,
    ) -> Result<Response<Body>, ActionError> {
        let body = self.flight.render(parts, options).await?;
        head.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static(FLIGHT_CONTENT_TYPE));
        Ok(head.into_response(body))
    }

    /// Redirect after a fetch action: stream the target inline when possible.
    pub async fn fetch_redirect(
        &self,
        parts: &Parts,
        mut head: ResponseHead,
        target: &str,
        revalidated_tags: &[String],
    ) -> Response<Body> {
        match HeaderValue::from_str(target) {
            Ok(value) => {
                head.headers.insert(ACTION_REDIRECT, value);
            }
            Err(_) => tracing::warn!(redirect = target, "Redirect target is not a valid header value"),
        }

        let outcome = self
            .probe
            .probe(ProbeRequest {
                target,
                request_headers: &parts.headers,
                response_headers: &head.headers,
                revalidated_tags,
            })
            .await;

        match outcome {
            ProbeOutcome::Rendered { headers, body } => {
                let mut response = head.into_response(Body::empty());
                merge_headers(response.headers_mut(), headers);
                *response.body_mut() = body;
                response
            }
            ProbeOutcome::Fallback(_) => {
                head.headers
                    .insert(CONTENT_TYPE, HeaderValue::from_static(FLIGHT_CONTENT_TYPE));
                head.into_response(Body::from("{}"))
            }
        }
    }

    /// `303 See Other` for a classic form submission.
    pub fn form_redirect(&self, mut head: ResponseHead, target: &str) -> Response<Body> {
        head.status = Some(StatusCode::SEE_OTHER);
        match HeaderValue::from_str(target) {
            Ok(value) => {
                head.headers.insert(LOCATION, value);
            }
            Err(_) => {
                tracing::warn!(redirect = target, "Redirect target is not a valid header value");
                head.headers.insert(LOCATION, HeaderValue::from_static("/"));
            }
        }
        head.into_response(Body::empty())
    }
}
