//! Rendering collaborators.
//!
//! Dispatch does not render pages itself. The structured payload returned to fetch
//! actions comes from a [`FlightRenderer`]; full pages come from a [`PageRenderer`].

use axum::body::Body;
use axum::http::request::Parts;
use axum::http::Response;
use futures_util::future::BoxFuture;
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::error::ActionError;

/// Content type of structured render payloads.
pub const FLIGHT_CONTENT_TYPE: &str = "text/x-component";

/// Pre-settled action result handed to the renderer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ActionResult {
    Fulfilled { value: JsonValue },
    Rejected { reason: Rejection },
}

impl ActionResult {
    pub fn fulfilled(value: JsonValue) -> Self {
        ActionResult::Fulfilled { value }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        ActionResult::Rejected {
            reason: Rejection {
                message: message.into(),
                not_found: false,
            },
        }
    }

    /// Rejection flagged as not-found. Without a message the reason reads `not found`.
    pub fn not_found(message: Option<String>) -> Self {
        ActionResult::Rejected {
            reason: Rejection {
                message: message.unwrap_or_else(|| "not found".to_string()),
                not_found: true,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Rejection {
    pub message: String,
    pub not_found: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlightOptions {
    pub action_result: ActionResult,
    /// Only the action result is sent; the page tree is not re-rendered.
    pub skip_flight: bool,
    pub as_not_found: bool,
}

/// Produces the structured payload body for fetch actions.
pub trait FlightRenderer: Send + Sync {
    fn render<'a>(&'a self, parts: &'a Parts, options: FlightOptions) -> BoxFuture<'a, Result<Body, ActionError>>;
}

/// Renders ordinary pages: non-action requests, form-action continuations and not-found.
pub trait PageRenderer: Send + Sync {
    fn render(&self, parts: Parts, not_found: bool) -> BoxFuture<'_, Response<Body>>;
}

/// Serialises the action result as JSON.
#[derive(Debug, Clone, Default)]
pub struct JsonFlightRenderer;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FlightPayload<'a> {
    action_result: &'a ActionResult,
    skip_flight: bool,
    as_not_found: bool,
    pathname: &'a str,
}

impl FlightRenderer for JsonFlightRenderer {
    fn render<'a>(&'a self, parts: &'a Parts, options: FlightOptions) -> BoxFuture<'a, Result<Body, ActionError>> {
        Box::pin(async move {
            let payload = FlightPayload {
                action_result: &options.action_result,
                skip_flight: options.skip_flight,
                as_not_found: options.as_not_found,
                pathname: parts.uri.path(),
            };
            let json = serde_json::to_vec(&payload).map_err(|err| ActionError::Render(err.to_string()))?;
            Ok(Body::from(json))
        })
    }
}
