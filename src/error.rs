//! Error types for action dispatch.
//!
//! # Error Categories
//! - **Fatal**: `OversizedPayload`, `UnknownAction`. Propagated to the caller as-is.
//! - **Generic failures**: everything else. Fetch actions receive them as a rejected
//!   structured payload, other requests get them back as an error.
//!
//! Redirect and not-found are not errors here; see [`crate::actions::ActionSignal`].

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use bytesize::ByteSize;
use thiserror::Error;

/// Boxed error returned by action implementations.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The main error type for the dispatch pipeline.
#[derive(Debug, Error)]
pub enum ActionError {
    /// The request body exceeded the configured size limit.
    #[error(
        "Body exceeded {limit} limit.\nTo configure the body size limit for server actions, \
         raise `actions.body_size_limit` in the server configuration."
    )]
    OversizedPayload { limit: ByteSize },

    /// The manifest has no entry for the action in the current worker scope.
    #[error(
        "Failed to find server action {action_id:?}. This request might be from an older or newer deployment."
    )]
    UnknownAction { action_id: String },

    /// The body could not be decoded into arguments.
    #[error("Invalid action payload: {0}")]
    MalformedPayload(String),

    /// The `origin` header does not match the host the request was sent to.
    #[error("Invalid server actions request: origin {origin:?} does not match host {host:?}")]
    ForbiddenOrigin { origin: String, host: Option<String> },

    /// Cookies were modified outside of an action.
    #[error("Cookies can only be modified in a server action")]
    ReadonlyCookies,

    /// Reading the body from the transport failed.
    #[error("Failed to read request body: {0}")]
    Body(#[source] axum::Error),

    /// The action implementation returned an error.
    #[error("{0}")]
    Action(#[source] BoxError),

    /// The rendering collaborator failed to produce a payload.
    #[error("Failed to render action result: {0}")]
    Render(String),
}

impl ActionError {
    /// Shorthand for [`ActionError::MalformedPayload`].
    pub fn malformed(message: impl Into<String>) -> Self {
        ActionError::MalformedPayload(message.into())
    }

    /// Fatal errors abort the request instead of being reported through the payload.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ActionError::OversizedPayload { .. } | ActionError::UnknownAction { .. }
        )
    }

    /// HTTP status used when the error reaches the transport.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ActionError::OversizedPayload { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ActionError::OversizedPayload { .. } => "oversized_payload",
            ActionError::UnknownAction { .. } => "unknown_action",
            ActionError::MalformedPayload(_) => "malformed_payload",
            ActionError::ForbiddenOrigin { .. } => "forbidden_origin",
            ActionError::ReadonlyCookies => "readonly_cookies",
            ActionError::Body(_) => "body",
            ActionError::Action(_) => "action",
            ActionError::Render(_) => "render",
        }
    }
}

impl IntoResponse for ActionError {
    fn into_response(self) -> Response {
        (self.status_code(), self.to_string()).into_response()
    }
}
