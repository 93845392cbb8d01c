//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, fallback handler)
//!     → request.rs (is this an action? which mode?)
//!     → [actions::dispatcher runs the action]
//!     → response.rs (compose per outcome)
//!         → probe.rs (redirect target streamed inline, headers.rs merge)
//!     → Send to client
//! ```

pub mod headers;
pub mod probe;
pub mod request;
pub mod response;
pub mod server;

pub use probe::{ProbeFallback, ProbeOutcome, RedirectProbe};
pub use request::{ActionRequest, BodyEncoding, DispatchMode, X_REQUEST_ID};
pub use response::{ResponseComposer, ResponseHead};
pub use server::{ActionApp, AppState, HttpServer};
