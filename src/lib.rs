//! Server action dispatch.
//!
//! Recognises action requests among ordinary page requests, decodes their arguments,
//! runs the named action exactly once and turns the result into the response the
//! client router expects.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http::server ──▶ http::request (classify)
//!                                           │ not an action
//!                                           ├──────────────────────────▶ PageRenderer
//!                                           ▼
//!                                 security::origin
//!                                           ▼
//!                                 decode (body → form → bound arguments)
//!                                           ▼
//!                                 actions (resolve → invoke → outcome)
//!                                           ▼
//!                                 store (cookies, revalidation summary)
//!                                           ▼
//!     Client Response             http::response ──▶ http::probe (redirect streamed inline)
//!     ◀──────────────────────────────────────┘
//!
//!     Cross-cutting: config, observability, lifecycle, error
//! ```

// Core subsystems
pub mod actions;
pub mod config;
pub mod decode;
pub mod http;
pub mod render;
pub mod store;

// Cross-cutting concerns
pub mod error;
pub mod lifecycle;
pub mod observability;
pub mod security;

pub mod demo;

pub use config::schema::ServerConfig;
pub use error::ActionError;
pub use http::{ActionApp, HttpServer};
pub use lifecycle::Shutdown;
