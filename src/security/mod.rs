//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Recognised action request:
//!     → origin.rs (origin host must match the served host or an allowed pattern)
//!     → Pass to the payload decoder
//! ```
//!
//! # Design Decisions
//! - Fail closed: a mismatched origin never reaches the action
//! - Requests without an origin header are let through with a warning

pub mod origin;

pub use origin::verify_origin;
