//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! dispatcher, decoder, probe
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout
//!     → Prometheus scrape endpoint
//! ```

pub mod logging;
pub mod metrics;
