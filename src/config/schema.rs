//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the action server.
//! All types derive Serde traits for deserialization from config files.

use bytesize::ByteSize;
use serde::{Deserialize, Serialize};

/// Root configuration for the action server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Action dispatch settings.
    pub actions: ActionsConfig,

    /// Streaming redirect probe settings.
    pub probe: ProbeConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
        }
    }
}

/// Execution environment the actions are compiled for.
///
/// Selects the manifest section and the body decoder, once, at start-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Runtime {
    #[default]
    Node,
    Edge,
}

impl Runtime {
    pub fn as_str(&self) -> &'static str {
        match self {
            Runtime::Node => "node",
            Runtime::Edge => "edge",
        }
    }
}

/// Action dispatch configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ActionsConfig {
    /// Runtime whose manifest section and decoder are used.
    pub runtime: Runtime,

    /// Maximum accepted request body size (e.g., "1 MiB", "500 KB").
    pub body_size_limit: ByteSize,

    /// Path to the action manifest JSON file.
    pub manifest_path: Option<String>,

    /// Extra hosts allowed to post actions cross-origin (exact or `*.domain`).
    pub allowed_origins: Vec<String>,

    /// Path prefix the application is mounted under (e.g., "/docs").
    pub base_path: String,
}

impl Default for ActionsConfig {
    fn default() -> Self {
        Self {
            runtime: Runtime::Node,
            body_size_limit: ByteSize::mib(1),
            manifest_path: None,
            allowed_origins: Vec::new(),
            base_path: String::new(),
        }
    }
}

/// Streaming redirect probe configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Try to stream the redirect target inline for fetch actions.
    pub enabled: bool,

    /// Origin the probe requests are sent to. Defaults to `http://<host header>`.
    pub origin: Option<String>,

    /// Token forwarded with revalidated tags so the target trusts them.
    pub revalidate_tag_token: Option<String>,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            origin: None,
            revalidate_tag_token: None,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
