//! Request and response types exchanged with the gateway.
//!
//! All bodies are JSON. Attribute values and stored strings are nullable: a
//! `null` value encodes to a `null` stored string and back.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Encode endpoint
// ---------------------------------------------------------------------------

/// Request body for `POST /encode`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncodeRequest {
    /// Plaintext attribute value.
    pub value: Option<String>,
    /// Tag of the format to encode under. Omitted: the configured policy decides.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

/// Successful response body for `POST /encode`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncodeResponse {
    /// `<tag>:<base64>` string to store verbatim.
    pub stored: Option<String>,
}

// ---------------------------------------------------------------------------
// Decode endpoint
// ---------------------------------------------------------------------------

/// Request body for `POST /decode`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecodeRequest {
    /// String previously produced by `/encode`.
    pub stored: Option<String>,
}

/// Successful response body for `POST /decode`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecodeResponse {
    pub value: Option<String>,
}

// ---------------------------------------------------------------------------
// Format catalog
// ---------------------------------------------------------------------------

/// One entry of the `GET /formats` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatInfo {
    pub name: String,
    pub tag: String,
    /// `null` for passthrough formats.
    pub algorithm: Option<String>,
    pub key_size_bits: usize,
    /// `true` when key material failed to load at startup.
    pub degraded: bool,
    /// `true` for the format used when a request names none.
    pub default: bool,
}

// ---------------------------------------------------------------------------
// Error response
// ---------------------------------------------------------------------------

/// Standard error response body returned on any non-2xx status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Short machine-readable error code (e.g. `"bad_request"`).
    pub code: String,
    /// Human-readable description safe to expose to callers.
    pub message: String,
}

impl ErrorResponse {
    /// Construct an [`ErrorResponse`] from a code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Health check
// ---------------------------------------------------------------------------

/// Response body for `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Overall service status: `"ok"` or `"degraded"`.
    pub status: String,
    /// Number of registered formats with usable key material.
    pub formats_ready: usize,
    /// Number of registered formats whose key material failed to load.
    pub formats_degraded: usize,
}
