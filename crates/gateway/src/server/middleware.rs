//! Limits applied by the router's middleware layers.
//!
//! The router adds request tracing, timeout enforcement, a body size cap and
//! response compression.

use std::time::Duration;

/// Default per-request timeout applied to all routes.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Largest accepted request body. Attribute values are column-sized.
pub const MAX_BODY_BYTES: usize = 64 * 1024;
