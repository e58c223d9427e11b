//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use attr_crypt::{Converter, EphemeralSecretProvider, FixedFormatPolicy, FormatRegistry};

/// Application state shared across all request handlers.
///
/// All fields are cheaply cloneable (`Arc`-backed) so that Axum can clone the
/// state for each request without copying the format catalog.
#[derive(Clone)]
pub struct AppState {
    /// Text converter, pinned to the configured encode format.
    pub converter: Converter<String, FixedFormatPolicy>,
    /// Tag used by `/encode` when the request names no format.
    pub encode_tag: Arc<String>,
}

impl AppState {
    /// Create a new [`AppState`] over `registry`, encoding under `encode_tag` by default.
    pub fn new(registry: Arc<FormatRegistry>, encode_tag: String) -> Self {
        let converter = Converter::with_policy(registry, FixedFormatPolicy::new(encode_tag.clone()));
        Self {
            converter,
            encode_tag: Arc::new(encode_tag),
        }
    }

    pub fn registry(&self) -> &FormatRegistry {
        self.converter.registry()
    }
}

impl Default for AppState {
    /// Built-in catalog with ephemeral keys and the registry default format,
    /// suitable for tests.
    fn default() -> Self {
        let registry = FormatRegistry::builtin(&EphemeralSecretProvider);
        let tag = registry.default_format().tag().to_owned();
        Self::new(Arc::new(registry), tag)
    }
}
