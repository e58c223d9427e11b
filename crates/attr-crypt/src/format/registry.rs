//! [`FormatRegistry`]: the fixed catalog of cipher formats, resolved once at startup.

use std::sync::{Arc, OnceLock};

use thiserror::Error;
use tracing::{error, info};

use super::{
    Algorithm, CipherFormat, CipherSuite, AES_V1, AES_V1_KEY_BITS, AES_V1_TAG, BASE_64,
    BASE_64_TAG, SEPARATOR,
};
use crate::secret::{EphemeralSecretProvider, SecretProvider};

/// Errors produced while building or installing a registry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// Another format already owns this tag.
    #[error("duplicate format tag: {0}")]
    DuplicateTag(String),

    /// Another format already owns this name.
    #[error("duplicate format name: {0}")]
    DuplicateName(String),

    /// The tag is empty or contains the separator.
    #[error("invalid format tag: {0:?}")]
    InvalidTag(String),

    /// The process-wide registry was already installed.
    #[error("format registry already installed")]
    AlreadyInstalled,
}

/// Catalog of cipher formats, looked up by storage tag.
///
/// The passthrough `BASE_64` format is always present and is the default
/// format. Formats are never mutated once registered, so a registry behind an
/// [`Arc`] can be shared across threads without locking.
#[derive(Debug, Clone)]
pub struct FormatRegistry {
    formats: Vec<CipherFormat>,
}

impl FormatRegistry {
    /// Registry holding only the passthrough format.
    pub fn new() -> Self {
        Self {
            formats: vec![CipherFormat::new(
                BASE_64,
                BASE_64_TAG,
                CipherSuite::Passthrough,
            )],
        }
    }

    /// Registry holding the built-in catalog, with key material from `provider`.
    ///
    /// A format whose material cannot be resolved is kept but degraded.
    pub fn builtin(provider: &dyn SecretProvider) -> Self {
        let mut registry = Self::new();
        // Built-in names and tags are distinct and valid.
        if let Err(e) = registry.register(
            AES_V1,
            AES_V1_TAG,
            Some(Algorithm::AesCbcPkcs7),
            AES_V1_KEY_BITS,
            provider,
        ) {
            error!(error = %e, "failed to register built-in cipher format");
        }
        registry
    }

    /// Build a format and add it to the catalog.
    ///
    /// Key and IV are requested from `provider` with `name` as the alias. A
    /// provider failure is logged and leaves the format degraded; it is not an
    /// error here.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] if the tag is invalid or the tag or name is taken.
    pub fn register(
        &mut self,
        name: &str,
        tag: &str,
        algorithm: Option<Algorithm>,
        key_size_bits: usize,
        provider: &dyn SecretProvider,
    ) -> Result<&CipherFormat, RegistryError> {
        if tag.is_empty() || tag.contains(SEPARATOR) {
            return Err(RegistryError::InvalidTag(tag.to_owned()));
        }
        if self.lookup_by_tag(tag).is_some() {
            return Err(RegistryError::DuplicateTag(tag.to_owned()));
        }
        if self.get(name).is_some() {
            return Err(RegistryError::DuplicateName(name.to_owned()));
        }

        let suite = match algorithm {
            None => CipherSuite::Passthrough,
            Some(Algorithm::AesCbcPkcs7) => {
                let key = match provider.key(name, key_size_bits) {
                    Ok(key) => Some(key),
                    Err(e) => {
                        error!(format = name, error = %e, "could not initialise key for cipher format");
                        None
                    }
                };
                let iv = match provider.iv(name) {
                    Ok(iv) => Some(iv),
                    Err(e) => {
                        error!(format = name, error = %e, "could not initialise iv for cipher format");
                        None
                    }
                };
                CipherSuite::AesCbc {
                    key_size_bits,
                    key,
                    iv,
                }
            }
        };

        let format = CipherFormat::new(name, tag, suite);
        info!(
            format = name,
            tag,
            degraded = format.is_degraded(),
            "cipher format registered"
        );
        let slot = self.formats.len();
        self.formats.push(format);
        Ok(&self.formats[slot])
    }

    /// Resolve a storage tag.
    pub fn lookup_by_tag(&self, tag: &str) -> Option<&CipherFormat> {
        self.formats.iter().find(|f| f.tag() == tag)
    }

    /// Resolve a symbolic name.
    pub fn get(&self, name: &str) -> Option<&CipherFormat> {
        self.formats.iter().find(|f| f.name() == name)
    }

    /// The format used when nothing else is chosen: always `BASE_64`.
    ///
    /// Encoding under the default format does not encrypt; callers wanting
    /// encryption select `AES1` explicitly or through a policy.
    pub fn default_format(&self) -> &CipherFormat {
        // `new()` seeds BASE_64 at index 0 and nothing removes formats.
        &self.formats[0]
    }

    /// Length of the longest registered tag.
    pub fn max_tag_len(&self) -> usize {
        self.formats.iter().map(|f| f.tag().len()).max().unwrap_or(0)
    }

    /// All formats in registration order.
    pub fn formats(&self) -> impl Iterator<Item = &CipherFormat> {
        self.formats.iter()
    }

    pub fn degraded_count(&self) -> usize {
        self.formats.iter().filter(|f| f.is_degraded()).count()
    }
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::new()
    }
}

static GLOBAL: OnceLock<Arc<FormatRegistry>> = OnceLock::new();

/// Install the process-wide registry. Must run before the first [`global`] call.
///
/// # Errors
///
/// Returns [`RegistryError::AlreadyInstalled`] if a registry is already in place,
/// including one lazily created by [`global`].
pub fn install(registry: FormatRegistry) -> Result<Arc<FormatRegistry>, RegistryError> {
    let registry = Arc::new(registry);
    GLOBAL
        .set(Arc::clone(&registry))
        .map_err(|_| RegistryError::AlreadyInstalled)?;
    Ok(registry)
}

/// The process-wide registry.
///
/// Falls back to the built-in catalog keyed by [`EphemeralSecretProvider`] when
/// nothing was installed.
pub fn global() -> Arc<FormatRegistry> {
    Arc::clone(GLOBAL.get_or_init(|| Arc::new(FormatRegistry::builtin(&EphemeralSecretProvider))))
}
