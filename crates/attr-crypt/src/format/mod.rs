//! Cipher formats and the registry that resolves them from storage tags.
//!
//! # Stored value format
//!
//! ```text
//! <tag>:<base64(payload)>
//! ```
//!
//! The tag identifies the [`CipherFormat`] that produced the payload. Tags are
//! unique within a registry and never contain [`SEPARATOR`].
//!
//! # Built-in catalog
//!
//! | name      | tag      | algorithm              | key bits | IV       |
//! |-----------|----------|------------------------|----------|----------|
//! | `BASE_64` | `BASE64` | passthrough            | 0        | none     |
//! | `AES_V1`  | `AES1`   | AES / CBC / PKCS#7     | 256      | 16 bytes |

pub mod registry;

pub use registry::{FormatRegistry, RegistryError};

use crate::secret::{Iv, SecretKey};

/// Delimiter between the format tag and the payload in a stored value.
pub const SEPARATOR: char = ':';

/// Symbolic name of the passthrough format.
pub const BASE_64: &str = "BASE_64";
/// Storage tag of the passthrough format.
pub const BASE_64_TAG: &str = "BASE64";

/// Symbolic name of the first AES format.
pub const AES_V1: &str = "AES_V1";
/// Storage tag of the first AES format.
pub const AES_V1_TAG: &str = "AES1";
/// Key size of the first AES format.
pub const AES_V1_KEY_BITS: usize = 256;

/// Symmetric cipher, mode and padding combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    /// AES in CBC mode with PKCS#7 padding, authenticated with HMAC-SHA256.
    AesCbcPkcs7,
}

impl Algorithm {
    /// Stable identifier, reported by `/formats`.
    pub fn id(&self) -> &'static str {
        match self {
            Algorithm::AesCbcPkcs7 => "AES/CBC/PKCS7Padding",
        }
    }
}

/// The cipher a format applies, with the material bound to it at startup.
#[derive(Debug, Clone)]
pub enum CipherSuite {
    /// No transform: the payload is the plaintext bytes.
    Passthrough,
    /// AES-CBC. `key` or `iv` is `None` when the provider could not supply it.
    AesCbc {
        key_size_bits: usize,
        key: Option<SecretKey>,
        iv: Option<Iv>,
    },
}

/// A named, immutable binding of algorithm, key and IV.
#[derive(Debug, Clone)]
pub struct CipherFormat {
    name: String,
    tag: String,
    suite: CipherSuite,
}

impl CipherFormat {
    pub(crate) fn new(name: impl Into<String>, tag: impl Into<String>, suite: CipherSuite) -> Self {
        Self {
            name: name.into(),
            tag: tag.into(),
            suite,
        }
    }

    /// Symbolic name, also the alias used with the secret provider.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Literal prefix written in front of stored values.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn suite(&self) -> &CipherSuite {
        &self.suite
    }

    /// `None` for passthrough.
    pub fn algorithm(&self) -> Option<Algorithm> {
        match self.suite {
            CipherSuite::Passthrough => None,
            CipherSuite::AesCbc { .. } => Some(Algorithm::AesCbcPkcs7),
        }
    }

    pub fn key_size_bits(&self) -> usize {
        match self.suite {
            CipherSuite::Passthrough => 0,
            CipherSuite::AesCbc { key_size_bits, .. } => key_size_bits,
        }
    }

    /// A degraded format is missing key material and cannot encrypt or decrypt.
    pub fn is_degraded(&self) -> bool {
        match &self.suite {
            CipherSuite::Passthrough => false,
            CipherSuite::AesCbc { key, iv, .. } => key.is_none() || iv.is_none(),
        }
    }
}
