//! Key and IV material for cipher formats.
//!
//! A [`SecretProvider`] is asked for material exactly once per format, while the
//! [`FormatRegistry`](crate::FormatRegistry) is being built. Providers are keyed by
//! the format's symbolic name (`AES_V1`, ...), never by its storage tag.
//!
//! # Security invariants
//!
//! - [`SecretKey`] bytes are zeroed on drop and redacted from `Debug` output.
//! - [`EphemeralSecretProvider`] keys live only as long as the process. Values
//!   encrypted with them cannot be read after a restart.

pub mod provider;

pub use provider::{EphemeralSecretProvider, StaticSecretProvider};

use thiserror::Error;

/// Byte length of the IV used by the CBC block mode (one AES block).
pub const IV_LEN: usize = 16;

/// Errors produced while resolving key material.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SecretError {
    /// No key could be produced for the alias.
    #[error("key unavailable for alias {alias}: {reason}")]
    KeyUnavailable { alias: String, reason: String },

    /// No IV could be produced for the alias.
    #[error("iv unavailable for alias {alias}: {reason}")]
    IvUnavailable { alias: String, reason: String },
}

impl SecretError {
    pub(crate) fn key(alias: &str, reason: impl Into<String>) -> Self {
        SecretError::KeyUnavailable {
            alias: alias.to_owned(),
            reason: reason.into(),
        }
    }

    pub(crate) fn iv(alias: &str, reason: impl Into<String>) -> Self {
        SecretError::IvUnavailable {
            alias: alias.to_owned(),
            reason: reason.into(),
        }
    }
}

/// Symmetric key bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretKey(Box<[u8]>);

impl SecretKey {
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into().into_boxed_slice())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Key length in bits.
    pub fn len_bits(&self) -> usize {
        self.0.len() * 8
    }
}

impl Drop for SecretKey {
    fn drop(&mut self) {
        self.0.iter_mut().for_each(|b| *b = 0);
    }
}

impl std::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretKey([REDACTED])")
    }
}

/// Initialization vector for block modes that need one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Iv(Box<[u8]>);

impl Iv {
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into().into_boxed_slice())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Supplies keys and IVs by alias.
///
/// Implementations back onto whatever holds the material: process memory,
/// a keystore, an external KMS. Failures are reported per alias and never abort
/// construction of unrelated formats.
#[cfg_attr(test, mockall::automock)]
pub trait SecretProvider: Send + Sync {
    /// Produce a key of `key_len_bits` for `alias`.
    ///
    /// # Errors
    ///
    /// Returns [`SecretError::KeyUnavailable`] if no key of that length exists
    /// or can be generated.
    fn key(&self, alias: &str, key_len_bits: usize) -> Result<SecretKey, SecretError>;

    /// Produce the IV for `alias`.
    ///
    /// # Errors
    ///
    /// Returns [`SecretError::IvUnavailable`] if no IV can be produced.
    fn iv(&self, alias: &str) -> Result<Iv, SecretError>;
}
