//! Storage converter: typed value <-> tagged, encrypted string.
//!
//! This is the only surface a persistence layer needs. Call
//! [`Converter::encode_for_storage`] before writing a column and
//! [`Converter::decode_from_storage`] after reading one. `None` passes through
//! both untouched.

use std::marker::PhantomData;
use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use thiserror::Error;
use tracing::debug;

use crate::codec::{AttributeCodec, CodecError};
use crate::crypto::{self, CipherError};
use crate::format::{registry, CipherFormat, FormatRegistry, SEPARATOR};

/// Stands in for a stored tag that is not echoed back.
const UNTAGGED: &str = "<untagged value>";

/// Errors produced by a single encode or decode call.
///
/// No variant is retried: a failure aborts the call with no partial result.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConvertError {
    /// The stored tag names no registered format.
    #[error("unknown attribute encryption format: {0}")]
    UnknownFormat(String),

    /// The format is registered but its key material failed to load.
    #[error("cipher format {0} is degraded: key material unavailable")]
    FormatDegraded(String),

    /// The payload is not valid base64.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// The cipher rejected the input.
    #[error("crypto operation failed: {0}")]
    CryptoOperation(#[from] CipherError),

    /// The value could not be serialized or rebuilt.
    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Decides which format a value is encoded under.
///
/// This is where key rotation attaches: a policy can move new writes to a new
/// format while old values keep decoding under the tag they carry.
pub trait FormatPolicy<T>: Send + Sync {
    /// # Errors
    ///
    /// Returns [`ConvertError::UnknownFormat`] if the chosen format is not registered.
    fn choose_format_for_encode<'r>(
        &self,
        value: &T,
        registry: &'r FormatRegistry,
    ) -> Result<&'r CipherFormat, ConvertError>;
}

/// Always the registry's default format, `BASE_64`.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultFormatPolicy;

impl<T> FormatPolicy<T> for DefaultFormatPolicy {
    fn choose_format_for_encode<'r>(
        &self,
        _value: &T,
        registry: &'r FormatRegistry,
    ) -> Result<&'r CipherFormat, ConvertError> {
        Ok(registry.default_format())
    }
}

/// Always the format with the given tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedFormatPolicy {
    tag: String,
}

impl FixedFormatPolicy {
    pub fn new(tag: impl Into<String>) -> Self {
        Self { tag: tag.into() }
    }
}

impl<T> FormatPolicy<T> for FixedFormatPolicy {
    fn choose_format_for_encode<'r>(
        &self,
        _value: &T,
        registry: &'r FormatRegistry,
    ) -> Result<&'r CipherFormat, ConvertError> {
        registry
            .lookup_by_tag(&self.tag)
            .ok_or_else(|| ConvertError::UnknownFormat(self.tag.clone()))
    }
}

/// Converts values of type `T` to and from their stored form.
///
/// Holds no mutable state; clone it freely and share it across threads.
pub struct Converter<T, P = DefaultFormatPolicy> {
    registry: Arc<FormatRegistry>,
    policy: P,
    _value: PhantomData<fn() -> T>,
}

impl<T: AttributeCodec> Converter<T> {
    /// Converter with the default policy.
    pub fn new(registry: Arc<FormatRegistry>) -> Self {
        Self::with_policy(registry, DefaultFormatPolicy)
    }

    /// Converter over the process-wide registry.
    pub fn global() -> Self {
        Self::new(registry::global())
    }
}

impl<T: AttributeCodec, P: FormatPolicy<T>> Converter<T, P> {
    pub fn with_policy(registry: Arc<FormatRegistry>, policy: P) -> Self {
        Self {
            registry,
            policy,
            _value: PhantomData,
        }
    }

    pub fn registry(&self) -> &FormatRegistry {
        &self.registry
    }

    /// Encode a value for storage under the format the policy picks.
    ///
    /// # Errors
    ///
    /// Returns [`ConvertError`] if the chosen format is unknown or degraded, or
    /// if serialization or encryption fails.
    pub fn encode_for_storage(&self, value: Option<&T>) -> Result<Option<String>, ConvertError> {
        let Some(value) = value else {
            return Ok(None);
        };
        let format = self.policy.choose_format_for_encode(value, &self.registry)?;
        encode(value, format).map(Some)
    }

    /// Encode a value under the format registered for `tag`, bypassing the policy.
    ///
    /// # Errors
    ///
    /// As [`Converter::encode_for_storage`].
    pub fn encode_with(&self, value: &T, tag: &str) -> Result<String, ConvertError> {
        let format = self
            .registry
            .lookup_by_tag(tag)
            .ok_or_else(|| ConvertError::UnknownFormat(tag.to_owned()))?;
        encode(value, format)
    }

    /// Decode a stored value under the format named by its tag.
    ///
    /// A string without a separator is read as a bare tag with an empty payload.
    ///
    /// # Errors
    ///
    /// Returns [`ConvertError::UnknownFormat`] for an unregistered tag, and the
    /// matching [`ConvertError`] variant for degraded formats, bad base64, failed
    /// decryption or failed deserialization.
    pub fn decode_from_storage(&self, stored: Option<&str>) -> Result<Option<T>, ConvertError> {
        let Some(stored) = stored else {
            return Ok(None);
        };
        let (tag, payload) = stored.split_once(SEPARATOR).unwrap_or((stored, ""));
        let format = self
            .registry
            .lookup_by_tag(tag)
            .ok_or_else(|| self.unknown_stored_tag(tag))?;
        ensure_usable(format)?;

        let ciphertext = STANDARD
            .decode(payload)
            .map_err(|e| ConvertError::MalformedPayload(e.to_string()))?;
        let plaintext = crypto::decrypt(&ciphertext, format)?;
        debug!(format = format.name(), "decrypted attribute");
        T::from_bytes(plaintext).map(Some).map_err(ConvertError::from)
    }

    /// A stored tag longer than every registered tag is most likely an untagged
    /// plaintext value, so it is left out of the error.
    fn unknown_stored_tag(&self, tag: &str) -> ConvertError {
        if tag.len() > self.registry.max_tag_len() {
            ConvertError::UnknownFormat(UNTAGGED.to_owned())
        } else {
            ConvertError::UnknownFormat(tag.to_owned())
        }
    }

    /// Decode a stored value and encode it again under the current policy.
    ///
    /// Used to migrate values off an old format.
    ///
    /// # Errors
    ///
    /// Any error from decoding or encoding.
    pub fn reencode(&self, stored: Option<&str>) -> Result<Option<String>, ConvertError> {
        let value = self.decode_from_storage(stored)?;
        self.encode_for_storage(value.as_ref())
    }
}

impl<T, P: Clone> Clone for Converter<T, P> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            policy: self.policy.clone(),
            _value: PhantomData,
        }
    }
}

impl<T, P: std::fmt::Debug> std::fmt::Debug for Converter<T, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Converter")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

fn encode<T: AttributeCodec>(value: &T, format: &CipherFormat) -> Result<String, ConvertError> {
    ensure_usable(format)?;
    let plaintext = value.to_bytes()?;
    let ciphertext = crypto::encrypt(&plaintext, format)?;
    debug!(format = format.name(), "encrypted attribute");
    Ok(format!(
        "{}{}{}",
        format.tag(),
        SEPARATOR,
        STANDARD.encode(ciphertext)
    ))
}

fn ensure_usable(format: &CipherFormat) -> Result<(), ConvertError> {
    if format.is_degraded() {
        return Err(ConvertError::FormatDegraded(format.name().to_owned()));
    }
    Ok(())
}
