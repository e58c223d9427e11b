//! Per-type serialization of attribute values to and from plaintext bytes.
//!
//! A type becomes storable by implementing [`AttributeCodec`]. The converter is
//! generic over it, so adding a type never touches the cipher pipeline.

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

/// Errors produced while converting a value to or from plaintext bytes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// The value could not be serialized. Never raised for text or bytes.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The decrypted bytes do not form a value of the type.
    #[error("deserialization failed: {0}")]
    Deserialization(String),
}

/// Bidirectional byte serialization for one attribute type.
pub trait AttributeCodec: Sized {
    /// Serialize the value.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Serialization`] if the value has no byte form.
    fn to_bytes(&self) -> Result<Vec<u8>, CodecError>;

    /// Rebuild a value from bytes produced by [`AttributeCodec::to_bytes`].
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Deserialization`] on malformed input.
    fn from_bytes(bytes: Vec<u8>) -> Result<Self, CodecError>;
}

/// Text, as UTF-8.
impl AttributeCodec for String {
    fn to_bytes(&self) -> Result<Vec<u8>, CodecError> {
        Ok(self.as_bytes().to_vec())
    }

    fn from_bytes(bytes: Vec<u8>) -> Result<Self, CodecError> {
        String::from_utf8(bytes).map_err(|e| CodecError::Deserialization(e.to_string()))
    }
}

/// Raw bytes, unchanged.
impl AttributeCodec for Vec<u8> {
    fn to_bytes(&self) -> Result<Vec<u8>, CodecError> {
        Ok(self.clone())
    }

    fn from_bytes(bytes: Vec<u8>) -> Result<Self, CodecError> {
        Ok(bytes)
    }
}

/// Any serde value, as JSON.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Json<T>(pub T);

impl<T: Serialize + DeserializeOwned> AttributeCodec for Json<T> {
    fn to_bytes(&self) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec(&self.0).map_err(|e| CodecError::Serialization(e.to_string()))
    }

    fn from_bytes(bytes: Vec<u8>) -> Result<Self, CodecError> {
        serde_json::from_slice(&bytes)
            .map(Json)
            .map_err(|e| CodecError::Deserialization(e.to_string()))
    }
}
