//! Format-tagged encryption of individual application attributes.
//!
//! Values are stored as `<tag>:<base64(payload)>`. The tag names the
//! [`CipherFormat`] that produced the payload, so values written under an older
//! format stay readable after the default changes.
//!
//! # Pipeline
//!
//! ```text
//! encode: value -> AttributeCodec::to_bytes -> crypto::encrypt -> base64 -> "<tag>:<b64>"
//! decode: "<tag>:<b64>" -> registry lookup -> base64 -> crypto::decrypt -> AttributeCodec::from_bytes
//! ```
//!
//! # Security invariants
//!
//! - Plaintext values and key material never appear in log fields or error messages.
//! - Formats are resolved once at startup and never mutated afterwards.

pub mod codec;
pub mod converter;
pub mod crypto;
pub mod format;
pub mod secret;

pub use codec::{AttributeCodec, CodecError, Json};
pub use converter::{ConvertError, Converter, DefaultFormatPolicy, FixedFormatPolicy, FormatPolicy};
pub use crypto::CipherError;
pub use format::{
    registry, Algorithm, CipherFormat, CipherSuite, FormatRegistry, RegistryError, SEPARATOR,
};
pub use secret::{EphemeralSecretProvider, Iv, SecretError, SecretKey, SecretProvider, StaticSecretProvider};
