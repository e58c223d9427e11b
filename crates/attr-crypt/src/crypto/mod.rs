//! Cipher primitives applied by a [`CipherFormat`](crate::CipherFormat).
//!
//! This module is free of encoding and storage concerns: bytes in, bytes out.
//! Base64 framing and tagging live in the [`converter`](crate::converter).

pub mod cipher;

pub use cipher::{decrypt, encrypt, CipherError, TAG_LEN};
