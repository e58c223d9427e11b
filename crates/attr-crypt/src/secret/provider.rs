//! Built-in [`SecretProvider`] implementations.

use std::collections::HashMap;

use rand::{rngs::OsRng, RngCore};

use super::{Iv, SecretError, SecretKey, SecretProvider, IV_LEN};
use crate::format::{AES_V1, BASE_64};

/// Largest key the ephemeral provider will generate.
const MAX_KEY_BITS: usize = 512;

/// Generates fresh random key material from the OS CSPRNG on every request.
///
/// Serves the built-in `AES_V1` format only. `BASE_64` needs no material, and
/// any other alias is refused so that a format added without a real key
/// source comes up degraded.
///
/// Each alias is asked exactly once per process by the registry, so a format
/// keeps one key for the lifetime of the process. After a restart the keys are
/// gone: only use this for stores that are recreated on startup.
#[derive(Debug, Default, Clone, Copy)]
pub struct EphemeralSecretProvider;

impl EphemeralSecretProvider {
    fn check_alias(alias: &str) -> Result<(), &'static str> {
        match alias {
            AES_V1 => Ok(()),
            BASE_64 => Err("passthrough format has no key material"),
            _ => Err("unsupported alias"),
        }
    }
}

impl SecretProvider for EphemeralSecretProvider {
    fn key(&self, alias: &str, key_len_bits: usize) -> Result<SecretKey, SecretError> {
        Self::check_alias(alias).map_err(|reason| SecretError::key(alias, reason))?;
        if key_len_bits == 0 || key_len_bits % 8 != 0 || key_len_bits > MAX_KEY_BITS {
            return Err(SecretError::key(
                alias,
                format!("unsupported key length {key_len_bits} bits"),
            ));
        }
        let mut buf = vec![0u8; key_len_bits / 8];
        OsRng
            .try_fill_bytes(&mut buf)
            .map_err(|e| SecretError::key(alias, format!("os rng failure: {e}")))?;
        Ok(SecretKey::from_bytes(buf))
    }

    fn iv(&self, alias: &str) -> Result<Iv, SecretError> {
        Self::check_alias(alias).map_err(|reason| SecretError::iv(alias, reason))?;
        let mut buf = [0u8; IV_LEN];
        OsRng
            .try_fill_bytes(&mut buf)
            .map_err(|e| SecretError::iv(alias, format!("os rng failure: {e}")))?;
        Ok(Iv::from_bytes(buf.to_vec()))
    }
}

/// Serves key material handed to it up front, keyed by alias.
///
/// This is the seam for material that outlives the process: load it from a
/// keystore at startup and seed the provider with it.
#[derive(Debug, Default, Clone)]
pub struct StaticSecretProvider {
    keys: HashMap<String, SecretKey>,
    ivs: HashMap<String, Iv>,
}

impl StaticSecretProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the key for `alias`, replacing any previous one.
    pub fn with_key(mut self, alias: impl Into<String>, key: SecretKey) -> Self {
        self.keys.insert(alias.into(), key);
        self
    }

    /// Register the IV for `alias`, replacing any previous one.
    pub fn with_iv(mut self, alias: impl Into<String>, iv: Iv) -> Self {
        self.ivs.insert(alias.into(), iv);
        self
    }
}

impl SecretProvider for StaticSecretProvider {
    fn key(&self, alias: &str, key_len_bits: usize) -> Result<SecretKey, SecretError> {
        let key = self
            .keys
            .get(alias)
            .ok_or_else(|| SecretError::key(alias, "no key registered"))?;
        if key.len_bits() != key_len_bits {
            return Err(SecretError::key(
                alias,
                format!("expected {key_len_bits} bits, got {}", key.len_bits()),
            ));
        }
        Ok(key.clone())
    }

    fn iv(&self, alias: &str) -> Result<Iv, SecretError> {
        self.ivs
            .get(alias)
            .cloned()
            .ok_or_else(|| SecretError::iv(alias, "no iv registered"))
    }
}
