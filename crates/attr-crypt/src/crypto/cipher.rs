//! Stateless encrypt/decrypt of attribute bytes under a [`CipherFormat`].
//!
//! **Passthrough** formats return the input unchanged.
//!
//! **AES-CBC** formats produce `ciphertext || tag`, where `ciphertext` is
//! AES-CBC with PKCS#7 padding under the format's key and IV, and `tag` is
//! HMAC-SHA256 over `iv || ciphertext`. The tag is checked before unpadding, so
//! any modified byte fails with [`CipherError::AuthenticationFailed`] instead of
//! yielding corrupted plaintext.
//!
//! The IV is fixed per format, so equal plaintexts give equal ciphertexts.
//! That keeps exact-match lookups on encrypted columns possible.

use aes::{Aes128, Aes192, Aes256};
use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

use crate::format::{CipherFormat, CipherSuite};
use crate::secret::{Iv, SecretKey, IV_LEN};

type HmacSha256 = Hmac<Sha256>;

/// Byte length of the HMAC-SHA256 tag appended to AES-CBC ciphertext.
pub const TAG_LEN: usize = 32;

/// Label mixed into the cipher key to derive the MAC key.
const MAC_KEY_LABEL: &[u8] = b"attr-crypt/mac/v1";

/// Errors produced by the cipher layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CipherError {
    /// The format has no key bound to it.
    #[error("no key bound to cipher format")]
    MissingKey,

    /// The format has no IV bound to it.
    #[error("no iv bound to cipher format")]
    MissingIv,

    /// The key length does not select an AES variant.
    #[error("unsupported key length: {0} bits")]
    UnsupportedKeyLength(usize),

    /// The IV is not one block long.
    #[error("invalid iv length: expected {IV_LEN} bytes, got {0}")]
    InvalidIvLength(usize),

    /// The input is shorter than the authentication tag.
    #[error("ciphertext truncated")]
    Truncated,

    /// The tag does not match: tampered data, or the wrong key.
    #[error("authentication failed")]
    AuthenticationFailed,

    /// Padding or block-size violation after a successful tag check.
    #[error("invalid padding or block size")]
    InvalidPadding,
}

/// Encrypt `plaintext` under `format`.
///
/// Every call builds its own cipher context.
///
/// # Errors
///
/// Returns [`CipherError`] if the format has no usable key or IV.
pub fn encrypt(plaintext: &[u8], format: &CipherFormat) -> Result<Vec<u8>, CipherError> {
    match format.suite() {
        CipherSuite::Passthrough => Ok(plaintext.to_vec()),
        CipherSuite::AesCbc { key, iv, .. } => {
            let (key, iv) = material(key.as_ref(), iv.as_ref())?;
            let mut out = cbc_encrypt(key.as_bytes(), iv.as_bytes(), plaintext)?;
            let tag = authenticator(key, iv, &out)?.finalize().into_bytes();
            out.extend_from_slice(&tag);
            Ok(out)
        }
    }
}

/// Decrypt `ciphertext` under `format`.
///
/// # Errors
///
/// Returns [`CipherError::Truncated`] or [`CipherError::AuthenticationFailed`]
/// for tampered or mismatched input, and [`CipherError::InvalidPadding`] if the
/// authenticated plaintext does not unpad.
pub fn decrypt(ciphertext: &[u8], format: &CipherFormat) -> Result<Vec<u8>, CipherError> {
    match format.suite() {
        CipherSuite::Passthrough => Ok(ciphertext.to_vec()),
        CipherSuite::AesCbc { key, iv, .. } => {
            let (key, iv) = material(key.as_ref(), iv.as_ref())?;
            if ciphertext.len() < TAG_LEN {
                return Err(CipherError::Truncated);
            }
            let (body, tag) = ciphertext.split_at(ciphertext.len() - TAG_LEN);
            authenticator(key, iv, body)?
                .verify_slice(tag)
                .map_err(|_| CipherError::AuthenticationFailed)?;
            cbc_decrypt(key.as_bytes(), iv.as_bytes(), body)
        }
    }
}

fn material<'a>(
    key: Option<&'a SecretKey>,
    iv: Option<&'a Iv>,
) -> Result<(&'a SecretKey, &'a Iv), CipherError> {
    let key = key.ok_or(CipherError::MissingKey)?;
    let iv = iv.ok_or(CipherError::MissingIv)?;
    Ok((key, iv))
}

fn cbc_encrypt(key: &[u8], iv: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, CipherError> {
    check_iv(iv)?;
    let invalid_iv = |_| CipherError::InvalidIvLength(iv.len());
    let out = match key.len() {
        16 => cbc::Encryptor::<Aes128>::new_from_slices(key, iv)
            .map_err(invalid_iv)?
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext),
        24 => cbc::Encryptor::<Aes192>::new_from_slices(key, iv)
            .map_err(invalid_iv)?
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext),
        32 => cbc::Encryptor::<Aes256>::new_from_slices(key, iv)
            .map_err(invalid_iv)?
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext),
        n => return Err(CipherError::UnsupportedKeyLength(n * 8)),
    };
    Ok(out)
}

fn cbc_decrypt(key: &[u8], iv: &[u8], body: &[u8]) -> Result<Vec<u8>, CipherError> {
    check_iv(iv)?;
    let invalid_iv = |_| CipherError::InvalidIvLength(iv.len());
    let out = match key.len() {
        16 => cbc::Decryptor::<Aes128>::new_from_slices(key, iv)
            .map_err(invalid_iv)?
            .decrypt_padded_vec_mut::<Pkcs7>(body),
        24 => cbc::Decryptor::<Aes192>::new_from_slices(key, iv)
            .map_err(invalid_iv)?
            .decrypt_padded_vec_mut::<Pkcs7>(body),
        32 => cbc::Decryptor::<Aes256>::new_from_slices(key, iv)
            .map_err(invalid_iv)?
            .decrypt_padded_vec_mut::<Pkcs7>(body),
        n => return Err(CipherError::UnsupportedKeyLength(n * 8)),
    };
    out.map_err(|_| CipherError::InvalidPadding)
}

fn check_iv(iv: &[u8]) -> Result<(), CipherError> {
    if iv.len() != IV_LEN {
        return Err(CipherError::InvalidIvLength(iv.len()));
    }
    Ok(())
}

/// HMAC over `iv || body`, keyed by a key derived from the cipher key.
fn authenticator(key: &SecretKey, iv: &Iv, body: &[u8]) -> Result<HmacSha256, CipherError> {
    let unsupported = |_| CipherError::UnsupportedKeyLength(key.len_bits());

    let mut derive = HmacSha256::new_from_slice(key.as_bytes()).map_err(unsupported)?;
    derive.update(MAC_KEY_LABEL);
    let mac_key = derive.finalize().into_bytes();

    let mut mac = HmacSha256::new_from_slice(&mac_key).map_err(unsupported)?;
    mac.update(iv.as_bytes());
    mac.update(body);
    Ok(mac)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{AES_V1, AES_V1_KEY_BITS, AES_V1_TAG, BASE_64, BASE_64_TAG};

    fn aes_format(key_len: usize) -> CipherFormat {
        CipherFormat::new(
            AES_V1,
            AES_V1_TAG,
            CipherSuite::AesCbc {
                key_size_bits: key_len * 8,
                key: Some(SecretKey::from_bytes(vec![0x42; key_len])),
                iv: Some(Iv::from_bytes(vec![0x24; IV_LEN])),
            },
        )
    }

    fn passthrough() -> CipherFormat {
        CipherFormat::new(BASE_64, BASE_64_TAG, CipherSuite::Passthrough)
    }

    #[test]
    fn passthrough_is_identity() {
        let f = passthrough();
        assert_eq!(encrypt(b"hello", &f).unwrap(), b"hello");
        assert_eq!(decrypt(b"hello", &f).unwrap(), b"hello");
    }

    #[test]
    fn encrypt_decrypt_round_trip_all_key_sizes() {
        for key_len in [16, 24, 32] {
            let f = aes_format(key_len);
            let ct = encrypt(b"123-45-6789", &f).unwrap();
            assert_ne!(&ct[..], b"123-45-6789");
            assert_eq!(decrypt(&ct, &f).unwrap(), b"123-45-6789");
        }
    }

    #[test]
    fn empty_plaintext_round_trip() {
        let f = aes_format(32);
        let ct = encrypt(b"", &f).unwrap();
        // One block of padding plus the tag.
        assert_eq!(ct.len(), 16 + TAG_LEN);
        assert!(decrypt(&ct, &f).unwrap().is_empty());
    }

    #[test]
    fn fixed_iv_is_deterministic() {
        let f = aes_format(32);
        assert_eq!(encrypt(b"same", &f).unwrap(), encrypt(b"same", &f).unwrap());
    }

    #[test]
    fn tampered_byte_anywhere_fails_auth() {
        let f = aes_format(32);
        let ct = encrypt(b"a value spanning more than one block", &f).unwrap();
        for i in 0..ct.len() {
            let mut tampered = ct.clone();
            tampered[i] ^= 0x01;
            assert_eq!(
                decrypt(&tampered, &f).unwrap_err(),
                CipherError::AuthenticationFailed,
                "byte {i}"
            );
        }
    }

    #[test]
    fn truncated_input_rejected() {
        let f = aes_format(32);
        assert_eq!(decrypt(&[0u8; 10], &f).unwrap_err(), CipherError::Truncated);
    }

    #[test]
    fn wrong_key_fails_decryption() {
        let ct = encrypt(b"secret", &aes_format(32)).unwrap();
        let other = CipherFormat::new(
            AES_V1,
            AES_V1_TAG,
            CipherSuite::AesCbc {
                key_size_bits: AES_V1_KEY_BITS,
                key: Some(SecretKey::from_bytes(vec![0x43; 32])),
                iv: Some(Iv::from_bytes(vec![0x24; IV_LEN])),
            },
        );
        assert!(decrypt(&ct, &other).is_err());
    }

    #[test]
    fn missing_material_rejected() {
        let f = CipherFormat::new(
            AES_V1,
            AES_V1_TAG,
            CipherSuite::AesCbc {
                key_size_bits: AES_V1_KEY_BITS,
                key: None,
                iv: Some(Iv::from_bytes(vec![0u8; IV_LEN])),
            },
        );
        assert_eq!(encrypt(b"x", &f).unwrap_err(), CipherError::MissingKey);
    }

    #[test]
    fn invalid_key_length_rejected() {
        let f = aes_format(20);
        assert_eq!(encrypt(b"x", &f).unwrap_err(), CipherError::UnsupportedKeyLength(160));
    }

    #[test]
    fn invalid_iv_length_rejected() {
        let f = CipherFormat::new(
            AES_V1,
            AES_V1_TAG,
            CipherSuite::AesCbc {
                key_size_bits: AES_V1_KEY_BITS,
                key: Some(SecretKey::from_bytes(vec![0u8; 32])),
                iv: Some(Iv::from_bytes(vec![0u8; 12])),
            },
        );
        assert_eq!(encrypt(b"x", &f).unwrap_err(), CipherError::InvalidIvLength(12));
    }
}
