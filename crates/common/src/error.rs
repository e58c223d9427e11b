//! Service errors: converter failures as callers see them.

use attr_crypt::ConvertError;
use thiserror::Error;

use crate::protocol::ErrorResponse;

/// Message sent for every crypto failure. The cause would tell a caller
/// whether a forged payload got past the tag check.
pub const CRYPTO_FAILURE_MESSAGE: &str = "crypto operation failed";

/// A failed encode or decode, classified by who is at fault.
///
/// The `Display` text is the message returned to callers:
/// - [`ServiceError::BadRequest`] → 400
/// - [`ServiceError::EncryptionFailure`] → 500
/// - [`ServiceError::Unavailable`] → 503
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// Unknown format tag, bad payload, or a value the codec rejects.
    #[error("{0}")]
    BadRequest(String),

    /// The cipher rejected the input.
    #[error("{0}")]
    EncryptionFailure(String),

    /// The selected cipher format has no key material.
    #[error("{0}")]
    Unavailable(String),
}

impl ServiceError {
    /// Returns the HTTP status code that should be sent for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            ServiceError::BadRequest(_) => 400,
            ServiceError::EncryptionFailure(_) => 500,
            ServiceError::Unavailable(_) => 503,
        }
    }

    /// Short machine-readable code for [`ErrorResponse`].
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::BadRequest(_) => "bad_request",
            ServiceError::EncryptionFailure(_) => "encryption_failure",
            ServiceError::Unavailable(_) => "service_unavailable",
        }
    }

    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse::new(self.code(), self.to_string())
    }
}

impl From<&ConvertError> for ServiceError {
    fn from(err: &ConvertError) -> Self {
        match err {
            ConvertError::UnknownFormat(_)
            | ConvertError::MalformedPayload(_)
            | ConvertError::Codec(_) => ServiceError::BadRequest(err.to_string()),
            ConvertError::FormatDegraded(_) => ServiceError::Unavailable(err.to_string()),
            ConvertError::CryptoOperation(_) => {
                ServiceError::EncryptionFailure(CRYPTO_FAILURE_MESSAGE.into())
            }
        }
    }
}
