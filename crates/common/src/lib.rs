//! Common types, protocol definitions, and errors shared across `attr-crypt` crates.

pub mod error;
pub mod protocol;

pub use error::ServiceError;
