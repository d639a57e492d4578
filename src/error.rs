// src/error.rs
//! Public error types for the entire crate

use thiserror::Error;

/// Failure to turn a stored value back into plaintext.
///
/// Every variant means the same thing to callers: the stored value cannot
/// be trusted. The variants only exist so logs can say which check failed.
#[derive(Error, Debug)]
pub enum DecryptError {
    #[error("stored value is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("stored value is too short to hold an IV and authentication tag")]
    TooShort,

    #[error("authentication tag mismatch, value is corrupt or was encrypted under a different key")]
    TagMismatch,

    #[error("decrypted payload has invalid padding")]
    Padding,

    #[error("decrypted payload is not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("decryption failed: {0}")]
    Decrypt(#[from] DecryptError),

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("database error: {0}")]
    Sql(#[from] rusqlite::Error),

    #[error("invalid argument: {0}")]
    Validation(String),

    #[error("migration failed: {0}")]
    Migration(String),

    #[error("config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
