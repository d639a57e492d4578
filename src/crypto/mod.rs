// src/crypto/mod.rs
//! Column value encryption — pure crypto, no I/O, no database
//!
//! Everything here works on in-memory strings. The row codec in
//! [`crate::store`] decides when a value passes through a cipher;
//! SQL NULL never does.

mod aes_hmac;

pub use aes_hmac::AesHmacCipher;

use crate::error::DecryptError;

/// Pluggable cipher for encrypted string columns.
pub trait PropertyCipher: Send + Sync {
    /// Encrypt a plaintext string into its stored form.
    ///
    /// A fresh IV is drawn per call, so encrypting the same plaintext
    /// twice yields different stored values.
    fn encrypt(&self, plaintext: &str) -> String;

    /// Recover the plaintext from a stored value.
    ///
    /// Fails closed: any malformed or tampered input surfaces a
    /// [`DecryptError`] and no partial plaintext escapes.
    fn decrypt(&self, stored: &str) -> Result<String, DecryptError>;

    /// Worst-case stored length for a plaintext of `plain_len` bytes.
    ///
    /// Non-decreasing in `plain_len` and a true upper bound on what
    /// [`encrypt`](Self::encrypt) can produce. Used to size database
    /// columns at registration time.
    fn max_encrypted_len(&self, plain_len: usize) -> usize;
}
