// src/crypto/aes_hmac.rs
//! Default cipher: AES-CBC + HMAC-SHA256, encrypt-then-MAC
//!
//! Stored layout (before base64):
//!
//! ```text
//! [ IV (16) | AES-CBC-PKCS7( 0x0A | plaintext utf-8 ) | HMAC-SHA256 tag (32) ]
//! ```
//!
//! The tag covers IV and ciphertext and is verified, in constant time,
//! before any decryption work happens.

use aes::cipher::block_padding::Pkcs7;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use rand::Rng;
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::consts::{AES_BLOCK_LEN, HMAC_TAG_LEN, PLAINTEXT_PREFIX};
use crate::crypto::PropertyCipher;
use crate::error::{DecryptError, Error};

type HmacSha256 = Hmac<Sha256>;

/// AES key width, picked by the byte length handed to [`AesHmacCipher::new`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum AesWidth {
    Aes128,
    Aes192,
    Aes256,
}

impl AesWidth {
    fn for_key_len(len: usize) -> Option<Self> {
        match len {
            16 => Some(Self::Aes128),
            24 => Some(Self::Aes192),
            32 => Some(Self::Aes256),
            _ => None,
        }
    }
}

fn cbc_encrypt<C>(key: &[u8], iv: &[u8], payload: &[u8]) -> Vec<u8>
where
    C: KeyIvInit + BlockEncryptMut,
{
    // Key length is validated in `new`, IV length is fixed by AES_BLOCK_LEN
    C::new_from_slices(key, iv)
        .expect("key and IV lengths checked at construction")
        .encrypt_padded_vec_mut::<Pkcs7>(payload)
}

fn cbc_decrypt<C>(key: &[u8], iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, DecryptError>
where
    C: KeyIvInit + BlockDecryptMut,
{
    C::new_from_slices(key, iv)
        .expect("key and IV lengths checked at construction")
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| DecryptError::Padding)
}

/// Default [`PropertyCipher`] over two caller-supplied keys.
///
/// The encryption key selects AES-128/192/256 by its length; the HMAC key
/// may be any non-empty length. Both are wiped from memory on drop.
pub struct AesHmacCipher {
    crypt_key: Zeroizing<Vec<u8>>,
    auth_key: Zeroizing<Vec<u8>>,
    width: AesWidth,
}

impl AesHmacCipher {
    pub fn new(crypt_key: &[u8], auth_key: &[u8]) -> Result<Self, Error> {
        let width = AesWidth::for_key_len(crypt_key.len()).ok_or_else(|| {
            Error::InvalidKey(format!(
                "AES key must be 16, 24 or 32 bytes, got {}",
                crypt_key.len()
            ))
        })?;
        if auth_key.is_empty() {
            return Err(Error::InvalidKey("HMAC key must not be empty".into()));
        }
        Ok(Self {
            crypt_key: Zeroizing::new(crypt_key.to_vec()),
            auth_key: Zeroizing::new(auth_key.to_vec()),
            width,
        })
    }

    fn encrypt_payload(&self, iv: &[u8], payload: &[u8]) -> Vec<u8> {
        match self.width {
            AesWidth::Aes128 => {
                cbc_encrypt::<cbc::Encryptor<aes::Aes128>>(&self.crypt_key, iv, payload)
            }
            AesWidth::Aes192 => {
                cbc_encrypt::<cbc::Encryptor<aes::Aes192>>(&self.crypt_key, iv, payload)
            }
            AesWidth::Aes256 => {
                cbc_encrypt::<cbc::Encryptor<aes::Aes256>>(&self.crypt_key, iv, payload)
            }
        }
    }

    fn decrypt_payload(&self, iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, DecryptError> {
        match self.width {
            AesWidth::Aes128 => {
                cbc_decrypt::<cbc::Decryptor<aes::Aes128>>(&self.crypt_key, iv, ciphertext)
            }
            AesWidth::Aes192 => {
                cbc_decrypt::<cbc::Decryptor<aes::Aes192>>(&self.crypt_key, iv, ciphertext)
            }
            AesWidth::Aes256 => {
                cbc_decrypt::<cbc::Decryptor<aes::Aes256>>(&self.crypt_key, iv, ciphertext)
            }
        }
    }

    fn mac(&self) -> HmacSha256 {
        // HMAC accepts keys of any length
        HmacSha256::new_from_slice(&self.auth_key).expect("HMAC key length")
    }
}

impl PropertyCipher for AesHmacCipher {
    fn encrypt(&self, plaintext: &str) -> String {
        let mut payload = Vec::with_capacity(plaintext.len() + 1);
        payload.push(PLAINTEXT_PREFIX);
        payload.extend_from_slice(plaintext.as_bytes());

        let mut iv = [0u8; AES_BLOCK_LEN];
        rand::rng().fill(&mut iv[..]);

        let ciphertext = self.encrypt_payload(&iv, &payload);

        let mut envelope = Vec::with_capacity(AES_BLOCK_LEN + ciphertext.len() + HMAC_TAG_LEN);
        envelope.extend_from_slice(&iv);
        envelope.extend_from_slice(&ciphertext);
        let mut mac = self.mac();
        mac.update(&envelope);
        envelope.extend_from_slice(&mac.finalize().into_bytes());

        BASE64.encode(envelope)
    }

    fn decrypt(&self, stored: &str) -> Result<String, DecryptError> {
        let envelope = BASE64.decode(stored)?;
        if envelope.len() < AES_BLOCK_LEN + HMAC_TAG_LEN {
            return Err(DecryptError::TooShort);
        }

        // Verify the tag before touching the ciphertext
        let (signed, tag) = envelope.split_at(envelope.len() - HMAC_TAG_LEN);
        let mut mac = self.mac();
        mac.update(signed);
        mac.verify_slice(tag)
            .map_err(|_| DecryptError::TagMismatch)?;

        let (iv, ciphertext) = signed.split_at(AES_BLOCK_LEN);
        let payload = self.decrypt_payload(iv, ciphertext)?;
        let text = String::from_utf8(payload)?;

        // Drop the framing byte encrypt() put in front
        let mut chars = text.chars();
        chars.next();
        Ok(chars.as_str().to_owned())
    }

    fn max_encrypted_len(&self, plain_len: usize) -> usize {
        // PKCS7 always pads, and the framing byte rides along
        let padded = ((plain_len + 1) / AES_BLOCK_LEN + 1) * AES_BLOCK_LEN;
        let envelope = AES_BLOCK_LEN + padded + HMAC_TAG_LEN;
        envelope.div_ceil(3) * 4
    }
}

// Keys stay out of debug output
impl std::fmt::Debug for AesHmacCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AesHmacCipher")
            .field("width", &self.width)
            .finish_non_exhaustive()
    }
}
