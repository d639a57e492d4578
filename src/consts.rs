// src/consts.rs
//! Shared constants — envelope layout and query defaults

/// AES block length in bytes; also the IV length at the front of the envelope
pub const AES_BLOCK_LEN: usize = 16;

/// HMAC-SHA256 tag length at the tail of the envelope
pub const HMAC_TAG_LEN: usize = 32;

/// Framing byte prepended to the plaintext before encryption
// Stripped again after decryption; keeps the padded payload non-empty
// even for "" and makes the envelope layout independent of string length.
pub const PLAINTEXT_PREFIX: u8 = b'\n';

/// Delimiter inserted after every column in the search concatenation
// A trailing delimiter per column means a needle never matches across a
// column boundary unless it contains the delimiter itself.
pub const SEARCH_DELIMITER: &str = " ";

/// Escape character for LIKE patterns built from caller input
pub const LIKE_ESCAPE: char = '\\';

/// Bookkeeping table for applied schema migrations
pub const MIGRATION_STATE_TABLE: &str = "encrypted_columns_migrations";
