// src/lib.rs
//! encrypted-columns — transparent column-level encryption for SQLite
//!
//! Features:
//! - AES-CBC + HMAC-SHA256 encrypt-then-MAC value envelopes
//! - Per-column registration with pluggable ciphers
//! - One-time retrofit of pre-existing plaintext rows
//! - Pagination, substring search, and null-safe projections on sea-query

pub mod config;
pub mod consts;
pub mod crypto;
pub mod error;
pub mod migrate;
pub mod query;
pub mod registry;
pub mod store;

// Re-export everything users need at the crate root
pub use config::load as load_config;
pub use crypto::{AesHmacCipher, PropertyCipher};
pub use error::{DecryptError, Error, Result};
pub use migrate::{migrate_and_retrofit, Migration, RetrofitColumn, RetrofitReport, SchemaMigrator};
pub use query::{column_or, PageRequest, Paged, SearchRequest, SelectQuery};
pub use registry::{ColumnRegistry, DecryptFailurePolicy, EncryptedColumn};
pub use store::{Dataset, DecodedRow, Table};
