// src/registry.rs
//! Encrypted-column registrations
//!
//! A [`ColumnRegistry`] is the single source of truth for which columns
//! are encrypted, with what cipher, and how read failures are handled.
//! It is a plain owned value: build it during application setup, hand it
//! by reference to [`crate::store::Dataset`] and to
//! [`crate::migrate::migrate_and_retrofit`]. Nothing here is global.

use std::sync::Arc;

use crate::crypto::PropertyCipher;
use crate::error::{Error, Result};

/// What a mapped read does when a stored value fails to decrypt.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum DecryptFailurePolicy {
    /// Propagate the decryption error to the caller.
    #[default]
    Error,
    /// Substitute an empty string and log a warning.
    EmptyString,
    /// Substitute a fixed sentinel and log a warning.
    Sentinel(String),
}

/// One encrypted-column registration.
pub struct EncryptedColumn {
    pub(crate) table: String,
    pub(crate) column: String,
    pub(crate) cipher: Arc<dyn PropertyCipher>,
    pub(crate) max_plain_len: Option<u32>,
    pub(crate) retrofit_migration: Option<String>,
    pub(crate) on_failure: DecryptFailurePolicy,
}

impl EncryptedColumn {
    pub fn new(
        table: impl Into<String>,
        column: impl Into<String>,
        cipher: Arc<dyn PropertyCipher>,
    ) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
            cipher,
            max_plain_len: None,
            retrofit_migration: None,
            on_failure: DecryptFailurePolicy::default(),
        }
    }

    /// Longest plaintext (in bytes) this column accepts on write.
    pub fn with_max_plain_len(mut self, len: u32) -> Self {
        self.max_plain_len = Some(len);
        self
    }

    /// Identifier of the schema migration that introduced encryption for
    /// this column. Rows that predate it get encrypted by the retrofit
    /// pass exactly once, when that migration goes from pending to applied.
    pub fn with_retrofit_migration(mut self, id: impl Into<String>) -> Self {
        self.retrofit_migration = Some(id.into());
        self
    }

    pub fn on_decrypt_failure(mut self, policy: DecryptFailurePolicy) -> Self {
        self.on_failure = policy;
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    /// Worst-case stored length for this column, if a plaintext cap is set.
    ///
    /// This is the number to use for the column size in schema DDL.
    pub fn max_stored_len(&self) -> Option<usize> {
        self.max_plain_len
            .map(|n| self.cipher.max_encrypted_len(n as usize))
    }
}

impl std::fmt::Debug for EncryptedColumn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptedColumn")
            .field("table", &self.table)
            .field("column", &self.column)
            .field("max_plain_len", &self.max_plain_len)
            .field("retrofit_migration", &self.retrofit_migration)
            .field("on_failure", &self.on_failure)
            .finish_non_exhaustive()
    }
}

/// The set of encrypted columns for one database.
#[derive(Debug, Default)]
pub struct ColumnRegistry {
    columns: Vec<EncryptedColumn>,
}

impl ColumnRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a registration. Table and column names must be non-empty and
    /// the (table, column) pair must not already be registered.
    pub fn register(&mut self, column: EncryptedColumn) -> Result<()> {
        if column.table.trim().is_empty() || column.column.trim().is_empty() {
            return Err(Error::Validation(
                "encrypted column registration needs non-empty table and column names".into(),
            ));
        }
        if self.codec_for(&column.table, &column.column).is_some() {
            return Err(Error::Validation(format!(
                "column {}.{} is already registered",
                column.table, column.column
            )));
        }
        self.columns.push(column);
        Ok(())
    }

    /// Registration for a (table, column) pair, if any.
    pub fn codec_for(&self, table: &str, column: &str) -> Option<&EncryptedColumn> {
        self.columns
            .iter()
            .find(|c| c.table == table && c.column == column)
    }

    /// All registrations for one table, in registration order.
    pub fn columns_for_table<'a>(
        &'a self,
        table: &'a str,
    ) -> impl Iterator<Item = &'a EncryptedColumn> {
        self.columns.iter().filter(move |c| c.table == table)
    }

    pub(crate) fn iter(&self) -> std::slice::Iter<'_, EncryptedColumn> {
        self.columns.iter()
    }

    /// Drop all registrations. The retrofit pass calls this when it is
    /// done so a second migration run has nothing left to re-encrypt.
    pub fn clear(&mut self) {
        self.columns.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }
}
