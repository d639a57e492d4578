// tests/support.rs
//! Test utilities — fixed keys, in-memory databases, a mapped test table

use std::sync::Arc;

use encrypted_columns::{AesHmacCipher, DecodedRow, Table};
use rusqlite::Connection;
use sea_query::Value;

// 32 bytes each, AES-256 in tests
pub const CRYPT_KEY: &[u8; 32] = b"an all too guessable crypt key!!";
pub const AUTH_KEY: &[u8; 32] = b"an all too guessable auth key!!!";

/// Respects RUST_LOG=, safe to call from every test
#[allow(dead_code)]
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[allow(dead_code)]
pub fn test_cipher() -> Arc<AesHmacCipher> {
    Arc::new(AesHmacCipher::new(CRYPT_KEY, AUTH_KEY).expect("test cipher"))
}

#[allow(dead_code)]
pub fn mem_conn() -> Connection {
    Connection::open_in_memory().expect("open in-memory db")
}

/// The mapped table most tests run against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub full_name: Option<String>,
    pub company_name: Option<String>,
}

impl Table for User {
    const TABLE: &'static str = "users";
    const COLUMNS: &'static [&'static str] = &["id", "full_name", "company_name"];

    fn from_row(row: &DecodedRow) -> encrypted_columns::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            full_name: row.get("full_name")?,
            company_name: row.get("company_name")?,
        })
    }

    fn to_row(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("id", self.id.into()),
            ("full_name", self.full_name.clone().into()),
            ("company_name", self.company_name.clone().into()),
        ]
    }
}

#[allow(dead_code)]
pub fn create_users_table(conn: &Connection) {
    conn.execute_batch(
        "CREATE TABLE users (
            id INTEGER PRIMARY KEY,
            full_name TEXT,
            company_name TEXT
        )",
    )
    .expect("create users table");
}

#[allow(dead_code)]
pub fn user(id: i64, full_name: Option<&str>, company_name: Option<&str>) -> User {
    User {
        id,
        full_name: full_name.map(str::to_owned),
        company_name: company_name.map(str::to_owned),
    }
}
