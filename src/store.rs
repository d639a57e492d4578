// src/store.rs
//! Mapped row access over rusqlite — the seam where encryption happens
//!
//! A [`Dataset`] pairs a connection with a [`ColumnRegistry`]. Writes pass
//! registered values through their cipher on the way in; reads decode rows
//! and decrypt registered columns on the way out. Anything that goes
//! around the dataset sees only ciphertext.

use log::warn;
use rusqlite::types::{FromSql, Value as SqlValue};
use rusqlite::{params_from_iter, Connection};
use sea_query::{Expr, Query, SqliteQueryBuilder, Value, Values};

use crate::error::{Error, Result};
use crate::query::SelectQuery;
use crate::registry::{ColumnRegistry, DecryptFailurePolicy, EncryptedColumn};

/// A mapped table: name, column set, and row conversions.
pub trait Table: Sized {
    const TABLE: &'static str;
    const COLUMNS: &'static [&'static str];

    fn from_row(row: &DecodedRow) -> Result<Self>;
    fn to_row(&self) -> Vec<(&'static str, Value)>;
}

/// One fetched row, column-addressed, with registered columns already
/// decrypted.
#[derive(Debug, Clone)]
pub struct DecodedRow {
    cols: Vec<(String, SqlValue)>,
}

impl DecodedRow {
    pub fn get<T: FromSql>(&self, column: &str) -> Result<T> {
        let value = self
            .cols
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
            .ok_or_else(|| Error::Validation(format!("row has no column named {column}")))?;
        T::column_result(value.into())
            .map_err(|e| Error::Validation(format!("column {column}: {e}")))
    }
}

/// Connection + registry handle for mapped reads and writes.
pub struct Dataset<'a> {
    conn: &'a Connection,
    registry: &'a ColumnRegistry,
}

impl<'a> Dataset<'a> {
    pub fn new(conn: &'a Connection, registry: &'a ColumnRegistry) -> Self {
        Self { conn, registry }
    }

    /// Typed SELECT over `T`'s columns.
    pub fn select<T: Table>(&self) -> SelectQuery<T> {
        SelectQuery::new()
    }

    /// Insert one row, encrypting registered columns on the way in.
    pub fn insert<T: Table>(&self, row: &T) -> Result<()> {
        let mut columns = Vec::new();
        let mut values = Vec::new();
        for (column, value) in row.to_row() {
            let value = match self.registry.codec_for(T::TABLE, column) {
                Some(reg) => encrypt_value(reg, value)?,
                None => value,
            };
            columns.push(column);
            values.push(value);
        }

        let mut stmt = Query::insert();
        stmt.into_table(T::TABLE)
            .columns(columns)
            .values(values.into_iter().map(Expr::val))
            .map_err(|e| Error::Validation(e.to_string()))?;
        let (sql, bind) = stmt.build(SqliteQueryBuilder);

        let params = bind_values(&bind)?;
        self.conn.execute(&sql, params_from_iter(params))?;
        Ok(())
    }

    /// Run a built SELECT, decode every row, decrypt `table`'s registered
    /// columns.
    pub(crate) fn fetch_decoded(
        &self,
        table: &str,
        sql: &str,
        values: &Values,
    ) -> Result<Vec<DecodedRow>> {
        let params = bind_values(values)?;
        let mut stmt = self.conn.prepare(sql)?;
        let names: Vec<String> = stmt.column_names().iter().map(|n| n.to_string()).collect();

        let mut rows = stmt.query(params_from_iter(params))?;
        let mut decoded = Vec::new();
        while let Some(row) = rows.next()? {
            let mut cols = Vec::with_capacity(names.len());
            for (i, name) in names.iter().enumerate() {
                cols.push((name.clone(), row.get::<_, SqlValue>(i)?));
            }
            decoded.push(DecodedRow { cols });
        }

        for row in &mut decoded {
            self.decrypt_row(table, row)?;
        }
        Ok(decoded)
    }

    /// Single-value query (COUNT and friends).
    pub(crate) fn query_scalar<T: FromSql>(&self, sql: &str, values: &Values) -> Result<T> {
        let params = bind_values(values)?;
        let mut stmt = self.conn.prepare(sql)?;
        let value = stmt.query_row(params_from_iter(params), |row| row.get::<_, T>(0))?;
        Ok(value)
    }

    /// First column of every row (scalar projections).
    pub(crate) fn query_column<T: FromSql>(&self, sql: &str, values: &Values) -> Result<Vec<T>> {
        let params = bind_values(values)?;
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params_from_iter(params), |row| row.get::<_, T>(0))?;
        let mut out = Vec::new();
        for value in rows {
            out.push(value?);
        }
        Ok(out)
    }

    fn decrypt_row(&self, table: &str, row: &mut DecodedRow) -> Result<()> {
        for reg in self.registry.columns_for_table(table) {
            let Some(slot) = row.cols.iter_mut().find(|(name, _)| name == reg.column()) else {
                continue;
            };
            // NULL and non-text values pass through untouched
            let SqlValue::Text(stored) = &slot.1 else {
                continue;
            };
            let stored = stored.clone();
            match reg.cipher.decrypt(&stored) {
                Ok(plain) => slot.1 = SqlValue::Text(plain),
                Err(err) => match &reg.on_failure {
                    DecryptFailurePolicy::Error => return Err(err.into()),
                    DecryptFailurePolicy::EmptyString => {
                        warn!(
                            "substituting empty string for unreadable {}.{}: {err}",
                            reg.table(),
                            reg.column()
                        );
                        slot.1 = SqlValue::Text(String::new());
                    }
                    DecryptFailurePolicy::Sentinel(sentinel) => {
                        warn!(
                            "substituting sentinel for unreadable {}.{}: {err}",
                            reg.table(),
                            reg.column()
                        );
                        slot.1 = SqlValue::Text(sentinel.clone());
                    }
                },
            }
        }
        Ok(())
    }
}

fn encrypt_value(reg: &EncryptedColumn, value: Value) -> Result<Value> {
    match value {
        Value::String(Some(plain)) => {
            if let Some(max) = reg.max_plain_len {
                if plain.len() > max as usize {
                    return Err(Error::Validation(format!(
                        "value for {}.{} is {} bytes, over the registered cap of {max}",
                        reg.table(),
                        reg.column(),
                        plain.len()
                    )));
                }
            }
            Ok(Value::String(Some(reg.cipher.encrypt(&plain))))
        }
        // NULL passthrough: never reaches the cipher
        Value::String(None) => Ok(Value::String(None)),
        other => Err(Error::Validation(format!(
            "encrypted column {}.{} takes string values, got {other:?}",
            reg.table(),
            reg.column()
        ))),
    }
}

/// sea-query bind values → rusqlite parameters.
pub(crate) fn bind_values(values: &Values) -> Result<Vec<SqlValue>> {
    values.iter().map(bind_value).collect()
}

fn bind_value(value: &Value) -> Result<SqlValue> {
    Ok(match value {
        Value::Bool(Some(b)) => SqlValue::Integer(*b as i64),
        Value::TinyInt(Some(i)) => SqlValue::Integer(*i as i64),
        Value::SmallInt(Some(i)) => SqlValue::Integer(*i as i64),
        Value::Int(Some(i)) => SqlValue::Integer(*i as i64),
        Value::BigInt(Some(i)) => SqlValue::Integer(*i),
        Value::TinyUnsigned(Some(u)) => SqlValue::Integer(*u as i64),
        Value::SmallUnsigned(Some(u)) => SqlValue::Integer(*u as i64),
        Value::Unsigned(Some(u)) => SqlValue::Integer(*u as i64),
        Value::BigUnsigned(Some(u)) => {
            if *u > i64::MAX as u64 {
                return Err(Error::Validation(format!(
                    "unsigned value {u} does not fit in a SQLite INTEGER"
                )));
            }
            SqlValue::Integer(*u as i64)
        }
        Value::Float(Some(f)) => SqlValue::Real(*f as f64),
        Value::Double(Some(d)) => SqlValue::Real(*d),
        Value::Char(Some(c)) => SqlValue::Text(c.to_string()),
        Value::String(Some(s)) => SqlValue::Text(s.clone()),
        Value::Bytes(Some(b)) => SqlValue::Blob(b.clone()),
        Value::Bool(None)
        | Value::TinyInt(None)
        | Value::SmallInt(None)
        | Value::Int(None)
        | Value::BigInt(None)
        | Value::TinyUnsigned(None)
        | Value::SmallUnsigned(None)
        | Value::Unsigned(None)
        | Value::BigUnsigned(None)
        | Value::Float(None)
        | Value::Double(None)
        | Value::Char(None)
        | Value::String(None)
        | Value::Bytes(None) => SqlValue::Null,
        other => {
            return Err(Error::Validation(format!(
                "unsupported bind value in query: {other:?}"
            )))
        }
    })
}

/// rusqlite column value → sea-query bind value, for statements built
/// around values read back from the database.
pub(crate) fn column_value(value: SqlValue) -> Value {
    match value {
        SqlValue::Null => Value::String(None),
        SqlValue::Integer(i) => Value::BigInt(Some(i)),
        SqlValue::Real(r) => Value::Double(Some(r)),
        SqlValue::Text(s) => Value::String(Some(s)),
        SqlValue::Blob(b) => Value::Bytes(Some(b)),
    }
}
