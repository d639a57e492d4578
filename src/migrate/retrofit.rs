// src/migrate/retrofit.rs
//! One-time encryption of pre-existing plaintext columns
//!
//! Turning encryption on for a column that already holds data leaves
//! plaintext behind: new writes are encrypted, old rows are not, and the
//! decrypting read path chokes on them. The retrofit pass closes that
//! gap once, keyed off the schema migration that introduced the column's
//! registration.

use log::info;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Connection};
use sea_query::{Alias, Expr, ExprTrait, Query, SqliteQueryBuilder};

use crate::error::{Error, Result};
use crate::migrate::SchemaMigrator;
use crate::registry::{ColumnRegistry, EncryptedColumn};
use crate::store::{bind_values, column_value};

/// Per-column outcome of one retrofit run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrofitColumn {
    pub table: String,
    pub column: String,
    pub rows_encrypted: usize,
}

/// What [`migrate_and_retrofit`] did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetrofitReport {
    pub migrations_applied: usize,
    pub columns: Vec<RetrofitColumn>,
}

/// Apply pending schema migrations, then encrypt existing plaintext in
/// every registered column whose trigger migration was in the pending
/// set.
///
/// The pending set is captured before anything is applied, so only
/// columns whose trigger ran *this* time are touched. On a database
/// where the trigger already ran, the column is skipped and its stored
/// envelopes stay byte for byte as they were. The registry is cleared
/// afterwards whether the retrofit succeeded or not.
pub fn migrate_and_retrofit(
    conn: &mut Connection,
    migrator: &SchemaMigrator,
    registry: &mut ColumnRegistry,
) -> Result<RetrofitReport> {
    let pending = migrator.pending(conn)?;
    let migrations_applied = migrator.apply_pending(conn)?;

    let outcome = retrofit_columns(conn, registry, &pending);
    registry.clear();
    let columns = outcome?;

    Ok(RetrofitReport {
        migrations_applied,
        columns,
    })
}

fn retrofit_columns(
    conn: &mut Connection,
    registry: &ColumnRegistry,
    pending: &[String],
) -> Result<Vec<RetrofitColumn>> {
    let mut out = Vec::new();
    for reg in registry.iter() {
        let Some(trigger) = &reg.retrofit_migration else {
            continue;
        };
        if !pending.iter().any(|id| id == trigger) {
            continue;
        }
        let rows_encrypted = encrypt_existing_rows(conn, reg)?;
        info!(
            "retrofit encrypted {rows_encrypted} rows in {}.{}",
            reg.table(),
            reg.column()
        );
        out.push(RetrofitColumn {
            table: reg.table().to_string(),
            column: reg.column().to_string(),
            rows_encrypted,
        });
    }
    Ok(out)
}

/// Rewrite every non-NULL value of one column as its encrypted form,
/// inside a single transaction.
fn encrypt_existing_rows(conn: &mut Connection, reg: &EncryptedColumn) -> Result<usize> {
    let pk_columns = primary_key_columns(conn, reg.table())?;

    let mut select = Query::select();
    select.from(Alias::new(reg.table()));
    for pk in &pk_columns {
        select.column(Alias::new(pk.as_str()));
    }
    select.column(Alias::new(reg.column()));
    let (sql, values) = select.build(SqliteQueryBuilder);

    // Read pass first; the write transaction below needs the connection.
    let rows: Vec<(Vec<SqlValue>, Option<String>)> = {
        let params = bind_values(&values)?;
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(params))?;
        let mut collected = Vec::new();
        while let Some(row) = rows.next()? {
            let mut pks = Vec::with_capacity(pk_columns.len());
            for i in 0..pk_columns.len() {
                pks.push(row.get::<_, SqlValue>(i)?);
            }
            let target: Option<String> = row.get(pk_columns.len())?;
            collected.push((pks, target));
        }
        collected
    };

    let tx = conn.transaction()?;
    let mut rows_encrypted = 0;
    for (pks, target) in rows {
        // NULL stays NULL, same as the write path
        let Some(plain) = target else {
            continue;
        };
        let stored = reg.cipher.encrypt(&plain);

        let mut update = Query::update();
        update
            .table(Alias::new(reg.table()))
            .value(Alias::new(reg.column()), Expr::val(stored));
        for (pk_col, pk_val) in pk_columns.iter().zip(pks) {
            update.and_where(
                Expr::col(Alias::new(pk_col.as_str())).eq(Expr::val(column_value(pk_val))),
            );
        }
        let (sql, values) = update.build(SqliteQueryBuilder);
        let params = bind_values(&values)?;
        tx.execute(&sql, params_from_iter(params))?;
        rows_encrypted += 1;
    }
    tx.commit()?;
    Ok(rows_encrypted)
}

/// Primary-key columns from the live schema, in key order. A registered
/// table that is missing or keyless is a configuration error, not
/// something to paper over.
fn primary_key_columns(conn: &Connection, table: &str) -> Result<Vec<String>> {
    let mut total = 0usize;
    let mut keys: Vec<(i64, String)> = Vec::new();
    conn.pragma(None, "table_info", table, |row| {
        total += 1;
        let pk: i64 = row.get("pk")?;
        if pk > 0 {
            keys.push((pk, row.get("name")?));
        }
        Ok(())
    })?;
    if total == 0 {
        return Err(Error::Migration(format!(
            "retrofit target table {table} does not exist"
        )));
    }
    if keys.is_empty() {
        return Err(Error::Migration(format!(
            "retrofit target table {table} has no primary key"
        )));
    }
    keys.sort_by_key(|&(ordinal, _)| ordinal);
    Ok(keys.into_iter().map(|(_, name)| name).collect())
}
