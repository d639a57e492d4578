// src/migrate/runner.rs
//! Minimal ordered migration runner with a state table

use chrono::Utc;
use log::info;
use rusqlite::{params, Connection};

use crate::consts::MIGRATION_STATE_TABLE;
use crate::error::{Error, Result};

/// One schema migration: a canonical identifier plus raw SQL. The SQL
/// may hold several statements; it runs through `execute_batch`.
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    pub id: &'static str,
    pub up: &'static str,
}

/// Applies declared migrations in order and records each in the state
/// table, so a migration runs exactly once per database.
pub struct SchemaMigrator {
    migrations: Vec<Migration>,
}

impl SchemaMigrator {
    pub fn new(migrations: Vec<Migration>) -> Result<Self> {
        for (i, migration) in migrations.iter().enumerate() {
            if migration.id.trim().is_empty() {
                return Err(Error::Migration("migration id must not be empty".into()));
            }
            if migrations[..i].iter().any(|m| m.id == migration.id) {
                return Err(Error::Migration(format!(
                    "duplicate migration id {}",
                    migration.id
                )));
            }
        }
        Ok(Self { migrations })
    }

    /// Identifiers declared but not yet recorded, in declaration order.
    pub fn pending(&self, conn: &Connection) -> Result<Vec<String>> {
        let applied = self.applied(conn)?;
        Ok(self
            .migrations
            .iter()
            .filter(|m| !applied.iter().any(|id| id == m.id))
            .map(|m| m.id.to_string())
            .collect())
    }

    /// Identifiers recorded in the state table, oldest first.
    pub fn applied(&self, conn: &Connection) -> Result<Vec<String>> {
        ensure_state_table(conn)?;
        let sql = format!("SELECT id FROM {MIGRATION_STATE_TABLE} ORDER BY applied_at, id");
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut out = Vec::new();
        for id in rows {
            out.push(id?);
        }
        Ok(out)
    }

    /// Apply everything pending, one transaction per migration, and
    /// return how many ran.
    pub fn apply_pending(&self, conn: &mut Connection) -> Result<usize> {
        let pending = self.pending(conn)?;
        let mut applied = 0;
        for migration in &self.migrations {
            if !pending.iter().any(|id| id == migration.id) {
                continue;
            }
            let tx = conn.transaction()?;
            tx.execute_batch(migration.up)?;
            let record =
                format!("INSERT INTO {MIGRATION_STATE_TABLE} (id, applied_at) VALUES (?1, ?2)");
            tx.execute(&record, params![migration.id, Utc::now().to_rfc3339()])?;
            tx.commit()?;
            info!("applied migration {}", migration.id);
            applied += 1;
        }
        Ok(applied)
    }
}

fn ensure_state_table(conn: &Connection) -> Result<()> {
    let sql = format!(
        "CREATE TABLE IF NOT EXISTS {MIGRATION_STATE_TABLE} (
            id TEXT PRIMARY KEY,
            applied_at TEXT NOT NULL
        )"
    );
    conn.execute(&sql, [])?;
    Ok(())
}
