//! Repository layer: the one seam between callers and SQLite.
//!
//! A `Store` is constructed explicitly and handed to whoever needs it. Every
//! operation returns a `StoreResult`, never a raw `rusqlite::Error`.

mod assignments;
mod catalog;
mod people;
mod records;
mod survey;

pub use assignments::Link;
pub(crate) use assignments::{link_insert, link_insert_ignore};

use crate::db;
use crate::error::{StoreError, StoreResult};
use rusqlite::{Connection, Transaction};
use std::cell::Cell;
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct Store {
    conn: Connection,
    workspace: Option<PathBuf>,
    generation: Cell<u64>,
}

impl Store {
    pub fn open(workspace: &Path) -> anyhow::Result<Self> {
        let conn = db::open_db(workspace)?;
        Ok(Self {
            conn,
            workspace: Some(workspace.to_path_buf()),
            generation: Cell::new(0),
        })
    }

    pub fn open_in_memory() -> anyhow::Result<Self> {
        let conn = db::open_in_memory()?;
        Ok(Self {
            conn,
            workspace: None,
            generation: Cell::new(0),
        })
    }

    pub fn workspace(&self) -> Option<&Path> {
        self.workspace.as_deref()
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Bumped after every committed mutation. Holders compare it to decide
    /// whether their last load is stale.
    pub fn generation(&self) -> u64 {
        self.generation.get()
    }

    fn touch(&self) {
        self.generation.set(self.generation.get() + 1);
    }

    /// Run `f` inside one transaction. Dropping the transaction on error rolls
    /// it back.
    pub(crate) fn write<T>(&self, f: impl FnOnce(&Transaction) -> StoreResult<T>) -> StoreResult<T> {
        let tx = self.conn.unchecked_transaction()?;
        let out = f(&tx)?;
        tx.commit()?;
        self.touch();
        Ok(out)
    }

    /// Row count of a table; used by seeding and by callers that show totals.
    pub fn count_rows(&self, table: &str) -> StoreResult<i64> {
        if !table.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(StoreError::InvalidInput(format!("bad table name: {table}")));
        }
        let n = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| r.get(0))?;
        Ok(n)
    }
}

impl Drop for Store {
    fn drop(&mut self) {
        debug!(workspace = ?self.workspace, "closing store");
    }
}

pub(crate) fn require_name(raw: &str, what: &str) -> StoreResult<String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(StoreError::InvalidInput(format!("{what} name must not be empty")));
    }
    Ok(name.to_string())
}

pub(crate) fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// Collapse duplicate ids, keeping first-seen order.
pub(crate) fn dedup_ids(ids: &[i64]) -> Vec<i64> {
    let mut seen = std::collections::HashSet::new();
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}
