//! Store error taxonomy.
//!
//! Every storage failure leaves the repository layer as a `StoreError`, so
//! callers can branch on the kind of failure without matching SQLite codes.

use thiserror::Error;

// Extended result codes for SQLITE_CONSTRAINT.
const CONSTRAINT_CHECK: i32 = 275;
const CONSTRAINT_FOREIGNKEY: i32 = 787;
const CONSTRAINT_NOTNULL: i32 = 1299;
const CONSTRAINT_PRIMARYKEY: i32 = 1555;
const CONSTRAINT_UNIQUE: i32 = 2067;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique name or a duplicate assignment pair.
    #[error("{0}")]
    Conflict(String),

    /// Delete blocked because other rows still reference the target.
    #[error("{0}")]
    InUse(String),

    /// Delete needs explicit confirmation because dependent rows exist.
    #[error("{what} still has {count} dependent row(s)")]
    HasDependents { what: String, count: i64 },

    /// A foreign key on insert/update points at a row that does not exist.
    #[error("{0}")]
    InvalidReference(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("storage error: {0}")]
    Storage(rusqlite::Error),
}

impl StoreError {
    /// Stable code used in IPC error envelopes.
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::Conflict(_) => "conflict",
            StoreError::InUse(_) => "in_use",
            StoreError::HasDependents { .. } => "has_dependents",
            StoreError::InvalidReference(_) => "invalid_reference",
            StoreError::NotFound(_) => "not_found",
            StoreError::InvalidInput(_) => "bad_params",
            StoreError::Storage(_) => "db_error",
        }
    }

    pub fn not_found(what: &str, id: i64) -> Self {
        StoreError::NotFound(format!("{what} {id} not found"))
    }

    /// Reclassify a foreign key failure raised by a DELETE: the row is still
    /// referenced, not pointing at something missing.
    pub fn on_delete(self, what: &str) -> Self {
        match self {
            StoreError::InvalidReference(_) => {
                StoreError::InUse(format!("cannot delete {what}: it is referenced elsewhere"))
            }
            other => other,
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(ref failure, ref msg) = e {
            if failure.code == rusqlite::ErrorCode::ConstraintViolation {
                let detail = msg.clone().unwrap_or_default();
                match failure.extended_code {
                    CONSTRAINT_UNIQUE | CONSTRAINT_PRIMARYKEY => {
                        return StoreError::Conflict(conflict_message(&detail));
                    }
                    CONSTRAINT_FOREIGNKEY => {
                        return StoreError::InvalidReference(
                            "referenced row does not exist".to_string(),
                        );
                    }
                    CONSTRAINT_NOTNULL | CONSTRAINT_CHECK => {
                        return StoreError::InvalidInput(detail);
                    }
                    _ => {}
                }
            }
        }
        StoreError::Storage(e)
    }
}

// SQLite reports "UNIQUE constraint failed: programs.name"; turn that into
// something a user can read in a transient notice.
fn conflict_message(detail: &str) -> String {
    let Some(cols) = detail.strip_prefix("UNIQUE constraint failed: ") else {
        return "already exists".to_string();
    };
    if cols.ends_with(".name") {
        let table = cols.trim_end_matches(".name");
        return format!("a {} with this name already exists", singular(table));
    }
    "this assignment already exists".to_string()
}

fn singular(table: &str) -> &str {
    match table {
        "programs" => "program",
        "pois" => "POI",
        "tasks" => "task",
        "scales" => "scale",
        "projects" => "project",
        "demo_templates" => "template",
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn unique_violation_maps_to_conflict() {
        let conn = Connection::open_in_memory().expect("open");
        conn.execute("CREATE TABLE programs(id INTEGER PRIMARY KEY, name TEXT NOT NULL UNIQUE)", [])
            .expect("create");
        conn.execute("INSERT INTO programs(name) VALUES('Alpha')", [])
            .expect("insert");
        let e: StoreError = conn
            .execute("INSERT INTO programs(name) VALUES('Alpha')", [])
            .expect_err("duplicate")
            .into();
        assert_eq!(e.code(), "conflict");
        assert_eq!(e.to_string(), "a program with this name already exists");
    }

    #[test]
    fn foreign_key_on_delete_becomes_in_use() {
        let conn = Connection::open_in_memory().expect("open");
        conn.execute_batch(
            "PRAGMA foreign_keys = ON;
             CREATE TABLE scales(id INTEGER PRIMARY KEY);
             CREATE TABLE questions(id INTEGER PRIMARY KEY, scale_id INTEGER REFERENCES scales(id) ON DELETE RESTRICT);
             INSERT INTO scales(id) VALUES(1);
             INSERT INTO questions(scale_id) VALUES(1);",
        )
        .expect("setup");
        let e: StoreError = conn
            .execute("DELETE FROM scales WHERE id = 1", [])
            .expect_err("restricted")
            .into();
        assert_eq!(e.code(), "invalid_reference");
        assert_eq!(e.on_delete("scale").code(), "in_use");
    }
}
