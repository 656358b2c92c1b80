use anyhow::Context;
use rusqlite::Connection;
use std::path::Path;
use tracing::{debug, info};

pub const DB_FILE: &str = "training.sqlite3";

/// Bumped whenever the canonical layout changes. Version 2 is the normalized
/// join-table schema; anything lower may still carry comma-separated id
/// columns.
pub const SCHEMA_VERSION: i64 = 2;

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)
        .with_context(|| format!("failed to create workspace {}", workspace.to_string_lossy()))?;
    let db_path = workspace.join(DB_FILE);
    let conn = Connection::open(&db_path)
        .with_context(|| format!("failed to open database {}", db_path.to_string_lossy()))?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn open_in_memory() -> anyhow::Result<Connection> {
    let conn = Connection::open_in_memory()?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> anyhow::Result<()> {
    conn.execute("PRAGMA foreign_keys = ON", [])?;
    let version = user_version(conn)?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS users(
            id INTEGER PRIMARY KEY,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            grade TEXT NOT NULL DEFAULT '',
            pin TEXT NOT NULL DEFAULT '',
            full_name TEXT NOT NULL,
            role TEXT CHECK(role IS NULL OR role IN ('instructor', 'student')),
            assigned_project TEXT
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_users_role ON users(role)",
        [],
    )?;

    // Older builds kept students in their own table; it is still served.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS students(
            id INTEGER PRIMARY KEY,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            grade TEXT NOT NULL DEFAULT '',
            pin TEXT NOT NULL DEFAULT '',
            full_name TEXT NOT NULL,
            role TEXT,
            assigned_project TEXT
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS programs(
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE
        )",
        [],
    )?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS pois(
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE
        )",
        [],
    )?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS tasks(
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE
        )",
        [],
    )?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS scales(
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            options TEXT NOT NULL DEFAULT ''
        )",
        [],
    )?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS questions(
            id INTEGER PRIMARY KEY,
            sub_task TEXT NOT NULL,
            control_type TEXT NOT NULL DEFAULT 'text',
            scale_id INTEGER,
            critical_task INTEGER NOT NULL DEFAULT 0,
            FOREIGN KEY(scale_id) REFERENCES scales(id) ON DELETE RESTRICT
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_questions_scale ON questions(scale_id)",
        [],
    )?;

    create_link_tables(conn)?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS evaluation_results(
            id INTEGER PRIMARY KEY,
            student_id INTEGER NOT NULL,
            instructor_id INTEGER NOT NULL,
            question_id INTEGER NOT NULL,
            score REAL NOT NULL,
            comment TEXT NOT NULL DEFAULT '',
            recorded_at TEXT NOT NULL,
            FOREIGN KEY(student_id) REFERENCES users(id) ON DELETE RESTRICT,
            FOREIGN KEY(instructor_id) REFERENCES users(id) ON DELETE RESTRICT,
            FOREIGN KEY(question_id) REFERENCES questions(id) ON DELETE RESTRICT
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_evaluation_results_student ON evaluation_results(student_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_evaluation_results_question ON evaluation_results(question_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS comments(
            id INTEGER PRIMARY KEY,
            student_id INTEGER NOT NULL,
            instructor_id INTEGER NOT NULL,
            text TEXT NOT NULL,
            created_at TEXT NOT NULL,
            FOREIGN KEY(student_id) REFERENCES users(id) ON DELETE RESTRICT,
            FOREIGN KEY(instructor_id) REFERENCES users(id) ON DELETE RESTRICT
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_comments_student ON comments(student_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS survey_questions(
            id INTEGER PRIMARY KEY,
            text TEXT NOT NULL,
            input_type TEXT NOT NULL DEFAULT 'text',
            options TEXT NOT NULL DEFAULT ''
        )",
        [],
    )?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS demo_templates(
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            question_ids TEXT NOT NULL DEFAULT ''
        )",
        [],
    )?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS responses(
            id INTEGER PRIMARY KEY,
            template_id INTEGER NOT NULL,
            user_id INTEGER,
            question_id INTEGER NOT NULL,
            answer TEXT NOT NULL,
            created_at TEXT NOT NULL,
            FOREIGN KEY(template_id) REFERENCES demo_templates(id) ON DELETE CASCADE,
            FOREIGN KEY(user_id) REFERENCES users(id) ON DELETE SET NULL,
            FOREIGN KEY(question_id) REFERENCES survey_questions(id) ON DELETE RESTRICT
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_responses_template ON responses(template_id)",
        [],
    )?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS projects(
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            description TEXT NOT NULL DEFAULT ''
        )",
        [],
    )?;

    if version < SCHEMA_VERSION {
        migrate_legacy_links(conn).context("legacy link migration failed")?;
        conn.execute_batch(&format!("PRAGMA user_version = {SCHEMA_VERSION}"))?;
        info!(from = version, to = SCHEMA_VERSION, "schema version updated");
    }

    Ok(())
}

fn create_link_tables(conn: &Connection) -> anyhow::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS poi_programs(
            id INTEGER PRIMARY KEY,
            poi_id INTEGER NOT NULL,
            program_id INTEGER NOT NULL,
            FOREIGN KEY(poi_id) REFERENCES pois(id) ON DELETE CASCADE,
            FOREIGN KEY(program_id) REFERENCES programs(id) ON DELETE CASCADE,
            UNIQUE(poi_id, program_id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_poi_programs_program ON poi_programs(program_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS task_pois(
            id INTEGER PRIMARY KEY,
            task_id INTEGER NOT NULL,
            poi_id INTEGER NOT NULL,
            FOREIGN KEY(task_id) REFERENCES tasks(id) ON DELETE CASCADE,
            FOREIGN KEY(poi_id) REFERENCES pois(id) ON DELETE CASCADE,
            UNIQUE(task_id, poi_id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_task_pois_poi ON task_pois(poi_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS question_tasks(
            id INTEGER PRIMARY KEY,
            question_id INTEGER NOT NULL,
            task_id INTEGER NOT NULL,
            FOREIGN KEY(question_id) REFERENCES questions(id) ON DELETE CASCADE,
            FOREIGN KEY(task_id) REFERENCES tasks(id) ON DELETE CASCADE,
            UNIQUE(question_id, task_id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_question_tasks_task ON question_tasks(task_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS instructor_programs(
            id INTEGER PRIMARY KEY,
            instructor_id INTEGER NOT NULL,
            program_id INTEGER NOT NULL,
            FOREIGN KEY(instructor_id) REFERENCES users(id) ON DELETE CASCADE,
            FOREIGN KEY(program_id) REFERENCES programs(id) ON DELETE CASCADE,
            UNIQUE(program_id, instructor_id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_instructor_programs_instructor ON instructor_programs(instructor_id)",
        [],
    )?;

    // Instructor deletion is gated in the store; the RESTRICT here only
    // catches writers that bypass it.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS instructor_students(
            id INTEGER PRIMARY KEY,
            instructor_id INTEGER NOT NULL,
            student_id INTEGER NOT NULL,
            program_id INTEGER,
            FOREIGN KEY(instructor_id) REFERENCES users(id) ON DELETE RESTRICT,
            FOREIGN KEY(student_id) REFERENCES users(id) ON DELETE CASCADE,
            FOREIGN KEY(program_id) REFERENCES programs(id) ON DELETE CASCADE
        )",
        [],
    )?;
    // NULL program ids would otherwise never collide.
    conn.execute(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_instructor_students_unique
         ON instructor_students(instructor_id, student_id, IFNULL(program_id, 0))",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_instructor_students_student ON instructor_students(student_id)",
        [],
    )?;
    Ok(())
}

/// Legacy column holding a comma-separated id list, and the link table its
/// ids move into.
struct LegacyLinkColumn {
    table: &'static str,
    column: &'static str,
    link_table: &'static str,
    child_col: &'static str,
    parent_col: &'static str,
    parent_table: &'static str,
}

const LEGACY_LINK_COLUMNS: &[LegacyLinkColumn] = &[
    LegacyLinkColumn {
        table: "pois",
        column: "program_ids",
        link_table: "poi_programs",
        child_col: "poi_id",
        parent_col: "program_id",
        parent_table: "programs",
    },
    LegacyLinkColumn {
        table: "tasks",
        column: "poi_ids",
        link_table: "task_pois",
        child_col: "task_id",
        parent_col: "poi_id",
        parent_table: "pois",
    },
    LegacyLinkColumn {
        table: "questions",
        column: "task_ids",
        link_table: "question_tasks",
        child_col: "question_id",
        parent_col: "task_id",
        parent_table: "tasks",
    },
];

fn migrate_legacy_links(conn: &Connection) -> anyhow::Result<()> {
    let tx = conn.unchecked_transaction()?;
    for legacy in LEGACY_LINK_COLUMNS {
        if !table_has_column(&tx, legacy.table, legacy.column)? {
            continue;
        }

        let rows = {
            let sql = format!("SELECT id, {} FROM {}", legacy.column, legacy.table);
            let mut stmt = tx.prepare(&sql)?;
            let rows = stmt
                .query_map([], |r| {
                    Ok((r.get::<_, i64>(0)?, r.get::<_, Option<String>>(1)?))
                })?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        };

        // Only carry ids whose parent row still exists; stale ids in the old
        // text column are dropped.
        let insert_sql = format!(
            "INSERT OR IGNORE INTO {link}({child}, {parent})
             SELECT ?, id FROM {parents} WHERE id = ?",
            link = legacy.link_table,
            child = legacy.child_col,
            parent = legacy.parent_col,
            parents = legacy.parent_table,
        );
        let mut moved = 0usize;
        for (child_id, raw) in rows {
            for parent_id in parse_id_list(raw.as_deref().unwrap_or("")) {
                moved += tx.execute(&insert_sql, (child_id, parent_id))?;
            }
        }

        tx.execute_batch(&format!(
            "ALTER TABLE {} DROP COLUMN {}",
            legacy.table, legacy.column
        ))?;
        debug!(
            table = legacy.table,
            column = legacy.column,
            moved,
            "migrated legacy id list column"
        );
    }
    tx.commit()?;
    Ok(())
}

/// Parse a comma-separated id list, skipping blanks and anything that is not
/// an integer.
pub fn parse_id_list(raw: &str) -> Vec<i64> {
    raw.split(',')
        .filter_map(|s| s.trim().parse::<i64>().ok())
        .collect()
}

pub fn join_id_list(ids: &[i64]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

pub fn user_version(conn: &Connection) -> anyhow::Result<i64> {
    Ok(conn.query_row("PRAGMA user_version", [], |r| r.get(0))?)
}

pub fn table_has_column(conn: &Connection, table: &str, column: &str) -> anyhow::Result<bool> {
    let sql = format!("PRAGMA table_info({})", table);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_list_parsing_skips_junk() {
        assert_eq!(parse_id_list("1, 2,,x,3 "), vec![1, 2, 3]);
        assert!(parse_id_list("").is_empty());
        assert_eq!(join_id_list(&[4, 5]), "4,5");
    }

    #[test]
    fn fresh_schema_is_current_version() {
        let conn = open_in_memory().expect("open");
        assert_eq!(user_version(&conn).expect("version"), SCHEMA_VERSION);
        assert!(table_has_column(&conn, "poi_programs", "program_id").expect("info"));
        assert!(!table_has_column(&conn, "pois", "program_ids").expect("info"));
    }

    #[test]
    fn init_is_repeatable() {
        let conn = open_in_memory().expect("open");
        init_schema(&conn).expect("second init");
        assert_eq!(user_version(&conn).expect("version"), SCHEMA_VERSION);
    }
}
