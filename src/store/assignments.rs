use super::{dedup_ids, Store};
use crate::error::{StoreError, StoreResult};
use crate::model::{InstructorStudentAssignment, Question};
use rusqlite::{Connection, OptionalExtension};
use tracing::debug;

/// A parent/child join table in the assignment graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Link {
    /// POI (child) under a Program (parent).
    PoiProgram,
    /// Task (child) under a POI (parent).
    TaskPoi,
    /// Question (child) under a Task (parent).
    QuestionTask,
    /// Instructor (child) teaching a Program (parent).
    InstructorProgram,
}

impl Link {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "poiProgram" => Some(Self::PoiProgram),
            "taskPoi" => Some(Self::TaskPoi),
            "questionTask" => Some(Self::QuestionTask),
            "instructorProgram" => Some(Self::InstructorProgram),
            _ => None,
        }
    }

    pub(crate) fn table(self) -> &'static str {
        match self {
            Self::PoiProgram => "poi_programs",
            Self::TaskPoi => "task_pois",
            Self::QuestionTask => "question_tasks",
            Self::InstructorProgram => "instructor_programs",
        }
    }

    pub(crate) fn parent_col(self) -> &'static str {
        match self {
            Self::PoiProgram | Self::InstructorProgram => "program_id",
            Self::TaskPoi => "poi_id",
            Self::QuestionTask => "task_id",
        }
    }

    pub(crate) fn child_col(self) -> &'static str {
        match self {
            Self::PoiProgram => "poi_id",
            Self::TaskPoi => "task_id",
            Self::QuestionTask => "question_id",
            Self::InstructorProgram => "instructor_id",
        }
    }
}

pub(crate) fn link_insert(conn: &Connection, link: Link, parent: i64, child: i64) -> StoreResult<()> {
    let sql = format!(
        "INSERT INTO {}({}, {}) VALUES(?, ?)",
        link.table(),
        link.parent_col(),
        link.child_col()
    );
    conn.execute(&sql, (parent, child))?;
    Ok(())
}

pub(crate) fn link_insert_ignore(
    conn: &Connection,
    link: Link,
    parent: i64,
    child: i64,
) -> StoreResult<usize> {
    let sql = format!(
        "INSERT OR IGNORE INTO {}({}, {}) VALUES(?, ?)",
        link.table(),
        link.parent_col(),
        link.child_col()
    );
    Ok(conn.execute(&sql, (parent, child))?)
}

pub(crate) fn link_replace_parents(
    conn: &Connection,
    link: Link,
    child: i64,
    parents: &[i64],
) -> StoreResult<()> {
    let sql = format!("DELETE FROM {} WHERE {} = ?", link.table(), link.child_col());
    conn.execute(&sql, [child])?;
    for parent in dedup_ids(parents) {
        link_insert(conn, link, parent, child)?;
    }
    Ok(())
}

pub(crate) fn link_child_count(conn: &Connection, link: Link, parent: i64) -> StoreResult<i64> {
    let sql = format!(
        "SELECT COUNT(*) FROM {} WHERE {} = ?",
        link.table(),
        link.parent_col()
    );
    Ok(conn.query_row(&sql, [parent], |r| r.get(0))?)
}

fn link_ids(conn: &Connection, sql: &str, key: i64) -> StoreResult<Vec<i64>> {
    let mut stmt = conn.prepare(sql)?;
    let ids = stmt
        .query_map([key], |r| r.get(0))?
        .collect::<Result<Vec<i64>, _>>()?;
    Ok(ids)
}

impl Store {
    pub fn assign(&self, link: Link, parent: i64, child: i64) -> StoreResult<()> {
        self.write(|tx| link_insert(tx, link, parent, child))?;
        debug!(?link, parent, child, "assigned");
        Ok(())
    }

    /// Remove one pair. Returns the number of rows removed; a missing pair is
    /// not an error.
    pub fn unassign(&self, link: Link, parent: i64, child: i64) -> StoreResult<usize> {
        let sql = format!(
            "DELETE FROM {} WHERE {} = ? AND {} = ?",
            link.table(),
            link.parent_col(),
            link.child_col()
        );
        self.write(|tx| Ok(tx.execute(&sql, (parent, child))?))
    }

    pub fn unassign_all_for_child(&self, link: Link, child: i64) -> StoreResult<usize> {
        let sql = format!("DELETE FROM {} WHERE {} = ?", link.table(), link.child_col());
        self.write(|tx| Ok(tx.execute(&sql, [child])?))
    }

    /// Swap the child's parent set in one transaction. If any insert fails the
    /// previous set is left untouched.
    pub fn replace_parents(&self, link: Link, child: i64, parents: &[i64]) -> StoreResult<()> {
        self.write(|tx| link_replace_parents(tx, link, child, parents))?;
        debug!(?link, child, count = parents.len(), "replaced parents");
        Ok(())
    }

    /// Child ids of `parent`, in assignment order.
    pub fn list_children(&self, link: Link, parent: i64) -> StoreResult<Vec<i64>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE {} = ? ORDER BY id",
            link.child_col(),
            link.table(),
            link.parent_col()
        );
        link_ids(&self.conn, &sql, parent)
    }

    /// Parent ids of `child`, in assignment order.
    pub fn list_parents(&self, link: Link, child: i64) -> StoreResult<Vec<i64>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE {} = ? ORDER BY id",
            link.parent_col(),
            link.table(),
            link.child_col()
        );
        link_ids(&self.conn, &sql, child)
    }

    pub fn count_children(&self, link: Link, parent: i64) -> StoreResult<i64> {
        link_child_count(&self.conn, link, parent)
    }

    pub fn assign_instructor_student(
        &self,
        instructor_id: i64,
        student_id: i64,
        program_id: Option<i64>,
    ) -> StoreResult<InstructorStudentAssignment> {
        let id = self.write(|tx| {
            tx.execute(
                "INSERT INTO instructor_students(instructor_id, student_id, program_id)
                 VALUES(?, ?, ?)",
                (instructor_id, student_id, program_id),
            )?;
            Ok(tx.last_insert_rowid())
        })?;
        Ok(InstructorStudentAssignment {
            id,
            instructor_id,
            student_id,
            program_id,
        })
    }

    pub fn unassign_instructor_student(
        &self,
        instructor_id: i64,
        student_id: i64,
        program_id: Option<i64>,
    ) -> StoreResult<usize> {
        self.write(|tx| {
            Ok(tx.execute(
                "DELETE FROM instructor_students
                 WHERE instructor_id = ? AND student_id = ? AND IFNULL(program_id, 0) = IFNULL(?, 0)",
                (instructor_id, student_id, program_id),
            )?)
        })
    }

    /// Replace every student assignment an instructor has with `students`.
    pub fn replace_instructor_students(
        &self,
        instructor_id: i64,
        students: &[(i64, Option<i64>)],
    ) -> StoreResult<()> {
        self.write(|tx| {
            tx.execute(
                "DELETE FROM instructor_students WHERE instructor_id = ?",
                [instructor_id],
            )?;
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO instructor_students(instructor_id, student_id, program_id)
                 VALUES(?, ?, ?)",
            )?;
            for (student_id, program_id) in students {
                stmt.execute((instructor_id, student_id, program_id))?;
            }
            Ok(())
        })
    }

    pub fn list_students_for_instructor(
        &self,
        instructor_id: i64,
    ) -> StoreResult<Vec<InstructorStudentAssignment>> {
        self.instructor_student_rows(
            "SELECT id, instructor_id, student_id, program_id
             FROM instructor_students WHERE instructor_id = ? ORDER BY id",
            instructor_id,
        )
    }

    pub fn list_instructors_for_student(
        &self,
        student_id: i64,
    ) -> StoreResult<Vec<InstructorStudentAssignment>> {
        self.instructor_student_rows(
            "SELECT id, instructor_id, student_id, program_id
             FROM instructor_students WHERE student_id = ? ORDER BY id",
            student_id,
        )
    }

    fn instructor_student_rows(
        &self,
        sql: &str,
        key: i64,
    ) -> StoreResult<Vec<InstructorStudentAssignment>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt
            .query_map([key], |r| {
                Ok(InstructorStudentAssignment {
                    id: r.get(0)?,
                    instructor_id: r.get(1)?,
                    student_id: r.get(2)?,
                    program_id: r.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Questions reachable through Program -> POI -> Task -> Question, each
    /// listed once, ordered by sub-task text.
    pub fn questions_for(&self, program_id: i64, poi_id: i64) -> StoreResult<Vec<Question>> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT q.id, q.sub_task, q.control_type, q.scale_id, q.critical_task
             FROM questions q
             JOIN question_tasks qt ON qt.question_id = q.id
             JOIN task_pois tp ON tp.task_id = qt.task_id
             JOIN poi_programs pp ON pp.poi_id = tp.poi_id
             WHERE pp.program_id = ? AND pp.poi_id = ?
             ORDER BY q.sub_task COLLATE NOCASE, q.id",
        )?;
        let rows = stmt
            .query_map((program_id, poi_id), super::catalog::question_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn questions_for_names(&self, program_name: &str, poi_name: &str) -> StoreResult<Vec<Question>> {
        let program_id: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM programs WHERE name = ?",
                [program_name.trim()],
                |r| r.get(0),
            )
            .optional()?;
        let Some(program_id) = program_id else {
            return Err(StoreError::NotFound(format!("program {program_name:?} not found")));
        };
        let poi_id: Option<i64> = self
            .conn
            .query_row("SELECT id FROM pois WHERE name = ?", [poi_name.trim()], |r| r.get(0))
            .optional()?;
        let Some(poi_id) = poi_id else {
            return Err(StoreError::NotFound(format!("POI {poi_name:?} not found")));
        };
        self.questions_for(program_id, poi_id)
    }
}
