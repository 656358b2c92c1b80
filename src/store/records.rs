use super::{now_rfc3339, Store};
use crate::error::{StoreError, StoreResult};
use crate::model::{Comment, EvaluationResult};
use rusqlite::Row;
use tracing::info;

fn result_from_row(r: &Row<'_>) -> rusqlite::Result<EvaluationResult> {
    Ok(EvaluationResult {
        id: r.get(0)?,
        student_id: r.get(1)?,
        instructor_id: r.get(2)?,
        question_id: r.get(3)?,
        score: r.get(4)?,
        comment: r.get(5)?,
        recorded_at: r.get(6)?,
    })
}

fn comment_from_row(r: &Row<'_>) -> rusqlite::Result<Comment> {
    Ok(Comment {
        id: r.get(0)?,
        student_id: r.get(1)?,
        instructor_id: r.get(2)?,
        text: r.get(3)?,
        created_at: r.get(4)?,
    })
}

impl Store {
    pub fn record_result(
        &self,
        student_id: i64,
        instructor_id: i64,
        question_id: i64,
        score: f64,
        comment: &str,
    ) -> StoreResult<EvaluationResult> {
        if !score.is_finite() {
            return Err(StoreError::InvalidInput("score must be a finite number".into()));
        }
        let recorded_at = now_rfc3339();
        let comment = comment.trim().to_string();
        let id = self.write(|tx| {
            tx.execute(
                "INSERT INTO evaluation_results(student_id, instructor_id, question_id, score, comment, recorded_at)
                 VALUES(?, ?, ?, ?, ?, ?)",
                (student_id, instructor_id, question_id, score, &comment, &recorded_at),
            )?;
            Ok(tx.last_insert_rowid())
        })?;
        info!(id, student_id, question_id, score, "result recorded");
        Ok(EvaluationResult {
            id,
            student_id,
            instructor_id,
            question_id,
            score,
            comment,
            recorded_at,
        })
    }

    pub fn list_results_for_student(&self, student_id: i64) -> StoreResult<Vec<EvaluationResult>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, student_id, instructor_id, question_id, score, comment, recorded_at
             FROM evaluation_results WHERE student_id = ?
             ORDER BY recorded_at, id",
        )?;
        let rows = stmt
            .query_map([student_id], result_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn delete_result(&self, id: i64) -> StoreResult<()> {
        self.write(|tx| {
            if tx.execute("DELETE FROM evaluation_results WHERE id = ?", [id])? == 0 {
                return Err(StoreError::not_found("result", id));
            }
            Ok(())
        })
    }

    pub fn add_comment(&self, student_id: i64, instructor_id: i64, text: &str) -> StoreResult<Comment> {
        let text = text.trim().to_string();
        if text.is_empty() {
            return Err(StoreError::InvalidInput("comment must not be empty".into()));
        }
        let created_at = now_rfc3339();
        let id = self.write(|tx| {
            tx.execute(
                "INSERT INTO comments(student_id, instructor_id, text, created_at) VALUES(?, ?, ?, ?)",
                (student_id, instructor_id, &text, &created_at),
            )?;
            Ok(tx.last_insert_rowid())
        })?;
        Ok(Comment {
            id,
            student_id,
            instructor_id,
            text,
            created_at,
        })
    }

    pub fn list_comments_for_student(&self, student_id: i64) -> StoreResult<Vec<Comment>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, student_id, instructor_id, text, created_at
             FROM comments WHERE student_id = ?
             ORDER BY created_at, id",
        )?;
        let rows = stmt
            .query_map([student_id], comment_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn delete_comment(&self, id: i64) -> StoreResult<()> {
        self.write(|tx| {
            if tx.execute("DELETE FROM comments WHERE id = ?", [id])? == 0 {
                return Err(StoreError::not_found("comment", id));
            }
            Ok(())
        })
    }
}
