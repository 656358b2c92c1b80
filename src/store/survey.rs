//! Demographics survey: question bank, templates, responses and projects.

use super::{dedup_ids, now_rfc3339, require_name, Store};
use crate::db::join_id_list;
use crate::error::{StoreError, StoreResult};
use crate::model::{DemoTemplate, InputType, Project, Response, SurveyQuestion};
use rusqlite::{OptionalExtension, Row};

fn survey_question_from_row(r: &Row<'_>) -> rusqlite::Result<SurveyQuestion> {
    let input: String = r.get(2)?;
    Ok(SurveyQuestion {
        id: r.get(0)?,
        text: r.get(1)?,
        input_type: InputType::parse(&input).unwrap_or(InputType::Text),
        options: r.get(3)?,
    })
}

fn template_from_row(r: &Row<'_>) -> rusqlite::Result<DemoTemplate> {
    Ok(DemoTemplate {
        id: r.get(0)?,
        name: r.get(1)?,
        question_ids: r.get(2)?,
    })
}

fn response_from_row(r: &Row<'_>) -> rusqlite::Result<Response> {
    Ok(Response {
        id: r.get(0)?,
        template_id: r.get(1)?,
        user_id: r.get(2)?,
        question_id: r.get(3)?,
        answer: r.get(4)?,
        created_at: r.get(5)?,
    })
}

fn project_from_row(r: &Row<'_>) -> rusqlite::Result<Project> {
    Ok(Project {
        id: r.get(0)?,
        name: r.get(1)?,
        description: r.get(2)?,
    })
}

impl Store {
    pub fn create_survey_question(
        &self,
        text: &str,
        input_type: InputType,
        options: &str,
    ) -> StoreResult<SurveyQuestion> {
        let text = require_name(text, "survey question")?;
        let options = options.trim().to_string();
        let id = self.write(|tx| {
            tx.execute(
                "INSERT INTO survey_questions(text, input_type, options) VALUES(?, ?, ?)",
                (&text, input_type.as_str(), &options),
            )?;
            Ok(tx.last_insert_rowid())
        })?;
        Ok(SurveyQuestion {
            id,
            text,
            input_type,
            options,
        })
    }

    pub fn update_survey_question(
        &self,
        id: i64,
        text: &str,
        input_type: InputType,
        options: &str,
    ) -> StoreResult<SurveyQuestion> {
        let text = require_name(text, "survey question")?;
        let options = options.trim().to_string();
        self.write(|tx| {
            let changed = tx.execute(
                "UPDATE survey_questions SET text = ?, input_type = ?, options = ? WHERE id = ?",
                (&text, input_type.as_str(), &options, id),
            )?;
            if changed == 0 {
                return Err(StoreError::not_found("survey question", id));
            }
            Ok(())
        })?;
        Ok(SurveyQuestion {
            id,
            text,
            input_type,
            options,
        })
    }

    pub fn delete_survey_question(&self, id: i64) -> StoreResult<()> {
        self.write(|tx| {
            let removed = tx
                .execute("DELETE FROM survey_questions WHERE id = ?", [id])
                .map_err(|e| StoreError::from(e).on_delete("survey question"))?;
            if removed == 0 {
                return Err(StoreError::not_found("survey question", id));
            }
            Ok(())
        })
    }

    pub fn list_survey_questions(&self) -> StoreResult<Vec<SurveyQuestion>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, text, input_type, options FROM survey_questions ORDER BY id")?;
        let rows = stmt
            .query_map([], survey_question_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn create_template(&self, name: &str, question_ids: &[i64]) -> StoreResult<DemoTemplate> {
        let name = require_name(name, "template")?;
        let question_ids = join_id_list(&dedup_ids(question_ids));
        let id = self.write(|tx| {
            tx.execute(
                "INSERT INTO demo_templates(name, question_ids) VALUES(?, ?)",
                (&name, &question_ids),
            )?;
            Ok(tx.last_insert_rowid())
        })?;
        Ok(DemoTemplate {
            id,
            name,
            question_ids,
        })
    }

    pub fn update_template(
        &self,
        id: i64,
        name: &str,
        question_ids: &[i64],
    ) -> StoreResult<DemoTemplate> {
        let name = require_name(name, "template")?;
        let question_ids = join_id_list(&dedup_ids(question_ids));
        self.write(|tx| {
            let changed = tx.execute(
                "UPDATE demo_templates SET name = ?, question_ids = ? WHERE id = ?",
                (&name, &question_ids, id),
            )?;
            if changed == 0 {
                return Err(StoreError::not_found("template", id));
            }
            Ok(())
        })?;
        Ok(DemoTemplate {
            id,
            name,
            question_ids,
        })
    }

    /// Deleting a template drops its responses with it.
    pub fn delete_template(&self, id: i64) -> StoreResult<()> {
        self.write(|tx| {
            if tx.execute("DELETE FROM demo_templates WHERE id = ?", [id])? == 0 {
                return Err(StoreError::not_found("template", id));
            }
            Ok(())
        })
    }

    pub fn get_template(&self, id: i64) -> StoreResult<DemoTemplate> {
        self.conn
            .query_row(
                "SELECT id, name, question_ids FROM demo_templates WHERE id = ?",
                [id],
                template_from_row,
            )
            .optional()?
            .ok_or_else(|| StoreError::not_found("template", id))
    }

    pub fn list_templates(&self) -> StoreResult<Vec<DemoTemplate>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, question_ids FROM demo_templates ORDER BY name COLLATE NOCASE",
        )?;
        let rows = stmt
            .query_map([], template_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Questions of a template in template order. Ids that no longer exist in
    /// the bank are skipped.
    pub fn template_questions(&self, template_id: i64) -> StoreResult<Vec<SurveyQuestion>> {
        let template = self.get_template(template_id)?;
        let mut stmt = self
            .conn
            .prepare("SELECT id, text, input_type, options FROM survey_questions WHERE id = ?")?;
        let mut out = Vec::new();
        for qid in template.question_id_list() {
            if let Some(q) = stmt
                .query_row([qid], survey_question_from_row)
                .optional()?
            {
                out.push(q);
            }
        }
        Ok(out)
    }

    pub fn submit_response(
        &self,
        template_id: i64,
        user_id: Option<i64>,
        question_id: i64,
        answer: &str,
    ) -> StoreResult<Response> {
        let template = self.get_template(template_id)?;
        if !template.question_id_list().contains(&question_id) {
            return Err(StoreError::InvalidInput(format!(
                "question {question_id} is not part of template {template_id}"
            )));
        }
        let answer = answer.trim().to_string();
        let created_at = now_rfc3339();
        let id = self.write(|tx| {
            tx.execute(
                "INSERT INTO responses(template_id, user_id, question_id, answer, created_at)
                 VALUES(?, ?, ?, ?, ?)",
                (template_id, user_id, question_id, &answer, &created_at),
            )?;
            Ok(tx.last_insert_rowid())
        })?;
        Ok(Response {
            id,
            template_id,
            user_id,
            question_id,
            answer,
            created_at,
        })
    }

    pub fn list_responses(&self, template_id: i64) -> StoreResult<Vec<Response>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, template_id, user_id, question_id, answer, created_at
             FROM responses WHERE template_id = ? ORDER BY id",
        )?;
        let rows = stmt
            .query_map([template_id], response_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn delete_response(&self, id: i64) -> StoreResult<()> {
        self.write(|tx| {
            if tx.execute("DELETE FROM responses WHERE id = ?", [id])? == 0 {
                return Err(StoreError::not_found("response", id));
            }
            Ok(())
        })
    }

    pub fn create_project(&self, name: &str, description: &str) -> StoreResult<Project> {
        let name = require_name(name, "project")?;
        let description = description.trim().to_string();
        let id = self.write(|tx| {
            tx.execute(
                "INSERT INTO projects(name, description) VALUES(?, ?)",
                (&name, &description),
            )?;
            Ok(tx.last_insert_rowid())
        })?;
        Ok(Project {
            id,
            name,
            description,
        })
    }

    pub fn update_project(&self, id: i64, name: &str, description: &str) -> StoreResult<Project> {
        let name = require_name(name, "project")?;
        let description = description.trim().to_string();
        self.write(|tx| {
            let changed = tx.execute(
                "UPDATE projects SET name = ?, description = ? WHERE id = ?",
                (&name, &description, id),
            )?;
            if changed == 0 {
                return Err(StoreError::not_found("project", id));
            }
            Ok(())
        })?;
        Ok(Project {
            id,
            name,
            description,
        })
    }

    pub fn delete_project(&self, id: i64) -> StoreResult<()> {
        self.write(|tx| {
            if tx.execute("DELETE FROM projects WHERE id = ?", [id])? == 0 {
                return Err(StoreError::not_found("project", id));
            }
            Ok(())
        })
    }

    pub fn list_projects(&self) -> StoreResult<Vec<Project>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, description FROM projects ORDER BY name COLLATE NOCASE")?;
        let rows = stmt
            .query_map([], project_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}
