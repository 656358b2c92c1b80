use super::assignments::{link_child_count, link_replace_parents};
use super::{require_name, Link, Store};
use crate::error::{StoreError, StoreResult};
use crate::model::{ControlType, Poi, Program, Question, QuestionDraft, Scale, Task};
use rusqlite::{OptionalExtension, Row};
use tracing::info;

pub(crate) fn question_from_row(r: &Row<'_>) -> rusqlite::Result<Question> {
    let control: String = r.get(2)?;
    Ok(Question {
        id: r.get(0)?,
        sub_task: r.get(1)?,
        // Unknown control types from older rows degrade to free text.
        control_type: ControlType::parse(&control).unwrap_or(ControlType::Text),
        scale_id: r.get(3)?,
        critical_task: r.get::<_, i64>(4)? != 0,
    })
}

fn scale_from_row(r: &Row<'_>) -> rusqlite::Result<Scale> {
    Ok(Scale {
        id: r.get(0)?,
        name: r.get(1)?,
        options: r.get(2)?,
    })
}

/// The three uniquely-named levels of the hierarchy share one table shape.
#[derive(Clone, Copy)]
enum Level {
    Program,
    Poi,
    Task,
}

impl Level {
    fn table(self) -> &'static str {
        match self {
            Level::Program => "programs",
            Level::Poi => "pois",
            Level::Task => "tasks",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Level::Program => "program",
            Level::Poi => "POI",
            Level::Task => "task",
        }
    }

    /// Link whose parent is this level.
    fn child_link(self) -> Link {
        match self {
            Level::Program => Link::PoiProgram,
            Level::Poi => Link::TaskPoi,
            Level::Task => Link::QuestionTask,
        }
    }

    /// Link whose child is this level.
    fn parent_link(self) -> Option<Link> {
        match self {
            Level::Program => None,
            Level::Poi => Some(Link::PoiProgram),
            Level::Task => Some(Link::TaskPoi),
        }
    }
}

impl Store {
    fn named_create(&self, level: Level, name: &str, parents: &[i64]) -> StoreResult<(i64, String)> {
        let name = require_name(name, level.label())?;
        let id = self.write(|tx| {
            tx.execute(
                &format!("INSERT INTO {}(name) VALUES(?)", level.table()),
                [&name],
            )?;
            let id = tx.last_insert_rowid();
            if let Some(link) = level.parent_link() {
                link_replace_parents(tx, link, id, parents)?;
            }
            Ok(id)
        })?;
        info!(kind = level.label(), id, name = %name, "created");
        Ok((id, name))
    }

    fn named_update(
        &self,
        level: Level,
        id: i64,
        name: &str,
        parents: Option<&[i64]>,
    ) -> StoreResult<(i64, String)> {
        let name = require_name(name, level.label())?;
        self.write(|tx| {
            let changed = tx.execute(
                &format!("UPDATE {} SET name = ? WHERE id = ?", level.table()),
                (&name, id),
            )?;
            if changed == 0 {
                return Err(StoreError::not_found(level.label(), id));
            }
            if let (Some(link), Some(parents)) = (level.parent_link(), parents) {
                link_replace_parents(tx, link, id, parents)?;
            }
            Ok(())
        })?;
        Ok((id, name))
    }

    fn named_delete(&self, level: Level, id: i64, restrict_children: bool) -> StoreResult<()> {
        self.write(|tx| {
            if restrict_children {
                let n = link_child_count(tx, level.child_link(), id)?;
                if n > 0 {
                    return Err(StoreError::InUse(format!(
                        "cannot delete {} {}: it still has {} assigned item(s)",
                        level.label(),
                        id,
                        n
                    )));
                }
            }
            let removed = tx
                .execute(&format!("DELETE FROM {} WHERE id = ?", level.table()), [id])
                .map_err(|e| StoreError::from(e).on_delete(level.label()))?;
            if removed == 0 {
                return Err(StoreError::not_found(level.label(), id));
            }
            Ok(())
        })?;
        info!(kind = level.label(), id, "deleted");
        Ok(())
    }

    fn named_get(&self, level: Level, id: i64) -> StoreResult<(i64, String)> {
        self.conn
            .query_row(
                &format!("SELECT id, name FROM {} WHERE id = ?", level.table()),
                [id],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .optional()?
            .ok_or_else(|| StoreError::not_found(level.label(), id))
    }

    fn named_find(&self, level: Level, name: &str) -> StoreResult<Option<(i64, String)>> {
        Ok(self
            .conn
            .query_row(
                &format!("SELECT id, name FROM {} WHERE name = ?", level.table()),
                [name.trim()],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .optional()?)
    }

    fn named_list(&self, level: Level) -> StoreResult<Vec<(i64, String)>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT id, name FROM {} ORDER BY name COLLATE NOCASE",
            level.table()
        ))?;
        let rows = stmt
            .query_map([], |r| Ok((r.get(0)?, r.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Rows of `level` assigned under `parent`, in assignment order.
    fn named_list_under(&self, level: Level, parent: i64) -> StoreResult<Vec<(i64, String)>> {
        let Some(link) = level.parent_link() else {
            return self.named_list(level);
        };
        let mut stmt = self.conn.prepare(&format!(
            "SELECT c.id, c.name FROM {table} c
             JOIN {link} l ON l.{child} = c.id
             WHERE l.{parent} = ?
             ORDER BY l.id",
            table = level.table(),
            link = link.table(),
            child = link.child_col(),
            parent = link.parent_col(),
        ))?;
        let rows = stmt
            .query_map([parent], |r| Ok((r.get(0)?, r.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn create_program(&self, name: &str) -> StoreResult<Program> {
        let (id, name) = self.named_create(Level::Program, name, &[])?;
        Ok(Program { id, name })
    }

    pub fn update_program(&self, id: i64, name: &str) -> StoreResult<Program> {
        let (id, name) = self.named_update(Level::Program, id, name, None)?;
        Ok(Program { id, name })
    }

    /// Delete a program and its POI/instructor links. With
    /// `restrict_children` the delete is refused while POIs are assigned.
    pub fn delete_program(&self, id: i64, restrict_children: bool) -> StoreResult<()> {
        self.named_delete(Level::Program, id, restrict_children)
    }

    pub fn get_program(&self, id: i64) -> StoreResult<Program> {
        let (id, name) = self.named_get(Level::Program, id)?;
        Ok(Program { id, name })
    }

    pub fn find_program(&self, name: &str) -> StoreResult<Option<Program>> {
        Ok(self
            .named_find(Level::Program, name)?
            .map(|(id, name)| Program { id, name }))
    }

    pub fn list_programs(&self) -> StoreResult<Vec<Program>> {
        Ok(self
            .named_list(Level::Program)?
            .into_iter()
            .map(|(id, name)| Program { id, name })
            .collect())
    }

    pub fn create_poi(&self, name: &str, program_ids: &[i64]) -> StoreResult<Poi> {
        let (id, name) = self.named_create(Level::Poi, name, program_ids)?;
        Ok(Poi { id, name })
    }

    /// Full-row update. `program_ids` of `None` leaves the assignments alone;
    /// `Some` replaces them in the same transaction.
    pub fn update_poi(&self, id: i64, name: &str, program_ids: Option<&[i64]>) -> StoreResult<Poi> {
        let (id, name) = self.named_update(Level::Poi, id, name, program_ids)?;
        Ok(Poi { id, name })
    }

    pub fn delete_poi(&self, id: i64, restrict_children: bool) -> StoreResult<()> {
        self.named_delete(Level::Poi, id, restrict_children)
    }

    pub fn get_poi(&self, id: i64) -> StoreResult<Poi> {
        let (id, name) = self.named_get(Level::Poi, id)?;
        Ok(Poi { id, name })
    }

    pub fn find_poi(&self, name: &str) -> StoreResult<Option<Poi>> {
        Ok(self
            .named_find(Level::Poi, name)?
            .map(|(id, name)| Poi { id, name }))
    }

    pub fn list_pois(&self) -> StoreResult<Vec<Poi>> {
        Ok(self
            .named_list(Level::Poi)?
            .into_iter()
            .map(|(id, name)| Poi { id, name })
            .collect())
    }

    pub fn list_pois_for_program(&self, program_id: i64) -> StoreResult<Vec<Poi>> {
        Ok(self
            .named_list_under(Level::Poi, program_id)?
            .into_iter()
            .map(|(id, name)| Poi { id, name })
            .collect())
    }

    pub fn create_task(&self, name: &str, poi_ids: &[i64]) -> StoreResult<Task> {
        let (id, name) = self.named_create(Level::Task, name, poi_ids)?;
        Ok(Task { id, name })
    }

    pub fn update_task(&self, id: i64, name: &str, poi_ids: Option<&[i64]>) -> StoreResult<Task> {
        let (id, name) = self.named_update(Level::Task, id, name, poi_ids)?;
        Ok(Task { id, name })
    }

    pub fn delete_task(&self, id: i64, restrict_children: bool) -> StoreResult<()> {
        self.named_delete(Level::Task, id, restrict_children)
    }

    pub fn get_task(&self, id: i64) -> StoreResult<Task> {
        let (id, name) = self.named_get(Level::Task, id)?;
        Ok(Task { id, name })
    }

    pub fn find_task(&self, name: &str) -> StoreResult<Option<Task>> {
        Ok(self
            .named_find(Level::Task, name)?
            .map(|(id, name)| Task { id, name }))
    }

    pub fn list_tasks(&self) -> StoreResult<Vec<Task>> {
        Ok(self
            .named_list(Level::Task)?
            .into_iter()
            .map(|(id, name)| Task { id, name })
            .collect())
    }

    pub fn list_tasks_for_poi(&self, poi_id: i64) -> StoreResult<Vec<Task>> {
        Ok(self
            .named_list_under(Level::Task, poi_id)?
            .into_iter()
            .map(|(id, name)| Task { id, name })
            .collect())
    }

    pub fn create_question(&self, draft: &QuestionDraft, task_ids: &[i64]) -> StoreResult<Question> {
        let sub_task = require_name(&draft.sub_task, "question")?;
        let id = self.write(|tx| {
            tx.execute(
                "INSERT INTO questions(sub_task, control_type, scale_id, critical_task)
                 VALUES(?, ?, ?, ?)",
                (
                    &sub_task,
                    draft.control_type.as_str(),
                    draft.scale_id,
                    draft.critical_task as i64,
                ),
            )?;
            let id = tx.last_insert_rowid();
            link_replace_parents(tx, Link::QuestionTask, id, task_ids)?;
            Ok(id)
        })?;
        Ok(Question {
            id,
            sub_task,
            control_type: draft.control_type,
            scale_id: draft.scale_id,
            critical_task: draft.critical_task,
        })
    }

    pub fn update_question(
        &self,
        id: i64,
        draft: &QuestionDraft,
        task_ids: Option<&[i64]>,
    ) -> StoreResult<Question> {
        let sub_task = require_name(&draft.sub_task, "question")?;
        self.write(|tx| {
            let changed = tx.execute(
                "UPDATE questions
                 SET sub_task = ?, control_type = ?, scale_id = ?, critical_task = ?
                 WHERE id = ?",
                (
                    &sub_task,
                    draft.control_type.as_str(),
                    draft.scale_id,
                    draft.critical_task as i64,
                    id,
                ),
            )?;
            if changed == 0 {
                return Err(StoreError::not_found("question", id));
            }
            if let Some(task_ids) = task_ids {
                link_replace_parents(tx, Link::QuestionTask, id, task_ids)?;
            }
            Ok(())
        })?;
        Ok(Question {
            id,
            sub_task,
            control_type: draft.control_type,
            scale_id: draft.scale_id,
            critical_task: draft.critical_task,
        })
    }

    pub fn delete_question(&self, id: i64) -> StoreResult<()> {
        self.write(|tx| {
            let removed = tx
                .execute("DELETE FROM questions WHERE id = ?", [id])
                .map_err(|e| StoreError::from(e).on_delete("question"))?;
            if removed == 0 {
                return Err(StoreError::not_found("question", id));
            }
            Ok(())
        })
    }

    pub fn get_question(&self, id: i64) -> StoreResult<Question> {
        self.conn
            .query_row(
                "SELECT id, sub_task, control_type, scale_id, critical_task
                 FROM questions WHERE id = ?",
                [id],
                question_from_row,
            )
            .optional()?
            .ok_or_else(|| StoreError::not_found("question", id))
    }

    pub fn list_questions(&self) -> StoreResult<Vec<Question>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, sub_task, control_type, scale_id, critical_task
             FROM questions ORDER BY sub_task COLLATE NOCASE, id",
        )?;
        let rows = stmt
            .query_map([], question_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn list_questions_for_task(&self, task_id: i64) -> StoreResult<Vec<Question>> {
        let mut stmt = self.conn.prepare(
            "SELECT q.id, q.sub_task, q.control_type, q.scale_id, q.critical_task
             FROM questions q
             JOIN question_tasks qt ON qt.question_id = q.id
             WHERE qt.task_id = ?
             ORDER BY qt.id",
        )?;
        let rows = stmt
            .query_map([task_id], question_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn create_scale(&self, name: &str, options: &str) -> StoreResult<Scale> {
        let name = require_name(name, "scale")?;
        let options = normalize_options(options);
        let id = self.write(|tx| {
            tx.execute(
                "INSERT INTO scales(name, options) VALUES(?, ?)",
                (&name, &options),
            )?;
            Ok(tx.last_insert_rowid())
        })?;
        Ok(Scale { id, name, options })
    }

    pub fn update_scale(&self, id: i64, name: &str, options: &str) -> StoreResult<Scale> {
        let name = require_name(name, "scale")?;
        let options = normalize_options(options);
        self.write(|tx| {
            let changed = tx.execute(
                "UPDATE scales SET name = ?, options = ? WHERE id = ?",
                (&name, &options, id),
            )?;
            if changed == 0 {
                return Err(StoreError::not_found("scale", id));
            }
            Ok(())
        })?;
        Ok(Scale { id, name, options })
    }

    /// Fails with `InUse` while any question grades on this scale.
    pub fn delete_scale(&self, id: i64) -> StoreResult<()> {
        self.write(|tx| {
            let removed = tx
                .execute("DELETE FROM scales WHERE id = ?", [id])
                .map_err(|e| StoreError::from(e).on_delete("scale"))?;
            if removed == 0 {
                return Err(StoreError::not_found("scale", id));
            }
            Ok(())
        })
    }

    pub fn get_scale(&self, id: i64) -> StoreResult<Scale> {
        self.conn
            .query_row(
                "SELECT id, name, options FROM scales WHERE id = ?",
                [id],
                scale_from_row,
            )
            .optional()?
            .ok_or_else(|| StoreError::not_found("scale", id))
    }

    pub fn list_scales(&self) -> StoreResult<Vec<Scale>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, options FROM scales ORDER BY name COLLATE NOCASE")?;
        let rows = stmt
            .query_map([], scale_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

fn normalize_options(raw: &str) -> String {
    crate::model::split_options(raw).join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> Store {
        Store::open_in_memory().expect("store")
    }

    fn draft(text: &str) -> QuestionDraft {
        QuestionDraft {
            sub_task: text.to_string(),
            control_type: ControlType::Score,
            scale_id: None,
            critical_task: false,
        }
    }

    #[test]
    fn duplicate_program_name_is_rejected() {
        let s = store();
        s.create_program("Alpha").expect("first");
        let e = s.create_program("Alpha").expect_err("second");
        assert!(matches!(e, StoreError::Conflict(_)));
        assert_eq!(s.list_programs().expect("list").len(), 1);
    }

    #[test]
    fn names_are_trimmed_and_required() {
        let s = store();
        let p = s.create_program("  Alpha ").expect("create");
        assert_eq!(p.name, "Alpha");
        assert_eq!(s.create_poi("   ", &[]).expect_err("blank").code(), "bad_params");
    }

    #[test]
    fn update_missing_row_is_not_found() {
        let s = store();
        assert_eq!(s.update_program(5, "X").expect_err("missing").code(), "not_found");
        assert_eq!(s.update_question(5, &draft("q"), None).expect_err("missing").code(), "not_found");
    }

    #[test]
    fn update_with_links_replaces_the_set() {
        let s = store();
        let a = s.create_program("A").expect("a");
        let b = s.create_program("B").expect("b");
        let poi = s.create_poi("Recon", &[a.id]).expect("poi");
        s.update_poi(poi.id, "Recon 2", Some(&[b.id])).expect("update");
        assert_eq!(s.list_parents(Link::PoiProgram, poi.id).expect("parents"), vec![b.id]);
        assert_eq!(s.get_poi(poi.id).expect("get").name, "Recon 2");

        s.update_poi(poi.id, "Recon 3", None).expect("rename only");
        assert_eq!(s.list_parents(Link::PoiProgram, poi.id).expect("parents"), vec![b.id]);
    }

    #[test]
    fn deleting_poi_keeps_tasks_and_drops_links() {
        let s = store();
        let prog = s.create_program("Alpha").expect("program");
        let a = s.create_poi("A", &[prog.id]).expect("a");
        let b = s.create_poi("B", &[prog.id]).expect("b");
        let t = s.create_task("Patrol", &[a.id, b.id]).expect("task");

        s.delete_poi(a.id, false).expect("delete");

        let links: i64 = s
            .conn()
            .query_row(
                "SELECT (SELECT COUNT(*) FROM poi_programs WHERE poi_id = ?1)
                      + (SELECT COUNT(*) FROM task_pois WHERE poi_id = ?1)",
                [a.id],
                |r| r.get(0),
            )
            .expect("count");
        assert_eq!(links, 0);
        assert_eq!(s.get_task(t.id).expect("task survives").name, "Patrol");
        assert_eq!(s.list_parents(Link::TaskPoi, t.id).expect("parents"), vec![b.id]);
    }

    #[test]
    fn restricted_delete_refuses_while_children_exist() {
        let s = store();
        let prog = s.create_program("Alpha").expect("program");
        s.create_poi("Recon", &[prog.id]).expect("poi");
        let e = s.delete_program(prog.id, true).expect_err("has children");
        assert_eq!(e.code(), "in_use");
        s.delete_program(prog.id, false).expect("unrestricted delete");
        assert_eq!(s.delete_program(prog.id, false).expect_err("gone").code(), "not_found");
    }

    #[test]
    fn scale_in_use_cannot_be_deleted() {
        let s = store();
        let scale = s.create_scale("GO/NO-GO", "GO, NO-GO").expect("scale");
        assert_eq!(scale.options, "GO,NO-GO");
        let mut d = draft("Check weapon");
        d.scale_id = Some(scale.id);
        let q = s.create_question(&d, &[]).expect("question");
        assert_eq!(s.delete_scale(scale.id).expect_err("in use").code(), "in_use");
        s.delete_question(q.id).expect("delete question");
        s.delete_scale(scale.id).expect("delete scale");
    }

    #[test]
    fn question_with_unknown_scale_is_invalid_reference() {
        let s = store();
        let mut d = draft("Check weapon");
        d.scale_id = Some(99);
        assert_eq!(s.create_question(&d, &[]).expect_err("bad scale").code(), "invalid_reference");
        assert!(s.list_questions().expect("list").is_empty());
    }

    #[test]
    fn lists_under_parent_follow_assignment_order() {
        let s = store();
        let prog = s.create_program("Alpha").expect("program");
        let z = s.create_poi("Zulu", &[prog.id]).expect("z");
        let a = s.create_poi("Able", &[prog.id]).expect("a");
        let ids: Vec<i64> = s
            .list_pois_for_program(prog.id)
            .expect("list")
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec![z.id, a.id]);
        let names: Vec<String> = s.list_pois().expect("all").into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["Able", "Zulu"]);
    }
}
