use super::{require_name, Store};
use crate::error::{StoreError, StoreResult};
use crate::model::{full_name, Person, PersonDraft, Role};
use rusqlite::{OptionalExtension, Row};
use tracing::{info, warn};

/// `users` and the older `students` table carry identical columns.
#[derive(Clone, Copy)]
enum PeopleTable {
    Users,
    Students,
}

impl PeopleTable {
    fn table(self) -> &'static str {
        match self {
            PeopleTable::Users => "users",
            PeopleTable::Students => "students",
        }
    }

    fn label(self) -> &'static str {
        match self {
            PeopleTable::Users => "user",
            PeopleTable::Students => "student",
        }
    }
}

fn person_from_row(r: &Row<'_>) -> rusqlite::Result<Person> {
    let role: Option<String> = r.get(6)?;
    Ok(Person {
        id: r.get(0)?,
        first_name: r.get(1)?,
        last_name: r.get(2)?,
        grade: r.get(3)?,
        pin: r.get(4)?,
        full_name: r.get(5)?,
        role: role.as_deref().and_then(Role::parse),
        assigned_project: r.get(7)?,
    })
}

const PERSON_COLUMNS: &str =
    "id, first_name, last_name, grade, pin, full_name, role, assigned_project";

fn clean(draft: &PersonDraft) -> StoreResult<PersonDraft> {
    let first_name = require_name(&draft.first_name, "first")?;
    let last_name = require_name(&draft.last_name, "last")?;
    Ok(PersonDraft {
        first_name,
        last_name,
        grade: draft.grade.trim().to_string(),
        pin: draft.pin.trim().to_string(),
        role: draft.role,
        assigned_project: draft
            .assigned_project
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string),
    })
}

fn into_person(id: i64, d: PersonDraft) -> Person {
    Person {
        id,
        full_name: full_name(&d.first_name, &d.last_name),
        first_name: d.first_name,
        last_name: d.last_name,
        grade: d.grade,
        pin: d.pin,
        role: d.role,
        assigned_project: d.assigned_project,
    }
}

impl Store {
    fn person_create(&self, t: PeopleTable, draft: &PersonDraft) -> StoreResult<Person> {
        let d = clean(draft)?;
        let id = self.write(|tx| {
            tx.execute(
                &format!(
                    "INSERT INTO {}(first_name, last_name, grade, pin, full_name, role, assigned_project)
                     VALUES(?, ?, ?, ?, ?, ?, ?)",
                    t.table()
                ),
                (
                    &d.first_name,
                    &d.last_name,
                    &d.grade,
                    &d.pin,
                    full_name(&d.first_name, &d.last_name),
                    d.role.map(Role::as_str),
                    &d.assigned_project,
                ),
            )?;
            Ok(tx.last_insert_rowid())
        })?;
        info!(kind = t.label(), id, "created");
        Ok(into_person(id, d))
    }

    // full_name is rewritten in the same statement as the names it derives
    // from, so the two can never disagree.
    fn person_update(&self, t: PeopleTable, id: i64, draft: &PersonDraft) -> StoreResult<Person> {
        let d = clean(draft)?;
        self.write(|tx| {
            let changed = tx.execute(
                &format!(
                    "UPDATE {}
                     SET first_name = ?, last_name = ?, grade = ?, pin = ?, full_name = ?,
                         role = ?, assigned_project = ?
                     WHERE id = ?",
                    t.table()
                ),
                (
                    &d.first_name,
                    &d.last_name,
                    &d.grade,
                    &d.pin,
                    full_name(&d.first_name, &d.last_name),
                    d.role.map(Role::as_str),
                    &d.assigned_project,
                    id,
                ),
            )?;
            if changed == 0 {
                return Err(StoreError::not_found(t.label(), id));
            }
            Ok(())
        })?;
        Ok(into_person(id, d))
    }

    fn person_get(&self, t: PeopleTable, id: i64) -> StoreResult<Person> {
        self.conn
            .query_row(
                &format!("SELECT {PERSON_COLUMNS} FROM {} WHERE id = ?", t.table()),
                [id],
                person_from_row,
            )
            .optional()?
            .ok_or_else(|| StoreError::not_found(t.label(), id))
    }

    fn person_list(&self, t: PeopleTable, role: Option<Role>) -> StoreResult<Vec<Person>> {
        let sql = format!(
            "SELECT {PERSON_COLUMNS} FROM {}
             WHERE (?1 IS NULL OR role = ?1)
             ORDER BY last_name COLLATE NOCASE, first_name COLLATE NOCASE, id",
            t.table()
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map([role.map(Role::as_str)], person_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn create_user(&self, draft: &PersonDraft) -> StoreResult<Person> {
        self.person_create(PeopleTable::Users, draft)
    }

    pub fn update_user(&self, id: i64, draft: &PersonDraft) -> StoreResult<Person> {
        self.person_update(PeopleTable::Users, id, draft)
    }

    pub fn get_user(&self, id: i64) -> StoreResult<Person> {
        self.person_get(PeopleTable::Users, id)
    }

    pub fn list_users(&self, role: Option<Role>) -> StoreResult<Vec<Person>> {
        self.person_list(PeopleTable::Users, role)
    }

    /// Delete a user. An instructor who still has students assigned needs
    /// `force`; with it the assignments go in the same transaction.
    pub fn delete_user(&self, id: i64, force: bool) -> StoreResult<()> {
        self.write(|tx| {
            let assigned: i64 = tx.query_row(
                "SELECT COUNT(*) FROM instructor_students WHERE instructor_id = ?",
                [id],
                |r| r.get(0),
            )?;
            if assigned > 0 {
                if !force {
                    return Err(StoreError::HasDependents {
                        what: format!("instructor {id}"),
                        count: assigned,
                    });
                }
                tx.execute(
                    "DELETE FROM instructor_students WHERE instructor_id = ?",
                    [id],
                )?;
                warn!(id, assigned, "force-deleting instructor with student assignments");
            }
            let removed = tx
                .execute("DELETE FROM users WHERE id = ?", [id])
                .map_err(|e| StoreError::from(e).on_delete("user"))?;
            if removed == 0 {
                return Err(StoreError::not_found("user", id));
            }
            Ok(())
        })?;
        info!(kind = "user", id, "deleted");
        Ok(())
    }

    pub fn create_student(&self, draft: &PersonDraft) -> StoreResult<Person> {
        self.person_create(PeopleTable::Students, draft)
    }

    pub fn update_student(&self, id: i64, draft: &PersonDraft) -> StoreResult<Person> {
        self.person_update(PeopleTable::Students, id, draft)
    }

    pub fn get_student(&self, id: i64) -> StoreResult<Person> {
        self.person_get(PeopleTable::Students, id)
    }

    pub fn list_students(&self) -> StoreResult<Vec<Person>> {
        self.person_list(PeopleTable::Students, None)
    }

    pub fn delete_student(&self, id: i64) -> StoreResult<()> {
        self.write(|tx| {
            let removed = tx.execute("DELETE FROM students WHERE id = ?", [id])?;
            if removed == 0 {
                return Err(StoreError::not_found("student", id));
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn student_rename_rewrites_full_name() {
        let s = Store::open_in_memory().expect("store");
        let st = s
            .create_student(&PersonDraft::new("Ana", "Diaz"))
            .expect("create");
        assert_eq!(st.full_name, "Diaz, Ana");

        let mut d = PersonDraft::new("Anna", "Díaz-Ruiz");
        d.grade = "E-4".into();
        s.update_student(st.id, &d).expect("update");
        let stored = s.get_student(st.id).expect("get");
        assert_eq!(stored.full_name, "Díaz-Ruiz, Anna");
        assert_eq!(stored.grade, "E-4");
    }

    #[test]
    fn users_filter_by_role() {
        let s = Store::open_in_memory().expect("store");
        s.create_user(&PersonDraft::new("Ian", "Ives").with_role(Role::Instructor))
            .expect("instructor");
        s.create_user(&PersonDraft::new("Sam", "Stone").with_role(Role::Student))
            .expect("student");
        s.create_user(&PersonDraft::new("Nora", "None")).expect("no role");
        assert_eq!(s.list_users(None).expect("all").len(), 3);
        let instructors = s.list_users(Some(Role::Instructor)).expect("instructors");
        assert_eq!(instructors.len(), 1);
        assert_eq!(instructors[0].full_name, "Ives, Ian");
    }

    #[test]
    fn instructor_delete_needs_force_while_assigned() {
        let s = Store::open_in_memory().expect("store");
        let i = s
            .create_user(&PersonDraft::new("Ian", "Ives").with_role(Role::Instructor))
            .expect("instructor");
        let st = s
            .create_user(&PersonDraft::new("Sam", "Stone").with_role(Role::Student))
            .expect("student");
        s.assign_instructor_student(i.id, st.id, None).expect("assign");

        let e = s.delete_user(i.id, false).expect_err("gated");
        assert!(matches!(e, StoreError::HasDependents { count: 1, .. }));
        assert!(s.get_user(i.id).is_ok());

        s.delete_user(i.id, true).expect("forced");
        assert_eq!(s.get_user(i.id).expect_err("gone").code(), "not_found");
        assert!(s.list_instructors_for_student(st.id).expect("list").is_empty());
        assert!(s.get_user(st.id).is_ok());
    }

    #[test]
    fn blank_names_are_rejected() {
        let s = Store::open_in_memory().expect("store");
        let e = s.create_user(&PersonDraft::new("  ", "Stone")).expect_err("blank");
        assert_eq!(e.code(), "bad_params");
    }
}
