use crate::ipc::error::HandlerError;
use crate::ipc::helpers::{opt_i64, opt_id_list, req_i64, req_str, with_store};
use crate::ipc::types::{AppState, Request};
use crate::store::Link;
use serde_json::json;

fn link_param(req: &Request) -> Result<Link, HandlerError> {
    let raw = req_str(req, "link")?;
    Link::parse(&raw).ok_or_else(|| HandlerError::bad_params(format!("unknown link: {raw}")))
}

fn handle_assign(state: &mut AppState, req: &Request) -> serde_json::Value {
    with_store(state, req, |store| {
        let link = link_param(req)?;
        store.assign(link, req_i64(req, "parentId")?, req_i64(req, "childId")?)?;
        Ok(json!({ "ok": true }))
    })
}

fn handle_unassign(state: &mut AppState, req: &Request) -> serde_json::Value {
    with_store(state, req, |store| {
        let link = link_param(req)?;
        let child = req_i64(req, "childId")?;
        let removed = match opt_i64(req, "parentId")? {
            Some(parent) => store.unassign(link, parent, child)?,
            None => store.unassign_all_for_child(link, child)?,
        };
        Ok(json!({ "removed": removed }))
    })
}

fn handle_list_children(state: &mut AppState, req: &Request) -> serde_json::Value {
    with_store(state, req, |store| {
        let link = link_param(req)?;
        let ids = store.list_children(link, req_i64(req, "parentId")?)?;
        Ok(json!({ "childIds": ids }))
    })
}

fn handle_list_parents(state: &mut AppState, req: &Request) -> serde_json::Value {
    with_store(state, req, |store| {
        let link = link_param(req)?;
        let ids = store.list_parents(link, req_i64(req, "childId")?)?;
        Ok(json!({ "parentIds": ids }))
    })
}

fn handle_replace_parents(state: &mut AppState, req: &Request) -> serde_json::Value {
    with_store(state, req, |store| {
        let link = link_param(req)?;
        let child = req_i64(req, "childId")?;
        // Only an explicit list replaces the set; `[]` clears it.
        let Some(parents) = opt_id_list(req, "parentIds")? else {
            return Err(HandlerError::bad_params("missing parentIds"));
        };
        store.replace_parents(link, child, &parents)?;
        Ok(json!({ "parentIds": store.list_parents(link, child)? }))
    })
}

/// `{instructorId}` or `{studentId}`.
fn handle_instructor_students_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    with_store(state, req, |store| {
        let rows = match (opt_i64(req, "instructorId")?, opt_i64(req, "studentId")?) {
            (Some(instructor), _) => store.list_students_for_instructor(instructor)?,
            (None, Some(student)) => store.list_instructors_for_student(student)?,
            (None, None) => return Err(HandlerError::bad_params("missing instructorId or studentId")),
        };
        Ok(json!({ "assignments": rows }))
    })
}

fn handle_instructor_students_assign(state: &mut AppState, req: &Request) -> serde_json::Value {
    with_store(state, req, |store| {
        let row = store.assign_instructor_student(
            req_i64(req, "instructorId")?,
            req_i64(req, "studentId")?,
            opt_i64(req, "programId")?,
        )?;
        Ok(json!({ "assignment": row }))
    })
}

fn handle_instructor_students_unassign(state: &mut AppState, req: &Request) -> serde_json::Value {
    with_store(state, req, |store| {
        let removed = store.unassign_instructor_student(
            req_i64(req, "instructorId")?,
            req_i64(req, "studentId")?,
            opt_i64(req, "programId")?,
        )?;
        Ok(json!({ "removed": removed }))
    })
}

/// `students` is an array of `{studentId, programId?}`.
fn handle_instructor_students_replace(state: &mut AppState, req: &Request) -> serde_json::Value {
    with_store(state, req, |store| {
        let instructor = req_i64(req, "instructorId")?;
        let Some(items) = req.params.get("students").and_then(|v| v.as_array()) else {
            return Err(HandlerError::bad_params("students must be an array"));
        };
        let mut pairs = Vec::with_capacity(items.len());
        for item in items {
            let Some(student) = item.get("studentId").and_then(|v| v.as_i64()) else {
                return Err(HandlerError::bad_params("each entry needs an integer studentId"));
            };
            let program = match item.get("programId") {
                None => None,
                Some(v) if v.is_null() => None,
                Some(v) => match v.as_i64() {
                    Some(id) => Some(id),
                    None => return Err(HandlerError::bad_params("programId must be an integer")),
                },
            };
            pairs.push((student, program));
        }
        store.replace_instructor_students(instructor, &pairs)?;
        Ok(json!({ "assignments": store.list_students_for_instructor(instructor)? }))
    })
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "assignments.assign" => Some(handle_assign(state, req)),
        "assignments.unassign" => Some(handle_unassign(state, req)),
        "assignments.listChildren" => Some(handle_list_children(state, req)),
        "assignments.listParents" => Some(handle_list_parents(state, req)),
        "assignments.replaceParents" => Some(handle_replace_parents(state, req)),
        "assignments.instructorStudents.list" => Some(handle_instructor_students_list(state, req)),
        "assignments.instructorStudents.assign" => {
            Some(handle_instructor_students_assign(state, req))
        }
        "assignments.instructorStudents.unassign" => {
            Some(handle_instructor_students_unassign(state, req))
        }
        "assignments.instructorStudents.replace" => {
            Some(handle_instructor_students_replace(state, req))
        }
        _ => None,
    }
}
