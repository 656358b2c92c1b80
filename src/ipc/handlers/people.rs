use crate::ipc::helpers::{bool_or, opt_role, person_draft, req_i64, with_store};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_users_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    with_store(state, req, |store| {
        let role = opt_role(req, "role")?;
        Ok(json!({ "users": store.list_users(role)? }))
    })
}

fn handle_users_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    with_store(state, req, |store| {
        let draft = person_draft(req)?;
        Ok(json!({ "user": store.create_user(&draft)? }))
    })
}

fn handle_users_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    with_store(state, req, |store| {
        let id = req_i64(req, "userId")?;
        let draft = person_draft(req)?;
        Ok(json!({ "user": store.update_user(id, &draft)? }))
    })
}

/// Deleting an instructor with students assigned fails with
/// `has_dependents` unless `force` is set.
fn handle_users_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    with_store(state, req, |store| {
        let id = req_i64(req, "userId")?;
        store.delete_user(id, bool_or(req, "force", false)?)?;
        Ok(json!({ "ok": true }))
    })
}

fn handle_students_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    with_store(state, req, |store| {
        Ok(json!({ "students": store.list_students()? }))
    })
}

fn handle_students_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    with_store(state, req, |store| {
        let draft = person_draft(req)?;
        Ok(json!({ "student": store.create_student(&draft)? }))
    })
}

fn handle_students_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    with_store(state, req, |store| {
        let id = req_i64(req, "studentId")?;
        let draft = person_draft(req)?;
        Ok(json!({ "student": store.update_student(id, &draft)? }))
    })
}

fn handle_students_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    with_store(state, req, |store| {
        store.delete_student(req_i64(req, "studentId")?)?;
        Ok(json!({ "ok": true }))
    })
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "users.list" => Some(handle_users_list(state, req)),
        "users.create" => Some(handle_users_create(state, req)),
        "users.update" => Some(handle_users_update(state, req)),
        "users.delete" => Some(handle_users_delete(state, req)),
        "students.list" => Some(handle_students_list(state, req)),
        "students.create" => Some(handle_students_create(state, req)),
        "students.update" => Some(handle_students_update(state, req)),
        "students.delete" => Some(handle_students_delete(state, req)),
        _ => None,
    }
}
