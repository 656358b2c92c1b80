use crate::ipc::error::HandlerError;
use crate::ipc::helpers::{opt_f64, opt_str, req_i64, req_str, with_store};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_results_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    with_store(state, req, |store| {
        let results = store.list_results_for_student(req_i64(req, "studentId")?)?;
        Ok(json!({ "results": results }))
    })
}

fn handle_results_record(state: &mut AppState, req: &Request) -> serde_json::Value {
    with_store(state, req, |store| {
        let Some(score) = opt_f64(req, "score")? else {
            return Err(HandlerError::bad_params("missing score"));
        };
        let comment = opt_str(req, "comment")?.unwrap_or_default();
        let result = store.record_result(
            req_i64(req, "studentId")?,
            req_i64(req, "instructorId")?,
            req_i64(req, "questionId")?,
            score,
            &comment,
        )?;
        Ok(json!({ "result": result }))
    })
}

fn handle_results_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    with_store(state, req, |store| {
        store.delete_result(req_i64(req, "resultId")?)?;
        Ok(json!({ "ok": true }))
    })
}

fn handle_comments_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    with_store(state, req, |store| {
        let comments = store.list_comments_for_student(req_i64(req, "studentId")?)?;
        Ok(json!({ "comments": comments }))
    })
}

fn handle_comments_add(state: &mut AppState, req: &Request) -> serde_json::Value {
    with_store(state, req, |store| {
        let comment = store.add_comment(
            req_i64(req, "studentId")?,
            req_i64(req, "instructorId")?,
            &req_str(req, "text")?,
        )?;
        Ok(json!({ "comment": comment }))
    })
}

fn handle_comments_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    with_store(state, req, |store| {
        store.delete_comment(req_i64(req, "commentId")?)?;
        Ok(json!({ "ok": true }))
    })
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "results.list" => Some(handle_results_list(state, req)),
        "results.record" => Some(handle_results_record(state, req)),
        "results.delete" => Some(handle_results_delete(state, req)),
        "comments.list" => Some(handle_comments_list(state, req)),
        "comments.add" => Some(handle_comments_add(state, req)),
        "comments.delete" => Some(handle_comments_delete(state, req)),
        _ => None,
    }
}
