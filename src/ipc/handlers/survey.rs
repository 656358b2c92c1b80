use crate::ipc::error::HandlerError;
use crate::ipc::helpers::{id_list_or_empty, opt_i64, opt_str, req_i64, req_str, with_store};
use crate::ipc::types::{AppState, Request};
use crate::model::InputType;
use serde_json::json;

fn input_type(req: &Request) -> Result<InputType, HandlerError> {
    match opt_str(req, "inputType")? {
        Some(s) => InputType::parse(&s)
            .ok_or_else(|| HandlerError::bad_params(format!("unknown inputType: {s}"))),
        None => Ok(InputType::Text),
    }
}

fn handle_questions_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    with_store(state, req, |store| {
        Ok(json!({ "questions": store.list_survey_questions()? }))
    })
}

fn handle_questions_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    with_store(state, req, |store| {
        let q = store.create_survey_question(
            &req_str(req, "text")?,
            input_type(req)?,
            &opt_str(req, "options")?.unwrap_or_default(),
        )?;
        Ok(json!({ "question": q }))
    })
}

fn handle_questions_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    with_store(state, req, |store| {
        let q = store.update_survey_question(
            req_i64(req, "questionId")?,
            &req_str(req, "text")?,
            input_type(req)?,
            &opt_str(req, "options")?.unwrap_or_default(),
        )?;
        Ok(json!({ "question": q }))
    })
}

fn handle_questions_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    with_store(state, req, |store| {
        store.delete_survey_question(req_i64(req, "questionId")?)?;
        Ok(json!({ "ok": true }))
    })
}

fn handle_templates_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    with_store(state, req, |store| {
        let templates: Vec<_> = store
            .list_templates()?
            .into_iter()
            .map(|t| {
                let ids = t.question_id_list();
                json!({ "id": t.id, "name": t.name, "questionIds": ids })
            })
            .collect();
        Ok(json!({ "templates": templates }))
    })
}

fn handle_templates_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    with_store(state, req, |store| {
        let t = store.create_template(&req_str(req, "name")?, &id_list_or_empty(req, "questionIds")?)?;
        Ok(json!({ "template": { "id": t.id, "name": t.name, "questionIds": t.question_id_list() } }))
    })
}

fn handle_templates_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    with_store(state, req, |store| {
        let t = store.update_template(
            req_i64(req, "templateId")?,
            &req_str(req, "name")?,
            &id_list_or_empty(req, "questionIds")?,
        )?;
        Ok(json!({ "template": { "id": t.id, "name": t.name, "questionIds": t.question_id_list() } }))
    })
}

fn handle_templates_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    with_store(state, req, |store| {
        store.delete_template(req_i64(req, "templateId")?)?;
        Ok(json!({ "ok": true }))
    })
}

fn handle_templates_questions(state: &mut AppState, req: &Request) -> serde_json::Value {
    with_store(state, req, |store| {
        let questions = store.template_questions(req_i64(req, "templateId")?)?;
        Ok(json!({ "questions": questions }))
    })
}

fn handle_responses_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    with_store(state, req, |store| {
        Ok(json!({ "responses": store.list_responses(req_i64(req, "templateId")?)? }))
    })
}

fn handle_responses_submit(state: &mut AppState, req: &Request) -> serde_json::Value {
    with_store(state, req, |store| {
        let r = store.submit_response(
            req_i64(req, "templateId")?,
            opt_i64(req, "userId")?,
            req_i64(req, "questionId")?,
            &req_str(req, "answer")?,
        )?;
        Ok(json!({ "response": r }))
    })
}

fn handle_responses_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    with_store(state, req, |store| {
        store.delete_response(req_i64(req, "responseId")?)?;
        Ok(json!({ "ok": true }))
    })
}

fn handle_projects_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    with_store(state, req, |store| {
        Ok(json!({ "projects": store.list_projects()? }))
    })
}

fn handle_projects_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    with_store(state, req, |store| {
        let p = store.create_project(
            &req_str(req, "name")?,
            &opt_str(req, "description")?.unwrap_or_default(),
        )?;
        Ok(json!({ "project": p }))
    })
}

fn handle_projects_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    with_store(state, req, |store| {
        let p = store.update_project(
            req_i64(req, "projectId")?,
            &req_str(req, "name")?,
            &opt_str(req, "description")?.unwrap_or_default(),
        )?;
        Ok(json!({ "project": p }))
    })
}

fn handle_projects_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    with_store(state, req, |store| {
        store.delete_project(req_i64(req, "projectId")?)?;
        Ok(json!({ "ok": true }))
    })
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "survey.questions.list" => Some(handle_questions_list(state, req)),
        "survey.questions.create" => Some(handle_questions_create(state, req)),
        "survey.questions.update" => Some(handle_questions_update(state, req)),
        "survey.questions.delete" => Some(handle_questions_delete(state, req)),
        "survey.templates.list" => Some(handle_templates_list(state, req)),
        "survey.templates.create" => Some(handle_templates_create(state, req)),
        "survey.templates.update" => Some(handle_templates_update(state, req)),
        "survey.templates.delete" => Some(handle_templates_delete(state, req)),
        "survey.templates.questions" => Some(handle_templates_questions(state, req)),
        "survey.responses.list" => Some(handle_responses_list(state, req)),
        "survey.responses.submit" => Some(handle_responses_submit(state, req)),
        "survey.responses.delete" => Some(handle_responses_delete(state, req)),
        "projects.list" => Some(handle_projects_list(state, req)),
        "projects.create" => Some(handle_projects_create(state, req)),
        "projects.update" => Some(handle_projects_update(state, req)),
        "projects.delete" => Some(handle_projects_delete(state, req)),
        _ => None,
    }
}
