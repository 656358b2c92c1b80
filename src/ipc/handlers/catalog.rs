use crate::ipc::error::{err, HandlerError};
use crate::ipc::helpers::{
    bool_or, id_list_or_empty, opt_i64, opt_id_list, opt_str, req_i64, req_str, respond,
    with_store,
};
use crate::ipc::types::{AppState, Request};
use crate::model::{ControlType, QuestionDraft};
use crate::state::LoadState;
use crate::store::Link;
use serde_json::json;

fn handle_programs_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let AppState { store, programs, .. } = state;
    let Some(store) = store.as_ref() else {
        return respond(req, Err(HandlerError::NoWorkspace));
    };
    programs.refresh_if_stale(store);
    let result = match programs.state() {
        LoadState::Success(list) => list
            .iter()
            .map(|p| {
                // Include POI counts so the list can warn before a delete.
                let pois = store.count_children(Link::PoiProgram, p.id)?;
                Ok(json!({ "id": p.id, "name": p.name, "poiCount": pois }))
            })
            .collect::<Result<Vec<_>, HandlerError>>()
            .map(|rows| json!({ "programs": rows })),
        LoadState::Error(message) => return err(&req.id, "db_error", message.as_str(), None),
        LoadState::Loading => return err(&req.id, "db_error", "programs not loaded", None),
    };
    respond(req, result)
}

fn handle_programs_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    with_store(state, req, |store| {
        let name = req_str(req, "name")?;
        Ok(json!({ "program": store.create_program(&name)? }))
    })
}

fn handle_programs_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    with_store(state, req, |store| {
        let id = req_i64(req, "programId")?;
        let name = req_str(req, "name")?;
        Ok(json!({ "program": store.update_program(id, &name)? }))
    })
}

fn handle_programs_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    with_store(state, req, |store| {
        let id = req_i64(req, "programId")?;
        store.delete_program(id, bool_or(req, "restrictChildren", false)?)?;
        Ok(json!({ "ok": true }))
    })
}

fn handle_pois_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    with_store(state, req, |store| {
        let pois = match opt_i64(req, "programId")? {
            Some(program_id) => store.list_pois_for_program(program_id)?,
            None => store.list_pois()?,
        };
        Ok(json!({ "pois": pois }))
    })
}

fn handle_pois_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    with_store(state, req, |store| {
        let name = req_str(req, "name")?;
        let program_ids = id_list_or_empty(req, "programIds")?;
        let poi = store.create_poi(&name, &program_ids)?;
        Ok(json!({ "poi": poi, "programIds": store.list_parents(Link::PoiProgram, poi.id)? }))
    })
}

fn handle_pois_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    with_store(state, req, |store| {
        let id = req_i64(req, "poiId")?;
        let name = req_str(req, "name")?;
        let program_ids = opt_id_list(req, "programIds")?;
        let poi = store.update_poi(id, &name, program_ids.as_deref())?;
        Ok(json!({ "poi": poi, "programIds": store.list_parents(Link::PoiProgram, poi.id)? }))
    })
}

fn handle_pois_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    with_store(state, req, |store| {
        let id = req_i64(req, "poiId")?;
        store.delete_poi(id, bool_or(req, "restrictChildren", false)?)?;
        Ok(json!({ "ok": true }))
    })
}

fn handle_tasks_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    with_store(state, req, |store| {
        let tasks = match opt_i64(req, "poiId")? {
            Some(poi_id) => store.list_tasks_for_poi(poi_id)?,
            None => store.list_tasks()?,
        };
        Ok(json!({ "tasks": tasks }))
    })
}

fn handle_tasks_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    with_store(state, req, |store| {
        let name = req_str(req, "name")?;
        let poi_ids = id_list_or_empty(req, "poiIds")?;
        let task = store.create_task(&name, &poi_ids)?;
        Ok(json!({ "task": task, "poiIds": store.list_parents(Link::TaskPoi, task.id)? }))
    })
}

fn handle_tasks_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    with_store(state, req, |store| {
        let id = req_i64(req, "taskId")?;
        let name = req_str(req, "name")?;
        let poi_ids = opt_id_list(req, "poiIds")?;
        let task = store.update_task(id, &name, poi_ids.as_deref())?;
        Ok(json!({ "task": task, "poiIds": store.list_parents(Link::TaskPoi, task.id)? }))
    })
}

fn handle_tasks_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    with_store(state, req, |store| {
        let id = req_i64(req, "taskId")?;
        store.delete_task(id, bool_or(req, "restrictChildren", false)?)?;
        Ok(json!({ "ok": true }))
    })
}

fn question_draft(req: &Request) -> Result<QuestionDraft, HandlerError> {
    let control_type = match opt_str(req, "controlType")? {
        Some(s) => ControlType::parse(&s)
            .ok_or_else(|| HandlerError::bad_params(format!("unknown controlType: {s}")))?,
        None => ControlType::Text,
    };
    Ok(QuestionDraft {
        sub_task: req_str(req, "subTask")?,
        control_type,
        scale_id: opt_i64(req, "scaleId")?,
        critical_task: bool_or(req, "criticalTask", false)?,
    })
}

fn handle_questions_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    with_store(state, req, |store| {
        let questions = match opt_i64(req, "taskId")? {
            Some(task_id) => store.list_questions_for_task(task_id)?,
            None => store.list_questions()?,
        };
        Ok(json!({ "questions": questions }))
    })
}

fn handle_questions_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    with_store(state, req, |store| {
        let draft = question_draft(req)?;
        let task_ids = id_list_or_empty(req, "taskIds")?;
        let question = store.create_question(&draft, &task_ids)?;
        Ok(json!({
            "question": question,
            "taskIds": store.list_parents(Link::QuestionTask, question.id)?,
        }))
    })
}

fn handle_questions_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    with_store(state, req, |store| {
        let id = req_i64(req, "questionId")?;
        let draft = question_draft(req)?;
        let task_ids = opt_id_list(req, "taskIds")?;
        let question = store.update_question(id, &draft, task_ids.as_deref())?;
        Ok(json!({
            "question": question,
            "taskIds": store.list_parents(Link::QuestionTask, question.id)?,
        }))
    })
}

fn handle_questions_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    with_store(state, req, |store| {
        store.delete_question(req_i64(req, "questionId")?)?;
        Ok(json!({ "ok": true }))
    })
}

/// Either `{programId, poiId}` or `{programName, poiName}`.
fn handle_questions_for_program_poi(state: &mut AppState, req: &Request) -> serde_json::Value {
    with_store(state, req, |store| {
        let questions = match (opt_i64(req, "programId")?, opt_i64(req, "poiId")?) {
            (Some(program_id), Some(poi_id)) => store.questions_for(program_id, poi_id)?,
            _ => {
                let program = req_str(req, "programName")?;
                let poi = req_str(req, "poiName")?;
                store.questions_for_names(&program, &poi)?
            }
        };
        Ok(json!({ "questions": questions }))
    })
}

fn handle_scales_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    with_store(state, req, |store| {
        let scales: Vec<_> = store
            .list_scales()?
            .into_iter()
            .map(|s| {
                let options = s.option_list();
                json!({ "id": s.id, "name": s.name, "options": s.options, "optionList": options })
            })
            .collect();
        Ok(json!({ "scales": scales }))
    })
}

fn handle_scales_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    with_store(state, req, |store| {
        let name = req_str(req, "name")?;
        let options = opt_str(req, "options")?.unwrap_or_default();
        Ok(json!({ "scale": store.create_scale(&name, &options)? }))
    })
}

fn handle_scales_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    with_store(state, req, |store| {
        let id = req_i64(req, "scaleId")?;
        let name = req_str(req, "name")?;
        let options = opt_str(req, "options")?.unwrap_or_default();
        Ok(json!({ "scale": store.update_scale(id, &name, &options)? }))
    })
}

fn handle_scales_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    with_store(state, req, |store| {
        store.delete_scale(req_i64(req, "scaleId")?)?;
        Ok(json!({ "ok": true }))
    })
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "programs.list" => Some(handle_programs_list(state, req)),
        "programs.create" => Some(handle_programs_create(state, req)),
        "programs.update" => Some(handle_programs_update(state, req)),
        "programs.delete" => Some(handle_programs_delete(state, req)),
        "pois.list" => Some(handle_pois_list(state, req)),
        "pois.create" => Some(handle_pois_create(state, req)),
        "pois.update" => Some(handle_pois_update(state, req)),
        "pois.delete" => Some(handle_pois_delete(state, req)),
        "tasks.list" => Some(handle_tasks_list(state, req)),
        "tasks.create" => Some(handle_tasks_create(state, req)),
        "tasks.update" => Some(handle_tasks_update(state, req)),
        "tasks.delete" => Some(handle_tasks_delete(state, req)),
        "questions.list" => Some(handle_questions_list(state, req)),
        "questions.create" => Some(handle_questions_create(state, req)),
        "questions.update" => Some(handle_questions_update(state, req)),
        "questions.delete" => Some(handle_questions_delete(state, req)),
        "questions.forProgramPoi" => Some(handle_questions_for_program_poi(state, req)),
        "scales.list" => Some(handle_scales_list(state, req)),
        "scales.create" => Some(handle_scales_create(state, req)),
        "scales.update" => Some(handle_scales_update(state, req)),
        "scales.delete" => Some(handle_scales_delete(state, req)),
        _ => None,
    }
}
