use crate::ipc::error::{err, ok, HandlerError};
use crate::ipc::helpers::{respond, with_store};
use crate::ipc::types::{AppState, Request};
use crate::seed;
use serde_json::json;
use std::path::PathBuf;

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string()),
            "generation": state.store.as_ref().map(|s| s.generation()),
        }),
    )
}

fn handle_workspace_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let p = req
        .params
        .get("path")
        .and_then(|v| v.as_str())
        .map(PathBuf::from);
    let Some(path) = p else {
        return err(&req.id, "bad_params", "missing params.path", None);
    };

    match state.open_workspace(&path) {
        Ok(seeded) => ok(
            &req.id,
            json!({ "workspacePath": path.to_string_lossy(), "seeded": seeded }),
        ),
        Err(e) => err(&req.id, "db_open_failed", format!("{e:#}"), None),
    }
}

fn handle_workspace_seed(state: &mut AppState, req: &Request) -> serde_json::Value {
    with_store(state, req, |store| {
        let report = seed::prepopulate(store)?;
        Ok(json!({ "seeded": report }))
    })
}

fn handle_workspace_counts(state: &mut AppState, req: &Request) -> serde_json::Value {
    const TABLES: &[(&str, &str)] = &[
        ("programs", "programs"),
        ("pois", "pois"),
        ("tasks", "tasks"),
        ("questions", "questions"),
        ("scales", "scales"),
        ("users", "users"),
        ("students", "students"),
        ("results", "evaluation_results"),
    ];
    let Some(store) = state.store.as_ref() else {
        return respond(req, Err(HandlerError::NoWorkspace));
    };
    let mut counts = serde_json::Map::new();
    for (key, table) in TABLES {
        match store.count_rows(table) {
            Ok(n) => {
                counts.insert(key.to_string(), json!(n));
            }
            Err(e) => return respond(req, Err(e.into())),
        }
    }
    ok(&req.id, json!({ "counts": counts }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "workspace.select" => Some(handle_workspace_select(state, req)),
        "workspace.seed" => Some(handle_workspace_seed(state, req)),
        "workspace.counts" => Some(handle_workspace_counts(state, req)),
        _ => None,
    }
}
