use crate::backup;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use serde_json::json;
use std::path::PathBuf;
use tracing::warn;

fn path_param(req: &Request, key: &str) -> Option<PathBuf> {
    match req.params.get(key).and_then(|v| v.as_str()) {
        Some(v) if !v.trim().is_empty() => Some(PathBuf::from(v.trim())),
        _ => None,
    }
}

fn handle_export_workspace_bundle(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(out) = path_param(req, "outPath") else {
        return err(&req.id, "bad_params", "missing outPath", None);
    };
    let Some(workspace_path) = path_param(req, "workspacePath").or_else(|| state.workspace.clone())
    else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    match backup::export_workspace_bundle(&workspace_path, &out) {
        Ok(export) => ok(
            &req.id,
            json!({
                "path": out.to_string_lossy(),
                "bundleFormat": export.bundle_format,
                "bundleId": export.bundle_id,
                "dbSha256": export.db_sha256,
            }),
        ),
        Err(e) => err(
            &req.id,
            "backup_failed",
            format!("{e:#}"),
            Some(json!({ "path": out.to_string_lossy() })),
        ),
    }
}

fn handle_import_workspace_bundle(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(src) = path_param(req, "inPath") else {
        return err(&req.id, "bad_params", "missing inPath", None);
    };
    let Some(workspace_path) = path_param(req, "workspacePath").or_else(|| state.workspace.clone())
    else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    if !src.is_file() {
        return err(
            &req.id,
            "not_found",
            "bundle file not found",
            Some(json!({ "path": src.to_string_lossy() })),
        );
    }

    // The open handle must be released before the database file is replaced.
    state.store = None;

    let import = match backup::import_workspace_bundle(&src, &workspace_path) {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %format!("{e:#}"), "bundle import failed");
            // Leave the previous workspace usable when the import is rejected.
            if let Some(prev) = state.workspace.clone() {
                let _ = state.open_workspace(&prev);
            }
            return err(
                &req.id,
                "backup_failed",
                format!("{e:#}"),
                Some(json!({ "path": src.to_string_lossy() })),
            );
        }
    };

    match state.open_workspace(&workspace_path) {
        Ok(seeded) => ok(
            &req.id,
            json!({
                "workspacePath": workspace_path.to_string_lossy(),
                "bundleFormatDetected": import.bundle_format_detected,
                "seeded": seeded,
            }),
        ),
        Err(e) => err(&req.id, "db_open_failed", format!("{e:#}"), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "backup.exportWorkspaceBundle" => Some(handle_export_workspace_bundle(state, req)),
        "backup.importWorkspaceBundle" => Some(handle_import_workspace_bundle(state, req)),
        _ => None,
    }
}
