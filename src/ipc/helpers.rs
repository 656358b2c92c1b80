use crate::ipc::error::{ok, HandlerError, HandlerResult};
use crate::ipc::types::{AppState, Request};
use crate::model::{PersonDraft, Role};
use crate::store::Store;

/// Run a handler body against the open store and wrap its outcome in a
/// response envelope.
pub fn with_store(
    state: &AppState,
    req: &Request,
    f: impl FnOnce(&Store) -> HandlerResult,
) -> serde_json::Value {
    let result = match state.store.as_ref() {
        Some(store) => f(store),
        None => Err(HandlerError::NoWorkspace),
    };
    respond(req, result)
}

pub fn respond(req: &Request, result: HandlerResult) -> serde_json::Value {
    match result {
        Ok(v) => ok(&req.id, v),
        Err(e) => e.into_response(&req.id),
    }
}

pub fn req_i64(req: &Request, key: &str) -> Result<i64, HandlerError> {
    match req.params.get(key) {
        Some(v) => v
            .as_i64()
            .ok_or_else(|| HandlerError::bad_params(format!("{key} must be an integer"))),
        None => Err(HandlerError::bad_params(format!("missing {key}"))),
    }
}

pub fn opt_i64(req: &Request, key: &str) -> Result<Option<i64>, HandlerError> {
    match req.params.get(key) {
        None => Ok(None),
        Some(v) if v.is_null() => Ok(None),
        Some(v) => v
            .as_i64()
            .map(Some)
            .ok_or_else(|| HandlerError::bad_params(format!("{key} must be an integer"))),
    }
}

pub fn req_str(req: &Request, key: &str) -> Result<String, HandlerError> {
    match req.params.get(key) {
        Some(v) => v
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| HandlerError::bad_params(format!("{key} must be a string"))),
        None => Err(HandlerError::bad_params(format!("missing {key}"))),
    }
}

pub fn opt_str(req: &Request, key: &str) -> Result<Option<String>, HandlerError> {
    match req.params.get(key) {
        None => Ok(None),
        Some(v) if v.is_null() => Ok(None),
        Some(v) => v
            .as_str()
            .map(|s| Some(s.to_string()))
            .ok_or_else(|| HandlerError::bad_params(format!("{key} must be a string"))),
    }
}

pub fn bool_or(req: &Request, key: &str, default: bool) -> Result<bool, HandlerError> {
    match req.params.get(key) {
        None => Ok(default),
        Some(v) if v.is_null() => Ok(default),
        Some(v) => v
            .as_bool()
            .ok_or_else(|| HandlerError::bad_params(format!("{key} must be a boolean"))),
    }
}

pub fn opt_f64(req: &Request, key: &str) -> Result<Option<f64>, HandlerError> {
    match req.params.get(key) {
        None => Ok(None),
        Some(v) if v.is_null() => Ok(None),
        Some(v) => v
            .as_f64()
            .map(Some)
            .ok_or_else(|| HandlerError::bad_params(format!("{key} must be a number"))),
    }
}

/// Absent means "leave the assignment set alone"; an array replaces it.
pub fn opt_id_list(req: &Request, key: &str) -> Result<Option<Vec<i64>>, HandlerError> {
    let Some(v) = req.params.get(key) else {
        return Ok(None);
    };
    if v.is_null() {
        return Ok(None);
    }
    let Some(items) = v.as_array() else {
        return Err(HandlerError::bad_params(format!("{key} must be an array")));
    };
    items
        .iter()
        .map(|item| {
            item.as_i64()
                .ok_or_else(|| HandlerError::bad_params(format!("{key} must contain integers")))
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
}

pub fn id_list_or_empty(req: &Request, key: &str) -> Result<Vec<i64>, HandlerError> {
    Ok(opt_id_list(req, key)?.unwrap_or_default())
}

pub fn opt_role(req: &Request, key: &str) -> Result<Option<Role>, HandlerError> {
    match opt_str(req, key)? {
        None => Ok(None),
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => Role::parse(&s)
            .map(Some)
            .ok_or_else(|| HandlerError::bad_params(format!("unknown role: {s}"))),
    }
}

pub fn person_draft(req: &Request) -> Result<PersonDraft, HandlerError> {
    Ok(PersonDraft {
        first_name: req_str(req, "firstName")?,
        last_name: req_str(req, "lastName")?,
        grade: opt_str(req, "grade")?.unwrap_or_default(),
        pin: opt_str(req, "pin")?.unwrap_or_default(),
        role: opt_role(req, "role")?,
        assigned_project: opt_str(req, "assignedProject")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn req(params: serde_json::Value) -> Request {
        Request {
            id: "t".into(),
            method: "test".into(),
            params,
        }
    }

    #[test]
    fn id_lists_distinguish_absent_from_empty() {
        assert_eq!(opt_id_list(&req(json!({})), "poiIds").expect("absent"), None);
        assert_eq!(
            opt_id_list(&req(json!({ "poiIds": [] })), "poiIds").expect("empty"),
            Some(vec![])
        );
        assert!(opt_id_list(&req(json!({ "poiIds": ["x"] })), "poiIds").is_err());
    }

    #[test]
    fn missing_and_mistyped_params_are_bad_params() {
        let r = req(json!({ "programId": "7" }));
        let e = req_i64(&r, "programId").expect_err("string id");
        let resp = e.into_response("t");
        assert_eq!(resp["error"]["code"], "bad_params");
        assert!(matches!(req_str(&r, "name"), Err(HandlerError::BadParams(_))));
    }

    #[test]
    fn unknown_role_is_rejected() {
        let r = req(json!({ "firstName": "A", "lastName": "B", "role": "admin" }));
        assert!(person_draft(&r).is_err());
    }
}
