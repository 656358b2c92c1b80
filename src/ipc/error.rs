use crate::error::StoreError;
use serde_json::json;

pub fn ok(id: &str, result: serde_json::Value) -> serde_json::Value {
    json!({
        "id": id,
        "ok": true,
        "result": result
    })
}

pub fn err(
    id: &str,
    code: &str,
    message: impl Into<String>,
    details: Option<serde_json::Value>,
) -> serde_json::Value {
    let mut error = json!({
        "code": code,
        "message": message.into(),
    });
    if let Some(d) = details {
        error["details"] = d;
    }
    json!({
        "id": id,
        "ok": false,
        "error": error,
    })
}

/// Why a handler could not produce a result. Turned into an error envelope
/// by `HandlerError::into_response`.
#[derive(Debug)]
pub enum HandlerError {
    BadParams(String),
    NoWorkspace,
    Store(StoreError),
}

impl From<StoreError> for HandlerError {
    fn from(e: StoreError) -> Self {
        HandlerError::Store(e)
    }
}

impl HandlerError {
    pub fn bad_params(message: impl Into<String>) -> Self {
        HandlerError::BadParams(message.into())
    }

    pub fn into_response(self, id: &str) -> serde_json::Value {
        match self {
            HandlerError::BadParams(m) => err(id, "bad_params", m, None),
            HandlerError::NoWorkspace => err(id, "no_workspace", "select a workspace first", None),
            HandlerError::Store(e) => {
                let details = match &e {
                    StoreError::HasDependents { count, .. } => Some(json!({ "count": count })),
                    _ => None,
                };
                err(id, e.code(), e.to_string(), details)
            }
        }
    }
}

pub type HandlerResult = Result<serde_json::Value, HandlerError>;
