use crate::api::ApiError;
use crate::desk::DeskError;
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

pub fn api_err(id: &str, e: &ApiError) -> serde_json::Value {
    if let ApiError::Db(inner) = e {
        tracing::error!(request_id = id, error = %inner, "storage failure");
    }
    err(id, e.code(), e.to_string(), e.details())
}

pub fn desk_err(id: &str, e: &DeskError) -> serde_json::Value {
    match e {
        DeskError::Api(inner) => api_err(id, inner),
        other => err(id, other.code(), other.to_string(), other.details()),
    }
}
