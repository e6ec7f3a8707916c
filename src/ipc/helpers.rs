use crate::ipc::error::err;
use crate::ipc::types::Request;
use crate::model::{Day, Shift};
use rusqlite::Connection;
use serde::de::DeserializeOwned;
use serde_json::Value;

pub fn db_conn<'a>(db: &'a Option<Connection>, req: &Request) -> Result<&'a Connection, Value> {
    db.as_ref()
        .ok_or_else(|| err(&req.id, "no_workspace", "select a workspace first", None))
}

pub fn required_str<'a>(req: &'a Request, key: &str) -> Result<&'a str, Value> {
    match req.params.get(key).and_then(|v| v.as_str()) {
        Some(s) if !s.trim().is_empty() => Ok(s.trim()),
        _ => Err(err(&req.id, "bad_params", format!("missing {}", key), None)),
    }
}

pub fn optional_str<'a>(req: &'a Request, key: &str) -> Option<&'a str> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Deserializes the whole params object; a missing object reads as `{}`.
pub fn parse_params<T: DeserializeOwned>(req: &Request) -> Result<T, Value> {
    let params = if req.params.is_null() {
        Value::Object(Default::default())
    } else {
        req.params.clone()
    };
    serde_json::from_value(params)
        .map_err(|e| err(&req.id, "bad_params", format!("invalid params: {}", e), None))
}

pub fn required_day(req: &Request, key: &str) -> Result<Day, Value> {
    let raw = required_str(req, key)?;
    Day::parse(raw).ok_or_else(|| {
        err(
            &req.id,
            "bad_params",
            format!("{} must be one of Sunday..Friday", key),
            None,
        )
    })
}

pub fn optional_day(req: &Request, key: &str) -> Result<Option<Day>, Value> {
    match optional_str(req, key) {
        None => Ok(None),
        Some(_) => required_day(req, key).map(Some),
    }
}

pub fn day_list(req: &Request, key: &str) -> Result<Vec<Day>, Value> {
    let Some(items) = req.params.get(key).and_then(|v| v.as_array()) else {
        return Err(err(&req.id, "bad_params", format!("{} must be an array", key), None));
    };
    items
        .iter()
        .map(|v| v.as_str().and_then(Day::parse))
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| {
            err(
                &req.id,
                "bad_params",
                format!("{} must contain day names", key),
                None,
            )
        })
}

pub fn optional_shift(req: &Request, key: &str) -> Result<Option<Shift>, Value> {
    match optional_str(req, key) {
        None => Ok(None),
        Some(raw) => Shift::parse(raw).map(Some).ok_or_else(|| {
            err(
                &req.id,
                "bad_params",
                format!("{} must be Morning or Day", key),
                None,
            )
        }),
    }
}
