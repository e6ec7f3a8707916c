use crate::ipc::error::{err, ok};
use crate::ipc::helpers::db_conn;
use crate::ipc::types::{AppState, Request};
use crate::store::settings::{self, DeskSettings, RoutineSettings};
use serde_json::{json, Map, Value};
use std::ops::RangeInclusive;

#[derive(Clone, Copy)]
enum SetupSection {
    Desk,
    Routines,
}

impl SetupSection {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "desk" => Some(Self::Desk),
            "routines" => Some(Self::Routines),
            _ => None,
        }
    }

    fn key(self) -> &'static str {
        match self {
            Self::Desk => "setup.desk",
            Self::Routines => "setup.routines",
        }
    }
}

/// Desk defaults come from the process config so env overrides show through.
fn default_section(section: SetupSection, base: DeskSettings) -> Value {
    match section {
        SetupSection::Desk => base.to_json(),
        SetupSection::Routines => RoutineSettings::default().to_json(),
    }
}

fn as_object_mut(value: &mut Value) -> Result<&mut Map<String, Value>, String> {
    value
        .as_object_mut()
        .ok_or_else(|| "internal setup object must be a JSON object".to_string())
}

fn parse_i64_range(v: &Value, key: &str, range: RangeInclusive<i64>) -> Result<i64, String> {
    let n = v
        .as_i64()
        .ok_or_else(|| format!("{} must be integer", key))?;
    if !range.contains(&n) {
        return Err(format!("{} must be in {}..={}", key, range.start(), range.end()));
    }
    Ok(n)
}

fn parse_nullable_string_max(v: &Value, key: &str, max_len: usize) -> Result<Value, String> {
    if v.is_null() {
        return Ok(Value::Null);
    }
    let s = v.as_str().ok_or_else(|| format!("{} must be string", key))?;
    let s = s.trim();
    if s.len() > max_len {
        return Err(format!("{} length must be <= {}", key, max_len));
    }
    if s.is_empty() {
        return Ok(Value::Null);
    }
    Ok(Value::String(s.to_string()))
}

fn merge_section_patch(
    section: SetupSection,
    current: &mut Value,
    patch: &Map<String, Value>,
) -> Result<(), String> {
    let obj = as_object_mut(current)?;
    for (k, v) in patch {
        match section {
            SetupSection::Desk => match k.as_str() {
                "undoWindowSeconds" => {
                    let n = parse_i64_range(v, k, settings::UNDO_WINDOW_RANGE)?;
                    obj.insert(k.clone(), Value::from(n));
                }
                "searchDebounceMs" => {
                    let n = parse_i64_range(v, k, settings::SEARCH_DEBOUNCE_RANGE)?;
                    obj.insert(k.clone(), Value::from(n));
                }
                _ => return Err(format!("unknown desk field: {}", k)),
            },
            SetupSection::Routines => match k.as_str() {
                "perPage" => {
                    obj.insert(k.clone(), Value::from(parse_i64_range(v, k, 1..=100)?));
                }
                "defaultInstitution" => {
                    obj.insert(k.clone(), parse_nullable_string_max(v, k, 200)?);
                }
                _ => return Err(format!("unknown routines field: {}", k)),
            },
        }
    }
    Ok(())
}

fn load_section(
    conn: &rusqlite::Connection,
    section: SetupSection,
    base: DeskSettings,
) -> anyhow::Result<Value> {
    let mut current = default_section(section, base);
    if let Some(saved) = settings::settings_get_json(conn, section.key())? {
        if let Some(saved_obj) = saved.as_object() {
            // Malformed historical values must not block the setup screen.
            if let Err(msg) = merge_section_patch(section, &mut current, saved_obj) {
                tracing::warn!(section = section.key(), %msg, "ignoring stored setup values");
            }
        }
    }
    Ok(current)
}

fn handle_setup_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(&state.db, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let base = state.config.desk;
    let desk = match load_section(conn, SetupSection::Desk, base) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let routines = match load_section(conn, SetupSection::Routines, base) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    ok(
        &req.id,
        json!({
            "desk": desk,
            "routines": routines
        }),
    )
}

fn handle_setup_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(&state.db, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let Some(section_raw) = req.params.get("section").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing section", None);
    };
    let Some(section) = SetupSection::parse(section_raw) else {
        return err(&req.id, "bad_params", "unknown section", None);
    };
    let Some(patch_obj) = req.params.get("patch").and_then(|v| v.as_object()) else {
        return err(&req.id, "bad_params", "patch must be an object", None);
    };

    let base = state.config.desk;
    let mut current = match load_section(conn, section, base) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    if let Err(msg) = merge_section_patch(section, &mut current, patch_obj) {
        return err(&req.id, "bad_params", msg, None);
    }
    if let Err(e) = settings::settings_set_json(conn, section.key(), &current) {
        return err(&req.id, "db_update_failed", e.to_string(), None);
    }
    if let SetupSection::Desk = section {
        let updated = settings::load_desk(conn, base);
        state.desk.set_settings(updated);
    }
    tracing::info!(section = section.key(), "setup updated");
    ok(&req.id, json!({ "ok": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "setup.get" => Some(handle_setup_get(state, req)),
        "setup.update" => Some(handle_setup_update(state, req)),
        _ => None,
    }
}
