use crate::api::{ApiResult, LocalApi, RoutineApi};
use crate::ipc::error::{api_err, err, ok};
use crate::ipc::helpers::{db_conn, day_list, optional_shift, parse_params, required_day, required_str};
use crate::ipc::types::{AppState, Request};
use crate::model::{CopyRequest, EntryInput, EntryPatch, RoutineEntry};
use serde_json::json;

fn entry_result(req: &Request, res: ApiResult<RoutineEntry>) -> serde_json::Value {
    match res {
        Ok(entry) => ok(&req.id, json!({ "entry": entry })),
        Err(e) => api_err(&req.id, &e),
    }
}

fn handle_entries_grid(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(&state.db, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let routine_id = match required_str(req, "routineId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let shift = match optional_shift(req, "shift") {
        Ok(Some(s)) => s,
        Ok(None) => return err(&req.id, "bad_params", "missing shift", None),
        Err(resp) => return resp,
    };
    let api = LocalApi::new(conn);
    match api.fetch_grid(routine_id, shift) {
        Ok(snapshot) => ok(&req.id, json!(snapshot)),
        Err(e) => api_err(&req.id, &e),
    }
}

fn handle_entries_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(&state.db, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let input: EntryInput = match parse_params(req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    entry_result(req, LocalApi::new(conn).create_entry(&input))
}

fn handle_entries_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(&state.db, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let id = match required_str(req, "id") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let patch: EntryPatch = match parse_params(req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    entry_result(req, LocalApi::new(conn).update_entry(id, &patch))
}

fn handle_entries_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(&state.db, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let id = match required_str(req, "id") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match LocalApi::new(conn).delete_entry(id) {
        Ok(()) => ok(&req.id, json!({ "ok": true })),
        Err(e) => api_err(&req.id, &e),
    }
}

fn handle_entries_restore(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(&state.db, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let id = match required_str(req, "id") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    entry_result(req, LocalApi::new(conn).restore_entry(id))
}

fn handle_entries_copy(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(&state.db, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let routine_id = match required_str(req, "routineId") {
        Ok(v) => v.to_string(),
        Err(resp) => return resp,
    };
    let source_day = match required_day(req, "sourceDay") {
        Ok(d) => d,
        Err(resp) => return resp,
    };
    let target_days = match day_list(req, "targetDays") {
        Ok(d) => d,
        Err(resp) => return resp,
    };
    let shift = match optional_shift(req, "shift") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let copy = CopyRequest {
        routine_id,
        source_day,
        target_days,
        shift,
    };
    match LocalApi::new(conn).copy_entries(&copy) {
        Ok(outcome) => ok(&req.id, json!(outcome)),
        Err(e) => api_err(&req.id, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "routineEntries.grid" => Some(handle_entries_grid(state, req)),
        "routineEntries.create" => Some(handle_entries_create(state, req)),
        "routineEntries.update" => Some(handle_entries_update(state, req)),
        "routineEntries.delete" => Some(handle_entries_delete(state, req)),
        "routineEntries.restore" => Some(handle_entries_restore(state, req)),
        "routineEntries.copy" => Some(handle_entries_copy(state, req)),
        _ => None,
    }
}
