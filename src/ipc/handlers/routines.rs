use crate::api::{ApiResult, LocalApi, RoutineApi};
use crate::ipc::error::{api_err, ok};
use crate::ipc::helpers::{db_conn, parse_params, required_str};
use crate::ipc::types::{AppState, Request};
use crate::model::{Routine, RoutineInput, RoutineQuery};
use serde_json::json;

fn routine_result(req: &Request, res: ApiResult<Routine>) -> serde_json::Value {
    match res {
        Ok(routine) => ok(&req.id, json!({ "routine": routine })),
        Err(e) => api_err(&req.id, &e),
    }
}

fn handle_routines_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(&state.db, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let query: RoutineQuery = match parse_params(req) {
        Ok(q) => q,
        Err(resp) => return resp,
    };
    match LocalApi::new(conn).list_routines(&query) {
        Ok(page) => ok(&req.id, json!(page)),
        Err(e) => api_err(&req.id, &e),
    }
}

fn handle_routines_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(&state.db, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let input: RoutineInput = match parse_params(req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    routine_result(req, LocalApi::new(conn).create_routine(&input))
}

fn handle_routines_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(&state.db, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let id = match required_str(req, "id") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let input: RoutineInput = match parse_params(req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    routine_result(req, LocalApi::new(conn).update_routine(id, &input))
}

/// get, delete, archive and publish all take just `{ id }`.
fn handle_routine_by_id(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(&state.db, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let id = match required_str(req, "id") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let api = LocalApi::new(conn);
    match req.method.as_str() {
        "routines.delete" => match api.delete_routine(id) {
            Ok(()) => ok(&req.id, json!({ "ok": true })),
            Err(e) => api_err(&req.id, &e),
        },
        "routines.archive" => routine_result(req, api.archive_routine(id)),
        "routines.publish" => routine_result(req, api.publish_routine(id)),
        _ => routine_result(req, api.get_routine(id)),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "routines.list" => Some(handle_routines_list(state, req)),
        "routines.create" => Some(handle_routines_create(state, req)),
        "routines.update" => Some(handle_routines_update(state, req)),
        "routines.get" | "routines.delete" | "routines.archive" | "routines.publish" => {
            Some(handle_routine_by_id(state, req))
        }
        _ => None,
    }
}
