use crate::api::LocalApi;
use crate::desk::cascade::FormField;
use crate::desk::grid::Click;
use crate::desk::list::FilterPatch;
use crate::desk::status::RoutineAction;
use crate::desk::{Desk, DeskError, Notice};
use crate::ipc::error::{desk_err, err, ok};
use crate::ipc::helpers::{
    day_list, db_conn, optional_day, optional_shift, optional_str, parse_params, required_day,
    required_str,
};
use crate::ipc::types::{AppState, Request};
use chrono::Utc;
use serde_json::{json, Value};

fn with_view(req: &Request, desk: &Desk, mut extra: Value) -> Value {
    if let Some(obj) = extra.as_object_mut() {
        obj.insert("view".to_string(), json!(desk.view()));
    }
    ok(&req.id, extra)
}

fn notice_result(req: &Request, desk: &Desk, res: Result<Notice, DeskError>) -> Value {
    match res {
        Ok(notice) => with_view(req, desk, json!({ "notice": notice })),
        Err(e) => desk_err(&req.id, &e),
    }
}

fn handle_desk_open(state: &mut AppState, req: &Request) -> Value {
    let conn = match db_conn(&state.db, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let routine_id = match required_str(req, "routineId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let shift = match optional_shift(req, "shift") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    if let Err(e) = state.desk.open(&LocalApi::new(conn), routine_id, shift) {
        return desk_err(&req.id, &e);
    }
    ok(&req.id, json!(state.desk.view()))
}

fn handle_desk_close(state: &mut AppState, req: &Request) -> Value {
    state.desk.close();
    ok(&req.id, json!({ "ok": true }))
}

fn handle_desk_shift(state: &mut AppState, req: &Request) -> Value {
    let conn = match db_conn(&state.db, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let shift = match optional_shift(req, "shift") {
        Ok(Some(s)) => s,
        Ok(None) => return err(&req.id, "bad_params", "missing shift", None),
        Err(resp) => return resp,
    };
    if let Err(e) = state.desk.set_shift(&LocalApi::new(conn), shift) {
        return desk_err(&req.id, &e);
    }
    ok(&req.id, json!(state.desk.view()))
}

fn handle_desk_grid(state: &mut AppState, req: &Request) -> Value {
    ok(&req.id, json!(state.desk.view()))
}

fn handle_desk_refresh(state: &mut AppState, req: &Request) -> Value {
    let conn = match db_conn(&state.db, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    if let Err(e) = state.desk.refresh(&LocalApi::new(conn)) {
        return desk_err(&req.id, &e);
    }
    ok(&req.id, json!(state.desk.view()))
}

fn handle_cell_click(state: &mut AppState, req: &Request) -> Value {
    let conn = match db_conn(&state.db, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let day = match required_day(req, "day") {
        Ok(d) => d,
        Err(resp) => return resp,
    };
    let label = match required_str(req, "timeSlot") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let click = match optional_str(req, "click").unwrap_or("single") {
        "single" => Click::Single,
        "double" => Click::Double,
        _ => return err(&req.id, "bad_params", "click must be single or double", None),
    };
    match state.desk.cell_click(&LocalApi::new(conn), day, label, click) {
        Ok(modal) => ok(&req.id, json!({ "modal": modal })),
        Err(e) => desk_err(&req.id, &e),
    }
}

fn handle_form_set(state: &mut AppState, req: &Request) -> Value {
    let conn = match db_conn(&state.db, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let field_raw = match required_str(req, "field") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Some(field) = FormField::parse(field_raw) else {
        return err(
            &req.id,
            "bad_params",
            format!("unknown form field: {}", field_raw),
            None,
        );
    };
    let value = match req.params.get("value") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => return err(&req.id, "bad_params", "value must be a string or null", None),
    };
    match state.desk.form_set(&LocalApi::new(conn), field, value) {
        Ok(modal) => ok(&req.id, json!({ "modal": modal })),
        Err(e) => desk_err(&req.id, &e),
    }
}

fn handle_form_close(state: &mut AppState, req: &Request) -> Value {
    state.desk.close_modal();
    ok(&req.id, json!({ "ok": true }))
}

fn handle_entry_create(state: &mut AppState, req: &Request) -> Value {
    let conn = match db_conn(&state.db, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let res = state.desk.submit_create(&LocalApi::new(conn));
    notice_result(req, &state.desk, res)
}

fn handle_entry_update(state: &mut AppState, req: &Request) -> Value {
    let conn = match db_conn(&state.db, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let res = state.desk.submit_update(&LocalApi::new(conn));
    notice_result(req, &state.desk, res)
}

fn handle_entry_delete(state: &mut AppState, req: &Request) -> Value {
    match state.desk.request_delete_entry() {
        Ok(prompt) => ok(&req.id, json!({ "prompt": prompt })),
        Err(e) => desk_err(&req.id, &e),
    }
}

fn handle_entry_undo(state: &mut AppState, req: &Request) -> Value {
    let conn = match db_conn(&state.db, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let token = match required_str(req, "token") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let res = state
        .desk
        .undo_delete(&LocalApi::new(conn), token, Utc::now());
    notice_result(req, &state.desk, res)
}

fn handle_copy_options(state: &mut AppState, req: &Request) -> Value {
    let source = match optional_day(req, "sourceDay") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match state.desk.copy_options(source) {
        Ok(options) => ok(&req.id, json!(options)),
        Err(e) => desk_err(&req.id, &e),
    }
}

fn handle_copy_run(state: &mut AppState, req: &Request) -> Value {
    let conn = match db_conn(&state.db, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let source = match optional_day(req, "sourceDay") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let targets = if req.params.get("targetDays").is_some() {
        match day_list(req, "targetDays") {
            Ok(v) => v,
            Err(resp) => return resp,
        }
    } else {
        Vec::new()
    };
    match state.desk.copy_run(&LocalApi::new(conn), source, &targets) {
        Ok(result) => with_view(
            req,
            &state.desk,
            json!({ "report": result.report, "notice": result.notice }),
        ),
        Err(e) => desk_err(&req.id, &e),
    }
}

fn handle_routine_actions(state: &mut AppState, req: &Request) -> Value {
    let conn = match db_conn(&state.db, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let routine_id = optional_str(req, "routineId");
    match state.desk.routine_actions(&LocalApi::new(conn), routine_id) {
        Ok((routine, actions)) => ok(
            &req.id,
            json!({
                "routineId": routine.id,
                "status": routine.status,
                "actions": actions
            }),
        ),
        Err(e) => desk_err(&req.id, &e),
    }
}

fn handle_routine_request(state: &mut AppState, req: &Request, action: RoutineAction) -> Value {
    let conn = match db_conn(&state.db, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let routine_id = optional_str(req, "routineId");
    match state
        .desk
        .request_routine_action(&LocalApi::new(conn), routine_id, action)
    {
        Ok(prompt) => ok(&req.id, json!({ "prompt": prompt })),
        Err(e) => desk_err(&req.id, &e),
    }
}

fn handle_confirm_resolve(state: &mut AppState, req: &Request) -> Value {
    let conn = match db_conn(&state.db, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let token = match required_str(req, "token") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Some(accept) = req.params.get("accept").and_then(|v| v.as_bool()) else {
        return err(&req.id, "bad_params", "accept must be boolean", None);
    };
    match state
        .desk
        .resolve(&LocalApi::new(conn), token, accept, Utc::now())
    {
        Ok(notice) => with_view(req, &state.desk, json!({ "notice": notice })),
        Err(e) => desk_err(&req.id, &e),
    }
}

fn handle_routines_filter(state: &mut AppState, req: &Request) -> Value {
    let patch: FilterPatch = match parse_params(req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match state.desk.list_filter(patch, Utc::now()) {
        Ok(view) => ok(
            &req.id,
            json!({
                "list": view,
                "debounceMs": state.desk.settings().search_debounce_ms
            }),
        ),
        Err(e) => desk_err(&req.id, &e),
    }
}

fn handle_routines_refresh(state: &mut AppState, req: &Request) -> Value {
    let conn = match db_conn(&state.db, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    match state.desk.list_refresh(&LocalApi::new(conn), Utc::now()) {
        Ok(view) => ok(&req.id, json!({ "list": view })),
        Err(e) => desk_err(&req.id, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    match req.method.as_str() {
        "desk.open" => Some(handle_desk_open(state, req)),
        "desk.close" => Some(handle_desk_close(state, req)),
        "desk.shift" => Some(handle_desk_shift(state, req)),
        "desk.grid" => Some(handle_desk_grid(state, req)),
        "desk.refresh" => Some(handle_desk_refresh(state, req)),
        "desk.cell.click" => Some(handle_cell_click(state, req)),
        "desk.form.set" => Some(handle_form_set(state, req)),
        "desk.form.close" => Some(handle_form_close(state, req)),
        "desk.entry.create" => Some(handle_entry_create(state, req)),
        "desk.entry.update" => Some(handle_entry_update(state, req)),
        "desk.entry.delete" => Some(handle_entry_delete(state, req)),
        "desk.entry.undo" => Some(handle_entry_undo(state, req)),
        "desk.copy.options" => Some(handle_copy_options(state, req)),
        "desk.copy.run" => Some(handle_copy_run(state, req)),
        "desk.routine.actions" => Some(handle_routine_actions(state, req)),
        "desk.routine.publish" => Some(handle_routine_request(state, req, RoutineAction::Publish)),
        "desk.routine.archive" => Some(handle_routine_request(state, req, RoutineAction::Archive)),
        "desk.routine.delete" => Some(handle_routine_request(state, req, RoutineAction::Delete)),
        "desk.confirm.resolve" => Some(handle_confirm_resolve(state, req)),
        "desk.routines.filter" => Some(handle_routines_filter(state, req)),
        "desk.routines.refresh" => Some(handle_routines_refresh(state, req)),
        _ => None,
    }
}
