use super::handlers;
use super::types::{AppState, Request};
use crate::ipc::error::err;

pub fn handle_request(state: &mut AppState, req: Request) -> serde_json::Value {
    let _span = tracing::info_span!("request", id = %req.id, method = %req.method).entered();
    tracing::debug!("handling request");

    if let Some(resp) = handlers::core::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::setup::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::catalog::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::routines::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::entries::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::desk::try_handle(state, &req) {
        return resp;
    }

    tracing::warn!("unknown method");
    err(
        &req.id,
        "not_implemented",
        format!("unknown method: {}", req.method),
        None,
    )
}
