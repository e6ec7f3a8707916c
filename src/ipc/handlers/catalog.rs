use crate::api::{LocalApi, RoutineApi};
use crate::ipc::error::{api_err, ok};
use crate::ipc::helpers::{db_conn, parse_params, required_str};
use crate::ipc::types::{AppState, Request};
use crate::model::Lookup;
use crate::store::catalog::{self, CatalogBundle};
use serde_json::json;

fn handle_catalog_import(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(&state.db, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let bundle: CatalogBundle = match parse_params(req) {
        Ok(b) => b,
        Err(resp) => return resp,
    };
    match catalog::import(conn, &bundle) {
        Ok(counts) => ok(&req.id, json!({ "imported": counts })),
        Err(e) => api_err(&req.id, &e),
    }
}

/// Builds the lookup for a `dropdowns.*` method from its parent id param.
fn lookup_for(req: &Request) -> Option<Result<Lookup, serde_json::Value>> {
    let parent = |key: &str| required_str(req, key).map(str::to_string);
    let lookup = match req.method.as_str() {
        "dropdowns.departments" => Ok(Lookup::Departments),
        "dropdowns.rooms" => Ok(Lookup::Rooms),
        "dropdowns.academicYears" => {
            parent("departmentId").map(|department_id| Lookup::AcademicYears { department_id })
        }
        "dropdowns.semesters" => parent("academicYearId")
            .map(|academic_year_id| Lookup::Semesters { academic_year_id }),
        "dropdowns.batches" => {
            parent("semesterId").map(|semester_id| Lookup::Batches { semester_id })
        }
        "dropdowns.courseAssignments" => {
            parent("batchId").map(|batch_id| Lookup::CourseAssignments { batch_id })
        }
        "dropdowns.timeSlots" => parent("batchId").map(|batch_id| Lookup::TimeSlots { batch_id }),
        _ => return None,
    };
    Some(lookup)
}

fn handle_dropdown(state: &mut AppState, req: &Request, lookup: Lookup) -> serde_json::Value {
    let conn = match db_conn(&state.db, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    match LocalApi::new(conn).lookup(&lookup) {
        Ok(options) => ok(&req.id, json!({ "options": options })),
        Err(e) => api_err(&req.id, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    if req.method == "catalog.import" {
        return Some(handle_catalog_import(state, req));
    }
    match lookup_for(req)? {
        Ok(lookup) => Some(handle_dropdown(state, req, lookup)),
        Err(resp) => Some(resp),
    }
}
