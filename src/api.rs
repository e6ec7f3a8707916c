//! The routine REST contract as a trait.
//!
//! `RoutineApi` lists the endpoints the desk consumes. `LocalApi` serves them
//! from the embedded workspace through `store`; the desk never talks to SQL.

use crate::model::{
    CopyOutcome, CopyRequest, EntryInput, EntryPatch, GridSnapshot, Lookup, OptionItem, Page,
    Routine, RoutineEntry, RoutineInput, RoutineQuery, Shift,
};
use crate::store;
use crate::validate::FieldError;
use rusqlite::Connection;
use serde_json::{json, Value};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadParams(String),
    #[error("validation failed")]
    Validation(Vec<FieldError>),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{message}")]
    Conflict {
        message: String,
        details: Option<Value>,
    },
    #[error("{0}")]
    InvalidState(String),
    #[error("cannot move routine from {from} to {to}")]
    InvalidTransition {
        from: &'static str,
        to: &'static str,
    },
    #[error("database error: {0}")]
    Db(#[from] rusqlite::Error),
}

impl ApiError {
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::BadParams(_) | ApiError::Validation(_) => "bad_params",
            ApiError::NotFound(_) => "not_found",
            ApiError::Conflict { .. } => "conflict",
            ApiError::InvalidState(_) => "invalid_state",
            ApiError::InvalidTransition { .. } => "invalid_transition",
            ApiError::Db(_) => "db_query_failed",
        }
    }

    pub fn details(&self) -> Option<Value> {
        match self {
            ApiError::Validation(fields) => Some(json!({ "fields": fields })),
            ApiError::Conflict { details, .. } => details.clone(),
            ApiError::InvalidTransition { from, to } => Some(json!({ "from": from, "to": to })),
            _ => None,
        }
    }

    /// Message suitable for an operator-facing notice.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Validation(fields) => fields
                .first()
                .map(|f| f.message.clone())
                .unwrap_or_else(|| "validation failed".to_string()),
            ApiError::Db(_) => "Something went wrong. Please try again.".to_string(),
            other => other.to_string(),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

pub trait RoutineApi {
    fn list_routines(&self, query: &RoutineQuery) -> ApiResult<Page<Routine>>;
    fn get_routine(&self, id: &str) -> ApiResult<Routine>;
    fn create_routine(&self, input: &RoutineInput) -> ApiResult<Routine>;
    fn update_routine(&self, id: &str, input: &RoutineInput) -> ApiResult<Routine>;
    fn delete_routine(&self, id: &str) -> ApiResult<()>;
    fn archive_routine(&self, id: &str) -> ApiResult<Routine>;
    fn publish_routine(&self, id: &str) -> ApiResult<Routine>;

    fn fetch_grid(&self, routine_id: &str, shift: Shift) -> ApiResult<GridSnapshot>;
    fn create_entry(&self, input: &EntryInput) -> ApiResult<RoutineEntry>;
    fn update_entry(&self, id: &str, patch: &EntryPatch) -> ApiResult<RoutineEntry>;
    fn delete_entry(&self, id: &str) -> ApiResult<()>;
    fn restore_entry(&self, id: &str) -> ApiResult<RoutineEntry>;
    fn copy_entries(&self, req: &CopyRequest) -> ApiResult<CopyOutcome>;

    fn lookup(&self, lookup: &Lookup) -> ApiResult<Vec<OptionItem>>;
}

pub struct LocalApi<'c> {
    conn: &'c Connection,
}

impl<'c> LocalApi<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }
}

impl RoutineApi for LocalApi<'_> {
    fn list_routines(&self, query: &RoutineQuery) -> ApiResult<Page<Routine>> {
        store::routines::list(self.conn, query)
    }

    fn get_routine(&self, id: &str) -> ApiResult<Routine> {
        store::routines::get(self.conn, id)
    }

    fn create_routine(&self, input: &RoutineInput) -> ApiResult<Routine> {
        store::routines::create(self.conn, input)
    }

    fn update_routine(&self, id: &str, input: &RoutineInput) -> ApiResult<Routine> {
        store::routines::update(self.conn, id, input)
    }

    fn delete_routine(&self, id: &str) -> ApiResult<()> {
        store::routines::delete(self.conn, id)
    }

    fn archive_routine(&self, id: &str) -> ApiResult<Routine> {
        store::routines::archive(self.conn, id)
    }

    fn publish_routine(&self, id: &str) -> ApiResult<Routine> {
        store::routines::publish(self.conn, id)
    }

    fn fetch_grid(&self, routine_id: &str, shift: Shift) -> ApiResult<GridSnapshot> {
        store::entries::grid(self.conn, routine_id, shift)
    }

    fn create_entry(&self, input: &EntryInput) -> ApiResult<RoutineEntry> {
        store::entries::create(self.conn, input)
    }

    fn update_entry(&self, id: &str, patch: &EntryPatch) -> ApiResult<RoutineEntry> {
        store::entries::update(self.conn, id, patch)
    }

    fn delete_entry(&self, id: &str) -> ApiResult<()> {
        store::entries::delete(self.conn, id)
    }

    fn restore_entry(&self, id: &str) -> ApiResult<RoutineEntry> {
        store::entries::restore(self.conn, id)
    }

    fn copy_entries(&self, req: &CopyRequest) -> ApiResult<CopyOutcome> {
        store::copy::copy_entries(self.conn, req)
    }

    fn lookup(&self, lookup: &Lookup) -> ApiResult<Vec<OptionItem>> {
        store::lookups::lookup(self.conn, lookup)
    }
}
