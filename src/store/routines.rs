use crate::api::{ApiError, ApiResult};
use crate::model::{
    BatchRef, NamedRef, Page, PageMeta, Routine, RoutineInput, RoutineQuery, RoutineStatus, Shift,
};
use crate::store::{entries, settings};
use crate::store::{enum_col, new_id, now_ts};
use crate::validate::{self, FieldError};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use serde_json::json;

const ROUTINE_SELECT: &str = "SELECT r.id, r.title, r.description, r.effective_from, r.effective_to,
        r.status, r.institution, s.id, s.name, b.id, b.name, b.shift, r.created_at, r.updated_at
     FROM routines r
     LEFT JOIN semesters s ON s.id = r.semester_id
     LEFT JOIN batches b ON b.id = r.batch_id";

fn routine_from_row(r: &Row<'_>) -> rusqlite::Result<Routine> {
    let semester = match r.get::<_, Option<String>>(7)? {
        Some(id) => Some(NamedRef {
            id,
            name: r.get(8)?,
        }),
        None => None,
    };
    let batch = match r.get::<_, Option<String>>(9)? {
        Some(id) => Some(BatchRef {
            id,
            name: r.get(10)?,
            shift: enum_col(r, 11, "shift", Shift::parse)?,
        }),
        None => None,
    };
    Ok(Routine {
        id: r.get(0)?,
        title: r.get(1)?,
        description: r.get(2)?,
        effective_from: r.get(3)?,
        effective_to: r.get(4)?,
        status: enum_col(r, 5, "status", RoutineStatus::parse)?,
        institution: r.get(6)?,
        semester,
        batch,
        created_at: r.get(12)?,
        updated_at: r.get(13)?,
    })
}

pub fn get(conn: &Connection, id: &str) -> ApiResult<Routine> {
    let sql = format!("{} WHERE r.id = ?", ROUTINE_SELECT);
    conn.query_row(&sql, [id], routine_from_row)
        .optional()?
        .ok_or(ApiError::NotFound("routine"))
}

pub(crate) fn status_of(conn: &Connection, id: &str) -> ApiResult<RoutineStatus> {
    let raw: Option<String> = conn
        .query_row("SELECT status FROM routines WHERE id = ?", [id], |r| r.get(0))
        .optional()?;
    let raw = raw.ok_or(ApiError::NotFound("routine"))?;
    RoutineStatus::parse(&raw).ok_or_else(|| ApiError::InvalidState(format!("unknown status {}", raw)))
}

/// Entries of archived routines are frozen.
pub(crate) fn ensure_editable(conn: &Connection, routine_id: &str) -> ApiResult<()> {
    match status_of(conn, routine_id)? {
        RoutineStatus::Archieved => Err(ApiError::InvalidState(
            "archived routines cannot be edited".to_string(),
        )),
        _ => Ok(()),
    }
}

pub fn list(conn: &Connection, query: &RoutineQuery) -> ApiResult<Page<Routine>> {
    let per_page = settings::load_routines(conn).per_page;

    let mut clauses: Vec<&str> = Vec::new();
    let mut binds: Vec<Value> = Vec::new();
    if let Some(status) = query.status {
        clauses.push("r.status = ?");
        binds.push(Value::Text(status.as_str().to_string()));
    }
    if let Some(search) = query
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        clauses.push("(r.title LIKE ? OR IFNULL(r.description, '') LIKE ?)");
        let pattern = format!("%{}%", search);
        binds.push(Value::Text(pattern.clone()));
        binds.push(Value::Text(pattern));
    }
    if let Some(from) = query.date_from.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        if validate::parse_iso_date(from).is_none() {
            return Err(ApiError::BadParams("dateFrom must be YYYY-MM-DD".to_string()));
        }
        clauses.push("r.effective_from >= ?");
        binds.push(Value::Text(from.to_string()));
    }
    if let Some(to) = query.date_to.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        if validate::parse_iso_date(to).is_none() {
            return Err(ApiError::BadParams("dateTo must be YYYY-MM-DD".to_string()));
        }
        clauses.push("r.effective_to <= ?");
        binds.push(Value::Text(to.to_string()));
    }
    let where_sql = if clauses.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", clauses.join(" AND "))
    };

    let total: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM routines r{}", where_sql),
        params_from_iter(binds.iter()),
        |r| r.get(0),
    )?;
    let last_page = ((total + per_page - 1) / per_page).max(1);
    let current_page = query.page.unwrap_or(1).clamp(1, last_page);
    let offset = (current_page - 1) * per_page;

    let sql = format!(
        "{}{} ORDER BY r.rowid DESC LIMIT {} OFFSET {}",
        ROUTINE_SELECT, where_sql, per_page, offset
    );
    let mut stmt = conn.prepare(&sql)?;
    let data = stmt
        .query_map(params_from_iter(binds.iter()), routine_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    let (from, to) = if data.is_empty() {
        (None, None)
    } else {
        (Some(offset + 1), Some(offset + data.len() as i64))
    };
    Ok(Page {
        data,
        meta: PageMeta {
            current_page,
            last_page,
            per_page,
            total,
            from,
            to,
        },
    })
}

fn check_refs(conn: &Connection, input: &RoutineInput) -> ApiResult<()> {
    let mut errors = Vec::new();
    let mut semester_of_batch: Option<String> = None;
    if let Some(batch_id) = &input.batch_id {
        semester_of_batch = conn
            .query_row(
                "SELECT semester_id FROM batches WHERE id = ?",
                [batch_id],
                |r| r.get(0),
            )
            .optional()?;
        if semester_of_batch.is_none() {
            errors.push(FieldError {
                field: "batchId",
                message: "Batch does not exist".to_string(),
            });
        }
    }
    if let Some(semester_id) = &input.semester_id {
        let exists = conn
            .query_row("SELECT 1 FROM semesters WHERE id = ?", [semester_id], |_r| Ok(()))
            .optional()?
            .is_some();
        if !exists {
            errors.push(FieldError {
                field: "semesterId",
                message: "Semester does not exist".to_string(),
            });
        } else if semester_of_batch.as_deref().is_some_and(|s| s != semester_id.as_str()) {
            errors.push(FieldError {
                field: "batchId",
                message: "Batch does not belong to the selected semester".to_string(),
            });
        }
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::Validation(errors))
    }
}

pub fn create(conn: &Connection, input: &RoutineInput) -> ApiResult<Routine> {
    let input = validate::routine(input).map_err(ApiError::Validation)?;
    check_refs(conn, &input)?;
    let institution = input
        .institution
        .clone()
        .or_else(|| settings::load_routines(conn).default_institution);

    let id = new_id();
    let ts = now_ts();
    conn.execute(
        "INSERT INTO routines(id, title, description, effective_from, effective_to, status,
            institution, semester_id, batch_id, created_at, updated_at)
         VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        params![
            id,
            input.title,
            input.description,
            input.effective_from,
            input.effective_to,
            RoutineStatus::Draft.as_str(),
            institution,
            input.semester_id,
            input.batch_id,
            ts,
            ts
        ],
    )?;
    tracing::info!(routine_id = %id, "routine created");
    get(conn, &id)
}

pub fn update(conn: &Connection, id: &str, input: &RoutineInput) -> ApiResult<Routine> {
    ensure_editable(conn, id)?;
    let input = validate::routine(input).map_err(ApiError::Validation)?;
    check_refs(conn, &input)?;
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "UPDATE routines SET title = ?, description = ?, effective_from = ?, effective_to = ?,
            institution = COALESCE(?, institution), semester_id = ?, batch_id = ?, updated_at = ?
         WHERE id = ?",
        params![
            input.title,
            input.description,
            input.effective_from,
            input.effective_to,
            input.institution,
            input.semester_id,
            input.batch_id,
            now_ts(),
            id
        ],
    )?;
    // New dates can overlap a routine that books the same rooms or teachers.
    if let Some((day, reason)) = entries::first_clash_in(&tx, id)? {
        tx.rollback()?;
        tracing::warn!(routine_id = %id, day = day.as_str(), "routine update rejected: {}", reason);
        return Err(ApiError::Conflict {
            message: reason,
            details: Some(json!({ "day": day })),
        });
    }
    tx.commit()?;
    get(conn, id)
}

pub fn delete(conn: &Connection, id: &str) -> ApiResult<()> {
    if status_of(conn, id)? == RoutineStatus::Published {
        return Err(ApiError::InvalidState(
            "published routines must be archived before deletion".to_string(),
        ));
    }
    let tx = conn.unchecked_transaction()?;
    tx.execute("DELETE FROM routine_entries WHERE routine_id = ?", [id])?;
    tx.execute("DELETE FROM routines WHERE id = ?", [id])?;
    tx.commit()?;
    tracing::info!(routine_id = %id, "routine deleted");
    Ok(())
}

fn transition(
    conn: &Connection,
    id: &str,
    from: RoutineStatus,
    to: RoutineStatus,
) -> ApiResult<Routine> {
    let current = status_of(conn, id)?;
    if current != from {
        return Err(ApiError::InvalidTransition {
            from: current.as_str(),
            to: to.as_str(),
        });
    }
    conn.execute(
        "UPDATE routines SET status = ?, updated_at = ? WHERE id = ? AND status = ?",
        params![to.as_str(), now_ts(), id, from.as_str()],
    )?;
    tracing::info!(routine_id = %id, from = from.as_str(), to = to.as_str(), "routine status changed");
    get(conn, id)
}

pub fn publish(conn: &Connection, id: &str) -> ApiResult<Routine> {
    transition(conn, id, RoutineStatus::Draft, RoutineStatus::Published)
}

pub fn archive(conn: &Connection, id: &str) -> ApiResult<Routine> {
    transition(conn, id, RoutineStatus::Published, RoutineStatus::Archieved)
}
