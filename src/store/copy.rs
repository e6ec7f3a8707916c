//! All-or-nothing copy of one day's entries onto other days of a routine.

use crate::api::{ApiError, ApiResult};
use crate::model::{CopyOutcome, CopyRequest, Day, Shift};
use crate::store::entries::{find_clash, Placement};
use crate::store::routines::ensure_editable;
use crate::store::{is_unique_violation, new_id, now_ts};
use rusqlite::{params, Connection};

struct SourceEntry {
    course_assignment_id: String,
    teacher_id: String,
    room_id: String,
    time_slot_id: String,
    entry_type: String,
    notes: Option<String>,
}

fn source_entries(
    conn: &Connection,
    routine_id: &str,
    day: Day,
    shift: Option<Shift>,
) -> ApiResult<Vec<SourceEntry>> {
    let mut stmt = conn.prepare(
        "SELECT e.course_assignment_id, ca.teacher_id, e.room_id, e.time_slot_id, e.entry_type, e.notes
         FROM routine_entries e
         JOIN course_assignments ca ON ca.id = e.course_assignment_id
         JOIN time_slots ts ON ts.id = e.time_slot_id
         WHERE e.routine_id = ?1 AND e.day_of_week = ?2 AND e.deleted_at IS NULL
           AND (?3 IS NULL OR ts.shift = ?3)
         ORDER BY ts.start_time, ts.id",
    )?;
    let rows = stmt
        .query_map(params![routine_id, day.as_str(), shift.map(Shift::as_str)], |r| {
            Ok(SourceEntry {
                course_assignment_id: r.get(0)?,
                teacher_id: r.get(1)?,
                room_id: r.get(2)?,
                time_slot_id: r.get(3)?,
                entry_type: r.get(4)?,
                notes: r.get(5)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn normalize_targets(req: &CopyRequest) -> ApiResult<Vec<Day>> {
    let mut targets: Vec<Day> = Vec::with_capacity(req.target_days.len());
    for d in &req.target_days {
        if *d == req.source_day {
            return Err(ApiError::BadParams(
                "targetDays must not include the source day".to_string(),
            ));
        }
        if !targets.contains(d) {
            targets.push(*d);
        }
    }
    if targets.is_empty() {
        return Err(ApiError::BadParams(
            "targetDays must contain at least one day".to_string(),
        ));
    }
    Ok(targets)
}

fn abort(req: &CopyRequest, mut outcome: CopyOutcome, day: Day, reason: String) -> CopyOutcome {
    tracing::warn!(
        routine_id = %req.routine_id,
        conflict_day = day.as_str(),
        attempted = outcome.total_copied,
        "copy aborted: {}",
        reason
    );
    outcome.aborted = true;
    outcome.conflict_day = Some(day);
    outcome.conflict_message = Some(reason);
    outcome
}

/// Copies every live entry of `source_day` (in `req.shift` when set) onto each
/// target day, in request order. The first conflict rolls the whole call back
/// and is reported as an aborted outcome; `total_copied` then counts the
/// inserts that were undone.
pub fn copy_entries(conn: &Connection, req: &CopyRequest) -> ApiResult<CopyOutcome> {
    let targets = normalize_targets(req)?;
    ensure_editable(conn, &req.routine_id)?;
    let sources = source_entries(conn, &req.routine_id, req.source_day, req.shift)?;
    if sources.is_empty() {
        return Err(ApiError::BadParams(format!(
            "{} has no entries to copy",
            req.source_day.as_str()
        )));
    }

    let tx = conn.unchecked_transaction()?;
    let ts = now_ts();
    let mut outcome = CopyOutcome::default();
    for day in targets {
        for src in &sources {
            let placement = Placement {
                routine_id: &req.routine_id,
                day,
                time_slot_id: &src.time_slot_id,
                room_id: &src.room_id,
                teacher_id: &src.teacher_id,
                exclude_entry_id: None,
            };
            if let Some(reason) = find_clash(&tx, &placement)? {
                tx.rollback()?;
                return Ok(abort(req, outcome, day, reason));
            }
            let inserted = tx.execute(
                "INSERT INTO routine_entries(id, routine_id, course_assignment_id, room_id, time_slot_id,
                    day_of_week, entry_type, notes, is_cancelled, created_at, updated_at)
                 VALUES(?, ?, ?, ?, ?, ?, ?, ?, 0, ?, ?)",
                params![
                    new_id(),
                    req.routine_id,
                    src.course_assignment_id,
                    src.room_id,
                    src.time_slot_id,
                    day.as_str(),
                    src.entry_type,
                    src.notes,
                    ts,
                    ts
                ],
            );
            match inserted {
                Ok(_) => outcome.total_copied += 1,
                Err(e) if is_unique_violation(&e) => {
                    tx.rollback()?;
                    let reason = format!("{} already has an entry in that time slot", day.as_str());
                    return Ok(abort(req, outcome, day, reason));
                }
                Err(e) => return Err(e.into()),
            }
        }
        outcome.days_completed.push(day);
    }
    tx.commit()?;
    tracing::info!(
        routine_id = %req.routine_id,
        source_day = req.source_day.as_str(),
        total_copied = outcome.total_copied,
        "entries copied"
    );
    Ok(outcome)
}
