use crate::api::{ApiError, ApiResult};
use crate::model::{
    Day, EntryInput, EntryPatch, GridSnapshot, RoutineEntry, Shift, SlotMeta, SlotType,
};
use crate::store::routines::ensure_editable;
use crate::store::{cell_conflict, entry_from_row, enum_col, new_id, now_ts, ENTRY_SELECT};
use crate::validate::{self, FieldError};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::json;
use std::collections::BTreeMap;

fn load_slot_type(conn: &Connection, time_slot_id: &str) -> ApiResult<Option<SlotType>> {
    Ok(conn
        .query_row(
            "SELECT slot_type FROM time_slots WHERE id = ?",
            [time_slot_id],
            |r| enum_col(r, 0, "slot_type", SlotType::parse),
        )
        .optional()?)
}

pub fn get(conn: &Connection, id: &str) -> ApiResult<RoutineEntry> {
    let sql = format!("{} WHERE e.id = ? AND e.deleted_at IS NULL", ENTRY_SELECT);
    conn.query_row(&sql, [id], entry_from_row)
        .optional()?
        .ok_or(ApiError::NotFound("entry"))
}

/// Full day x slot matrix for one shift. Every slot of the shift appears as a
/// key on every day, `null` when the cell is empty.
pub fn grid(conn: &Connection, routine_id: &str, shift: Shift) -> ApiResult<GridSnapshot> {
    crate::store::routines::status_of(conn, routine_id)?;

    let mut stmt = conn.prepare(
        "SELECT id, label, start_time, end_time, slot_type FROM time_slots
         WHERE shift = ? ORDER BY start_time, id",
    )?;
    let slots = stmt
        .query_map([shift.as_str()], |r| {
            Ok((
                r.get::<_, String>(1)?,
                SlotMeta {
                    id: r.get(0)?,
                    start_time: r.get(2)?,
                    end_time: r.get(3)?,
                    slot_type: enum_col(r, 4, "slot_type", SlotType::parse)?,
                },
            ))
        })?
        .collect::<Result<BTreeMap<_, _>, _>>()?;

    let mut snapshot = GridSnapshot {
        grid: Day::ALL
            .into_iter()
            .map(|d| (d, slots.keys().map(|l| (l.clone(), None)).collect()))
            .collect(),
        slots,
    };

    let sql = format!(
        "{} WHERE e.routine_id = ? AND e.deleted_at IS NULL AND ts.shift = ?",
        ENTRY_SELECT
    );
    let mut stmt = conn.prepare(&sql)?;
    let entries = stmt
        .query_map(params![routine_id, shift.as_str()], entry_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    for entry in entries {
        if let Some(row) = snapshot.grid.get_mut(&entry.day_of_week) {
            row.insert(entry.time_slot_label.clone(), Some(entry));
        }
    }
    Ok(snapshot)
}

pub(crate) struct Placement<'a> {
    pub routine_id: &'a str,
    pub day: Day,
    pub time_slot_id: &'a str,
    pub room_id: &'a str,
    pub teacher_id: &'a str,
    pub exclude_entry_id: Option<&'a str>,
}

/// Returns a human-readable reason when the placement collides with the cell
/// itself, or with the room or teacher in another live routine whose effective
/// dates overlap this one.
pub(crate) fn find_clash(conn: &Connection, p: &Placement<'_>) -> ApiResult<Option<String>> {
    let exclude = p.exclude_entry_id.unwrap_or("");
    let occupied: Option<(String, String)> = conn
        .query_row(
            "SELECT c.code, ts.label FROM routine_entries e
             JOIN course_assignments ca ON ca.id = e.course_assignment_id
             JOIN courses c ON c.id = ca.course_id
             JOIN time_slots ts ON ts.id = e.time_slot_id
             WHERE e.routine_id = ? AND e.day_of_week = ? AND e.time_slot_id = ?
               AND e.deleted_at IS NULL AND e.id <> ?
             LIMIT 1",
            params![p.routine_id, p.day.as_str(), p.time_slot_id, exclude],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .optional()?;
    if let Some((code, label)) = occupied {
        return Ok(Some(format!(
            "{} already has {} at {}",
            p.day.as_str(),
            code,
            label
        )));
    }

    let (eff_from, eff_to): (Option<String>, Option<String>) = conn.query_row(
        "SELECT effective_from, effective_to FROM routines WHERE id = ?",
        [p.routine_id],
        |r| Ok((r.get(0)?, r.get(1)?)),
    )?;
    let overlap = "o.id <> ?1 AND o.status <> 'archieved'
        AND e.deleted_at IS NULL AND e.day_of_week = ?2 AND e.time_slot_id = ?3
        AND (?5 IS NULL OR o.effective_to IS NULL OR ?5 <= o.effective_to)
        AND (?6 IS NULL OR o.effective_from IS NULL OR o.effective_from <= ?6)";

    let room_sql = format!(
        "SELECT rm.name, o.title, ts.label FROM routine_entries e
         JOIN routines o ON o.id = e.routine_id
         JOIN rooms rm ON rm.id = e.room_id
         JOIN time_slots ts ON ts.id = e.time_slot_id
         WHERE {} AND e.room_id = ?4 LIMIT 1",
        overlap
    );
    let room: Option<(String, String, String)> = conn
        .query_row(
            &room_sql,
            params![
                p.routine_id,
                p.day.as_str(),
                p.time_slot_id,
                p.room_id,
                eff_from,
                eff_to
            ],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
        )
        .optional()?;
    if let Some((room, title, label)) = room {
        return Ok(Some(format!(
            "{} is already booked on {} at {} by routine \"{}\"",
            room,
            p.day.as_str(),
            label,
            title
        )));
    }

    let teacher_sql = format!(
        "SELECT t.name, o.title, ts.label FROM routine_entries e
         JOIN routines o ON o.id = e.routine_id
         JOIN course_assignments ca ON ca.id = e.course_assignment_id
         JOIN teachers t ON t.id = ca.teacher_id
         JOIN time_slots ts ON ts.id = e.time_slot_id
         WHERE {} AND ca.teacher_id = ?4 LIMIT 1",
        overlap
    );
    let teacher: Option<(String, String, String)> = conn
        .query_row(
            &teacher_sql,
            params![
                p.routine_id,
                p.day.as_str(),
                p.time_slot_id,
                p.teacher_id,
                eff_from,
                eff_to
            ],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
        )
        .optional()?;
    if let Some((teacher, title, label)) = teacher {
        return Ok(Some(format!(
            "{} is already teaching on {} at {} in routine \"{}\"",
            teacher,
            p.day.as_str(),
            label,
            title
        )));
    }
    Ok(None)
}

/// Re-runs the clash check for every live entry of a routine against the
/// routine's current dates. Returns the first day and reason found.
pub(crate) fn first_clash_in(
    conn: &Connection,
    routine_id: &str,
) -> ApiResult<Option<(Day, String)>> {
    let mut stmt = conn.prepare(
        "SELECT e.id, e.day_of_week, e.time_slot_id, e.room_id, ca.teacher_id
         FROM routine_entries e
         JOIN course_assignments ca ON ca.id = e.course_assignment_id
         JOIN time_slots ts ON ts.id = e.time_slot_id
         WHERE e.routine_id = ? AND e.deleted_at IS NULL
         ORDER BY e.day_of_week, ts.start_time, e.id",
    )?;
    let live = stmt
        .query_map([routine_id], |r| {
            Ok((
                r.get::<_, String>(0)?,
                enum_col(r, 1, "day_of_week", Day::parse)?,
                r.get::<_, String>(2)?,
                r.get::<_, String>(3)?,
                r.get::<_, String>(4)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    for (entry_id, day, slot, room, teacher) in &live {
        let placement = Placement {
            routine_id,
            day: *day,
            time_slot_id: slot,
            room_id: room,
            teacher_id: teacher,
            exclude_entry_id: Some(entry_id.as_str()),
        };
        if let Some(reason) = find_clash(conn, &placement)? {
            return Ok(Some((*day, reason)));
        }
    }
    Ok(None)
}

fn teacher_of(conn: &Connection, course_assignment_id: &str) -> ApiResult<Option<String>> {
    Ok(conn
        .query_row(
            "SELECT teacher_id FROM course_assignments WHERE id = ?",
            [course_assignment_id],
            |r| r.get(0),
        )
        .optional()?)
}

fn room_exists(conn: &Connection, room_id: &str) -> ApiResult<bool> {
    Ok(conn
        .query_row("SELECT 1 FROM rooms WHERE id = ?", [room_id], |_r| Ok(()))
        .optional()?
        .is_some())
}

fn field(field: &'static str, message: &str) -> FieldError {
    FieldError {
        field,
        message: message.to_string(),
    }
}

/// Resolves the teacher behind the course assignment and checks the slot
/// can hold an entry, collecting field errors for anything missing.
fn check_refs(
    conn: &Connection,
    course_assignment_id: &str,
    time_slot_id: &str,
    room_id: Option<&str>,
) -> ApiResult<String> {
    let mut errors = Vec::new();
    let teacher = teacher_of(conn, course_assignment_id)?;
    if teacher.is_none() {
        errors.push(field("courseAssignmentId", "Course assignment does not exist"));
    }
    match load_slot_type(conn, time_slot_id)? {
        None => errors.push(field("timeSlotId", "Time slot does not exist")),
        Some(SlotType::Break) => {
            errors.push(field("timeSlotId", "Break slots cannot hold entries"))
        }
        Some(_) => {}
    }
    if let Some(room_id) = room_id {
        if !room_exists(conn, room_id)? {
            errors.push(field("roomId", "Room does not exist"));
        }
    }
    match teacher {
        Some(t) if errors.is_empty() => Ok(t),
        _ => Err(ApiError::Validation(errors)),
    }
}

fn conflict(message: String, day: Day, time_slot_id: &str) -> ApiError {
    ApiError::Conflict {
        message,
        details: Some(json!({ "day": day, "timeSlotId": time_slot_id })),
    }
}

pub fn create(conn: &Connection, input: &EntryInput) -> ApiResult<RoutineEntry> {
    let entry = validate::entry(input).map_err(ApiError::Validation)?;
    ensure_editable(conn, &entry.routine_id)?;
    let teacher_id = check_refs(
        conn,
        &entry.course_assignment_id,
        &entry.time_slot_id,
        Some(&entry.room_id),
    )?;

    let placement = Placement {
        routine_id: &entry.routine_id,
        day: entry.day_of_week,
        time_slot_id: &entry.time_slot_id,
        room_id: &entry.room_id,
        teacher_id: &teacher_id,
        exclude_entry_id: None,
    };
    if let Some(reason) = find_clash(conn, &placement)? {
        return Err(conflict(reason, entry.day_of_week, &entry.time_slot_id));
    }

    let id = new_id();
    let ts = now_ts();
    conn.execute(
        "INSERT INTO routine_entries(id, routine_id, course_assignment_id, room_id, time_slot_id,
            day_of_week, entry_type, notes, is_cancelled, created_at, updated_at)
         VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        params![
            id,
            entry.routine_id,
            entry.course_assignment_id,
            entry.room_id,
            entry.time_slot_id,
            entry.day_of_week.as_str(),
            entry.entry_type.as_str(),
            entry.notes,
            entry.is_cancelled as i64,
            ts,
            ts
        ],
    )
    .map_err(|e| cell_conflict(e, entry.day_of_week))?;
    tracing::info!(entry_id = %id, routine_id = %entry.routine_id, day = entry.day_of_week.as_str(), "entry created");
    get(conn, &id)
}

pub fn update(conn: &Connection, id: &str, patch: &EntryPatch) -> ApiResult<RoutineEntry> {
    let current = get(conn, id)?;
    ensure_editable(conn, &current.routine_id)?;
    let upd = validate::entry_patch(patch).map_err(ApiError::Validation)?;
    let teacher_id = check_refs(conn, &upd.course_assignment_id, &upd.time_slot_id, None)?;

    let placement = Placement {
        routine_id: &current.routine_id,
        day: current.day_of_week,
        time_slot_id: &upd.time_slot_id,
        room_id: &current.room.id,
        teacher_id: &teacher_id,
        exclude_entry_id: Some(id),
    };
    if let Some(reason) = find_clash(conn, &placement)? {
        return Err(conflict(reason, current.day_of_week, &upd.time_slot_id));
    }

    conn.execute(
        "UPDATE routine_entries SET course_assignment_id = ?, time_slot_id = ?, entry_type = ?,
            notes = ?, updated_at = ?
         WHERE id = ? AND deleted_at IS NULL",
        params![
            upd.course_assignment_id,
            upd.time_slot_id,
            upd.entry_type.as_str(),
            upd.notes,
            now_ts(),
            id
        ],
    )
    .map_err(|e| cell_conflict(e, current.day_of_week))?;
    get(conn, id)
}

/// Soft delete; the row stays restorable until purged.
pub fn delete(conn: &Connection, id: &str) -> ApiResult<()> {
    let current = get(conn, id)?;
    ensure_editable(conn, &current.routine_id)?;
    conn.execute(
        "UPDATE routine_entries SET deleted_at = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL",
        params![now_ts(), now_ts(), id],
    )?;
    tracing::info!(entry_id = %id, "entry deleted");
    Ok(())
}

pub fn restore(conn: &Connection, id: &str) -> ApiResult<RoutineEntry> {
    let row: Option<(String, String, String, String, String)> = conn
        .query_row(
            "SELECT e.routine_id, e.day_of_week, e.time_slot_id, e.room_id, ca.teacher_id
             FROM routine_entries e
             JOIN course_assignments ca ON ca.id = e.course_assignment_id
             WHERE e.id = ? AND e.deleted_at IS NOT NULL",
            [id],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?, r.get(4)?)),
        )
        .optional()?;
    let (routine_id, day_raw, time_slot_id, room_id, teacher_id) =
        row.ok_or(ApiError::NotFound("deleted entry"))?;
    ensure_editable(conn, &routine_id)?;
    let day = Day::parse(&day_raw)
        .ok_or_else(|| ApiError::InvalidState(format!("unknown day {}", day_raw)))?;

    let placement = Placement {
        routine_id: &routine_id,
        day,
        time_slot_id: &time_slot_id,
        room_id: &room_id,
        teacher_id: &teacher_id,
        exclude_entry_id: Some(id),
    };
    if let Some(reason) = find_clash(conn, &placement)? {
        return Err(conflict(reason, day, &time_slot_id));
    }
    conn.execute(
        "UPDATE routine_entries SET deleted_at = NULL, updated_at = ? WHERE id = ?",
        params![now_ts(), id],
    )
    .map_err(|e| cell_conflict(e, day))?;
    tracing::info!(entry_id = %id, "entry restored");
    get(conn, id)
}
