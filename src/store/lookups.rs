//! Dropdown sources, each keyed by the minimal set of parent ids.

use crate::api::{ApiError, ApiResult};
use crate::model::{Lookup, OptionItem, Shift};
use crate::store::enum_col;
use rusqlite::{Connection, OptionalExtension, Params};

fn named(conn: &Connection, sql: &str, p: impl Params) -> ApiResult<Vec<OptionItem>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(p, |r| {
            Ok(OptionItem {
                id: r.get(0)?,
                label: r.get(1)?,
                shift: None,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn batch_shift(conn: &Connection, batch_id: &str) -> ApiResult<Shift> {
    conn.query_row("SELECT shift FROM batches WHERE id = ?", [batch_id], |r| {
        enum_col(r, 0, "shift", Shift::parse)
    })
    .optional()?
    .ok_or(ApiError::NotFound("batch"))
}

pub fn lookup(conn: &Connection, lookup: &Lookup) -> ApiResult<Vec<OptionItem>> {
    match lookup {
        Lookup::Departments => named(conn, "SELECT id, name FROM departments ORDER BY name, id", []),
        Lookup::AcademicYears { department_id } => named(
            conn,
            "SELECT id, name FROM academic_years WHERE department_id = ? ORDER BY name DESC, id",
            [department_id],
        ),
        Lookup::Semesters { academic_year_id } => named(
            conn,
            "SELECT id, name FROM semesters WHERE academic_year_id = ? ORDER BY name, id",
            [academic_year_id],
        ),
        Lookup::Batches { semester_id } => {
            let mut stmt = conn.prepare(
                "SELECT id, name, shift FROM batches WHERE semester_id = ? ORDER BY name, id",
            )?;
            let rows = stmt
                .query_map([semester_id], |r| {
                    Ok(OptionItem {
                        id: r.get(0)?,
                        label: r.get(1)?,
                        shift: Some(enum_col(r, 2, "shift", Shift::parse)?),
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        }
        Lookup::CourseAssignments { batch_id } => named(
            conn,
            "SELECT ca.id, c.code || ' - ' || c.title || ' (' || t.name || ')'
             FROM course_assignments ca
             JOIN courses c ON c.id = ca.course_id
             JOIN teachers t ON t.id = ca.teacher_id
             WHERE ca.batch_id = ?
             ORDER BY c.code, ca.id",
            [batch_id],
        ),
        Lookup::Rooms => named(conn, "SELECT id, name FROM rooms ORDER BY name, id", []),
        Lookup::TimeSlots { batch_id } => {
            let shift = batch_shift(conn, batch_id)?;
            let mut stmt = conn.prepare(
                "SELECT id, label FROM time_slots
                 WHERE shift = ? AND slot_type <> 'Break'
                 ORDER BY start_time, id",
            )?;
            let rows = stmt
                .query_map([shift.as_str()], |r| {
                    Ok(OptionItem {
                        id: r.get(0)?,
                        label: r.get(1)?,
                        shift: Some(shift),
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        }
    }
}
