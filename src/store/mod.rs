//! Authoritative routine storage: the server side of the routine API.

pub mod catalog;
pub mod copy;
pub mod entries;
pub mod lookups;
pub mod routines;
pub mod settings;

use crate::api::ApiError;
use crate::model::{
    BatchRef, CourseAssignment, CourseRef, Day, EntryType, NamedRef, RoutineEntry, Shift,
};
use rusqlite::types::Type;
use rusqlite::{ErrorCode, Row};

#[derive(Debug, thiserror::Error)]
#[error("unexpected stored value {value:?} in {column}")]
struct BadColumn {
    column: &'static str,
    value: String,
}

pub(crate) fn now_ts() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Reads a text column and converts it with `parse`, failing the row on unknown values.
pub(crate) fn enum_col<T>(
    row: &Row<'_>,
    idx: usize,
    column: &'static str,
    parse: fn(&str) -> Option<T>,
) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    parse(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Text,
            Box::new(BadColumn { column, value: raw }),
        )
    })
}

pub(crate) fn is_unique_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(f, _)
            if f.code == ErrorCode::ConstraintViolation
                && f.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

/// Maps a unique-index violation on the cell index to a conflict.
pub(crate) fn cell_conflict(e: rusqlite::Error, day: Day) -> ApiError {
    if is_unique_violation(&e) {
        ApiError::Conflict {
            message: format!("{} already has an entry in that time slot", day.as_str()),
            details: Some(serde_json::json!({ "day": day })),
        }
    } else {
        ApiError::Db(e)
    }
}

pub(crate) const ENTRY_SELECT: &str = "SELECT e.id, e.routine_id, e.day_of_week, e.time_slot_id, ts.label,
        e.entry_type, e.notes, e.is_cancelled,
        rm.id, rm.name,
        ca.id, c.id, c.code, c.title, t.id, t.name,
        b.id, b.name, b.shift,
        s.id, s.name, ay.id, ay.name, d.id, d.name
     FROM routine_entries e
     JOIN time_slots ts ON ts.id = e.time_slot_id
     JOIN rooms rm ON rm.id = e.room_id
     JOIN course_assignments ca ON ca.id = e.course_assignment_id
     JOIN courses c ON c.id = ca.course_id
     JOIN teachers t ON t.id = ca.teacher_id
     JOIN batches b ON b.id = ca.batch_id
     JOIN semesters s ON s.id = b.semester_id
     JOIN academic_years ay ON ay.id = s.academic_year_id
     JOIN departments d ON d.id = ay.department_id";

pub(crate) fn entry_from_row(r: &Row<'_>) -> rusqlite::Result<RoutineEntry> {
    Ok(RoutineEntry {
        id: r.get(0)?,
        routine_id: r.get(1)?,
        day_of_week: enum_col(r, 2, "day_of_week", Day::parse)?,
        time_slot_id: r.get(3)?,
        time_slot_label: r.get(4)?,
        entry_type: enum_col(r, 5, "entry_type", EntryType::parse)?,
        notes: r.get(6)?,
        is_cancelled: r.get::<_, i64>(7)? != 0,
        room: NamedRef {
            id: r.get(8)?,
            name: r.get(9)?,
        },
        course_assignment: CourseAssignment {
            id: r.get(10)?,
            course: CourseRef {
                id: r.get(11)?,
                code: r.get(12)?,
                title: r.get(13)?,
            },
            teacher: NamedRef {
                id: r.get(14)?,
                name: r.get(15)?,
            },
            batch: BatchRef {
                id: r.get(16)?,
                name: r.get(17)?,
                shift: enum_col(r, 18, "shift", Shift::parse)?,
            },
            semester: NamedRef {
                id: r.get(19)?,
                name: r.get(20)?,
            },
            academic_year: NamedRef {
                id: r.get(21)?,
                name: r.get(22)?,
            },
            department: NamedRef {
                id: r.get(23)?,
                name: r.get(24)?,
            },
        },
    })
}

#[cfg(test)]
pub(crate) mod testkit {
    //! Shared workspace fixture: one department chain, two batches (Morning
    //! and Day), three courses, rooms A/B and a Morning slot set with a break.

    use super::catalog::{self, CatalogBundle};
    use rusqlite::Connection;
    use serde_json::json;

    pub fn seeded() -> Connection {
        let conn = crate::db::open_in_memory().expect("db");
        let bundle: CatalogBundle = serde_json::from_value(json!({
            "departments": [{ "id": "cse", "name": "CSE" }],
            "academicYears": [{ "id": "y1", "departmentId": "cse", "name": "2026" }],
            "semesters": [{ "id": "s1", "academicYearId": "y1", "name": "Spring" }],
            "batches": [
                { "id": "b1", "semesterId": "s1", "name": "CSE-26A", "shift": "Morning" },
                { "id": "b2", "semesterId": "s1", "name": "CSE-26B", "shift": "Day" }
            ],
            "courses": [
                { "id": "phy", "code": "PHY101", "title": "Physics" },
                { "id": "chem", "code": "CHE101", "title": "Chemistry" },
                { "id": "math", "code": "MAT101", "title": "Mathematics" }
            ],
            "teachers": [
                { "id": "t1", "name": "Dr. Rahman" },
                { "id": "t2", "name": "Dr. Akter" },
                { "id": "t3", "name": "Dr. Hasan" }
            ],
            "courseAssignments": [
                { "id": "ca-phy", "batchId": "b1", "courseId": "phy", "teacherId": "t1" },
                { "id": "ca-chem", "batchId": "b1", "courseId": "chem", "teacherId": "t2" },
                { "id": "ca-math", "batchId": "b1", "courseId": "math", "teacherId": "t3" },
                { "id": "ca-phy-day", "batchId": "b2", "courseId": "phy", "teacherId": "t1" }
            ],
            "rooms": [
                { "id": "room-a", "name": "Room A" },
                { "id": "room-b", "name": "Room B" }
            ],
            "timeSlots": [
                { "id": "m1", "startTime": "08:00", "endTime": "08:50", "slotType": "Class", "shift": "Morning" },
                { "id": "m2", "startTime": "09:00", "endTime": "09:50", "slotType": "Class", "shift": "Morning" },
                { "id": "m-break", "startTime": "09:50", "endTime": "10:10", "slotType": "Break", "shift": "Morning" },
                { "id": "m3", "startTime": "10:10", "endTime": "11:00", "slotType": "Class", "shift": "Morning" },
                { "id": "d1", "startTime": "13:00", "endTime": "13:50", "slotType": "Class", "shift": "Day" }
            ]
        }))
        .expect("bundle");
        catalog::import(&conn, &bundle).expect("import");
        conn
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RoutineInput;
    use rusqlite::{params, Connection};

    fn insert_entry(conn: &Connection, routine_id: &str, room_id: &str) -> rusqlite::Result<usize> {
        let ts = now_ts();
        conn.execute(
            "INSERT INTO routine_entries(id, routine_id, course_assignment_id, room_id, time_slot_id,
                day_of_week, entry_type, notes, is_cancelled, created_at, updated_at)
             VALUES(?, ?, 'ca-phy', ?, 'm1', 'Monday', 'Lecture', NULL, 0, ?, ?)",
            params![new_id(), routine_id, room_id, ts, ts],
        )
    }

    #[test]
    fn only_the_cell_index_maps_to_a_conflict() {
        let conn = testkit::seeded();
        let r = routines::create(
            &conn,
            &RoutineInput {
                title: Some("R".into()),
                batch_id: Some("b1".into()),
                ..Default::default()
            },
        )
        .unwrap();
        insert_entry(&conn, &r.id, "room-a").unwrap();

        let dup = insert_entry(&conn, &r.id, "room-b").unwrap_err();
        assert!(is_unique_violation(&dup));
        match cell_conflict(dup, Day::Monday) {
            ApiError::Conflict { details, .. } => {
                assert_eq!(details, Some(serde_json::json!({ "day": "Monday" })))
            }
            other => panic!("unexpected: {:?}", other),
        }

        // A dangling routine reference is a foreign-key failure, not a taken cell.
        let fk = insert_entry(&conn, "missing-routine", "room-a").unwrap_err();
        assert!(!is_unique_violation(&fk));
        assert!(matches!(cell_conflict(fk, Day::Monday), ApiError::Db(_)));
    }
}
