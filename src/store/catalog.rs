//! Bulk upsert of reference data (departments down to time slots).

use crate::api::{ApiError, ApiResult};
use crate::model::{Shift, SlotType};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct NamedRow {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcademicYearRow {
    pub id: String,
    pub department_id: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SemesterRow {
    pub id: String,
    pub academic_year_id: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRow {
    pub id: String,
    pub semester_id: String,
    pub name: String,
    pub shift: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CourseRow {
    pub id: String,
    pub code: String,
    pub title: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseAssignmentRow {
    pub id: String,
    pub batch_id: String,
    pub course_id: String,
    pub teacher_id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSlotRow {
    pub id: String,
    #[serde(default)]
    pub label: Option<String>,
    pub start_time: String,
    pub end_time: String,
    pub slot_type: String,
    pub shift: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CatalogBundle {
    pub departments: Vec<NamedRow>,
    pub academic_years: Vec<AcademicYearRow>,
    pub semesters: Vec<SemesterRow>,
    pub batches: Vec<BatchRow>,
    pub courses: Vec<CourseRow>,
    pub teachers: Vec<NamedRow>,
    pub course_assignments: Vec<CourseAssignmentRow>,
    pub rooms: Vec<NamedRow>,
    pub time_slots: Vec<TimeSlotRow>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportCounts {
    pub departments: usize,
    pub academic_years: usize,
    pub semesters: usize,
    pub batches: usize,
    pub courses: usize,
    pub teachers: usize,
    pub course_assignments: usize,
    pub rooms: usize,
    pub time_slots: usize,
}

fn bad_value(kind: &str, id: &str, field: &str, value: &str) -> ApiError {
    ApiError::BadParams(format!("{} {} has invalid {}: {:?}", kind, id, field, value))
}

fn check_values(bundle: &CatalogBundle) -> ApiResult<()> {
    for b in &bundle.batches {
        if Shift::parse(&b.shift).is_none() {
            return Err(bad_value("batch", &b.id, "shift", &b.shift));
        }
    }
    for ts in &bundle.time_slots {
        if Shift::parse(&ts.shift).is_none() {
            return Err(bad_value("time slot", &ts.id, "shift", &ts.shift));
        }
        if SlotType::parse(&ts.slot_type).is_none() {
            return Err(bad_value("time slot", &ts.id, "slotType", &ts.slot_type));
        }
        if ts.start_time.trim() >= ts.end_time.trim() {
            return Err(bad_value("time slot", &ts.id, "endTime", &ts.end_time));
        }
    }
    Ok(())
}

/// Upserts every row of the bundle in one transaction, parents first.
pub fn import(conn: &Connection, bundle: &CatalogBundle) -> ApiResult<ImportCounts> {
    check_values(bundle)?;

    let tx = conn.unchecked_transaction()?;
    for d in &bundle.departments {
        tx.execute(
            "INSERT INTO departments(id, name) VALUES(?, ?)
             ON CONFLICT(id) DO UPDATE SET name = excluded.name",
            params![d.id, d.name.trim()],
        )?;
    }
    for y in &bundle.academic_years {
        tx.execute(
            "INSERT INTO academic_years(id, department_id, name) VALUES(?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET department_id = excluded.department_id, name = excluded.name",
            params![y.id, y.department_id, y.name.trim()],
        )?;
    }
    for s in &bundle.semesters {
        tx.execute(
            "INSERT INTO semesters(id, academic_year_id, name) VALUES(?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET academic_year_id = excluded.academic_year_id, name = excluded.name",
            params![s.id, s.academic_year_id, s.name.trim()],
        )?;
    }
    for b in &bundle.batches {
        let shift = Shift::parse(&b.shift).map(Shift::as_str).unwrap_or("Morning");
        tx.execute(
            "INSERT INTO batches(id, semester_id, name, shift) VALUES(?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET semester_id = excluded.semester_id,
               name = excluded.name, shift = excluded.shift",
            params![b.id, b.semester_id, b.name.trim(), shift],
        )?;
    }
    for c in &bundle.courses {
        tx.execute(
            "INSERT INTO courses(id, code, title) VALUES(?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET code = excluded.code, title = excluded.title",
            params![c.id, c.code.trim(), c.title.trim()],
        )?;
    }
    for t in &bundle.teachers {
        tx.execute(
            "INSERT INTO teachers(id, name) VALUES(?, ?)
             ON CONFLICT(id) DO UPDATE SET name = excluded.name",
            params![t.id, t.name.trim()],
        )?;
    }
    for a in &bundle.course_assignments {
        tx.execute(
            "INSERT INTO course_assignments(id, batch_id, course_id, teacher_id) VALUES(?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET batch_id = excluded.batch_id,
               course_id = excluded.course_id, teacher_id = excluded.teacher_id",
            params![a.id, a.batch_id, a.course_id, a.teacher_id],
        )?;
    }
    for r in &bundle.rooms {
        tx.execute(
            "INSERT INTO rooms(id, name) VALUES(?, ?)
             ON CONFLICT(id) DO UPDATE SET name = excluded.name",
            params![r.id, r.name.trim()],
        )?;
    }
    for ts in &bundle.time_slots {
        let start = ts.start_time.trim();
        let end = ts.end_time.trim();
        let label = ts
            .label
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}-{}", start, end));
        let slot_type = SlotType::parse(&ts.slot_type)
            .map(SlotType::as_str)
            .unwrap_or("Class");
        let shift = Shift::parse(&ts.shift).map(Shift::as_str).unwrap_or("Morning");
        tx.execute(
            "INSERT INTO time_slots(id, label, start_time, end_time, slot_type, shift)
             VALUES(?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET label = excluded.label, start_time = excluded.start_time,
               end_time = excluded.end_time, slot_type = excluded.slot_type, shift = excluded.shift",
            params![ts.id, label, start, end, slot_type, shift],
        )?;
    }
    tx.commit()?;

    Ok(ImportCounts {
        departments: bundle.departments.len(),
        academic_years: bundle.academic_years.len(),
        semesters: bundle.semesters.len(),
        batches: bundle.batches.len(),
        courses: bundle.courses.len(),
        teachers: bundle.teachers.len(),
        course_assignments: bundle.course_assignments.len(),
        rooms: bundle.rooms.len(),
        time_slots: bundle.time_slots.len(),
    })
}
