//! Form validation for routine and entry inputs.
//!
//! Mirrors the dashboard's form schemas: every failure is reported against the
//! field it belongs to so the caller can show messages next to inputs.

use crate::model::{
    Day, EntryInput, EntryPatch, EntryType, EntryUpdate, NewEntry, RoutineInput,
};
use chrono::NaiveDate;
use serde::Serialize;

pub const TITLE_MAX: usize = 255;
pub const DESCRIPTION_MAX: usize = 2000;
pub const NOTES_MAX: usize = 500;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

#[derive(Debug, Default)]
struct Collector {
    errors: Vec<FieldError>,
}

impl Collector {
    fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.errors.push(FieldError {
            field,
            message: message.into(),
        });
    }

    fn required(&mut self, field: &'static str, label: &str, value: &Option<String>) -> Option<String> {
        match trimmed(value) {
            Some(v) => Some(v),
            None => {
                self.push(field, format!("{} is required", label));
                None
            }
        }
    }

    fn max_len(&mut self, field: &'static str, label: &str, value: &Option<String>, max: usize) {
        if let Some(v) = value {
            if v.trim().chars().count() > max {
                self.push(field, format!("{} must be at most {} characters", label, max));
            }
        }
    }

    fn finish<T>(self, value: impl FnOnce() -> T) -> Result<T, Vec<FieldError>> {
        if self.errors.is_empty() {
            Ok(value())
        } else {
            Err(self.errors)
        }
    }
}

fn trimmed(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

pub fn parse_iso_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

/// Validates a routine form. Returns the input with blank strings normalized to `None`.
pub fn routine(input: &RoutineInput) -> Result<RoutineInput, Vec<FieldError>> {
    let mut c = Collector::default();
    let title = c.required("title", "Title", &input.title);
    c.max_len("title", "Title", &input.title, TITLE_MAX);
    c.max_len("description", "Description", &input.description, DESCRIPTION_MAX);

    let from = trimmed(&input.effective_from);
    let to = trimmed(&input.effective_to);
    let from_date = from.as_deref().and_then(|s| {
        let d = parse_iso_date(s);
        if d.is_none() {
            c.push("effectiveFrom", "Effective from must be a date (YYYY-MM-DD)");
        }
        d
    });
    let to_date = to.as_deref().and_then(|s| {
        let d = parse_iso_date(s);
        if d.is_none() {
            c.push("effectiveTo", "Effective to must be a date (YYYY-MM-DD)");
        }
        d
    });
    if let (Some(f), Some(t)) = (from_date, to_date) {
        if t < f {
            c.push("effectiveTo", "Effective to must not be before effective from");
        }
    }

    c.finish(|| RoutineInput {
        title,
        description: trimmed(&input.description),
        effective_from: from,
        effective_to: to,
        semester_id: trimmed(&input.semester_id),
        batch_id: trimmed(&input.batch_id),
        institution: trimmed(&input.institution),
    })
}

pub fn entry(input: &EntryInput) -> Result<NewEntry, Vec<FieldError>> {
    let mut c = Collector::default();
    let routine_id = c.required("routineId", "Routine", &input.routine_id);
    let course_assignment_id =
        c.required("courseAssignmentId", "Course assignment", &input.course_assignment_id);
    let room_id = c.required("roomId", "Room", &input.room_id);
    let time_slot_id = c.required("timeSlotId", "Time slot", &input.time_slot_id);

    let day = match trimmed(&input.day_of_week) {
        Some(raw) => {
            let d = Day::parse(&raw);
            if d.is_none() {
                c.push("dayOfWeek", "Day must be one of Sunday..Friday");
            }
            d
        }
        None => {
            c.push("dayOfWeek", "Day is required");
            None
        }
    };
    let entry_type = parse_entry_type(&mut c, &input.entry_type);
    c.max_len("notes", "Notes", &input.notes, NOTES_MAX);

    c.finish(|| NewEntry {
        routine_id: routine_id.unwrap_or_default(),
        course_assignment_id: course_assignment_id.unwrap_or_default(),
        room_id: room_id.unwrap_or_default(),
        time_slot_id: time_slot_id.unwrap_or_default(),
        day_of_week: day.unwrap_or(Day::Sunday),
        entry_type: entry_type.unwrap_or(EntryType::Lecture),
        notes: trimmed(&input.notes),
        is_cancelled: input.is_cancelled.unwrap_or(false),
    })
}

pub fn entry_patch(input: &EntryPatch) -> Result<EntryUpdate, Vec<FieldError>> {
    let mut c = Collector::default();
    let course_assignment_id =
        c.required("courseAssignmentId", "Course assignment", &input.course_assignment_id);
    let time_slot_id = c.required("timeSlotId", "Time slot", &input.time_slot_id);
    let entry_type = parse_entry_type(&mut c, &input.entry_type);
    c.max_len("notes", "Notes", &input.notes, NOTES_MAX);

    c.finish(|| EntryUpdate {
        course_assignment_id: course_assignment_id.unwrap_or_default(),
        time_slot_id: time_slot_id.unwrap_or_default(),
        entry_type: entry_type.unwrap_or(EntryType::Lecture),
        notes: trimmed(&input.notes),
    })
}

fn parse_entry_type(c: &mut Collector, raw: &Option<String>) -> Option<EntryType> {
    match trimmed(raw) {
        Some(raw) => {
            let t = EntryType::parse(&raw);
            if t.is_none() {
                c.push("entryType", "Entry type must be Lecture or Practical");
            }
            t
        }
        None => {
            c.push("entryType", "Entry type is required");
            None
        }
    }
}
