//! Entry form with dependent dropdowns.
//!
//! The dropdowns form a small dependency graph:
//! Department -> AcademicYear -> Semester -> Batch -> {CourseAssignment, TimeSlot}.
//! Room hangs off nothing. Changing a field clears everything downstream and
//! names the option lists that can be fetched again.

use super::DeskError;
use crate::api::{ApiResult, RoutineApi};
use crate::model::{Day, EntryInput, EntryPatch, EntryType, Lookup, OptionItem, Shift};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    Department,
    AcademicYear,
    Semester,
    Batch,
    CourseAssignment,
    TimeSlot,
    Room,
}

impl Field {
    /// Topological order.
    pub const ALL: [Field; 7] = [
        Field::Department,
        Field::AcademicYear,
        Field::Semester,
        Field::Batch,
        Field::CourseAssignment,
        Field::TimeSlot,
        Field::Room,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Field::Department => "department",
            Field::AcademicYear => "academicYear",
            Field::Semester => "semester",
            Field::Batch => "batch",
            Field::CourseAssignment => "courseAssignment",
            Field::TimeSlot => "timeSlot",
            Field::Room => "room",
        }
    }

    pub fn parents(self) -> &'static [Field] {
        match self {
            Field::Department | Field::Room => &[],
            Field::AcademicYear => &[Field::Department],
            Field::Semester => &[Field::AcademicYear],
            Field::Batch => &[Field::Semester],
            Field::CourseAssignment | Field::TimeSlot => &[Field::Batch],
        }
    }
}

/// Every field that transitively depends on `field`, in topological order.
pub fn downstream(field: Field) -> Vec<Field> {
    let mut hit: BTreeSet<Field> = BTreeSet::new();
    hit.insert(field);
    let mut out = Vec::new();
    for f in Field::ALL {
        if f.parents().iter().any(|p| hit.contains(p)) {
            hit.insert(f);
            out.push(f);
        }
    }
    out
}

/// A settable form input: a dropdown or one of the free fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Select(Field),
    EntryType,
    Notes,
}

impl FormField {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "entryType" => return Some(FormField::EntryType),
            "notes" => return Some(FormField::Notes),
            _ => {}
        }
        Field::ALL
            .into_iter()
            .find(|f| f.as_str() == s)
            .map(FormField::Select)
    }

    fn name(self) -> &'static str {
        match self {
            FormField::Select(f) => f.as_str(),
            FormField::EntryType => "entryType",
            FormField::Notes => "notes",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryForm {
    values: BTreeMap<Field, String>,
    options: BTreeMap<Field, Vec<OptionItem>>,
    locked: BTreeSet<Field>,
    pub day: Option<Day>,
    pub shift: Option<Shift>,
    pub entry_type: Option<EntryType>,
    pub notes: Option<String>,
    locked_free: bool,
}

impl EntryForm {
    pub fn value(&self, field: Field) -> Option<&str> {
        self.values.get(&field).map(String::as_str)
    }

    pub fn options(&self, field: Field) -> &[OptionItem] {
        self.options.get(&field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_locked(&self, field: Field) -> bool {
        self.locked.contains(&field)
    }

    /// Seeds a value without cascading; used when prefilling a form.
    pub fn seed(&mut self, field: Field, value: Option<String>) {
        match value.filter(|v| !v.trim().is_empty()) {
            Some(v) => {
                self.values.insert(field, v);
            }
            None => {
                self.values.remove(&field);
            }
        }
    }

    pub fn lock(&mut self, field: Field) {
        self.locked.insert(field);
    }

    /// Freezes entry type and notes as well as every dropdown.
    pub fn lock_all(&mut self) {
        self.locked.extend(Field::ALL);
        self.locked_free = true;
    }

    /// The lookup for `field` if all of its parents are set.
    pub fn lookup_for(&self, field: Field) -> Option<Lookup> {
        let parent = |f: Field| self.value(f).map(str::to_string);
        Some(match field {
            Field::Department => Lookup::Departments,
            Field::Room => Lookup::Rooms,
            Field::AcademicYear => Lookup::AcademicYears {
                department_id: parent(Field::Department)?,
            },
            Field::Semester => Lookup::Semesters {
                academic_year_id: parent(Field::AcademicYear)?,
            },
            Field::Batch => Lookup::Batches {
                semester_id: parent(Field::Semester)?,
            },
            Field::CourseAssignment => Lookup::CourseAssignments {
                batch_id: parent(Field::Batch)?,
            },
            Field::TimeSlot => Lookup::TimeSlots {
                batch_id: parent(Field::Batch)?,
            },
        })
    }

    /// Sets one input. For a dropdown, downstream values and option lists are
    /// dropped and the returned fields are the ones whose options can be
    /// fetched now.
    pub fn set(&mut self, field: FormField, value: Option<String>) -> Result<Vec<Field>, DeskError> {
        let read_only = match field {
            FormField::Select(f) => self.is_locked(f),
            FormField::EntryType | FormField::Notes => self.locked_free,
        };
        if read_only {
            return Err(DeskError::ReadOnly(field.name()));
        }
        match field {
            FormField::EntryType => {
                self.entry_type = match value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
                    None => None,
                    Some(raw) => Some(EntryType::parse(raw).ok_or_else(|| {
                        DeskError::Precondition(format!("unknown entry type {}", raw))
                    })?),
                };
                Ok(Vec::new())
            }
            FormField::Notes => {
                self.notes = value;
                Ok(Vec::new())
            }
            FormField::Select(f) => {
                self.seed(f, value);
                let below = downstream(f);
                for d in &below {
                    self.values.remove(d);
                    self.options.remove(d);
                }
                Ok(below
                    .into_iter()
                    .filter(|d| self.lookup_for(*d).is_some())
                    .collect())
            }
        }
    }

    /// Fetches option lists for `fields`, skipping any whose parents are unset.
    pub fn load_options(&mut self, api: &impl RoutineApi, fields: &[Field]) -> ApiResult<()> {
        for f in fields {
            if let Some(lookup) = self.lookup_for(*f) {
                let items = api.lookup(&lookup)?;
                self.options.insert(*f, items);
            }
        }
        Ok(())
    }

    /// Fetches every option list that is currently resolvable.
    pub fn load_all_options(&mut self, api: &impl RoutineApi) -> ApiResult<()> {
        self.load_options(api, &Field::ALL)
    }

    pub fn to_input(&self, routine_id: &str) -> EntryInput {
        let v = |f: Field| self.value(f).map(str::to_string);
        EntryInput {
            routine_id: Some(routine_id.to_string()),
            course_assignment_id: v(Field::CourseAssignment),
            room_id: v(Field::Room),
            time_slot_id: v(Field::TimeSlot),
            day_of_week: self.day.map(|d| d.as_str().to_string()),
            entry_type: self.entry_type.map(|t| t.as_str().to_string()),
            notes: self.notes.clone(),
            is_cancelled: None,
        }
    }

    pub fn to_patch(&self) -> EntryPatch {
        EntryPatch {
            course_assignment_id: self.value(Field::CourseAssignment).map(str::to_string),
            time_slot_id: self.value(Field::TimeSlot).map(str::to_string),
            entry_type: self.entry_type.map(|t| t.as_str().to_string()),
            notes: self.notes.clone(),
        }
    }
}
