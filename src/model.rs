use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Working days of the routine week. Declaration order is display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Day {
    Sunday,
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
}

impl Day {
    pub const ALL: [Day; 6] = [
        Day::Sunday,
        Day::Monday,
        Day::Tuesday,
        Day::Wednesday,
        Day::Thursday,
        Day::Friday,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Day::Sunday => "Sunday",
            Day::Monday => "Monday",
            Day::Tuesday => "Tuesday",
            Day::Wednesday => "Wednesday",
            Day::Thursday => "Thursday",
            Day::Friday => "Friday",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        Day::ALL
            .into_iter()
            .find(|d| d.as_str().eq_ignore_ascii_case(s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Shift {
    Morning,
    Day,
}

impl Shift {
    pub fn as_str(self) -> &'static str {
        match self {
            Shift::Morning => "Morning",
            Shift::Day => "Day",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "morning" => Some(Shift::Morning),
            "day" => Some(Shift::Day),
            _ => None,
        }
    }
}

/// Routine lifecycle. `Archieved` keeps the wire spelling used by the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoutineStatus {
    Draft,
    Published,
    Archieved,
}

impl RoutineStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RoutineStatus::Draft => "draft",
            RoutineStatus::Published => "published",
            RoutineStatus::Archieved => "archieved",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "draft" => Some(RoutineStatus::Draft),
            "published" => Some(RoutineStatus::Published),
            // Accept the conventional spelling on input, store the wire one.
            "archieved" | "archived" => Some(RoutineStatus::Archieved),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryType {
    Lecture,
    Practical,
}

impl EntryType {
    pub fn as_str(self) -> &'static str {
        match self {
            EntryType::Lecture => "Lecture",
            EntryType::Practical => "Practical",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lecture" => Some(EntryType::Lecture),
            "practical" => Some(EntryType::Practical),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SlotType {
    Class,
    Break,
}

impl SlotType {
    pub fn as_str(self) -> &'static str {
        match self {
            SlotType::Class => "Class",
            SlotType::Break => "Break",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "class" | "lecture" | "regular" => Some(SlotType::Class),
            "break" => Some(SlotType::Break),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedRef {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchRef {
    pub id: String,
    pub name: String,
    pub shift: Shift,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseRef {
    pub id: String,
    pub code: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Routine {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub effective_from: Option<String>,
    pub effective_to: Option<String>,
    pub status: RoutineStatus,
    pub institution: Option<String>,
    pub semester: Option<NamedRef>,
    pub batch: Option<BatchRef>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseAssignment {
    pub id: String,
    pub course: CourseRef,
    pub teacher: NamedRef,
    pub batch: BatchRef,
    pub semester: NamedRef,
    pub academic_year: NamedRef,
    pub department: NamedRef,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutineEntry {
    pub id: String,
    pub routine_id: String,
    pub day_of_week: Day,
    pub time_slot_id: String,
    pub time_slot_label: String,
    pub course_assignment: CourseAssignment,
    pub room: NamedRef,
    pub entry_type: EntryType,
    pub notes: Option<String>,
    pub is_cancelled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotMeta {
    pub id: String,
    pub start_time: String,
    pub end_time: String,
    pub slot_type: SlotType,
}

/// Day -> time-slot label -> entry in that cell, if any.
pub type RoutineGrid = BTreeMap<Day, BTreeMap<String, Option<RoutineEntry>>>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GridSnapshot {
    pub grid: RoutineGrid,
    pub slots: BTreeMap<String, SlotMeta>,
}

impl GridSnapshot {
    pub fn entries_on(&self, day: Day) -> impl Iterator<Item = &RoutineEntry> {
        self.grid
            .get(&day)
            .into_iter()
            .flat_map(|row| row.values().flatten())
    }

    pub fn entry_count(&self, day: Day) -> usize {
        self.entries_on(day).count()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub current_page: i64,
    pub last_page: i64,
    pub per_page: i64,
    pub total: i64,
    pub from: Option<i64>,
    pub to: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub meta: PageMeta,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutineQuery {
    pub status: Option<RoutineStatus>,
    pub search: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub page: Option<i64>,
}

/// Raw routine form values, validated by `validate::routine`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RoutineInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub effective_from: Option<String>,
    pub effective_to: Option<String>,
    pub semester_id: Option<String>,
    pub batch_id: Option<String>,
    pub institution: Option<String>,
}

/// Raw entry-creation form values, validated by `validate::entry`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EntryInput {
    pub routine_id: Option<String>,
    pub course_assignment_id: Option<String>,
    pub room_id: Option<String>,
    pub time_slot_id: Option<String>,
    pub day_of_week: Option<String>,
    pub entry_type: Option<String>,
    pub notes: Option<String>,
    pub is_cancelled: Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewEntry {
    pub routine_id: String,
    pub course_assignment_id: String,
    pub room_id: String,
    pub time_slot_id: String,
    pub day_of_week: Day,
    pub entry_type: EntryType,
    pub notes: Option<String>,
    pub is_cancelled: bool,
}

/// The four fields an existing entry may change.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EntryPatch {
    pub course_assignment_id: Option<String>,
    pub time_slot_id: Option<String>,
    pub entry_type: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntryUpdate {
    pub course_assignment_id: String,
    pub time_slot_id: String,
    pub entry_type: EntryType,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CopyRequest {
    pub routine_id: String,
    pub source_day: Day,
    pub target_days: Vec<Day>,
    /// Limits the copy to entries in this shift's slots; all shifts when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shift: Option<Shift>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CopyOutcome {
    pub aborted: bool,
    pub total_copied: i64,
    pub days_completed: Vec<Day>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conflict_day: Option<Day>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conflict_message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Lookup {
    Departments,
    #[serde(rename_all = "camelCase")]
    AcademicYears { department_id: String },
    #[serde(rename_all = "camelCase")]
    Semesters { academic_year_id: String },
    #[serde(rename_all = "camelCase")]
    Batches { semester_id: String },
    #[serde(rename_all = "camelCase")]
    CourseAssignments { batch_id: String },
    Rooms,
    #[serde(rename_all = "camelCase")]
    TimeSlots { batch_id: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionItem {
    pub id: String,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shift: Option<Shift>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn day_parse_is_case_insensitive_and_excludes_saturday() {
        assert_eq!(Day::parse("monday"), Some(Day::Monday));
        assert_eq!(Day::parse(" FRIDAY "), Some(Day::Friday));
        assert_eq!(Day::parse("Saturday"), None);
    }

    #[test]
    fn status_keeps_wire_spelling() {
        assert_eq!(RoutineStatus::parse("archived"), Some(RoutineStatus::Archieved));
        assert_eq!(
            serde_json::to_value(RoutineStatus::Archieved).unwrap(),
            serde_json::json!("archieved")
        );
    }

    #[test]
    fn grid_keys_serialize_as_day_names() {
        let mut snap = GridSnapshot::default();
        snap.grid
            .entry(Day::Sunday)
            .or_default()
            .insert("08:00-08:50".to_string(), None);
        let v = serde_json::to_value(&snap).unwrap();
        assert!(v.pointer("/grid/Sunday/08:00-08:50").is_some());
    }
}
