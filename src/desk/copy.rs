//! Copy-entries dialog: previews counts, checks what it can before sending,
//! and turns the authority's answer into a report.

use super::DeskError;
use crate::api::{ApiError, ApiResult};
use crate::model::{CopyOutcome, CopyRequest, Day, GridSnapshot, Shift};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayCount {
    pub day: Day,
    pub entry_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetOption {
    pub day: Day,
    pub entry_count: usize,
    /// The target already has an entry in a slot the source fills.
    pub overlaps: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CopyOptions {
    pub available: bool,
    pub sources: Vec<DayCount>,
    pub source_day: Option<Day>,
    pub targets: Vec<TargetOption>,
}

fn filled_slots(snapshot: &GridSnapshot, day: Day) -> BTreeSet<&str> {
    snapshot
        .entries_on(day)
        .map(|e| e.time_slot_id.as_str())
        .collect()
}

/// Counts come from the open shift's snapshot; `prepare` scopes the copy to
/// the same shift so the preview matches what is copied.
pub fn options(snapshot: &GridSnapshot, source: Option<Day>) -> CopyOptions {
    let sources: Vec<DayCount> = Day::ALL
        .into_iter()
        .map(|day| DayCount {
            day,
            entry_count: snapshot.entry_count(day),
        })
        .filter(|c| c.entry_count > 0)
        .collect();
    let source = source.filter(|d| sources.iter().any(|c| c.day == *d));
    let targets = match source {
        None => Vec::new(),
        Some(src) => {
            let src_slots = filled_slots(snapshot, src);
            Day::ALL
                .into_iter()
                .filter(|d| *d != src)
                .map(|day| {
                    let slots = filled_slots(snapshot, day);
                    TargetOption {
                        day,
                        entry_count: slots.len(),
                        overlaps: !slots.is_disjoint(&src_slots),
                    }
                })
                .collect()
        }
    };
    CopyOptions {
        available: !sources.is_empty(),
        sources,
        source_day: source,
        targets,
    }
}

/// Checks the dialog state and builds the request for the open routine and
/// shift.
pub fn prepare(
    open: Option<(&str, Shift)>,
    source: Option<Day>,
    targets: &[Day],
) -> Result<CopyRequest, DeskError> {
    let (routine_id, shift) = open.ok_or(DeskError::NoRoutine)?;
    let source = source.ok_or_else(|| DeskError::Precondition("choose a day to copy from".into()))?;
    if targets.is_empty() {
        return Err(DeskError::Precondition(
            "choose at least one day to copy to".into(),
        ));
    }
    if targets.contains(&source) {
        return Err(DeskError::Precondition(format!(
            "{} cannot be copied onto itself",
            source.as_str()
        )));
    }
    let mut target_days: Vec<Day> = Vec::with_capacity(targets.len());
    for d in targets {
        if !target_days.contains(d) {
            target_days.push(*d);
        }
    }
    Ok(CopyRequest {
        routine_id: routine_id.to_string(),
        source_day: source,
        target_days,
        shift: Some(shift),
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum CopyReport {
    #[serde(rename_all = "camelCase")]
    Completed {
        total_copied: i64,
        days_completed: Vec<Day>,
    },
    #[serde(rename_all = "camelCase")]
    Aborted {
        conflict_day: Option<Day>,
        conflict_message: String,
        total_copied: i64,
    },
}

fn aborted_from_details(message: &str, details: Option<&Value>) -> CopyReport {
    let field = |k: &str| details.and_then(|d| d.get(k));
    CopyReport::Aborted {
        conflict_day: field("conflictDay")
            .or_else(|| field("day"))
            .and_then(Value::as_str)
            .and_then(Day::parse),
        conflict_message: field("conflictMessage")
            .and_then(Value::as_str)
            .unwrap_or(message)
            .to_string(),
        total_copied: field("totalCopied").and_then(Value::as_i64).unwrap_or(0),
    }
}

/// An abort arrives either as `aborted` in a successful result or as a
/// conflict error; both become `Aborted`. Other errors pass through.
pub fn interpret(result: ApiResult<CopyOutcome>) -> Result<CopyReport, ApiError> {
    match result {
        Ok(out) if out.aborted => Ok(CopyReport::Aborted {
            conflict_day: out.conflict_day,
            conflict_message: out
                .conflict_message
                .unwrap_or_else(|| "a conflicting entry was found".to_string()),
            total_copied: out.total_copied,
        }),
        Ok(out) => Ok(CopyReport::Completed {
            total_copied: out.total_copied,
            days_completed: out.days_completed,
        }),
        Err(ApiError::Conflict { message, details }) => {
            Ok(aborted_from_details(&message, details.as_ref()))
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::desk::grid::fixtures;
    use serde_json::json;

    #[test]
    fn options_list_populated_sources_and_flag_overlaps() {
        let mut snap = fixtures::snapshot();
        let e = fixtures::entry("e2", Day::Tuesday, "m1", "08:00-08:50", "CHE101", "Room B");
        snap.grid
            .get_mut(&Day::Tuesday)
            .unwrap()
            .insert("08:00-08:50".into(), Some(e));

        let opts = options(&snap, None);
        assert!(opts.available);
        assert_eq!(
            opts.sources.iter().map(|c| c.day).collect::<Vec<_>>(),
            vec![Day::Sunday, Day::Tuesday]
        );
        assert!(opts.targets.is_empty());

        let opts = options(&snap, Some(Day::Sunday));
        assert_eq!(opts.targets.len(), 5);
        assert!(opts.targets.iter().all(|t| t.day != Day::Sunday));
        let tue = opts.targets.iter().find(|t| t.day == Day::Tuesday).unwrap();
        assert!(tue.overlaps);
        assert_eq!(tue.entry_count, 1);
        let mon = opts.targets.iter().find(|t| t.day == Day::Monday).unwrap();
        assert!(!mon.overlaps);

        assert_eq!(options(&snap, Some(Day::Friday)).source_day, None);
    }

    #[test]
    fn unavailable_when_grid_is_empty() {
        let opts = options(&GridSnapshot::default(), Some(Day::Sunday));
        assert!(!opts.available);
        assert!(opts.targets.is_empty());
    }

    #[test]
    fn prepare_enforces_preconditions() {
        assert!(matches!(
            prepare(None, Some(Day::Sunday), &[Day::Monday]),
            Err(DeskError::NoRoutine)
        ));
        assert_eq!(
            prepare(Some(("r1", Shift::Morning)), None, &[Day::Monday]).unwrap_err().code(),
            "precondition_failed"
        );
        assert!(prepare(Some(("r1", Shift::Morning)), Some(Day::Sunday), &[]).is_err());
        assert!(prepare(Some(("r1", Shift::Morning)), Some(Day::Sunday), &[Day::Sunday, Day::Monday]).is_err());
        let req = prepare(Some(("r1", Shift::Morning)), Some(Day::Sunday), &[Day::Monday, Day::Monday]).unwrap();
        assert_eq!(req.target_days, vec![Day::Monday]);
        assert_eq!(req.shift, Some(Shift::Morning));
    }

    #[test]
    fn both_abort_channels_read_the_same() {
        let flag = interpret(Ok(CopyOutcome {
            aborted: true,
            total_copied: 2,
            days_completed: vec![Day::Monday],
            conflict_day: Some(Day::Tuesday),
            conflict_message: Some("Room A is booked".into()),
        }))
        .unwrap();
        let error = interpret(Err(ApiError::Conflict {
            message: "conflict".into(),
            details: Some(json!({
                "conflictDay": "Tuesday",
                "conflictMessage": "Room A is booked",
                "totalCopied": 2
            })),
        }))
        .unwrap();
        assert_eq!(flag, error);
        assert!(interpret(Err(ApiError::NotFound("routine"))).is_err());
    }

    #[test]
    fn cell_conflict_details_still_name_the_day() {
        let report = interpret(Err(ApiError::Conflict {
            message: "Monday already has an entry in that time slot".into(),
            details: Some(json!({ "day": "Monday" })),
        }))
        .unwrap();
        assert_eq!(
            report,
            CopyReport::Aborted {
                conflict_day: Some(Day::Monday),
                conflict_message: "Monday already has an entry in that time slot".into(),
                total_copied: 0,
            }
        );
    }
}
