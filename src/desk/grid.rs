use crate::model::{Day, EntryType, GridSnapshot, RoutineEntry, SlotType};
use serde::Serialize;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum LoadPhase {
    /// Nothing to show yet.
    Spinner,
    /// A previous grid stays visible under a translucent overlay.
    Overlay,
    Ready,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket(u64);

/// Latest grid snapshot plus fetch bookkeeping. A fetch result only lands if
/// no newer fetch was started after it.
#[derive(Debug, Default)]
pub struct GridState {
    snapshot: Option<GridSnapshot>,
    started: u64,
    settled: u64,
}

impl GridState {
    pub fn begin_fetch(&mut self) -> FetchTicket {
        self.started += 1;
        FetchTicket(self.started)
    }

    /// Returns false when the result was superseded and dropped.
    pub fn finish_fetch(&mut self, ticket: FetchTicket, snapshot: GridSnapshot) -> bool {
        if ticket.0 < self.started {
            tracing::debug!(ticket = ticket.0, latest = self.started, "stale grid fetch dropped");
            self.settled = self.settled.max(ticket.0);
            return false;
        }
        self.snapshot = Some(snapshot);
        self.settled = ticket.0;
        true
    }

    pub fn fail_fetch(&mut self, ticket: FetchTicket) {
        self.settled = self.settled.max(ticket.0);
    }

    pub fn phase(&self) -> LoadPhase {
        let in_flight = self.settled < self.started;
        match (&self.snapshot, in_flight) {
            (None, _) => LoadPhase::Spinner,
            (Some(_), true) => LoadPhase::Overlay,
            (Some(_), false) => LoadPhase::Ready,
        }
    }

    pub fn snapshot(&self) -> Option<&GridSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn clear(&mut self) {
        self.snapshot = None;
        self.settled = self.started;
    }
}

/// Column order: by slot start time when metadata is present, otherwise the
/// slot keys found in the grid itself.
pub fn columns(snapshot: &GridSnapshot) -> Vec<String> {
    if !snapshot.slots.is_empty() {
        let mut labels: Vec<(&str, &String)> = snapshot
            .slots
            .iter()
            .map(|(label, meta)| (meta.start_time.as_str(), label))
            .collect();
        labels.sort();
        return labels.into_iter().map(|(_, l)| l.clone()).collect();
    }
    let keys: BTreeSet<&String> = snapshot.grid.values().flat_map(|row| row.keys()).collect();
    keys.into_iter().cloned().collect()
}

#[derive(Debug, Clone, PartialEq)]
pub enum CellKind<'a> {
    Break,
    Entry(&'a RoutineEntry),
    Empty { slot_type: Option<SlotType> },
}

pub fn classify<'a>(snapshot: &'a GridSnapshot, day: Day, label: &str) -> CellKind<'a> {
    let entry = snapshot
        .grid
        .get(&day)
        .and_then(|row| row.get(label))
        .and_then(|cell| cell.as_ref());
    if let Some(entry) = entry {
        return CellKind::Entry(entry);
    }
    let slot_type = snapshot.slots.get(label).map(|m| m.slot_type);
    match slot_type {
        Some(SlotType::Break) => CellKind::Break,
        other => CellKind::Empty { slot_type: other },
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Click {
    Single,
    Double,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSeed {
    pub day: Day,
    pub time_slot_label: String,
    pub time_slot_id: Option<String>,
    pub slot_type: Option<SlotType>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ModalRequest {
    Create(CreateSeed),
    Update(Box<RoutineEntry>),
}

/// Single click on an empty class cell creates; double click on an entry
/// edits; breaks and other combinations do nothing.
pub fn dispatch(
    snapshot: &GridSnapshot,
    day: Day,
    label: &str,
    click: Click,
) -> Option<ModalRequest> {
    match (classify(snapshot, day, label), click) {
        (CellKind::Entry(entry), Click::Double) => {
            Some(ModalRequest::Update(Box::new(entry.clone())))
        }
        (CellKind::Empty { slot_type }, Click::Single) => Some(ModalRequest::Create(CreateSeed {
            day,
            time_slot_label: label.to_string(),
            time_slot_id: snapshot.slots.get(label).map(|m| m.id.clone()),
            slot_type,
        })),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntrySummary {
    pub entry_id: String,
    pub course_code: String,
    pub course_title: String,
    pub teacher: String,
    pub room: String,
    pub entry_type: EntryType,
    pub is_cancelled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl From<&RoutineEntry> for EntrySummary {
    fn from(e: &RoutineEntry) -> Self {
        Self {
            entry_id: e.id.clone(),
            course_code: e.course_assignment.course.code.clone(),
            course_title: e.course_assignment.course.title.clone(),
            teacher: e.course_assignment.teacher.name.clone(),
            room: e.room.name.clone(),
            entry_type: e.entry_type,
            is_cancelled: e.is_cancelled,
            notes: e.notes.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum CellView {
    Break { label: &'static str },
    Entry(EntrySummary),
    #[serde(rename_all = "camelCase")]
    Empty { slot_type: Option<SlotType> },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnView {
    pub label: String,
    pub start_time: Option<String>,
    pub slot_type: Option<SlotType>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowView {
    pub day: Day,
    pub cells: Vec<CellView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridView {
    pub phase: LoadPhase,
    pub columns: Vec<ColumnView>,
    pub rows: Vec<RowView>,
}

pub fn render(state: &GridState) -> GridView {
    let phase = state.phase();
    let Some(snapshot) = state.snapshot() else {
        return GridView {
            phase,
            columns: Vec::new(),
            rows: Vec::new(),
        };
    };
    let labels = columns(snapshot);
    let columns = labels
        .iter()
        .map(|l| {
            let meta = snapshot.slots.get(l);
            ColumnView {
                label: l.clone(),
                start_time: meta.map(|m| m.start_time.clone()),
                slot_type: meta.map(|m| m.slot_type),
            }
        })
        .collect();
    let rows = Day::ALL
        .into_iter()
        .map(|day| RowView {
            day,
            cells: labels
                .iter()
                .map(|l| match classify(snapshot, day, l) {
                    CellKind::Break => CellView::Break { label: "Break" },
                    CellKind::Entry(e) => CellView::Entry(EntrySummary::from(e)),
                    CellKind::Empty { slot_type } => CellView::Empty { slot_type },
                })
                .collect(),
        })
        .collect();
    GridView {
        phase,
        columns,
        rows,
    }
}
