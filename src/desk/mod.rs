//! Dashboard application state.
//!
//! `Desk` holds what the routine screens keep between requests: the open
//! routine and shift, the latest grid, the entry modal, per-routine session
//! memory, pending confirmations, undo offers and the routine list filters.
//! Every mutation goes through `RoutineApi` and is followed by a grid refetch.

pub mod cascade;
pub mod confirm;
pub mod copy;
pub mod grid;
pub mod list;
pub mod session;
pub mod status;
pub mod undo;

use crate::api::{ApiError, RoutineApi};
use crate::model::{Day, EntryType, Routine, RoutineEntry, RoutineStatus, Shift};
use crate::store::settings::DeskSettings;
use crate::validate::{self, FieldError};
use cascade::{EntryForm, Field, FormField};
use chrono::{DateTime, Utc};
use confirm::{Confirmations, PendingAction, Prompt};
use copy::{CopyOptions, CopyReport};
use grid::{Click, GridState, GridView, ModalRequest};
use list::{FilterPatch, ListView, RoutineList};
use serde::Serialize;
use serde_json::{json, Value};
use session::{SessionMemory, SessionStore};
use status::RoutineAction;
use std::cell::Cell;
use std::rc::Rc;
use undo::{UndoOffer, UndoRefusal, UndoWindow};

#[derive(Debug, thiserror::Error)]
pub enum DeskError {
    #[error("open a routine first")]
    NoRoutine,
    #[error("no entry form is open")]
    NoModal,
    #[error("another change is still being saved")]
    Busy,
    #[error("{0}")]
    Precondition(String),
    #[error("validation failed")]
    Validation(Vec<FieldError>),
    #[error("{0} is read-only")]
    ReadOnly(&'static str),
    #[error("unknown or already used confirmation")]
    UnknownConfirmation,
    #[error("the undo window has closed")]
    UndoExpired,
    #[error("nothing to undo")]
    UndoUnknown,
    #[error(transparent)]
    Api(#[from] ApiError),
}

impl DeskError {
    pub fn code(&self) -> &'static str {
        match self {
            DeskError::NoRoutine => "no_routine",
            DeskError::NoModal => "no_modal",
            DeskError::Busy => "busy",
            DeskError::Precondition(_) => "precondition_failed",
            DeskError::Validation(_) => "bad_params",
            DeskError::ReadOnly(_) => "read_only",
            DeskError::UnknownConfirmation => "unknown_confirmation",
            DeskError::UndoExpired => "undo_expired",
            DeskError::UndoUnknown => "undo_unknown",
            DeskError::Api(e) => e.code(),
        }
    }

    pub fn details(&self) -> Option<Value> {
        match self {
            DeskError::Validation(fields) => Some(json!({ "fields": fields })),
            DeskError::Api(e) => e.details(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum NoticeLevel {
    Success,
    Error,
    Aborted,
}

/// Operator-facing outcome of a desk action.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub undo: Option<UndoOffer>,
}

impl Notice {
    fn new(level: NoticeLevel, title: &str, message: impl Into<String>) -> Self {
        Self {
            level,
            title: title.to_string(),
            message: message.into(),
            undo: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "camelCase")]
pub enum ModalMode {
    Create,
    #[serde(rename_all = "camelCase")]
    Update { entry_id: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryModal {
    #[serde(flatten)]
    pub mode: ModalMode,
    pub time_slot_label: String,
    pub form: EntryForm,
}

#[derive(Debug, Clone)]
struct OpenRoutine {
    routine: Routine,
    shift: Shift,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeskView<'a> {
    pub routine: Option<&'a Routine>,
    pub shift: Option<Shift>,
    pub status_label: Option<&'static str>,
    pub actions: &'static [RoutineAction],
    pub grid: GridView,
    pub modal: Option<&'a EntryModal>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CopyResult {
    pub report: CopyReport,
    pub notice: Notice,
}

/// Clears the busy flag on every exit path.
struct BusyGuard(Rc<Cell<bool>>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

pub struct Desk {
    settings: DeskSettings,
    current: Option<OpenRoutine>,
    grid: GridState,
    sessions: SessionStore,
    modal: Option<EntryModal>,
    confirmations: Confirmations,
    undo: UndoWindow,
    list: RoutineList,
    busy: Rc<Cell<bool>>,
}

impl Desk {
    pub fn new(settings: DeskSettings) -> Self {
        Self {
            settings,
            current: None,
            grid: GridState::default(),
            sessions: SessionStore::default(),
            modal: None,
            confirmations: Confirmations::default(),
            undo: UndoWindow::new(settings.undo_window_seconds),
            list: RoutineList::new(settings.search_debounce_ms),
            busy: Rc::new(Cell::new(false)),
        }
    }

    pub fn settings(&self) -> DeskSettings {
        self.settings
    }

    /// Applies new timing settings without dropping the open routine.
    pub fn set_settings(&mut self, settings: DeskSettings) {
        self.settings = settings;
        self.undo.set_window(settings.undo_window_seconds);
        self.list.set_debounce(settings.search_debounce_ms);
    }

    fn begin(&self) -> Result<BusyGuard, DeskError> {
        if self.busy.get() {
            return Err(DeskError::Busy);
        }
        self.busy.set(true);
        Ok(BusyGuard(self.busy.clone()))
    }

    fn current(&self) -> Result<&OpenRoutine, DeskError> {
        self.current.as_ref().ok_or(DeskError::NoRoutine)
    }

    fn is_archived(&self) -> bool {
        self.current
            .as_ref()
            .is_some_and(|c| c.routine.status == RoutineStatus::Archieved)
    }

    pub fn view(&self) -> DeskView<'_> {
        let routine = self.current.as_ref().map(|c| &c.routine);
        DeskView {
            routine,
            shift: self.current.as_ref().map(|c| c.shift),
            status_label: routine.map(|r| status::label(r.status)),
            actions: routine.map(|r| status::actions(r.status)).unwrap_or(&[]),
            grid: grid::render(&self.grid),
            modal: self.modal.as_ref(),
        }
    }

    /// Opens a routine. Switching to another routine drops the previous
    /// routine's session memory, modal and undo offers.
    pub fn open(
        &mut self,
        api: &impl RoutineApi,
        routine_id: &str,
        shift: Option<Shift>,
    ) -> Result<(), DeskError> {
        let routine = api.get_routine(routine_id)?;
        let same = self
            .current
            .as_ref()
            .is_some_and(|c| c.routine.id == routine.id);
        if !same {
            self.close();
        }
        let shift = shift
            .or_else(|| routine.batch.as_ref().map(|b| b.shift))
            .unwrap_or(Shift::Morning);
        tracing::debug!(routine_id = %routine.id, shift = shift.as_str(), "routine opened");
        self.current = Some(OpenRoutine { routine, shift });
        self.refresh(api)
    }

    pub fn close(&mut self) {
        if let Some(prev) = self.current.take() {
            self.sessions.forget(&prev.routine.id);
        }
        self.grid.clear();
        self.modal = None;
        self.confirmations.clear();
        self.undo.clear();
    }

    pub fn set_shift(&mut self, api: &impl RoutineApi, shift: Shift) -> Result<(), DeskError> {
        let current = self.current.as_mut().ok_or(DeskError::NoRoutine)?;
        current.shift = shift;
        self.modal = None;
        self.refresh(api)
    }

    /// Refetches the grid for the open routine and shift.
    pub fn refresh(&mut self, api: &impl RoutineApi) -> Result<(), DeskError> {
        let (routine_id, shift) = {
            let c = self.current()?;
            (c.routine.id.clone(), c.shift)
        };
        let ticket = self.grid.begin_fetch();
        match api.fetch_grid(&routine_id, shift) {
            Ok(snapshot) => {
                self.grid.finish_fetch(ticket, snapshot);
                Ok(())
            }
            Err(e) => {
                self.grid.fail_fetch(ticket);
                Err(e.into())
            }
        }
    }

    /// Refetch after a mutation that already succeeded; a failed fetch
    /// leaves the previous grid and is only logged.
    fn refresh_after(&mut self, api: &impl RoutineApi) {
        if self.current.is_none() {
            return;
        }
        if let Err(e) = self.refresh(api) {
            tracing::warn!(error = %e, "grid refetch after mutation failed");
        }
    }

    /// Opens the create or update modal for a cell, or does nothing.
    pub fn cell_click(
        &mut self,
        api: &impl RoutineApi,
        day: Day,
        label: &str,
        click: Click,
    ) -> Result<Option<&EntryModal>, DeskError> {
        let (routine_id, shift) = {
            let c = self.current()?;
            (c.routine.id.clone(), c.shift)
        };
        let Some(snapshot) = self.grid.snapshot() else {
            return Ok(None);
        };
        let Some(request) = grid::dispatch(snapshot, day, label, click) else {
            return Ok(None);
        };
        let archived = self.is_archived();
        let modal = match request {
            ModalRequest::Create(_) if archived => return Ok(None),
            ModalRequest::Create(seed) => {
                let mut form = EntryForm::default();
                form.day = Some(seed.day);
                form.shift = Some(shift);
                form.entry_type = Some(EntryType::Lecture);
                if let Some(mem) = self.sessions.memory(&routine_id) {
                    form.seed(Field::Department, mem.department_id.clone());
                    form.seed(Field::AcademicYear, mem.academic_year_id.clone());
                    form.seed(Field::Semester, mem.semester_id.clone());
                    form.seed(Field::Batch, mem.batch_id.clone());
                    form.seed(Field::Room, mem.room_id.clone());
                }
                if let Some(room) = self.sessions.locked_room(&routine_id) {
                    form.seed(Field::Room, Some(room.to_string()));
                    form.lock(Field::Room);
                }
                form.seed(Field::TimeSlot, seed.time_slot_id);
                EntryModal {
                    mode: ModalMode::Create,
                    time_slot_label: seed.time_slot_label,
                    form,
                }
            }
            ModalRequest::Update(entry) => {
                let form = update_form(&entry, shift, archived);
                EntryModal {
                    mode: ModalMode::Update {
                        entry_id: entry.id.clone(),
                    },
                    time_slot_label: entry.time_slot_label.clone(),
                    form,
                }
            }
        };
        let mut modal = modal;
        modal.form.load_all_options(api)?;
        self.modal = Some(modal);
        Ok(self.modal.as_ref())
    }

    pub fn form_set(
        &mut self,
        api: &impl RoutineApi,
        field: FormField,
        value: Option<String>,
    ) -> Result<&EntryModal, DeskError> {
        let modal = self.modal.as_mut().ok_or(DeskError::NoModal)?;
        let refetch = modal.form.set(field, value)?;
        modal.form.load_options(api, &refetch)?;
        Ok(modal)
    }

    pub fn close_modal(&mut self) {
        self.modal = None;
    }

    pub fn submit_create(&mut self, api: &impl RoutineApi) -> Result<Notice, DeskError> {
        let _busy = self.begin()?;
        let routine_id = self.current()?.routine.id.clone();
        let modal = self.modal.as_ref().ok_or(DeskError::NoModal)?;
        if modal.mode != ModalMode::Create {
            return Err(DeskError::Precondition(
                "the open form edits an existing entry".into(),
            ));
        }
        let input = modal.form.to_input(&routine_id);
        validate::entry(&input).map_err(DeskError::Validation)?;
        let remembered = |f: Field| modal.form.value(f).map(str::to_string);
        let mut memory = SessionMemory {
            department_id: remembered(Field::Department),
            academic_year_id: remembered(Field::AcademicYear),
            semester_id: remembered(Field::Semester),
            batch_id: remembered(Field::Batch),
            room_id: None,
            shift: modal.form.shift,
            day: modal.form.day,
        };

        let created = api.create_entry(&input)?;
        memory.room_id = Some(created.room.id.clone());
        self.sessions.remember(&routine_id, memory);
        self.modal = None;
        self.refresh_after(api);
        Ok(Notice::new(
            NoticeLevel::Success,
            "Entry created",
            format!(
                "{} added on {} at {}",
                created.course_assignment.course.code,
                created.day_of_week.as_str(),
                created.time_slot_label
            ),
        ))
    }

    pub fn submit_update(&mut self, api: &impl RoutineApi) -> Result<Notice, DeskError> {
        let _busy = self.begin()?;
        self.current()?;
        let modal = self.modal.as_ref().ok_or(DeskError::NoModal)?;
        let ModalMode::Update { entry_id } = &modal.mode else {
            return Err(DeskError::Precondition(
                "the open form creates a new entry".into(),
            ));
        };
        let patch = modal.form.to_patch();
        validate::entry_patch(&patch).map_err(DeskError::Validation)?;
        let updated = api.update_entry(entry_id, &patch)?;
        self.modal = None;
        self.refresh_after(api);
        Ok(Notice::new(
            NoticeLevel::Success,
            "Entry updated",
            format!(
                "{} on {} at {}",
                updated.course_assignment.course.code,
                updated.day_of_week.as_str(),
                updated.time_slot_label
            ),
        ))
    }

    /// First half of an entry delete; the modal must be editing an entry.
    pub fn request_delete_entry(&mut self) -> Result<Prompt, DeskError> {
        let routine_id = self.current()?.routine.id.clone();
        if self.is_archived() {
            return Err(DeskError::ReadOnly("routine"));
        }
        let modal = self.modal.as_ref().ok_or(DeskError::NoModal)?;
        let ModalMode::Update { entry_id } = &modal.mode else {
            return Err(DeskError::Precondition("nothing to delete yet".into()));
        };
        let action = PendingAction::DeleteEntry {
            routine_id,
            entry_id: entry_id.clone(),
        };
        let message = format!(
            "Delete this entry? You can undo for {} seconds.",
            self.settings.undo_window_seconds
        );
        Ok(self
            .confirmations
            .request(action, "Delete entry", message, "Delete"))
    }

    pub fn routine_actions(
        &self,
        api: &impl RoutineApi,
        routine_id: Option<&str>,
    ) -> Result<(Routine, &'static [RoutineAction]), DeskError> {
        let routine = self.target_routine(api, routine_id)?;
        let actions = status::actions(routine.status);
        Ok((routine, actions))
    }

    fn target_routine(
        &self,
        api: &impl RoutineApi,
        routine_id: Option<&str>,
    ) -> Result<Routine, DeskError> {
        let id = match routine_id {
            Some(id) => id.to_string(),
            None => self.current()?.routine.id.clone(),
        };
        Ok(api.get_routine(&id)?)
    }

    /// First half of publish/archive/delete for the open routine or `routine_id`.
    pub fn request_routine_action(
        &mut self,
        api: &impl RoutineApi,
        routine_id: Option<&str>,
        action: RoutineAction,
    ) -> Result<Prompt, DeskError> {
        let routine = self.target_routine(api, routine_id)?;
        if !status::allows(routine.status, action) {
            return Err(DeskError::Precondition(format!(
                "{} routines do not offer {:?}",
                status::label(routine.status),
                action
            )));
        }
        let routine_id = routine.id.clone();
        let pending = match action {
            RoutineAction::Publish => PendingAction::PublishRoutine { routine_id },
            RoutineAction::Archive => PendingAction::ArchiveRoutine { routine_id },
            RoutineAction::Delete => PendingAction::DeleteRoutine { routine_id },
        };
        let (title, message, label) = status::prompt(action, &routine);
        Ok(self.confirmations.request(pending, title, message, label))
    }

    /// Second half of every confirmation. Declining drops the token and
    /// returns no notice.
    pub fn resolve(
        &mut self,
        api: &impl RoutineApi,
        token: &str,
        accept: bool,
        now: DateTime<Utc>,
    ) -> Result<Option<Notice>, DeskError> {
        let _busy = self.begin()?;
        let action = self
            .confirmations
            .take(token)
            .ok_or(DeskError::UnknownConfirmation)?;
        if !accept {
            tracing::debug!(?action, "confirmation declined");
            return Ok(None);
        }
        let notice = match action {
            PendingAction::PublishRoutine { routine_id } => match api.publish_routine(&routine_id) {
                Ok(routine) => {
                    let message = format!("\"{}\" is now published.", routine.title);
                    self.replace_current(routine);
                    Notice::new(NoticeLevel::Success, "Routine published", message)
                }
                Err(e) => {
                    tracing::warn!(routine_id = %routine_id, error = %e, "publish failed");
                    Notice::new(NoticeLevel::Error, "Publish failed", e.user_message())
                }
            },
            PendingAction::ArchiveRoutine { routine_id } => {
                let routine = api.archive_routine(&routine_id)?;
                let message = format!("\"{}\" is now archived.", routine.title);
                self.replace_current(routine);
                Notice::new(NoticeLevel::Success, "Routine archived", message)
            }
            PendingAction::DeleteRoutine { routine_id } => {
                api.delete_routine(&routine_id)?;
                if self
                    .current
                    .as_ref()
                    .is_some_and(|c| c.routine.id == routine_id)
                {
                    self.close();
                }
                Notice::new(NoticeLevel::Success, "Routine deleted", "The routine was removed.")
            }
            PendingAction::DeleteEntry { entry_id, .. } => {
                api.delete_entry(&entry_id)?;
                let offer = self.undo.open(&entry_id, now);
                self.modal = None;
                self.refresh_after(api);
                let mut notice = Notice::new(
                    NoticeLevel::Success,
                    "Entry deleted",
                    format!("Undo within {} seconds.", offer.window_seconds),
                );
                notice.undo = Some(offer);
                notice
            }
        };
        Ok(Some(notice))
    }

    fn replace_current(&mut self, routine: Routine) {
        if let Some(c) = self.current.as_mut() {
            if c.routine.id == routine.id {
                c.routine = routine;
            }
        }
    }

    pub fn undo_delete(
        &mut self,
        api: &impl RoutineApi,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Notice, DeskError> {
        let _busy = self.begin()?;
        let offer = self.undo.claim(token, now).map_err(|r| match r {
            UndoRefusal::Unknown => DeskError::UndoUnknown,
            UndoRefusal::Expired => DeskError::UndoExpired,
        })?;
        let entry: RoutineEntry = api.restore_entry(&offer.entry_id)?;
        self.refresh_after(api);
        Ok(Notice::new(
            NoticeLevel::Success,
            "Entry restored",
            format!(
                "{} is back on {}",
                entry.course_assignment.course.code,
                entry.day_of_week.as_str()
            ),
        ))
    }

    pub fn copy_options(&self, source: Option<Day>) -> Result<CopyOptions, DeskError> {
        self.current()?;
        let options = match self.grid.snapshot() {
            Some(snapshot) => copy::options(snapshot, source),
            None => copy::options(&Default::default(), source),
        };
        Ok(options)
    }

    pub fn copy_run(
        &mut self,
        api: &impl RoutineApi,
        source: Option<Day>,
        targets: &[Day],
    ) -> Result<CopyResult, DeskError> {
        let _busy = self.begin()?;
        let open = self
            .current
            .as_ref()
            .map(|c| (c.routine.id.as_str(), c.shift));
        let request = copy::prepare(open, source, targets)?;
        let report = copy::interpret(api.copy_entries(&request))?;
        self.refresh_after(api);
        let notice = match &report {
            CopyReport::Completed {
                total_copied,
                days_completed,
            } => {
                let days: Vec<&str> = days_completed.iter().map(|d| d.as_str()).collect();
                Notice::new(
                    NoticeLevel::Success,
                    "Entries copied",
                    format!("Copied {} entries to {}.", total_copied, days.join(", ")),
                )
            }
            CopyReport::Aborted {
                conflict_message, ..
            } => {
                tracing::info!(routine_id = %request.routine_id, "copy aborted by conflict");
                Notice::new(NoticeLevel::Aborted, "Operation Aborted", conflict_message.clone())
            }
        };
        Ok(CopyResult { report, notice })
    }

    pub fn list_filter(&mut self, patch: FilterPatch, now: DateTime<Utc>) -> Result<ListView, DeskError> {
        self.list.apply(patch, now).map_err(DeskError::Precondition)?;
        Ok(self.list.view())
    }

    pub fn list_refresh(&mut self, api: &impl RoutineApi, now: DateTime<Utc>) -> Result<ListView, DeskError> {
        self.list.refresh(api, now)?;
        Ok(self.list.view())
    }
}

fn update_form(entry: &RoutineEntry, shift: Shift, archived: bool) -> EntryForm {
    let ca = &entry.course_assignment;
    let mut form = EntryForm::default();
    form.seed(Field::Department, Some(ca.department.id.clone()));
    form.seed(Field::AcademicYear, Some(ca.academic_year.id.clone()));
    form.seed(Field::Semester, Some(ca.semester.id.clone()));
    form.seed(Field::Batch, Some(ca.batch.id.clone()));
    form.seed(Field::CourseAssignment, Some(ca.id.clone()));
    form.seed(Field::TimeSlot, Some(entry.time_slot_id.clone()));
    form.seed(Field::Room, Some(entry.room.id.clone()));
    for f in [
        Field::Department,
        Field::AcademicYear,
        Field::Semester,
        Field::Batch,
        Field::Room,
    ] {
        form.lock(f);
    }
    if archived {
        form.lock_all();
    }
    form.day = Some(entry.day_of_week);
    form.shift = Some(shift);
    form.entry_type = Some(entry.entry_type);
    form.notes = entry.notes.clone();
    form
}
