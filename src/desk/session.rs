use crate::model::{Day, Shift};
use serde::Serialize;
use std::collections::HashMap;

/// Structural form values carried from one successful create to the next.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionMemory {
    pub department_id: Option<String>,
    pub academic_year_id: Option<String>,
    pub semester_id: Option<String>,
    pub batch_id: Option<String>,
    pub room_id: Option<String>,
    pub shift: Option<Shift>,
    pub day: Option<Day>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct RoutineSession {
    memory: SessionMemory,
    locked_room: Option<String>,
}

/// Per-routine transient state. Lives only as long as the desk process.
#[derive(Debug, Default)]
pub struct SessionStore {
    by_routine: HashMap<String, RoutineSession>,
}

impl SessionStore {
    pub fn memory(&self, routine_id: &str) -> Option<&SessionMemory> {
        self.by_routine.get(routine_id).map(|s| &s.memory)
    }

    pub fn locked_room(&self, routine_id: &str) -> Option<&str> {
        self.by_routine
            .get(routine_id)
            .and_then(|s| s.locked_room.as_deref())
    }

    /// Records a successful create. The first recorded room stays locked for
    /// the rest of the session.
    pub fn remember(&mut self, routine_id: &str, memory: SessionMemory) {
        let session = self.by_routine.entry(routine_id.to_string()).or_default();
        if session.locked_room.is_none() {
            session.locked_room = memory.room_id.clone();
        }
        session.memory = memory;
    }

    pub fn forget(&mut self, routine_id: &str) {
        self.by_routine.remove(routine_id);
    }
}
