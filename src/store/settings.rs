use rusqlite::{Connection, OptionalExtension};
use serde_json::{json, Map, Value};
use std::ops::RangeInclusive;

pub const DEFAULT_UNDO_WINDOW_SECONDS: i64 = 5;
pub const DEFAULT_SEARCH_DEBOUNCE_MS: i64 = 450;
pub const DEFAULT_PER_PAGE: i64 = 10;
pub const UNDO_WINDOW_RANGE: RangeInclusive<i64> = 0..=60;
pub const SEARCH_DEBOUNCE_RANGE: RangeInclusive<i64> = 0..=5000;

pub fn settings_get_json(conn: &Connection, key: &str) -> rusqlite::Result<Option<Value>> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT value_json FROM settings WHERE key = ?",
            [key],
            |r| r.get(0),
        )
        .optional()?;
    Ok(raw.and_then(|s| serde_json::from_str(&s).ok()))
}

pub fn settings_set_json(conn: &Connection, key: &str, value: &Value) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO settings(key, value_json) VALUES(?, ?)
         ON CONFLICT(key) DO UPDATE SET value_json = excluded.value_json",
        (key, value.to_string()),
    )?;
    Ok(())
}

/// Desk timing knobs. Environment config supplies the baseline, the workspace
/// `setup.desk` section overrides it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeskSettings {
    pub undo_window_seconds: i64,
    pub search_debounce_ms: i64,
}

impl Default for DeskSettings {
    fn default() -> Self {
        Self {
            undo_window_seconds: DEFAULT_UNDO_WINDOW_SECONDS,
            search_debounce_ms: DEFAULT_SEARCH_DEBOUNCE_MS,
        }
    }
}

impl DeskSettings {
    pub fn to_json(self) -> Value {
        json!({
            "undoWindowSeconds": self.undo_window_seconds,
            "searchDebounceMs": self.search_debounce_ms,
        })
    }

    /// Values outside the accepted ranges are ignored.
    pub fn overlay(mut self, stored: &Map<String, Value>) -> Self {
        let in_range = |key: &str, range: RangeInclusive<i64>| {
            stored
                .get(key)
                .and_then(|v| v.as_i64())
                .filter(|v| range.contains(v))
        };
        if let Some(v) = in_range("undoWindowSeconds", UNDO_WINDOW_RANGE) {
            self.undo_window_seconds = v;
        }
        if let Some(v) = in_range("searchDebounceMs", SEARCH_DEBOUNCE_RANGE) {
            self.search_debounce_ms = v;
        }
        self
    }
}

pub fn load_desk(conn: &Connection, base: DeskSettings) -> DeskSettings {
    match settings_get_json(conn, "setup.desk") {
        Ok(Some(Value::Object(obj))) => base.overlay(&obj),
        _ => base,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutineSettings {
    pub per_page: i64,
    pub default_institution: Option<String>,
}

impl Default for RoutineSettings {
    fn default() -> Self {
        Self {
            per_page: DEFAULT_PER_PAGE,
            default_institution: None,
        }
    }
}

impl RoutineSettings {
    pub fn to_json(&self) -> Value {
        json!({
            "perPage": self.per_page,
            "defaultInstitution": self.default_institution,
        })
    }
}

pub fn load_routines(conn: &Connection) -> RoutineSettings {
    let mut out = RoutineSettings::default();
    if let Ok(Some(Value::Object(obj))) = settings_get_json(conn, "setup.routines") {
        if let Some(v) = obj.get("perPage").and_then(|v| v.as_i64()) {
            if v > 0 {
                out.per_page = v;
            }
        }
        out.default_institution = obj
            .get("defaultInstitution")
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    #[test]
    fn stored_desk_section_overrides_baseline() {
        let conn = db::open_in_memory().expect("db");
        let base = DeskSettings {
            undo_window_seconds: 9,
            search_debounce_ms: 300,
        };
        assert_eq!(load_desk(&conn, base), base);

        settings_set_json(&conn, "setup.desk", &json!({ "undoWindowSeconds": 2 })).unwrap();
        let loaded = load_desk(&conn, base);
        assert_eq!(loaded.undo_window_seconds, 2);
        assert_eq!(loaded.search_debounce_ms, 300);
    }

    #[test]
    fn stored_desk_values_out_of_range_are_ignored() {
        let conn = db::open_in_memory().expect("db");
        settings_set_json(
            &conn,
            "setup.desk",
            &json!({ "undoWindowSeconds": i64::MAX, "searchDebounceMs": -5 }),
        )
        .unwrap();
        assert_eq!(load_desk(&conn, DeskSettings::default()), DeskSettings::default());

        settings_set_json(&conn, "setup.desk", &json!({ "undoWindowSeconds": 60 })).unwrap();
        assert_eq!(load_desk(&conn, DeskSettings::default()).undo_window_seconds, 60);
    }

    #[test]
    fn routine_settings_ignore_non_positive_page_size() {
        let conn = db::open_in_memory().expect("db");
        settings_set_json(
            &conn,
            "setup.routines",
            &json!({ "perPage": 0, "defaultInstitution": "  " }),
        )
        .unwrap();
        assert_eq!(load_routines(&conn), RoutineSettings::default());
    }
}
