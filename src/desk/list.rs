use crate::api::{ApiResult, RoutineApi};
use crate::model::{Page, Routine, RoutineQuery, RoutineStatus};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Filter changes from the list toolbar. `None` leaves a filter untouched;
/// an empty string clears it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterPatch {
    pub status: Option<String>,
    pub search: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub page: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingSearch {
    text: String,
    due: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListView {
    pub query: RoutineQuery,
    pub search_pending: bool,
    pub page: Option<Page<Routine>>,
}

/// Routine list filters with a debounced search box.
#[derive(Debug)]
pub struct RoutineList {
    debounce: Duration,
    query: RoutineQuery,
    pending: Option<PendingSearch>,
    page: Option<Page<Routine>>,
}

fn blank_to_none(v: String) -> Option<String> {
    let t = v.trim();
    if t.is_empty() {
        None
    } else {
        Some(t.to_string())
    }
}

impl RoutineList {
    pub fn new(debounce_ms: i64) -> Self {
        Self {
            debounce: Duration::milliseconds(debounce_ms.max(0)),
            query: RoutineQuery::default(),
            pending: None,
            page: None,
        }
    }

    pub fn set_debounce(&mut self, debounce_ms: i64) {
        self.debounce = Duration::milliseconds(debounce_ms.max(0));
    }

    /// Applies non-search filters right away. A search change restarts the
    /// debounce timer and resets paging once it lands.
    pub fn apply(&mut self, patch: FilterPatch, now: DateTime<Utc>) -> Result<(), String> {
        if let Some(raw) = patch.status {
            self.query.status = match blank_to_none(raw) {
                None => None,
                Some(s) => {
                    Some(RoutineStatus::parse(&s).ok_or_else(|| format!("unknown status {}", s))?)
                }
            };
            self.query.page = None;
        }
        if let Some(v) = patch.date_from {
            self.query.date_from = blank_to_none(v);
            self.query.page = None;
        }
        if let Some(v) = patch.date_to {
            self.query.date_to = blank_to_none(v);
            self.query.page = None;
        }
        if let Some(p) = patch.page {
            self.query.page = Some(p.max(1));
        }
        if let Some(text) = patch.search {
            self.pending = Some(PendingSearch {
                text,
                due: now + self.debounce,
            });
        }
        Ok(())
    }

    /// Promotes a pending search whose quiet period has elapsed.
    pub fn settle(&mut self, now: DateTime<Utc>) -> bool {
        match &self.pending {
            Some(p) if now >= p.due => {
                let text = p.text.clone();
                self.pending = None;
                self.query.search = blank_to_none(text);
                self.query.page = None;
                true
            }
            _ => false,
        }
    }

    pub fn refresh(&mut self, api: &impl RoutineApi, now: DateTime<Utc>) -> ApiResult<()> {
        self.settle(now);
        self.page = Some(api.list_routines(&self.query)?);
        Ok(())
    }

    pub fn view(&self) -> ListView {
        ListView {
            query: self.query.clone(),
            search_pending: self.pending.is_some(),
            page: self.page.clone(),
        }
    }
}
