use serde::Serialize;
use std::collections::HashMap;

/// Actions that only run after an explicit yes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingAction {
    PublishRoutine { routine_id: String },
    ArchiveRoutine { routine_id: String },
    DeleteRoutine { routine_id: String },
    DeleteEntry { routine_id: String, entry_id: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Prompt {
    pub token: String,
    pub title: String,
    pub message: String,
    pub confirm_label: &'static str,
}

#[derive(Debug, Default)]
pub struct Confirmations {
    pending: HashMap<String, PendingAction>,
}

impl Confirmations {
    pub fn request(
        &mut self,
        action: PendingAction,
        title: impl Into<String>,
        message: impl Into<String>,
        confirm_label: &'static str,
    ) -> Prompt {
        let token = uuid::Uuid::new_v4().to_string();
        self.pending.insert(token.clone(), action);
        Prompt {
            token,
            title: title.into(),
            message: message.into(),
            confirm_label,
        }
    }

    /// Removes and returns the action; a token resolves at most once.
    pub fn take(&mut self, token: &str) -> Option<PendingAction> {
        self.pending.remove(token)
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}
