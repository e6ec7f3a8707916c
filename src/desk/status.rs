use crate::model::{Routine, RoutineStatus};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RoutineAction {
    Publish,
    Archive,
    Delete,
}

/// Buttons offered for a routine in each status.
pub fn actions(status: RoutineStatus) -> &'static [RoutineAction] {
    match status {
        RoutineStatus::Draft => &[RoutineAction::Publish, RoutineAction::Delete],
        RoutineStatus::Published => &[RoutineAction::Archive],
        RoutineStatus::Archieved => &[RoutineAction::Delete],
    }
}

pub fn allows(status: RoutineStatus, action: RoutineAction) -> bool {
    actions(status).contains(&action)
}

pub fn label(status: RoutineStatus) -> &'static str {
    match status {
        RoutineStatus::Draft => "Draft",
        RoutineStatus::Published => "Published",
        RoutineStatus::Archieved => "Archived",
    }
}

/// (title, message, confirm button) for the confirmation dialog.
pub fn prompt(action: RoutineAction, routine: &Routine) -> (String, String, &'static str) {
    match action {
        RoutineAction::Publish => (
            "Publish routine".to_string(),
            format!(
                "Publish \"{}\"? Everyone on the routine will receive an email notification with the routine attached as a PDF.",
                routine.title
            ),
            "Publish",
        ),
        RoutineAction::Archive => (
            "Archive routine".to_string(),
            format!(
                "Archive \"{}\"? Archived routines can no longer be edited.",
                routine.title
            ),
            "Archive",
        ),
        RoutineAction::Delete => (
            "Delete routine".to_string(),
            format!(
                "Delete \"{}\" and all of its entries? This cannot be undone.",
                routine.title
            ),
            "Delete",
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn affordances_per_status() {
        assert_eq!(
            actions(RoutineStatus::Draft),
            &[RoutineAction::Publish, RoutineAction::Delete]
        );
        assert_eq!(actions(RoutineStatus::Published), &[RoutineAction::Archive]);
        assert_eq!(actions(RoutineStatus::Archieved), &[RoutineAction::Delete]);
        assert!(!allows(RoutineStatus::Published, RoutineAction::Delete));
        assert!(!allows(RoutineStatus::Archieved, RoutineAction::Publish));
    }

    #[test]
    fn publish_prompt_mentions_email_and_pdf() {
        let routine = Routine {
            id: "r1".into(),
            title: "Spring".into(),
            description: None,
            effective_from: None,
            effective_to: None,
            status: RoutineStatus::Draft,
            institution: None,
            semester: None,
            batch: None,
            created_at: String::new(),
            updated_at: String::new(),
        };
        let (_, message, _) = prompt(RoutineAction::Publish, &routine);
        assert!(message.contains("email"));
        assert!(message.contains("PDF"));
    }
}
