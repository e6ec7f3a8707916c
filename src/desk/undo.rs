use crate::store::settings::UNDO_WINDOW_RANGE;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UndoOffer {
    pub token: String,
    pub entry_id: String,
    pub expires_at: DateTime<Utc>,
    pub window_seconds: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UndoRefusal {
    Unknown,
    Expired,
}

fn bounded(window_seconds: i64) -> i64 {
    window_seconds.clamp(*UNDO_WINDOW_RANGE.start(), *UNDO_WINDOW_RANGE.end())
}

/// Deleted entries that may still be restored.
#[derive(Debug)]
pub struct UndoWindow {
    window_seconds: i64,
    offers: HashMap<String, UndoOffer>,
}

impl UndoWindow {
    pub fn new(window_seconds: i64) -> Self {
        Self {
            window_seconds: bounded(window_seconds),
            offers: HashMap::new(),
        }
    }

    /// Offers already made keep their deadline.
    pub fn set_window(&mut self, window_seconds: i64) {
        self.window_seconds = bounded(window_seconds);
    }

    pub fn open(&mut self, entry_id: &str, now: DateTime<Utc>) -> UndoOffer {
        let offer = UndoOffer {
            token: uuid::Uuid::new_v4().to_string(),
            entry_id: entry_id.to_string(),
            expires_at: now
                .checked_add_signed(Duration::seconds(self.window_seconds))
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
            window_seconds: self.window_seconds,
        };
        self.offers.insert(offer.token.clone(), offer.clone());
        offer
    }

    /// Consumes the offer. Claims at or after the deadline are refused and the
    /// offer is dropped with them.
    pub fn claim(&mut self, token: &str, now: DateTime<Utc>) -> Result<UndoOffer, UndoRefusal> {
        let offer = self.offers.remove(token).ok_or(UndoRefusal::Unknown)?;
        if now >= offer.expires_at {
            return Err(UndoRefusal::Expired);
        }
        Ok(offer)
    }

    pub fn clear(&mut self) {
        self.offers.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claim_inside_window_succeeds_once() {
        let t0 = Utc::now();
        let mut u = UndoWindow::new(5);
        let offer = u.open("e1", t0);
        assert_eq!(offer.window_seconds, 5);
        let claimed = u.claim(&offer.token, t0 + Duration::seconds(4)).unwrap();
        assert_eq!(claimed.entry_id, "e1");
        assert_eq!(
            u.claim(&offer.token, t0 + Duration::seconds(4)),
            Err(UndoRefusal::Unknown)
        );
    }

    #[test]
    fn lapsed_window_is_refused() {
        let t0 = Utc::now();
        let mut u = UndoWindow::new(5);
        let offer = u.open("e1", t0);
        assert_eq!(
            u.claim(&offer.token, t0 + Duration::seconds(5)),
            Err(UndoRefusal::Expired)
        );
    }

    #[test]
    fn oversized_window_is_clamped_instead_of_overflowing() {
        let t0 = Utc::now();
        let mut u = UndoWindow::new(i64::MAX);
        let offer = u.open("e1", t0);
        assert_eq!(offer.window_seconds, 60);
        assert_eq!(offer.expires_at, t0 + Duration::seconds(60));

        u.set_window(-3);
        assert_eq!(u.open("e2", t0).expires_at, t0);

        u.set_window(30);
        let late = u.open("e3", DateTime::<Utc>::MAX_UTC - Duration::seconds(1));
        assert_eq!(late.expires_at, DateTime::<Utc>::MAX_UTC);
    }
}
