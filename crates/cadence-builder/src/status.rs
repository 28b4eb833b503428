//! Save indicator.
//!
//! Every field and rubric save holds a [`SaveGuard`] while in flight. The
//! indicator switches to `Saving` when the first save starts and settles
//! exactly once, when the last one finishes, so overlapping saves produce a
//! single `Saving -> Saved` transition. A failure anywhere in that window
//! settles the indicator on `Failed` instead.

use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use tokio::sync::{broadcast, watch};

use crate::events::BuilderEvent;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "message", rename_all = "snake_case")]
pub enum SaveStatus {
    Idle,
    Saving,
    Saved,
    Failed(String),
}

#[derive(Default)]
struct Pending {
    count: usize,
    failure: Option<String>,
}

#[derive(Clone)]
pub(crate) struct SaveTracker {
    pending: Arc<Mutex<Pending>>,
    status: watch::Sender<SaveStatus>,
    events: broadcast::Sender<BuilderEvent>,
}

impl SaveTracker {
    pub(crate) fn new(events: broadcast::Sender<BuilderEvent>) -> Self {
        let (status, _) = watch::channel(SaveStatus::Idle);
        Self {
            pending: Arc::new(Mutex::new(Pending::default())),
            status,
            events,
        }
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<SaveStatus> {
        self.status.subscribe()
    }

    pub(crate) fn current(&self) -> SaveStatus {
        self.status.borrow().clone()
    }

    pub(crate) fn in_flight(&self) -> usize {
        self.lock().count
    }

    pub(crate) fn begin(&self) -> SaveGuard {
        let first = {
            let mut pending = self.lock();
            pending.count += 1;
            if pending.count == 1 {
                pending.failure = None;
            }
            pending.count == 1
        };
        if first {
            self.publish(SaveStatus::Saving);
        }
        SaveGuard {
            tracker: self.clone(),
        }
    }

    fn finish(&self) {
        let settled = {
            let mut pending = self.lock();
            pending.count = pending.count.saturating_sub(1);
            if pending.count == 0 {
                Some(match pending.failure.take() {
                    Some(message) => SaveStatus::Failed(message),
                    None => SaveStatus::Saved,
                })
            } else {
                None
            }
        };
        if let Some(status) = settled {
            self.publish(status);
        }
    }

    fn publish(&self, status: SaveStatus) {
        self.status.send_replace(status.clone());
        // No subscribers is fine.
        let _ = self.events.send(BuilderEvent::SaveStatusChanged(status));
    }

    fn lock(&self) -> MutexGuard<'_, Pending> {
        self.pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// One in-flight save. Dropping it marks the save finished, including when
/// the owning future is cancelled.
pub(crate) struct SaveGuard {
    tracker: SaveTracker,
}

impl SaveGuard {
    pub(crate) fn fail(&self, message: impl Into<String>) {
        let mut pending = self.tracker.lock();
        if pending.failure.is_none() {
            pending.failure = Some(message.into());
        }
    }
}

impl Drop for SaveGuard {
    fn drop(&mut self) {
        self.tracker.finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn statuses(rx: &mut broadcast::Receiver<BuilderEvent>) -> Vec<SaveStatus> {
        let mut seen = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let BuilderEvent::SaveStatusChanged(status) = event {
                seen.push(status);
            }
        }
        seen
    }

    #[test]
    fn overlapping_saves_settle_once() {
        let (tx, mut rx) = broadcast::channel(16);
        let tracker = SaveTracker::new(tx);

        let first = tracker.begin();
        let second = tracker.begin();
        assert_eq!(tracker.in_flight(), 2);
        drop(first);
        assert_eq!(tracker.current(), SaveStatus::Saving);
        drop(second);

        assert_eq!(tracker.current(), SaveStatus::Saved);
        assert_eq!(statuses(&mut rx), vec![SaveStatus::Saving, SaveStatus::Saved]);
    }

    #[test]
    fn failure_in_window_wins() {
        let (tx, mut rx) = broadcast::channel(16);
        let tracker = SaveTracker::new(tx);

        let ok = tracker.begin();
        let bad = tracker.begin();
        bad.fail("request timed out");
        drop(bad);
        drop(ok);

        assert_eq!(
            statuses(&mut rx),
            vec![
                SaveStatus::Saving,
                SaveStatus::Failed("request timed out".to_string())
            ]
        );

        // A fresh window starts clean.
        drop(tracker.begin());
        assert_eq!(tracker.current(), SaveStatus::Saved);
    }
}
