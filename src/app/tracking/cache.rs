use std::sync::mpsc;
use std::sync::{Mutex, PoisonError};

use crate::store::ResumePoint;

pub(crate) struct HistoryState {
    entries: Mutex<Vec<ResumePoint>>,
    subscribers: Mutex<Vec<mpsc::Sender<Vec<ResumePoint>>>>,
}

impl HistoryState {
    pub(crate) fn new(initial: Vec<ResumePoint>) -> Self {
        Self {
            entries: Mutex::new(initial),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn snapshot(&self) -> Vec<ResumePoint> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn subscribe(&self) -> mpsc::Receiver<Vec<ResumePoint>> {
        let (tx, rx) = mpsc::channel();
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        rx
    }

    // Called only after the matching store write has completed, so observers
    // never see state that is not yet durable.
    pub(crate) fn publish(&self, entries: Vec<ResumePoint>) {
        *self.entries.lock().unwrap_or_else(PoisonError::into_inner) = entries.clone();
        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        subscribers.retain(|subscriber| subscriber.send(entries.clone()).is_ok());
    }

    #[cfg(test)]
    pub(crate) fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
