//! Sinks and notifiers that remember what they were given.

use async_trait::async_trait;
use helpdesk_core::event::EventSink;
use helpdesk_core::notify::{Notification, Notifier, NotifyError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Event sink that keeps every event in arrival order.
#[derive(Debug)]
pub struct RecordingSink<E> {
    events: Mutex<Vec<E>>,
}

impl<E> RecordingSink<E> {
    /// Create an empty recorder
    #[must_use]
    pub const fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
        }
    }

    /// Number of recorded events
    #[must_use]
    pub fn len(&self) -> usize {
        lock(&self.events).len()
    }

    /// Whether nothing was recorded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        lock(&self.events).is_empty()
    }

    /// Forget everything recorded so far
    pub fn clear(&self) {
        lock(&self.events).clear();
    }
}

impl<E: Clone> RecordingSink<E> {
    /// Snapshot of the recorded events
    #[must_use]
    pub fn events(&self) -> Vec<E> {
        lock(&self.events).clone()
    }
}

impl<E> Default for RecordingSink<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Send> EventSink<E> for RecordingSink<E> {
    fn record(&self, event: E) {
        lock(&self.events).push(event);
    }
}

/// Notifier that records every message it is asked to deliver.
///
/// Call [`RecordingNotifier::fail_deliveries`] to make every subsequent send
/// return [`NotifyError::Delivery`] (the message is still recorded).
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
    failing: AtomicBool,
}

impl RecordingNotifier {
    /// Create a notifier that accepts everything
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent deliveries fail (or succeed again)
    pub fn fail_deliveries(&self, fail: bool) {
        self.failing.store(fail, Ordering::SeqCst);
    }

    /// Snapshot of every notification handed to `send`
    #[must_use]
    pub fn sent(&self) -> Vec<Notification> {
        lock(&self.sent).clone()
    }

    /// Forget everything sent so far
    pub fn clear(&self) {
        lock(&self.sent).clear();
    }

    /// Notifications addressed to `recipient`
    #[must_use]
    pub fn sent_to(&self, recipient: &str) -> Vec<Notification> {
        lock(&self.sent)
            .iter()
            .filter(|n| n.recipient == recipient)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        lock(&self.sent).push(notification.clone());
        if self.failing.load(Ordering::SeqCst) {
            return Err(NotifyError::Delivery("recording notifier set to fail".into()));
        }
        Ok(())
    }
}
