//! Completion notifications.
//!
//! The engine reports the end of a run (success or failure) through
//! [`Notifier`]. Delivery problems stay inside the notifier; the engine
//! never sees them.

use async_trait::async_trait;
use parking_lot::Mutex;

/// Sink for end-of-run reports.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, message: &str);
}

/// Discards every message.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullNotifier;

#[async_trait]
impl Notifier for NullNotifier {
    async fn notify(&self, _message: &str) {}
}

/// Keeps every message in memory.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.messages.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.lock().is_empty()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, message: &str) {
        self.messages.lock().push(message.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_recording_notifier_keeps_order() {
        let notifier = RecordingNotifier::new();
        assert!(notifier.is_empty());

        notifier.notify("first").await;
        notifier.notify("second").await;

        assert_eq!(notifier.len(), 2);
        assert_eq!(notifier.messages(), vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_null_notifier_accepts_anything() {
        NullNotifier.notify("ignored").await;
    }
}
