//! User-facing notifications.
//!
//! A transient message channel used exclusively for error reporting: each
//! failed cart operation publishes one message here, and UI layers render
//! it as a toast. Successful operations publish nothing.

use tokio::sync::broadcast;
use tracing::warn;

/// Buffered notifications per subscriber before older ones are dropped.
const CHANNEL_CAPACITY: usize = 16;

/// A single user-facing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Message describing what went wrong.
    pub message: String,
}

/// Fan-out publisher for [`Notification`]s.
///
/// Publishing never blocks and never fails: with no subscribers the message
/// is dropped, and a slow subscriber only loses its own backlog.
#[derive(Debug, Clone)]
pub struct Notifier {
    sender: broadcast::Sender<Notification>,
}

impl Notifier {
    /// Create a notifier with no subscribers yet.
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Publish a message, logging it as well.
    pub fn publish(&self, message: impl Into<String>) {
        let message = message.into();
        warn!(%message, "cart notification");
        let _ = self.sender.send(Notification { message });
    }

    /// Subscribe to future notifications.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscriber_receives_published_message() {
        let notifier = Notifier::new();
        let mut rx = notifier.subscribe();

        notifier.publish("requested quantity exceeds available stock");

        let notification = rx.recv().await.unwrap();
        assert_eq!(
            notification.message,
            "requested quantity exceeds available stock"
        );
    }

    #[test]
    fn test_publish_without_subscribers_is_silent() {
        let notifier = Notifier::new();
        // Must not panic or error.
        notifier.publish("nobody is listening");
    }
}
