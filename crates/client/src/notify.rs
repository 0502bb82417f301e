//! Outbound interface to the presentation layer's toasts.

use casepulse_shared::Notification;
use tokio::sync::mpsc;

/// Receives user-visible notifications.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// A [`Notifier`] that forwards into a channel drained by the UI.
#[derive(Debug, Clone)]
pub struct NotificationFeed {
    tx: mpsc::UnboundedSender<Notification>,
}

impl NotificationFeed {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Notifier for NotificationFeed {
    fn notify(&self, notification: Notification) {
        if let Err(e) = self.tx.send(notification) {
            tracing::debug!(title = %e.0.title, "notification dropped, no listener attached");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feed_forwards_in_order() {
        let (feed, mut rx) = NotificationFeed::channel();
        feed.notify(Notification::new("A", "first"));
        feed.notify(Notification::new("B", "second"));
        assert_eq!(rx.try_recv().unwrap().title, "A");
        assert_eq!(rx.try_recv().unwrap().title, "B");
    }

    #[test]
    fn feed_without_listener_does_not_panic() {
        let (feed, rx) = NotificationFeed::channel();
        drop(rx);
        feed.notify(Notification::new("A", "nobody listening"));
    }
}
