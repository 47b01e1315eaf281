//! Transient user-visible messages (success/error toasts) and the sinks that
//! present them.

use std::fmt;
use tokio::sync::mpsc;
use tracing::debug;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub title: String,
    pub description: String,
}

impl Notification {
    #[must_use]
    pub fn success(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Success,
            title: title.into(),
            description: description.into(),
        }
    }

    #[must_use]
    pub fn error(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Error,
            title: title.into(),
            description: description.into(),
        }
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        self.kind == NotificationKind::Error
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.title, self.description)
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Forwards notifications to a presenter task.
#[derive(Debug)]
pub struct ChannelNotifier {
    sender: mpsc::UnboundedSender<Notification>,
}

impl ChannelNotifier {
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, notification: Notification) {
        if self.sender.send(notification).is_err() {
            debug!("notification dropped: presenter is gone");
        }
    }
}

/// Keeps every notification in memory, in order.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct MemoryNotifier {
    notifications: std::sync::Mutex<Vec<Notification>>,
}

#[cfg(test)]
impl MemoryNotifier {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn notifications(&self) -> Vec<Notification> {
        self.notifications
            .lock()
            .map(|notifications| notifications.clone())
            .unwrap_or_default()
    }

    pub(crate) fn errors(&self) -> Vec<Notification> {
        self.notifications()
            .into_iter()
            .filter(Notification::is_error)
            .collect()
    }
}

#[cfg(test)]
impl Notifier for MemoryNotifier {
    fn notify(&self, notification: Notification) {
        if let Ok(mut notifications) = self.notifications.lock() {
            notifications.push(notification);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn channel_notifier_forwards_in_order() {
        let (notifier, mut receiver) = ChannelNotifier::new();
        notifier.notify(Notification::success("Success", "Signed in successfully!"));
        notifier.notify(Notification::error("Error", "boom"));

        assert_eq!(
            receiver.recv().await.map(|n| n.kind),
            Some(NotificationKind::Success)
        );
        assert_eq!(receiver.recv().await.map(|n| n.description), Some("boom".to_string()));
    }

    #[test]
    fn channel_notifier_tolerates_closed_receiver() {
        let (notifier, receiver) = ChannelNotifier::new();
        drop(receiver);
        notifier.notify(Notification::success("Success", "ignored"));
    }

    #[test]
    fn memory_notifier_filters_errors() {
        let notifier = MemoryNotifier::new();
        notifier.notify(Notification::success("Success", "ok"));
        notifier.notify(Notification::error("Error", "Failed to load user profile"));

        assert_eq!(notifier.notifications().len(), 2);
        let errors = notifier.errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].to_string(), "Error: Failed to load user profile");
    }
}
