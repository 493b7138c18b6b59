// ── Transient user notifications ──
//
// Handles report the outcome of fetches and mutations as short messages
// (the UI shows them as toasts). Delivery is fire-and-forget over a
// broadcast channel; with no listeners they are dropped.

use std::fmt;

use tokio::sync::broadcast;

const NOTIFICATION_CHANNEL_SIZE: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Success,
    Error,
}

/// A user-visible message about an operation's outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub title: String,
    pub message: String,
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "{}", self.title)
        } else {
            write!(f, "{}: {}", self.title, self.message)
        }
    }
}

/// Sender side of the notification channel. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: broadcast::Sender<Notification>,
}

impl Notifier {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(NOTIFICATION_CHANNEL_SIZE);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }

    pub fn success(&self, title: impl Into<String>, message: impl Into<String>) {
        self.emit(NotificationLevel::Success, title.into(), message.into());
    }

    pub fn error(&self, title: impl Into<String>, message: impl Into<String>) {
        self.emit(NotificationLevel::Error, title.into(), message.into());
    }

    fn emit(&self, level: NotificationLevel, title: String, message: String) {
        let _ = self.tx.send(Notification {
            level,
            title,
            message,
        });
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

    #[test]
    fn subscribers_receive_notifications() {
        let notifier = Notifier::new();
        let mut rx = notifier.subscribe();

        notifier.error("Erro ao carregar leads", "timeout");
        let n = rx.try_recv().unwrap();
        assert_eq!(n.level, NotificationLevel::Error);
        assert_eq!(n.to_string(), "Erro ao carregar leads: timeout");
    }

    #[test]
    fn sending_without_listeners_is_fine() {
        Notifier::new().success("Campanha criada", "");
    }
}
