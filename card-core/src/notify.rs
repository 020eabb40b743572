//! Transient user notifications.

use std::time::{Duration, Instant};

/// How long a notification stays visible.
pub const NOTIFICATION_TTL: Duration = Duration::from_secs(3);

/// Notification severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    /// The action succeeded.
    Success,
    /// The action failed.
    Error,
}

/// A message shown to the user for a fixed time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Severity.
    pub kind: NotificationKind,
    /// Text shown to the user.
    pub message: String,
    /// When it was posted.
    pub created: Instant,
}

impl Notification {
    /// A success notification posted now.
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NotificationKind::Success, message)
    }

    /// An error notification posted now.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NotificationKind::Error, message)
    }

    fn new(kind: NotificationKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            created: Instant::now(),
        }
    }

    /// Whether the notification should no longer be shown at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.created) >= NOTIFICATION_TTL
    }

    /// Whether this is an error notification.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.kind == NotificationKind::Error
    }
}

/// Single-slot notification channel. Posting replaces whatever is showing.
#[derive(Debug, Default)]
pub struct Notifier {
    current: Option<Notification>,
}

impl Notifier {
    /// Create an empty channel.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Show `notification`, replacing the current one.
    pub fn post(&mut self, notification: Notification) {
        match notification.kind {
            NotificationKind::Success => tracing::info!("{}", notification.message),
            NotificationKind::Error => tracing::warn!("{}", notification.message),
        }
        self.current = Some(notification);
    }

    /// The visible notification at `now`, dropping it once expired.
    pub fn current_at(&mut self, now: Instant) -> Option<&Notification> {
        if self.current.as_ref().is_some_and(|n| n.is_expired_at(now)) {
            self.current = None;
        }
        self.current.as_ref()
    }

    /// The visible notification right now.
    pub fn current(&mut self) -> Option<&Notification> {
        self.current_at(Instant::now())
    }

    /// Hide the current notification.
    pub fn dismiss(&mut self) {
        self.current = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expires_after_ttl() {
        let n = Notification::success("Saved");
        assert!(!n.is_expired_at(n.created));
        assert!(!n.is_expired_at(n.created + Duration::from_millis(2999)));
        assert!(n.is_expired_at(n.created + NOTIFICATION_TTL));
    }

    #[test]
    fn test_post_replaces_and_expires() {
        let mut notifier = Notifier::new();
        notifier.post(Notification::success("first"));
        let second = Notification::error("second");
        let created = second.created;
        notifier.post(second);

        let shown = notifier.current_at(created).expect("visible");
        assert_eq!(shown.message, "second");
        assert!(shown.is_error());

        assert!(notifier.current_at(created + NOTIFICATION_TTL).is_none());
        assert!(notifier.current_at(created).is_none());
    }
}
