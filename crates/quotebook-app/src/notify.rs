// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::time::{Duration, Instant};

use crate::NotificationToken;

pub const DEFAULT_NOTIFICATION_DURATION: Duration = Duration::from_millis(3_000);
pub const MAX_NOTIFICATION_DURATION: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Error,
}

impl NotificationKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub token: NotificationToken,
    pub message: String,
    pub kind: NotificationKind,
    pub expires_at: Instant,
}

/// Single-slot transient message. Every `show` mints a fresh token; a
/// dismissal only lands if it carries the token of the message that is
/// still on screen, so a superseded timer can never clear its successor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notifier {
    duration: Duration,
    current: Option<Notification>,
    last_token: NotificationToken,
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(DEFAULT_NOTIFICATION_DURATION)
    }
}

impl Notifier {
    /// Durations longer than [`MAX_NOTIFICATION_DURATION`] are clamped.
    pub fn new(duration: Duration) -> Self {
        Self {
            duration: duration.min(MAX_NOTIFICATION_DURATION),
            current: None,
            last_token: NotificationToken::default(),
        }
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn current(&self) -> Option<&Notification> {
        self.current.as_ref()
    }

    pub fn is_idle(&self) -> bool {
        self.current.is_none()
    }

    pub fn show(
        &mut self,
        message: impl Into<String>,
        kind: NotificationKind,
        now: Instant,
    ) -> NotificationToken {
        if let Some(previous) = &self.current {
            tracing::debug!(token = %previous.token, "notification superseded");
        }
        self.last_token = self.last_token.next();
        let notification = Notification {
            token: self.last_token,
            message: message.into(),
            kind,
            expires_at: now.checked_add(self.duration).unwrap_or(now),
        };
        tracing::debug!(
            token = %notification.token,
            kind = notification.kind.as_str(),
            message = %notification.message,
            "notification shown"
        );
        self.current = Some(notification);
        self.last_token
    }

    /// Timer-driven dismissal. Returns whether anything was cleared.
    pub fn dismiss(&mut self, token: NotificationToken) -> bool {
        match &self.current {
            Some(current) if current.token == token => {
                tracing::debug!(%token, "notification dismissed");
                self.current = None;
                true
            }
            _ => {
                tracing::trace!(%token, "stale notification timer ignored");
                false
            }
        }
    }

    pub fn clear(&mut self) -> bool {
        self.current.take().is_some()
    }

    pub fn is_visible_at(&self, now: Instant) -> bool {
        self.current
            .as_ref()
            .is_some_and(|current| now < current.expires_at)
    }
}

#[cfg(test)]
mod tests {
    use super::{MAX_NOTIFICATION_DURATION, NotificationKind, Notifier};
    use std::time::{Duration, Instant};

    #[test]
    fn show_sets_expiry_one_interval_out() {
        let mut notifier = Notifier::new(Duration::from_millis(3_000));
        let start = Instant::now();
        notifier.show("saved", NotificationKind::Success, start);

        let current = notifier.current().expect("notification should be showing");
        assert_eq!(current.expires_at, start + Duration::from_millis(3_000));
        assert_eq!(current.kind, NotificationKind::Success);
        assert!(notifier.is_visible_at(start + Duration::from_millis(2_999)));
        assert!(!notifier.is_visible_at(start + Duration::from_millis(3_000)));
    }

    #[test]
    fn second_show_replaces_first_and_outlives_its_timer() {
        let mut notifier = Notifier::new(Duration::from_millis(3_000));
        let start = Instant::now();
        let first = notifier.show("one", NotificationKind::Success, start);
        let second = notifier.show(
            "two",
            NotificationKind::Success,
            start + Duration::from_millis(1_000),
        );
        assert_ne!(first, second);

        assert!(!notifier.dismiss(first));
        let current = notifier.current().expect("second message should survive");
        assert_eq!(current.message, "two");
        assert!(notifier.is_visible_at(start + Duration::from_millis(3_500)));

        assert!(notifier.dismiss(second));
        assert!(notifier.is_idle());
        assert!(!notifier.is_visible_at(start + Duration::from_millis(4_000)));
    }

    #[test]
    fn dismiss_after_clear_is_a_no_op() {
        let mut notifier = Notifier::default();
        let token = notifier.show("oops", NotificationKind::Error, Instant::now());
        assert!(notifier.clear());
        assert!(!notifier.dismiss(token));
        assert!(!notifier.clear());
    }

    #[test]
    fn oversized_duration_is_clamped_and_show_does_not_overflow() {
        let mut notifier = Notifier::new(Duration::MAX);
        assert_eq!(notifier.duration(), MAX_NOTIFICATION_DURATION);

        let start = Instant::now();
        notifier.show("late", NotificationKind::Error, start);
        let current = notifier.current().expect("notification should be showing");
        assert!(current.expires_at > start);
        assert!(notifier.is_visible_at(start + Duration::from_secs(59 * 60)));
    }
}
