use std::time::{Duration, Instant};

/// Default lifetime of a notification.
pub const TOAST_DURATION: Duration = Duration::from_secs(3);

/// Lifetime of the "tile removed" notification carrying the undo link.
pub const UNDO_TOAST_DURATION: Duration = Duration::from_secs(5);

/// Action offered as a link inside a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastAction {
    UndoDelete,
}

impl ToastAction {
    pub fn label(self) -> &'static str {
        match self {
            Self::UndoDelete => "(undo?)",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub message: String,
    pub action: Option<ToastAction>,
    expires_at: Instant,
}

impl Toast {
    pub fn remaining(&self, now: Instant) -> Duration {
        self.expires_at.saturating_duration_since(now)
    }
}

/// Single-slot transient notification. A newer notification replaces the
/// current one and restarts the timer.
#[derive(Debug, Default)]
pub struct Toasts {
    current: Option<Toast>,
}

impl Toasts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn show(
        &mut self,
        message: impl Into<String>,
        duration: Duration,
        action: Option<ToastAction>,
        now: Instant,
    ) {
        self.current = Some(Toast {
            message: message.into(),
            action,
            expires_at: now + duration,
        });
    }

    /// The live notification, dropping it once expired.
    pub fn current(&mut self, now: Instant) -> Option<&Toast> {
        if self.current.as_ref().is_some_and(|t| t.expires_at <= now) {
            self.current = None;
        }
        self.current.as_ref()
    }

    pub fn dismiss(&mut self) {
        self.current = None;
    }
}
