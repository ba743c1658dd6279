//! Driven port for transient user-facing notices (toasts).

/// Severity of a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    /// Something failed.
    Error,
    /// Informational message.
    Info,
    /// An action completed.
    Success,
}

/// Short message shown to the user and then dismissed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Severity.
    pub level: NoticeLevel,
    /// Human readable text.
    pub message: String,
}

impl Notice {
    /// Build an error notice.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }

    /// Build an informational notice.
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    /// Build a success notice.
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }
}

/// Port for surfacing notices. Notices never replace error propagation.
#[cfg_attr(test, mockall::automock)]
pub trait Notifier: Send + Sync {
    /// Show `notice` to the user.
    fn notify(&self, notice: Notice);
}

/// Notifier that drops every notice.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentNotifier;

impl Notifier for SilentNotifier {
    fn notify(&self, _notice: Notice) {}
}
