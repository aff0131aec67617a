//! User-visible, non-blocking notices.
//!
//! Every operation boundary (connect, switch, balance fetch, purchase,
//! history query) reports its outcome as a [`Notice`] rather than failing
//! the process. Long-running operations first emit a
//! [`NoticeLevel::Loading`] notice and later resolve it by reusing the same
//! [`NoticeId`].

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Correlates a loading notice with the notice that resolves it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NoticeId(u64);

impl NoticeId {
    /// Allocates a process-unique notice id.
    #[must_use]
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for NoticeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Severity of a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoticeLevel {
    /// Informational.
    Info,
    /// An operation is in flight.
    Loading,
    /// An operation completed.
    Success,
    /// An operation failed; the session keeps its prior state.
    Error,
}

/// A single notification for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Correlation id.
    pub id: NoticeId,
    /// Severity.
    pub level: NoticeLevel,
    /// Human-readable text.
    pub message: String,
}

impl Notice {
    fn with_level(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            id: NoticeId::next(),
            level,
            message: message.into(),
        }
    }

    /// Creates an informational notice.
    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self::with_level(NoticeLevel::Info, message)
    }

    /// Creates a loading notice.
    #[must_use]
    pub fn loading(message: impl Into<String>) -> Self {
        Self::with_level(NoticeLevel::Loading, message)
    }

    /// Creates a success notice.
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self::with_level(NoticeLevel::Success, message)
    }

    /// Creates an error notice.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::with_level(NoticeLevel::Error, message)
    }

    /// Re-targets this notice at an earlier one, replacing it.
    #[must_use]
    pub const fn replacing(mut self, id: NoticeId) -> Self {
        self.id = id;
        self
    }
}

/// Sink for notices. Implementations must not block.
pub trait Notifier: Send + Sync {
    /// Delivers a notice.
    fn notify(&self, notice: Notice);
}

impl<T: Notifier + ?Sized> Notifier for Arc<T> {
    fn notify(&self, notice: Notice) {
        (**self).notify(notice);
    }
}

/// Forwards notices to `tracing` events.
#[cfg(feature = "telemetry")]
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

#[cfg(feature = "telemetry")]
impl Notifier for TracingNotifier {
    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Info | NoticeLevel::Loading | NoticeLevel::Success => {
                tracing::info!(id = %notice.id, level = ?notice.level, "{}", notice.message);
            }
            NoticeLevel::Error => {
                tracing::warn!(id = %notice.id, "{}", notice.message);
            }
        }
    }
}
