//! User-visible notifications
//!
//! Every surfaced error becomes exactly one [`Notice`]. The CLI prints them,
//! tests record them.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
    pub at: DateTime<Utc>,
}

impl Notice {
    pub fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            at: Utc::now(),
        }
    }
}

/// Sink for one-line user notifications and the login redirect.
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);

    /// Navigate the user back to the login entry point.
    fn redirect_to_login(&self);
}

/// Prints notices to stderr and mirrors them into the log.
#[derive(Debug, Default)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Info => info!("{}", notice.message),
            NoticeLevel::Warning => warn!("{}", notice.message),
            NoticeLevel::Error => error!("{}", notice.message),
        }
        eprintln!("{}", notice.message);
    }

    fn redirect_to_login(&self) {
        eprintln!("Run `hvc login` to sign in again.");
    }
}

/// Collects notices in memory.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
    redirects: Mutex<usize>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.notices.lock().iter().map(|n| n.message.clone()).collect()
    }

    pub fn redirect_count(&self) -> usize {
        *self.redirects.lock()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices.lock().push(notice);
    }

    fn redirect_to_login(&self) {
        *self.redirects.lock() += 1;
    }
}
