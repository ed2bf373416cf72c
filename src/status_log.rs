//! Cross-thread status log shared by workers and the presentation surface.
//!
//! Workers on any thread hand entries to [`LogSink::post`]; the owner thread
//! drains them with [`LogSink::deliver_pending`] into the one attached
//! [`LogTarget`]. Posting only pushes onto a queue behind a short-lived lock,
//! so a slow or missing target never stalls a worker. Entries reach the target
//! in arrival order at the sink; the optional timestamp is display metadata and
//! plays no part in ordering.

use std::{
    collections::VecDeque,
    sync::{Arc, LazyLock, Mutex, MutexGuard},
};

use time::OffsetDateTime;

/// Severity of a status message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warn,
    Error,
}

/// One status message. Append-only: the core never mutates or removes entries
/// once posted.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub severity: Severity,
    pub text: String,
    pub timestamp: Option<OffsetDateTime>,
}

impl LogEntry {
    /// Entry stamped with the current UTC time.
    pub fn new(severity: Severity, text: impl Into<String>) -> Self {
        Self {
            severity,
            text: text.into(),
            timestamp: Some(OffsetDateTime::now_utc()),
        }
    }

    /// Entry without a timestamp, for callers that stamp on display.
    pub fn untimed(severity: Severity, text: impl Into<String>) -> Self {
        Self {
            severity,
            text: text.into(),
            timestamp: None,
        }
    }
}

/// Rendering destination for delivered entries.
///
/// Implementations are owned by the owner thread; the sink only calls into the
/// target from [`LogSink::deliver_pending`], which the owner thread drives.
pub trait LogTarget: Send {
    /// Append the entry to the display.
    fn append(&mut self, entry: &LogEntry);

    /// Bring the most recently appended entry into the user's current view.
    fn reveal_latest(&mut self);
}

/// Thread-safe, ordered status log with a single delivery point.
pub struct LogSink {
    pending: Mutex<VecDeque<LogEntry>>,
    target: Mutex<Option<Box<dyn LogTarget>>>,
}

impl LogSink {
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(VecDeque::new()),
            target: Mutex::new(None),
        }
    }

    /// Queue an entry for delivery. Callable from any thread; entries posted
    /// before a target is attached are buffered, not dropped.
    pub fn post(&self, entry: LogEntry) {
        lock_recovering(&self.pending).push_back(entry);
    }

    /// Post an Info entry stamped now.
    pub fn info(&self, text: impl Into<String>) {
        self.post(LogEntry::new(Severity::Info, text));
    }

    /// Post a Warn entry stamped now.
    pub fn warn(&self, text: impl Into<String>) {
        self.post(LogEntry::new(Severity::Warn, text));
    }

    /// Post an Error entry stamped now.
    pub fn error(&self, text: impl Into<String>) {
        self.post(LogEntry::new(Severity::Error, text));
    }

    /// Bind the rendering target. Owner thread only; replaces any previous
    /// target. Buffered entries flow to it on the next delivery.
    pub fn attach(&self, target: Box<dyn LogTarget>) {
        *lock_recovering(&self.target) = Some(target);
    }

    /// Unbind and return the current target, if any. Owner thread only.
    /// Subsequent posts buffer again.
    pub fn detach(&self) -> Option<Box<dyn LogTarget>> {
        lock_recovering(&self.target).take()
    }

    /// Hand every queued entry to the attached target, in post order, asking
    /// the target to reveal each one. Owner thread only. Returns the number of
    /// entries delivered; zero when no target is attached.
    pub fn deliver_pending(&self) -> usize {
        let mut target_guard = lock_recovering(&self.target);
        let Some(target) = target_guard.as_mut() else {
            return 0;
        };
        let mut delivered = 0;
        loop {
            // Pop one at a time so posters never wait on target rendering.
            let entry = lock_recovering(&self.pending).pop_front();
            let Some(entry) = entry else {
                break;
            };
            target.append(&entry);
            target.reveal_latest();
            delivered += 1;
        }
        delivered
    }

    /// Number of entries queued but not yet delivered.
    pub fn pending_len(&self) -> usize {
        lock_recovering(&self.pending).len()
    }
}

impl Default for LogSink {
    fn default() -> Self {
        Self::new()
    }
}

// A poisoned status log must not take the owner thread down with it; the
// queue is valid after any panic mid-push, so recover the guard.
fn lock_recovering<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

static PROCESS_SINK: LazyLock<Arc<LogSink>> = LazyLock::new(|| Arc::new(LogSink::new()));

/// The process-wide sink. Initialized on first use, before any task is
/// started; the presentation surface attaches its target here and detaches it
/// on shutdown.
pub fn sink() -> Arc<LogSink> {
    PROCESS_SINK.clone()
}
