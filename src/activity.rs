//! In-memory activity feed.
//!
//! Successful invoice actions append an entry here so the dashboard sidebar
//! can show "who did what". The log is session-scoped and bounded; it is
//! never persisted.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};

/// Maximum retained entries before the oldest are evicted.
pub const ACTIVITY_CAPACITY: usize = 50;

/// What an activity entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActivityKind {
    Created,
    Sent,
    PaymentConfirmed,
    Overdue,
    Deleted,
    Duplicated,
}

impl ActivityKind {
    /// The feed's display label.
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityKind::Created => "Invoice creation",
            ActivityKind::Sent => "Invoice sent",
            ActivityKind::PaymentConfirmed => "Payment Confirmed",
            ActivityKind::Overdue => "Invoice overdue",
            ActivityKind::Deleted => "Invoice deleted",
            ActivityKind::Duplicated => "Invoice duplicated",
        }
    }
}

impl fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One feed entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Activity {
    /// Short actor label, typically the signed-in user's initials.
    pub actor: String,
    pub kind: ActivityKind,
    pub description: String,
    pub timestamp: DateTime<Utc>,
}

/// Bounded newest-first activity log.
///
/// Cheap to clone; clones share the same entries. Lock scope is a plain
/// push/copy, so a `std` mutex suffices even on async callers.
#[derive(Clone, Default)]
pub struct ActivityLog {
    entries: Arc<Mutex<VecDeque<Activity>>>,
}

impl ActivityLog {
    pub fn new() -> Self {
        ActivityLog::default()
    }

    /// Prepends an entry stamped now, evicting the oldest past capacity.
    pub fn record(
        &self,
        kind: ActivityKind,
        actor: impl Into<String>,
        description: impl Into<String>,
    ) {
        let entry = Activity {
            actor: actor.into(),
            kind,
            description: description.into(),
            timestamp: Utc::now(),
        };
        let mut entries = match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        entries.push_front(entry);
        while entries.len() > ACTIVITY_CAPACITY {
            entries.pop_back();
        }
    }

    /// The newest `n` entries, newest first.
    pub fn recent(&self, n: usize) -> Vec<Activity> {
        let entries = match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        entries.iter().take(n).cloned().collect()
    }

    pub fn len(&self) -> usize {
        match self.entries.lock() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
