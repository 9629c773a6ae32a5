//! Notification deduplication and toast policy.
//!
//! Realtime feeds redeliver: reconnects replay events and the mock source
//! repeats itself. Every event the session receives runs through here once.
//! The dedup key is the event kind plus the entity id (falling back to the
//! message when there is no payload); a key seen before is suppressed with no
//! UI effect. New events join the retained feed (newest first, bounded) and
//! at most a small subset become toasts: payment events always, the welcome
//! announcement once per session.
//!
//! All of this state is session-scoped. It dies with the session and is never
//! persisted.

use std::collections::{HashSet, VecDeque};

use crate::event::{EventKind, RealtimeEvent};

/// Retained-feed capacity; the oldest entry is evicted past this.
pub const RETAINED_CAPACITY: usize = 5;

/// Marker carried by the one-time welcome announcement.
pub const WELCOME_MARKER: &str = "Welcome! Real-time updates are active";

/// Toast code for realtime payment events.
pub const REALTIME_PAYMENT: &str = "REALTIME_PAYMENT";

/// Toast code for the welcome announcement.
pub const REALTIME_WELCOME: &str = "REALTIME_WELCOME";

/// Toast severity, mirrored by the UI's banner color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToastSeverity {
    Success,
    Error,
}

/// One transient toast.
#[derive(Debug, Clone, PartialEq)]
pub struct Toast {
    pub severity: ToastSeverity,
    /// Stable machine-readable code, e.g. `INVOICE_CREATED`.
    pub code: &'static str,
    pub message: String,
}

impl Toast {
    pub fn success(code: &'static str, message: impl Into<String>) -> Self {
        Toast {
            severity: ToastSeverity::Success,
            code,
            message: message.into(),
        }
    }

    pub fn error(code: &'static str, message: impl Into<String>) -> Self {
        Toast {
            severity: ToastSeverity::Error,
            code,
            message: message.into(),
        }
    }
}

/// What became of one ingested event.
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    /// Recorded in the feed and worth a toast.
    Toast(Toast),
    /// Recorded in the feed, no toast.
    Recorded,
    /// Seen before; no UI effect.
    Duplicate,
}

/// Session-scoped dedup state.
///
/// Not internally synchronized; the owning session serializes access.
#[derive(Default)]
pub struct NotificationDedup {
    seen: HashSet<String>,
    retained: VecDeque<RealtimeEvent>,
    welcome_toasted: bool,
}

impl NotificationDedup {
    pub fn new() -> Self {
        NotificationDedup::default()
    }

    /// Runs one event through dedup and the toast policy.
    pub fn ingest(&mut self, event: RealtimeEvent) -> Delivery {
        let key = dedup_key(&event);
        if !self.seen.insert(key) {
            return Delivery::Duplicate;
        }

        let decision = self.decide(&event);

        self.retained.push_front(event);
        while self.retained.len() > RETAINED_CAPACITY {
            self.retained.pop_back();
        }

        decision
    }

    fn decide(&mut self, event: &RealtimeEvent) -> Delivery {
        match &event.kind {
            EventKind::InvoicePaid => {
                let message = match event.data.as_ref().and_then(|d| d.amount.as_deref()) {
                    Some(amount) => format!("{} - {}", event.message, amount),
                    None => event.message.clone(),
                };
                Delivery::Toast(Toast::success(REALTIME_PAYMENT, message))
            }
            EventKind::InvoiceCreated if event.message.contains(WELCOME_MARKER) => {
                // The welcome announcement can arrive again with a fresh id
                // (reconnects, replays); the latch keeps it to one toast per
                // session while still recording the repeats.
                if self.welcome_toasted {
                    Delivery::Recorded
                } else {
                    self.welcome_toasted = true;
                    Delivery::Toast(Toast::success(REALTIME_WELCOME, event.message.clone()))
                }
            }
            _ => Delivery::Recorded,
        }
    }

    /// The retained feed, newest first.
    pub fn retained(&self) -> Vec<RealtimeEvent> {
        self.retained.iter().cloned().collect()
    }

    /// Whether the one-shot welcome toast has fired.
    pub fn welcome_toasted(&self) -> bool {
        self.welcome_toasted
    }

    /// Distinct events seen so far (including evicted ones).
    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }
}

/// Composes the dedup key: `kind + ":" + (entity id | message)`.
pub fn dedup_key(event: &RealtimeEvent) -> String {
    let tail = event
        .data
        .as_ref()
        .map(|d| d.id.as_str())
        .unwrap_or(&event.message);
    format!("{}:{}", event.kind, tail)
}
