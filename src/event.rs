//! Typed realtime event plumbing.
//!
//! The dashboard's realtime feed is an observer bus keyed by event name: the
//! session subscribes to a name and receives every event emitted under it, in
//! emission order. Ordering across distinct names is not guaranteed.
//! Subscriptions are guards; dropping one (or cancelling it explicitly)
//! unsubscribes exactly once and nothing is delivered afterwards.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use serde::de;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tokio::sync::mpsc;

// ============================================================================
// Event names and payloads
// ============================================================================

/// Channel names the bus routes on.
///
/// `Notification` is the only channel the session listens to; the per-entity
/// names exist for parity with the realtime protocol and for callers that
/// want narrower feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventName {
    Notification,
    InvoiceCreated,
    InvoiceUpdated,
    InvoiceDeleted,
    InvoicePaid,
    InvoiceSent,
    UserActivity,
}

impl EventName {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventName::Notification => "notification",
            EventName::InvoiceCreated => "invoice_created",
            EventName::InvoiceUpdated => "invoice_updated",
            EventName::InvoiceDeleted => "invoice_deleted",
            EventName::InvoicePaid => "invoice_paid",
            EventName::InvoiceSent => "invoice_sent",
            EventName::UserActivity => "user_activity",
        }
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a realtime event announces.
///
/// Open-world like the invoice status: kinds this engine version does not
/// recognize are carried verbatim, recorded in the feed and never toasted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventKind {
    InvoiceCreated,
    InvoicePaid,
    InvoiceSent,
    Other(String),
}

impl EventKind {
    pub fn as_str(&self) -> &str {
        match self {
            EventKind::InvoiceCreated => "invoice_created",
            EventKind::InvoicePaid => "invoice_paid",
            EventKind::InvoiceSent => "invoice_sent",
            EventKind::Other(s) => s,
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "invoice_created" => EventKind::InvoiceCreated,
            "invoice_paid" => EventKind::InvoicePaid,
            "invoice_sent" => EventKind::InvoiceSent,
            other => EventKind::Other(other.to_string()),
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for EventKind {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EventKind {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct KindVisitor;

        impl de::Visitor<'_> for KindVisitor {
            type Value = EventKind;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str("an event kind string")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<EventKind, E> {
                Ok(EventKind::parse(v))
            }
        }

        deserializer.deserialize_str(KindVisitor)
    }
}

/// Optional entity payload attached to an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventData {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_email: Option<String>,
    /// Already-formatted currency string, `$1,234.56`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<String>,
}

impl EventData {
    pub fn new(id: impl Into<String>) -> Self {
        EventData {
            id: id.into(),
            customer_name: None,
            customer_email: None,
            amount: None,
        }
    }

    pub fn with_customer(mut self, name: impl Into<String>) -> Self {
        self.customer_name = Some(name.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.customer_email = Some(email.into());
        self
    }

    pub fn with_amount(mut self, amount: impl Into<String>) -> Self {
        self.amount = Some(amount.into());
        self
    }
}

/// One realtime event as it crosses the bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealtimeEvent {
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<EventData>,
}

impl RealtimeEvent {
    pub fn new(kind: EventKind, message: impl Into<String>) -> Self {
        RealtimeEvent {
            kind,
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: EventData) -> Self {
        self.data = Some(data);
        self
    }
}

// ============================================================================
// Bus
// ============================================================================

type Subscriber = (u64, mpsc::UnboundedSender<RealtimeEvent>);

#[derive(Default)]
struct BusInner {
    channels: DashMap<EventName, Vec<Subscriber>>,
    next_token: AtomicU64,
}

/// In-process observer bus with typed names.
///
/// Cheap to clone; clones share the same channels. Delivery per name is in
/// emission order because each subscriber is one FIFO channel.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl EventBus {
    pub fn new() -> Self {
        EventBus::default()
    }

    /// Registers a subscriber for `name` and returns its guard.
    pub fn subscribe(&self, name: EventName) -> EventSubscription {
        let token = self.inner.next_token.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.channels.entry(name).or_default().push((token, tx));
        debug!("Subscribed to '{}' (token {})", name, token);

        EventSubscription {
            bus: self.clone(),
            name,
            token,
            receiver: rx,
            cancelled: false,
        }
    }

    /// Delivers an event to every live subscriber of `name`, pruning closed
    /// ones. Returns the delivery count.
    pub fn emit(&self, name: EventName, event: RealtimeEvent) -> usize {
        let mut delivered = 0;
        if let Some(mut subscribers) = self.inner.channels.get_mut(&name) {
            subscribers.retain(|(_, tx)| match tx.send(event.clone()) {
                Ok(()) => {
                    delivered += 1;
                    true
                }
                Err(_) => false,
            });
        }
        debug!("Emitted '{}' ({}) to {} subscriber(s)", name, event.kind, delivered);
        delivered
    }

    /// Live subscriber count for `name`.
    pub fn subscriber_count(&self, name: EventName) -> usize {
        self.inner
            .channels
            .get(&name)
            .map(|subscribers| subscribers.len())
            .unwrap_or(0)
    }

    fn unsubscribe(&self, name: EventName, token: u64) {
        if let Some(mut subscribers) = self.inner.channels.get_mut(&name) {
            subscribers.retain(|(t, _)| *t != token);
        }
        debug!("Unsubscribed from '{}' (token {})", name, token);
    }
}

/// A live subscription. Receives events via [`EventSubscription::recv`];
/// unsubscribes on drop or explicit cancel, exactly once.
pub struct EventSubscription {
    bus: EventBus,
    name: EventName,
    token: u64,
    receiver: mpsc::UnboundedReceiver<RealtimeEvent>,
    cancelled: bool,
}

impl EventSubscription {
    /// The channel this subscription listens on.
    pub fn name(&self) -> EventName {
        self.name
    }

    /// Waits for the next event. Returns `None` once cancelled.
    pub async fn recv(&mut self) -> Option<RealtimeEvent> {
        if self.cancelled {
            return None;
        }
        self.receiver.recv().await
    }

    /// Unsubscribes now instead of at drop time. Safe to call repeatedly;
    /// only the first call detaches from the bus.
    pub fn cancel(&mut self) {
        if !self.cancelled {
            self.cancelled = true;
            self.receiver.close();
            self.bus.unsubscribe(self.name, self.token);
        }
    }
}

impl Drop for EventSubscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paid_event(id: &str) -> RealtimeEvent {
        RealtimeEvent::new(EventKind::InvoicePaid, "Invoice payment received")
            .with_data(EventData::new(id).with_amount("$2,500.00"))
    }

    #[tokio::test]
    async fn test_subscriber_receives_in_emission_order() {
        let bus = EventBus::new();
        let mut sub = bus.subscribe(EventName::Notification);

        for id in ["INV-1", "INV-2", "INV-3"] {
            assert_eq!(bus.emit(EventName::Notification, paid_event(id)), 1);
        }

        for id in ["INV-1", "INV-2", "INV-3"] {
            let event = sub.recv().await.expect("Failed to receive event");
            assert_eq!(event.data.expect("missing data").id, id);
        }
    }

    #[tokio::test]
    async fn test_every_subscriber_receives() {
        let bus = EventBus::new();
        let mut first = bus.subscribe(EventName::Notification);
        let mut second = bus.subscribe(EventName::Notification);
        assert_eq!(bus.subscriber_count(EventName::Notification), 2);

        assert_eq!(bus.emit(EventName::Notification, paid_event("INV-9")), 2);
        assert!(first.recv().await.is_some());
        assert!(second.recv().await.is_some());
    }

    #[tokio::test]
    async fn test_names_do_not_cross() {
        let bus = EventBus::new();
        let mut notification = bus.subscribe(EventName::Notification);
        let _activity = bus.subscribe(EventName::UserActivity);

        assert_eq!(bus.emit(EventName::UserActivity, paid_event("INV-5")), 1);
        assert_eq!(bus.emit(EventName::Notification, paid_event("INV-6")), 1);

        let event = notification.recv().await.expect("Failed to receive event");
        assert_eq!(event.data.expect("missing data").id, "INV-6");
    }

    #[tokio::test]
    async fn test_drop_unsubscribes() {
        let bus = EventBus::new();
        {
            let _sub = bus.subscribe(EventName::Notification);
            assert_eq!(bus.subscriber_count(EventName::Notification), 1);
        }
        assert_eq!(bus.subscriber_count(EventName::Notification), 0);
        assert_eq!(bus.emit(EventName::Notification, paid_event("INV-7")), 0);
    }

    #[tokio::test]
    async fn test_cancel_is_idempotent_and_stops_delivery() {
        let bus = EventBus::new();
        let mut sub = bus.subscribe(EventName::Notification);

        bus.emit(EventName::Notification, paid_event("INV-8"));
        sub.cancel();
        sub.cancel();

        assert_eq!(bus.subscriber_count(EventName::Notification), 0);
        assert!(sub.recv().await.is_none());
    }

    #[test]
    fn test_event_wire_shape() {
        let event = RealtimeEvent::new(
            EventKind::InvoiceCreated,
            "Welcome! Real-time updates are active",
        )
        .with_data(
            EventData::new("INV-WELCOME")
                .with_customer("Demo Customer")
                .with_amount("$1,234.56"),
        );

        let json = serde_json::to_string(&event).expect("Failed to serialize");
        assert!(json.contains("\"type\":\"invoice_created\""));
        assert!(json.contains("\"customerName\":\"Demo Customer\""));
        assert!(json.contains("\"amount\":\"$1,234.56\""));

        let back: RealtimeEvent = serde_json::from_str(&json).expect("Failed to deserialize");
        assert_eq!(back, event);
    }

    #[test]
    fn test_unknown_kind_carried_verbatim() {
        let json = r#"{"type":"invoice_archived","message":"archived"}"#;
        let event: RealtimeEvent = serde_json::from_str(json).expect("Failed to deserialize");
        assert_eq!(event.kind, EventKind::Other("invoice_archived".to_string()));
        let out = serde_json::to_string(&event).expect("Failed to serialize");
        assert!(out.contains("\"type\":\"invoice_archived\""));
    }
}
