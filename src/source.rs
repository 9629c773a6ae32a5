//! Realtime event sources.
//!
//! An [`EventSource`] is where realtime events come from: a handle that can
//! connect, disconnect and hand out bus subscriptions. The crate ships
//! [`MockEventSource`], the demo feed the dashboard runs against when no
//! realtime server is configured. It emits a one-time welcome announcement
//! shortly after the first connect and a trickle of randomized invoice events
//! while connected.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rand::Rng;
use tokio::task::JoinHandle;

use crate::dedup::WELCOME_MARKER;
use crate::event::{EventBus, EventData, EventKind, EventName, EventSubscription, RealtimeEvent};
use crate::invoice::random_token;
use crate::money::Money;

/// Delay before the one-time welcome announcement.
pub const DEFAULT_WELCOME_DELAY: Duration = Duration::from_secs(3);

/// Interval between randomized mock events.
pub const DEFAULT_EVENT_INTERVAL: Duration = Duration::from_secs(300);

/// Entity id carried by the welcome announcement.
pub const WELCOME_ID: &str = "INV-WELCOME";

/// Where realtime events come from.
///
/// Control methods are synchronous so teardown paths (including drops) can
/// call them; implementations run their IO on background tasks.
pub trait EventSource: Send + Sync + Clone {
    /// Starts the feed for the given user key. A no-op when already
    /// connected.
    fn connect(&self, user_key: &str);

    /// Stops the feed. Timers stop before their next tick. A no-op when
    /// already disconnected.
    fn disconnect(&self);

    fn is_connected(&self) -> bool;

    /// A subscription to one of the source's channels. Valid to call before
    /// connecting; events only flow while connected.
    fn subscribe(&self, name: EventName) -> EventSubscription;
}

/// Demo event feed.
///
/// Cheap to clone; clones share the connection state. The welcome
/// announcement is sent at most once per source lifetime, even across
/// disconnect/reconnect cycles. Timers run on the ambient Tokio runtime.
#[derive(Clone)]
pub struct MockEventSource {
    bus: EventBus,
    connected: Arc<AtomicBool>,
    welcome_sent: Arc<AtomicBool>,
    welcome_delay: Duration,
    event_interval: Duration,
    tasks: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl MockEventSource {
    /// A mock source with the demo pacing (welcome after 3s, one event every
    /// 5 minutes).
    pub fn new(bus: EventBus) -> Self {
        MockEventSource::with_timing(bus, DEFAULT_WELCOME_DELAY, DEFAULT_EVENT_INTERVAL)
    }

    /// A mock source with custom pacing. The pacing is presentation, not
    /// contract; tests shrink it to keep timer assertions fast.
    pub fn with_timing(bus: EventBus, welcome_delay: Duration, event_interval: Duration) -> Self {
        MockEventSource {
            bus,
            connected: Arc::new(AtomicBool::new(false)),
            welcome_sent: Arc::new(AtomicBool::new(false)),
            welcome_delay,
            event_interval,
            tasks: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Whether the welcome announcement has fired.
    pub fn welcome_sent(&self) -> bool {
        self.welcome_sent.load(Ordering::SeqCst)
    }

    fn push_task(&self, handle: JoinHandle<()>) {
        let mut tasks = match self.tasks.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        tasks.push(handle);
    }

    fn spawn_welcome(&self) {
        let bus = self.bus.clone();
        let connected = Arc::clone(&self.connected);
        let welcome_sent = Arc::clone(&self.welcome_sent);
        let delay = self.welcome_delay;

        self.push_task(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let still_fresh = welcome_sent
                .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok();
            if connected.load(Ordering::SeqCst) && still_fresh {
                bus.emit(EventName::Notification, welcome_event());
            }
        }));
    }

    fn spawn_event_loop(&self) {
        let bus = self.bus.clone();
        let connected = Arc::clone(&self.connected);
        let interval = self.event_interval;

        self.push_task(tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                if !connected.load(Ordering::SeqCst) {
                    break;
                }
                bus.emit(EventName::Notification, random_mock_event());
            }
        }));
    }
}

impl EventSource for MockEventSource {
    fn connect(&self, user_key: &str) {
        if self.connected.swap(true, Ordering::SeqCst) {
            return;
        }
        info!("✓ Mock event source connected (user {})", user_key);

        if !self.welcome_sent.load(Ordering::SeqCst) {
            self.spawn_welcome();
        }
        self.spawn_event_loop();
    }

    fn disconnect(&self) {
        if !self.connected.swap(false, Ordering::SeqCst) {
            return;
        }
        let mut tasks = match self.tasks.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        for task in tasks.drain(..) {
            task.abort();
        }
        info!("✓ Mock event source disconnected");
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn subscribe(&self, name: EventName) -> EventSubscription {
        self.bus.subscribe(name)
    }
}

fn welcome_event() -> RealtimeEvent {
    RealtimeEvent::new(EventKind::InvoiceCreated, WELCOME_MARKER).with_data(
        EventData::new(WELCOME_ID)
            .with_customer("Demo Customer")
            .with_amount("$1,234.56"),
    )
}

fn random_mock_event() -> RealtimeEvent {
    let mut rng = rand::rng();
    let id = format!("INV-{}", random_token(9));

    match rng.random_range(0..3u8) {
        0 => {
            let customers = ["John Doe", "Jane Smith", "Acme Corp", "Tech Solutions"];
            let amount = Money::from_cents(rng.random_range(0..1_000_000));
            RealtimeEvent::new(EventKind::InvoiceCreated, "New invoice created").with_data(
                EventData::new(id)
                    .with_customer(customers[rng.random_range(0..customers.len())])
                    .with_amount(amount.to_string()),
            )
        }
        1 => {
            let customers = ["John Doe", "Jane Smith", "Acme Corp"];
            let amount = Money::from_cents(rng.random_range(0..500_000));
            RealtimeEvent::new(EventKind::InvoicePaid, "Invoice payment received").with_data(
                EventData::new(id)
                    .with_customer(customers[rng.random_range(0..customers.len())])
                    .with_amount(amount.to_string()),
            )
        }
        _ => {
            let customers = ["John Doe", "Jane Smith"];
            RealtimeEvent::new(EventKind::InvoiceSent, "Invoice sent to customer").with_data(
                EventData::new(id)
                    .with_customer(customers[rng.random_range(0..customers.len())])
                    .with_email("customer@example.com"),
            )
        }
    }
}
