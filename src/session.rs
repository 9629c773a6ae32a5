//! Realtime session lifecycle.
//!
//! A [`RealtimeSession`] ties the event feed to auth presence: while a user
//! is signed in the source is connected and the session listens on the
//! notification channel; on sign-out the subscription is released and the
//! source disconnected. Every received event runs through the session's
//! deduplicator; toast-worthy ones go out on the session's toast channel,
//! everything else is only recorded.
//!
//! One background watcher task drives the whole lifecycle. `shutdown` (or
//! drop) aborts it, releases any live subscription exactly once and
//! disconnects; nothing is delivered afterwards.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::auth::{AuthUser, SessionAuth};
use crate::dedup::{dedup_key, Delivery, NotificationDedup, Toast};
use crate::event::{EventName, EventSubscription, RealtimeEvent};
use crate::source::EventSource;

/// The auth-driven realtime pipeline.
///
/// Dedup state lives as long as this value: it spans sign-out/sign-in cycles
/// within the session and dies with it.
pub struct RealtimeSession<S: EventSource> {
    source: S,
    dedup: Arc<Mutex<NotificationDedup>>,
    watcher: Option<JoinHandle<()>>,
}

impl<S: EventSource + 'static> RealtimeSession<S> {
    /// Spawns the watcher and wires it to `auth`. A user already signed in
    /// when this is called connects immediately.
    pub fn start(auth: &SessionAuth, source: S, toasts: mpsc::UnboundedSender<Toast>) -> Self {
        let dedup = Arc::new(Mutex::new(NotificationDedup::new()));
        let watcher = tokio::spawn(watch_auth(
            auth.watch(),
            source.clone(),
            Arc::clone(&dedup),
            toasts,
        ));

        RealtimeSession {
            source,
            dedup,
            watcher: Some(watcher),
        }
    }

    /// The retained notification feed, newest first.
    pub fn notifications(&self) -> Vec<RealtimeEvent> {
        lock_dedup(&self.dedup).retained()
    }

    /// Whether the underlying source is currently connected.
    pub fn is_connected(&self) -> bool {
        self.source.is_connected()
    }

    /// Tears the session down: watcher aborted, subscription released,
    /// source disconnected. Idempotent.
    pub fn shutdown(&mut self) {
        if let Some(watcher) = self.watcher.take() {
            watcher.abort();
            self.source.disconnect();
            info!("✓ Realtime session shut down");
        }
    }
}

impl<S: EventSource> Drop for RealtimeSession<S> {
    fn drop(&mut self) {
        if let Some(watcher) = self.watcher.take() {
            watcher.abort();
            self.source.disconnect();
        }
    }
}

async fn watch_auth<S: EventSource>(
    mut auth_rx: watch::Receiver<Option<AuthUser>>,
    source: S,
    dedup: Arc<Mutex<NotificationDedup>>,
    toasts: mpsc::UnboundedSender<Toast>,
) {
    let mut subscription: Option<EventSubscription> = None;

    // The watch channel only wakes on changes, so a user signed in before
    // the session started is picked up here.
    let initial = auth_rx.borrow_and_update().clone();
    if let Some(user) = initial {
        attach(&source, &mut subscription, &user.id);
    }

    loop {
        tokio::select! {
            changed = auth_rx.changed() => {
                if changed.is_err() {
                    // Auth handle gone; stop driving the lifecycle.
                    detach(&source, &mut subscription);
                    break;
                }
                let user = auth_rx.borrow_and_update().clone();
                match user {
                    Some(user) => {
                        // Successive sign-ins (user switch, repeated sign-in)
                        // recycle the connection under the new key.
                        detach(&source, &mut subscription);
                        attach(&source, &mut subscription, &user.id);
                    }
                    None => detach(&source, &mut subscription),
                }
            }
            event = next_event(&mut subscription) => {
                match event {
                    Some(event) => handle_event(&dedup, &toasts, event),
                    None => subscription = None,
                }
            }
        }
    }
}

async fn next_event(subscription: &mut Option<EventSubscription>) -> Option<RealtimeEvent> {
    match subscription {
        Some(sub) => sub.recv().await,
        None => std::future::pending().await,
    }
}

fn attach<S: EventSource>(source: &S, subscription: &mut Option<EventSubscription>, user_key: &str) {
    source.connect(user_key);
    *subscription = Some(source.subscribe(EventName::Notification));
}

fn detach<S: EventSource>(source: &S, subscription: &mut Option<EventSubscription>) {
    if let Some(mut sub) = subscription.take() {
        sub.cancel();
    }
    source.disconnect();
}

fn handle_event(
    dedup: &Mutex<NotificationDedup>,
    toasts: &mpsc::UnboundedSender<Toast>,
    event: RealtimeEvent,
) {
    let key = dedup_key(&event);
    match lock_dedup(dedup).ingest(event) {
        Delivery::Toast(toast) => {
            debug!("Notification '{}' -> toast {}", key, toast.code);
            // A dropped receiver just means nobody is listening anymore.
            let _ = toasts.send(toast);
        }
        Delivery::Recorded => debug!("Notification '{}' recorded", key),
        Delivery::Duplicate => debug!("Skipping duplicate notification: {}", key),
    }
}

fn lock_dedup(dedup: &Mutex<NotificationDedup>) -> MutexGuard<'_, NotificationDedup> {
    match dedup.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
