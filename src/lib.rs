//! # invoice-kit
//!
//! The state engine behind a single-page invoicing dashboard.
//!
//! ## Features
//!
//! - **Single Source of Truth:** One [`InvoiceRepository`] owns the invoice
//!   set, the derived stats and the current selection
//! - **Storage Agnostic:** Persists through the [`StateStore`] seam; ships an
//!   in-memory store, hosts bring browser-storage or file bridges
//! - **Atomic Mutations:** Persist-then-commit with full rollback on storage
//!   failure; stats recomputed on every change
//! - **Realtime Ready:** Typed event bus, auth-driven session lifecycle and
//!   notification dedup with a bounded feed
//! - **Form Boundary Included:** Validation, outcome toasts with stable
//!   codes, and an activity feed
//! - **Round-Trip Faithful:** Records persist as the dashboard's original
//!   JSON shape, unknown statuses survive byte-for-byte
//!
//! ## Quick Start
//!
//! ### Repository and actions
//!
//! ```ignore
//! use invoice_kit::store::InMemoryStore;
//! use invoice_kit::{
//!     ActivityLog, DraftItem, InvoiceActions, InvoiceDraft, InvoiceRepository, Money,
//! };
//! use tokio::sync::mpsc;
//!
//! let repository = InvoiceRepository::open(InMemoryStore::new()).await?;
//!
//! // Toasts arrive on a channel; the UI renders them however it likes.
//! let (toast_tx, mut toast_rx) = mpsc::unbounded_channel();
//! let actions = InvoiceActions::new(repository, toast_tx, ActivityLog::new(), "KO");
//!
//! let invoice = actions
//!     .create_invoice(InvoiceDraft {
//!         customer_name: "Jane Doe".to_string(),
//!         customer_email: "jane@example.com".to_string(),
//!         customer_phone: None,
//!         issue_date: "2023-05-01".parse()?,
//!         due_date: "2023-05-19".parse()?,
//!         items: vec![DraftItem::new("Design", 2, Money::from_cents(5000))],
//!         note: None,
//!     })
//!     .await?;
//!
//! let stats = actions.repository().stats().await;
//! assert_eq!(stats.total_draft.count, 1);
//! ```
//!
//! ### Filtering the dashboard list
//!
//! ```ignore
//! use invoice_kit::{filter, ListQuery, SortBy, StatusFilter};
//!
//! let visible = filter::apply(
//!     &repository.list().await,
//!     &ListQuery::new()
//!         .with_search("jane")
//!         .with_status(StatusFilter::All)
//!         .with_sort(SortBy::Amount),
//! );
//! ```
//!
//! ### Realtime session
//!
//! ```ignore
//! use invoice_kit::{AuthUser, EventBus, MockEventSource, RealtimeSession, SessionAuth};
//! use tokio::sync::mpsc;
//!
//! let auth = SessionAuth::new();
//! let source = MockEventSource::new(EventBus::new());
//! let (toast_tx, mut toast_rx) = mpsc::unbounded_channel();
//! let session = RealtimeSession::start(&auth, source, toast_tx);
//!
//! // Signing in connects the feed; the welcome toast follows shortly.
//! auth.sign_in(AuthUser::new("user-1", "Karim Okafor", "karim@example.com"));
//! ```

#[macro_use]
extern crate log;

pub mod actions;
pub mod activity;
pub mod auth;
pub mod dedup;
pub mod error;
pub mod event;
pub mod export;
pub mod filter;
pub mod invoice;
pub mod money;
pub mod repository;
pub mod session;
pub mod source;
pub mod stats;
pub mod store;
pub mod validate;

// Re-exports for convenience
pub use actions::{InvoiceActions, ToastSink};
pub use activity::{Activity, ActivityKind, ActivityLog};
pub use auth::{AuthUser, SessionAuth};
pub use dedup::{Delivery, NotificationDedup, Toast, ToastSeverity};
pub use error::{Error, Result};
pub use event::{EventBus, EventData, EventKind, EventName, EventSubscription, RealtimeEvent};
pub use export::{ExportReceipt, LinkSharer, PdfExporter, SharedLink};
pub use filter::{ListQuery, SortBy, StatusFilter};
pub use invoice::{DraftItem, Invoice, InvoiceDraft, InvoiceStatus, LineItem, StatusColor};
pub use money::Money;
pub use repository::InvoiceRepository;
pub use session::RealtimeSession;
pub use source::{EventSource, MockEventSource};
pub use stats::{aggregate, InvoiceStats, StatsBucket};
pub use store::StateStore;
pub use validate::validate_draft;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
