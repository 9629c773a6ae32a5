//! Canonical invoice state owner.
//!
//! One repository instance exists per application session. It holds the live
//! invoice set, the derived stats and the selection reference behind an async
//! mutex, and mediates every mutation. A mutation's read-modify-write runs
//! entirely under the lock, including the store write, so no interleaving can
//! observe a half-updated set.
//!
//! Mutations follow a persist-then-commit discipline: build the successor
//! set, write it to the store, and only on success swap it in and recompute
//! stats. A failed store write therefore rolls back by never committing, and
//! the call returns a persistence error while reads keep seeing the previous
//! consistent state.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::{Error, Result};
use crate::invoice::{generate_invoice_id, Invoice, InvoiceDraft, InvoiceStatus};
use crate::stats::{aggregate, InvoiceStats};
use crate::store::StateStore;

/// Storage key for the serialized invoice set.
pub const INVOICES_KEY: &str = "invoice_app_invoices";

/// Storage key for the selected-invoice id (empty string = no selection).
pub const SELECTION_KEY: &str = "invoice_app_current_invoice_id";

/// Schema version of the persisted invoice document.
pub const DOCUMENT_VERSION: u32 = 1;

/// Persisted envelope for the invoice set.
#[derive(Deserialize)]
struct StateDocument {
    version: u32,
    invoices: Vec<Invoice>,
}

#[derive(Serialize)]
struct StateDocumentRef<'a> {
    version: u32,
    invoices: &'a [Invoice],
}

#[derive(Debug)]
struct EngineState {
    invoices: Vec<Invoice>,
    selected: Option<String>,
    stats: InvoiceStats,
}

/// The invoice repository.
///
/// Cheap to clone; clones share the same state and store handle. All methods
/// take `&self`.
///
/// # Example
///
/// ```
/// use invoice_kit::store::InMemoryStore;
/// use invoice_kit::{DraftItem, InvoiceDraft, InvoiceRepository, Money};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let repo = InvoiceRepository::open(InMemoryStore::new()).await?;
/// let draft = InvoiceDraft {
///     customer_name: "Jane Doe".to_string(),
///     customer_email: "jane@example.com".to_string(),
///     customer_phone: None,
///     issue_date: "2023-05-01".parse()?,
///     due_date: "2023-05-19".parse()?,
///     items: vec![DraftItem::new("Design", 2, Money::from_cents(5000))],
///     note: None,
/// };
/// let invoice = repo.create(draft).await?;
/// assert_eq!(repo.list().await.len(), 1);
/// assert_eq!(repo.selected().await.map(|i| i.id), Some(invoice.id));
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct InvoiceRepository<S: StateStore> {
    store: S,
    state: Arc<Mutex<EngineState>>,
}

impl<S: StateStore> InvoiceRepository<S> {
    /// Opens the repository, loading both owned keys from the store.
    ///
    /// Missing keys mean an empty set and no selection. The loaded set is
    /// ordered newest-created-first.
    ///
    /// # Errors
    ///
    /// - [`Error::Persistence`] when the store read fails
    /// - [`Error::Deserialization`] when the stored document is corrupt
    /// - [`Error::VersionMismatch`] when the document schema is unsupported
    pub async fn open(store: S) -> Result<Self> {
        let invoices = match store.get(INVOICES_KEY).await? {
            Some(raw) => decode_document(&raw)?,
            None => Vec::new(),
        };
        let selected = match store.get(SELECTION_KEY).await? {
            Some(id) if !id.is_empty() => Some(id),
            _ => None,
        };
        let stats = aggregate(&invoices);

        info!(
            "✓ Repository opened: {} invoice(s), selection {:?}",
            invoices.len(),
            selected
        );

        Ok(InvoiceRepository {
            store,
            state: Arc::new(Mutex::new(EngineState {
                invoices,
                selected,
                stats,
            })),
        })
    }

    /// Snapshot of the current set, newest-created-first.
    pub async fn list(&self) -> Vec<Invoice> {
        self.state.lock().await.invoices.clone()
    }

    /// Current aggregate stats (recomputed on every mutation).
    pub async fn stats(&self) -> InvoiceStats {
        self.state.lock().await.stats
    }

    /// Number of invoices in the set.
    pub async fn len(&self) -> usize {
        self.state.lock().await.invoices.len()
    }

    /// Whether the set is empty.
    pub async fn is_empty(&self) -> bool {
        self.state.lock().await.invoices.is_empty()
    }

    /// Looks up a single invoice by id.
    pub async fn get(&self, id: &str) -> Option<Invoice> {
        self.state
            .lock()
            .await
            .invoices
            .iter()
            .find(|invoice| invoice.id == id)
            .cloned()
    }

    /// The selected invoice id, if any.
    pub async fn selected_id(&self) -> Option<String> {
        self.state.lock().await.selected.clone()
    }

    /// Resolves the selection against the live set.
    ///
    /// A dangling selection (id no longer present) resolves to `None`, never
    /// an error.
    pub async fn selected(&self) -> Option<Invoice> {
        let state = self.state.lock().await;
        state
            .selected
            .as_ref()
            .and_then(|id| state.invoices.iter().find(|invoice| &invoice.id == id))
            .cloned()
    }

    /// Creates an invoice from a draft.
    ///
    /// Performs no validation (that is the form boundary's job): assigns a
    /// fresh unique id, computes the amount from the items, starts the
    /// lifecycle at DRAFT/gray, prepends to the set, persists, recomputes
    /// stats and selects the new invoice.
    ///
    /// # Errors
    ///
    /// Returns a persistence/serialization error and leaves the set untouched
    /// when the store write fails.
    pub async fn create(&self, draft: InvoiceDraft) -> Result<Invoice> {
        let mut state = self.state.lock().await;

        let id = fresh_id(&state.invoices);
        let invoice = Invoice::from_draft(draft, id, Utc::now());

        let mut next = state.invoices.clone();
        next.insert(0, invoice.clone());
        self.persist_invoices(&next).await?;

        state.invoices = next;
        state.stats = aggregate(&state.invoices);
        state.selected = Some(invoice.id.clone());
        self.persist_selection_best_effort(state.selected.as_deref())
            .await;

        info!(
            "✓ Created invoice {} for {} ({})",
            invoice.id, invoice.customer_name, invoice.amount
        );
        Ok(invoice)
    }

    /// Replaces an invoice's status and its derived color together.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] when the id is absent
    /// - persistence errors roll the mutation back entirely
    pub async fn update_status(&self, id: &str, status: InvoiceStatus) -> Result<Invoice> {
        let mut state = self.state.lock().await;

        let index = state
            .invoices
            .iter()
            .position(|invoice| invoice.id == id)
            .ok_or_else(|| Error::NotFound(format!("invoice {}", id)))?;

        let mut next = state.invoices.clone();
        next[index].set_status(status);
        self.persist_invoices(&next).await?;

        state.invoices = next;
        state.stats = aggregate(&state.invoices);
        let updated = state.invoices[index].clone();

        info!("✓ Invoice {} status -> {}", updated.id, updated.status);
        Ok(updated)
    }

    /// Removes an invoice. Clears the selection when it pointed at the
    /// removed invoice.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] when the id is absent (a second delete of the
    ///   same id reports this and changes nothing)
    /// - persistence errors roll the mutation back entirely
    pub async fn delete(&self, id: &str) -> Result<()> {
        let mut state = self.state.lock().await;

        let index = state
            .invoices
            .iter()
            .position(|invoice| invoice.id == id)
            .ok_or_else(|| Error::NotFound(format!("invoice {}", id)))?;

        let mut next = state.invoices.clone();
        next.remove(index);
        self.persist_invoices(&next).await?;

        state.invoices = next;
        state.stats = aggregate(&state.invoices);
        if state.selected.as_deref() == Some(id) {
            state.selected = None;
            self.persist_selection_best_effort(None).await;
        }

        info!("✓ Deleted invoice {}", id);
        Ok(())
    }

    /// Inserts a copy of an existing invoice as a fresh DRAFT record and
    /// selects it. The copy gets a new id, a " (Copy)" name suffix, today's
    /// issue date and a due date 30 days out.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] when the source id is absent
    /// - persistence errors roll the mutation back entirely
    pub async fn duplicate(&self, id: &str) -> Result<Invoice> {
        let mut state = self.state.lock().await;

        let source = state
            .invoices
            .iter()
            .find(|invoice| invoice.id == id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("invoice {}", id)))?;

        let now = Utc::now();
        let copy = source.duplicated(fresh_id(&state.invoices), now.date_naive(), now);

        let mut next = state.invoices.clone();
        next.insert(0, copy.clone());
        self.persist_invoices(&next).await?;

        state.invoices = next;
        state.stats = aggregate(&state.invoices);
        state.selected = Some(copy.id.clone());
        self.persist_selection_best_effort(state.selected.as_deref())
            .await;

        info!("✓ Duplicated invoice {} as {}", id, copy.id);
        Ok(copy)
    }

    /// Sets the selection reference and persists it under its own key.
    ///
    /// Performs no existence check: selecting an unknown id is legal and
    /// resolves to `None` on lookup.
    ///
    /// # Errors
    ///
    /// Returns a persistence error (selection unchanged) when the store write
    /// fails.
    pub async fn select(&self, id: Option<&str>) -> Result<()> {
        let mut state = self.state.lock().await;
        self.persist_selection(id).await?;
        state.selected = id.map(str::to_string);
        debug!("✓ Selection -> {:?}", state.selected);
        Ok(())
    }

    /// Replaces the whole set (seeding, restores). Orders newest-first,
    /// persists and recomputes stats; the selection is left as-is and heals
    /// lazily if it dangles.
    ///
    /// # Errors
    ///
    /// Persistence errors roll the replacement back entirely.
    pub async fn import(&self, invoices: Vec<Invoice>) -> Result<()> {
        let mut state = self.state.lock().await;

        let mut next = invoices;
        next.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        self.persist_invoices(&next).await?;

        info!("✓ Imported {} invoice(s)", next.len());
        state.invoices = next;
        state.stats = aggregate(&state.invoices);
        Ok(())
    }

    async fn persist_invoices(&self, invoices: &[Invoice]) -> Result<()> {
        let document = StateDocumentRef {
            version: DOCUMENT_VERSION,
            invoices,
        };
        let payload = serde_json::to_string(&document)?;
        self.store.set(INVOICES_KEY, payload).await
    }

    async fn persist_selection(&self, selected: Option<&str>) -> Result<()> {
        self.store
            .set(SELECTION_KEY, selected.unwrap_or_default().to_string())
            .await
    }

    /// Selection writes that follow an already-committed set mutation must
    /// not un-commit it; a stale persisted selection heals on the next load.
    async fn persist_selection_best_effort(&self, selected: Option<&str>) {
        if let Err(e) = self.persist_selection(selected).await {
            warn!("⚠ Selection persist failed (will heal on reload): {}", e);
        }
    }
}

fn decode_document(raw: &str) -> Result<Vec<Invoice>> {
    let document: StateDocument = serde_json::from_str(raw)?;
    if document.version != DOCUMENT_VERSION {
        return Err(Error::VersionMismatch {
            expected: DOCUMENT_VERSION,
            found: document.version,
        });
    }
    let mut invoices = document.invoices;
    invoices.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(invoices)
}

/// Draws ids until one misses the live set. A single draw has a small
/// collision window (timestamp suffix plus four random chars), so collisions
/// re-draw instead of ever silently reusing an id.
fn fresh_id(invoices: &[Invoice]) -> String {
    loop {
        let id = generate_invoice_id();
        if !invoices.iter().any(|invoice| invoice.id == id) {
            return id;
        }
        warn!("⚠ Invoice id collision on {}, redrawing", id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoice::{DraftItem, StatusColor};
    use crate::money::Money;
    use crate::store::InMemoryStore;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn draft(name: &str, items: Vec<DraftItem>) -> InvoiceDraft {
        InvoiceDraft {
            customer_name: name.to_string(),
            customer_email: format!("{}@example.com", name.to_lowercase().replace(' ', ".")),
            customer_phone: None,
            issue_date: "2023-05-01".parse().expect("Failed to parse date"),
            due_date: "2023-05-19".parse().expect("Failed to parse date"),
            items,
            note: None,
        }
    }

    fn jane_doe_draft() -> InvoiceDraft {
        draft(
            "Jane Doe",
            vec![
                DraftItem::new("Design", 2, Money::from_cents(5000)),
                DraftItem::new("Review", 1, Money::from_cents(2500)),
            ],
        )
    }

    async fn open_repo() -> InvoiceRepository<InMemoryStore> {
        InvoiceRepository::open(InMemoryStore::new())
            .await
            .expect("Failed to open repository")
    }

    /// Store wrapper whose writes can be failed on demand.
    #[derive(Clone)]
    struct FlakyStore {
        inner: InMemoryStore,
        fail_writes: Arc<AtomicBool>,
    }

    impl FlakyStore {
        fn new() -> Self {
            FlakyStore {
                inner: InMemoryStore::new(),
                fail_writes: Arc::new(AtomicBool::new(false)),
            }
        }

        fn fail_writes(&self, fail: bool) {
            self.fail_writes.store(fail, Ordering::SeqCst);
        }
    }

    impl StateStore for FlakyStore {
        async fn get(&self, key: &str) -> Result<Option<String>> {
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: String) -> Result<()> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(Error::Persistence("simulated write failure".to_string()));
            }
            self.inner.set(key, value).await
        }
    }

    #[tokio::test]
    async fn test_create_grows_list_by_one_and_sums_items() {
        let repo = open_repo().await;
        assert!(repo.is_empty().await);

        let invoice = repo
            .create(jane_doe_draft())
            .await
            .expect("Failed to create invoice");

        let list = repo.list().await;
        assert_eq!(list.len(), 1);
        assert_eq!(invoice.amount, Money::from_cents(12_500));
        assert_eq!(invoice.amount.to_string(), "$125.00");
        assert_eq!(invoice.status, InvoiceStatus::Draft);
        assert_eq!(invoice.status_color, StatusColor::Gray);
    }

    #[tokio::test]
    async fn test_create_prepends_and_selects() {
        let repo = open_repo().await;
        let first = repo
            .create(draft(
                "First",
                vec![DraftItem::new("A", 1, Money::from_cents(100))],
            ))
            .await
            .expect("Failed to create invoice");
        let second = repo
            .create(draft(
                "Second",
                vec![DraftItem::new("B", 1, Money::from_cents(200))],
            ))
            .await
            .expect("Failed to create invoice");

        let list = repo.list().await;
        assert_eq!(list[0].id, second.id);
        assert_eq!(list[1].id, first.id);
        assert_eq!(repo.selected().await.map(|i| i.id), Some(second.id));
    }

    #[tokio::test]
    async fn test_jane_doe_scenario() {
        let repo = open_repo().await;
        let invoice = repo
            .create(jane_doe_draft())
            .await
            .expect("Failed to create invoice");
        assert_eq!(repo.stats().await.total_draft.count, 1);

        let updated = repo
            .update_status(&invoice.id, InvoiceStatus::Paid)
            .await
            .expect("Failed to update status");
        assert_eq!(updated.status, InvoiceStatus::Paid);
        assert_eq!(updated.status_color, StatusColor::Green);

        let stats = repo.stats().await;
        assert_eq!(stats.total_paid.count, 1);
        assert_eq!(stats.total_paid.value, Money::from_cents(12_500));
        assert_eq!(stats.total_draft.count, 0);
    }

    #[tokio::test]
    async fn test_update_status_unknown_id_is_not_found() {
        let repo = open_repo().await;
        let err = repo
            .update_status("000000-ZZZZ", InvoiceStatus::Paid)
            .await
            .expect_err("update of unknown id should fail");
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_then_delete_again_is_not_found() {
        let repo = open_repo().await;
        let invoice = repo
            .create(jane_doe_draft())
            .await
            .expect("Failed to create invoice");

        repo.delete(&invoice.id).await.expect("Failed to delete");
        assert!(repo.is_empty().await);

        let err = repo
            .delete(&invoice.id)
            .await
            .expect_err("second delete should fail");
        assert!(matches!(err, Error::NotFound(_)));
        assert!(repo.is_empty().await);
    }

    #[tokio::test]
    async fn test_delete_clears_selection_only_when_selected() {
        let repo = open_repo().await;
        let first = repo
            .create(draft(
                "First",
                vec![DraftItem::new("A", 1, Money::from_cents(100))],
            ))
            .await
            .expect("Failed to create invoice");
        let second = repo
            .create(draft(
                "Second",
                vec![DraftItem::new("B", 1, Money::from_cents(200))],
            ))
            .await
            .expect("Failed to create invoice");

        // Second is selected; deleting first keeps the selection.
        repo.delete(&first.id).await.expect("Failed to delete");
        assert_eq!(repo.selected_id().await, Some(second.id.clone()));

        repo.delete(&second.id).await.expect("Failed to delete");
        assert_eq!(repo.selected_id().await, None);
    }

    #[tokio::test]
    async fn test_select_dangling_resolves_to_none() {
        let repo = open_repo().await;
        repo.select(Some("nonexistent-id"))
            .await
            .expect("Failed to select");
        assert_eq!(repo.selected_id().await, Some("nonexistent-id".to_string()));
        assert!(repo.selected().await.is_none());
    }

    #[tokio::test]
    async fn test_state_survives_reload() {
        let store = InMemoryStore::new();
        let repo = InvoiceRepository::open(store.clone())
            .await
            .expect("Failed to open repository");
        let invoice = repo
            .create(jane_doe_draft())
            .await
            .expect("Failed to create invoice");
        repo.update_status(&invoice.id, InvoiceStatus::Sent)
            .await
            .expect("Failed to update status");

        let reloaded = InvoiceRepository::open(store)
            .await
            .expect("Failed to reopen repository");
        let list = reloaded.list().await;
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].status, InvoiceStatus::Sent);
        assert_eq!(reloaded.selected().await.map(|i| i.id), Some(invoice.id));
        assert_eq!(reloaded.stats().await.total_unpaid.count, 1);
    }

    #[tokio::test]
    async fn test_create_rolls_back_on_persist_failure() {
        let store = FlakyStore::new();
        let repo = InvoiceRepository::open(store.clone())
            .await
            .expect("Failed to open repository");
        let kept = repo
            .create(jane_doe_draft())
            .await
            .expect("Failed to create invoice");

        store.fail_writes(true);
        let err = repo
            .create(draft(
                "Doomed",
                vec![DraftItem::new("X", 1, Money::from_cents(100))],
            ))
            .await
            .expect_err("create should fail while the store is down");
        assert!(matches!(err, Error::Persistence(_)));

        // No partial state: set, stats and selection all unchanged.
        assert_eq!(repo.len().await, 1);
        assert_eq!(repo.stats().await.total_draft.count, 1);
        assert_eq!(repo.selected_id().await, Some(kept.id.clone()));

        store.fail_writes(false);
        repo.create(draft(
            "Recovered",
            vec![DraftItem::new("Y", 1, Money::from_cents(100))],
        ))
        .await
        .expect("Failed to create invoice after recovery");
        assert_eq!(repo.len().await, 2);
    }

    #[tokio::test]
    async fn test_update_and_delete_roll_back_on_persist_failure() {
        let store = FlakyStore::new();
        let repo = InvoiceRepository::open(store.clone())
            .await
            .expect("Failed to open repository");
        let invoice = repo
            .create(jane_doe_draft())
            .await
            .expect("Failed to create invoice");

        store.fail_writes(true);

        let err = repo
            .update_status(&invoice.id, InvoiceStatus::Paid)
            .await
            .expect_err("update should fail while the store is down");
        assert!(matches!(err, Error::Persistence(_)));
        assert_eq!(
            repo.get(&invoice.id).await.map(|i| i.status),
            Some(InvoiceStatus::Draft)
        );

        let err = repo
            .delete(&invoice.id)
            .await
            .expect_err("delete should fail while the store is down");
        assert!(matches!(err, Error::Persistence(_)));
        assert_eq!(repo.len().await, 1);
    }

    #[tokio::test]
    async fn test_select_rolls_back_on_persist_failure() {
        let store = FlakyStore::new();
        let repo = InvoiceRepository::open(store.clone())
            .await
            .expect("Failed to open repository");
        let invoice = repo
            .create(jane_doe_draft())
            .await
            .expect("Failed to create invoice");

        store.fail_writes(true);
        let err = repo
            .select(None)
            .await
            .expect_err("select should fail while the store is down");
        assert!(matches!(err, Error::Persistence(_)));
        assert_eq!(repo.selected_id().await, Some(invoice.id));
    }

    #[tokio::test]
    async fn test_open_rejects_corrupt_document() {
        let store = InMemoryStore::new();
        store
            .set(INVOICES_KEY, "{not json".to_string())
            .await
            .expect("Failed to seed store");
        let err = InvoiceRepository::open(store)
            .await
            .expect_err("corrupt document should fail to load");
        assert!(matches!(err, Error::Deserialization(_)));
    }

    #[tokio::test]
    async fn test_open_rejects_unknown_document_version() {
        let store = InMemoryStore::new();
        store
            .set(INVOICES_KEY, "{\"version\":99,\"invoices\":[]}".to_string())
            .await
            .expect("Failed to seed store");
        let err = InvoiceRepository::open(store)
            .await
            .expect_err("unknown version should fail to load");
        assert!(matches!(
            err,
            Error::VersionMismatch {
                expected: DOCUMENT_VERSION,
                found: 99
            }
        ));
    }

    #[tokio::test]
    async fn test_open_treats_empty_selection_as_none() {
        let store = InMemoryStore::new();
        store
            .set(SELECTION_KEY, String::new())
            .await
            .expect("Failed to seed store");
        let repo = InvoiceRepository::open(store)
            .await
            .expect("Failed to open repository");
        assert_eq!(repo.selected_id().await, None);
    }

    #[tokio::test]
    async fn test_import_orders_newest_first() {
        let repo = open_repo().await;
        let older = Invoice::from_draft(
            draft("Old", vec![DraftItem::new("A", 1, Money::from_cents(100))]),
            "100000-OLDD".to_string(),
            "2023-01-01T00:00:00Z"
                .parse()
                .expect("Failed to parse timestamp"),
        );
        let newer = Invoice::from_draft(
            draft("New", vec![DraftItem::new("B", 1, Money::from_cents(200))]),
            "200000-NEWW".to_string(),
            "2023-06-01T00:00:00Z"
                .parse()
                .expect("Failed to parse timestamp"),
        );

        repo.import(vec![older, newer])
            .await
            .expect("Failed to import");
        let list = repo.list().await;
        assert_eq!(list[0].id, "200000-NEWW");
        assert_eq!(list[1].id, "100000-OLDD");
        assert_eq!(repo.stats().await.total_draft.count, 2);
    }

    #[tokio::test]
    async fn test_duplicate_copies_and_selects() {
        let repo = open_repo().await;
        let original = repo
            .create(jane_doe_draft())
            .await
            .expect("Failed to create invoice");
        repo.update_status(&original.id, InvoiceStatus::Paid)
            .await
            .expect("Failed to update status");

        let copy = repo
            .duplicate(&original.id)
            .await
            .expect("Failed to duplicate invoice");
        assert_ne!(copy.id, original.id);
        assert_eq!(copy.customer_name, "Jane Doe (Copy)");
        assert_eq!(copy.status, InvoiceStatus::Draft);
        assert_eq!(copy.amount, original.amount);
        assert_eq!(repo.len().await, 2);
        assert_eq!(repo.selected_id().await, Some(copy.id));

        let err = repo
            .duplicate("000000-ZZZZ")
            .await
            .expect_err("duplicate of unknown id should fail");
        assert!(matches!(err, Error::NotFound(_)));
    }
}
