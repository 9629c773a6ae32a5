//! Invoice actions at the form boundary.
//!
//! Every UI intent funnels through here: validate, call the repository (or an
//! export collaborator), and surface exactly one toast per outcome. Success
//! paths also append to the activity feed. Failure toasts carry the user-safe
//! retry phrasing; the underlying error still propagates to the caller, so
//! nothing is silently swallowed.

use chrono::Utc;
use tokio::sync::mpsc;

use crate::activity::{ActivityKind, ActivityLog};
use crate::dedup::Toast;
use crate::error::{Error, Result};
use crate::export::{pdf_file_name, share_url, ExportReceipt, LinkSharer, PdfExporter, SharedLink};
use crate::invoice::{Invoice, InvoiceDraft, InvoiceStatus};
use crate::repository::InvoiceRepository;
use crate::store::StateStore;
use crate::validate::validate_draft;

// Stable toast codes the UI keys styling and telemetry on.
pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
pub const INVOICE_CREATED: &str = "INVOICE_CREATED";
pub const CREATE_INVOICE_ERROR: &str = "CREATE_INVOICE_ERROR";
pub const INVOICE_SENT: &str = "INVOICE_SENT";
pub const SEND_INVOICE_ERROR: &str = "SEND_INVOICE_ERROR";
pub const INVOICE_PAID: &str = "INVOICE_PAID";
pub const MARK_PAID_ERROR: &str = "MARK_PAID_ERROR";
pub const INVOICE_OVERDUE: &str = "INVOICE_OVERDUE";
pub const MARK_OVERDUE_ERROR: &str = "MARK_OVERDUE_ERROR";
pub const INVOICE_DELETED: &str = "INVOICE_DELETED";
pub const DELETE_INVOICE_ERROR: &str = "DELETE_INVOICE_ERROR";
pub const INVOICE_DUPLICATED: &str = "INVOICE_DUPLICATED";
pub const DUPLICATE_INVOICE_ERROR: &str = "DUPLICATE_INVOICE_ERROR";
pub const PDF_SUCCESS: &str = "PDF_SUCCESS";
pub const PDF_ERROR: &str = "PDF_ERROR";
pub const LINK_SUCCESS: &str = "LINK_SUCCESS";
pub const LINK_ERROR: &str = "LINK_ERROR";

/// Where outcome toasts go.
pub trait ToastSink: Send + Sync + Clone {
    fn push(&self, toast: Toast);
}

impl ToastSink for mpsc::UnboundedSender<Toast> {
    fn push(&self, toast: Toast) {
        // A dropped receiver just means nobody is listening anymore.
        let _ = self.send(toast);
    }
}

/// The action layer the dashboard drives.
///
/// Cheap to clone; clones share the repository, the toast sink and the
/// activity feed. `actor` is the label activity entries carry, typically the
/// signed-in user's initials.
#[derive(Clone)]
pub struct InvoiceActions<S: StateStore, T: ToastSink> {
    repository: InvoiceRepository<S>,
    toasts: T,
    activities: ActivityLog,
    actor: String,
}

impl<S: StateStore, T: ToastSink> InvoiceActions<S, T> {
    pub fn new(
        repository: InvoiceRepository<S>,
        toasts: T,
        activities: ActivityLog,
        actor: impl Into<String>,
    ) -> Self {
        InvoiceActions {
            repository,
            toasts,
            activities,
            actor: actor.into(),
        }
    }

    pub fn repository(&self) -> &InvoiceRepository<S> {
        &self.repository
    }

    pub fn activities(&self) -> &ActivityLog {
        &self.activities
    }

    /// Validates, creates and selects a new invoice.
    ///
    /// # Errors
    ///
    /// [`Error::Validation`] before the repository is touched, or the
    /// repository's own failure. Either way a failure toast went out first.
    pub async fn create_invoice(&self, draft: InvoiceDraft) -> Result<Invoice> {
        if let Err(e) = validate_draft(&draft) {
            let message = match &e {
                Error::Validation(msg) => msg.clone(),
                other => other.to_string(),
            };
            self.toasts.push(Toast::error(VALIDATION_ERROR, message));
            return Err(e);
        }

        match self.repository.create(draft).await {
            Ok(invoice) => {
                self.toasts
                    .push(Toast::success(INVOICE_CREATED, "Invoice created successfully!"));
                self.activities.record(
                    ActivityKind::Created,
                    self.actor.as_str(),
                    format!("Created invoice {}/{}", invoice.id, invoice.customer_name),
                );
                Ok(invoice)
            }
            Err(e) => {
                self.toasts.push(Toast::error(
                    CREATE_INVOICE_ERROR,
                    "Failed to create invoice. Please try again.",
                ));
                Err(e)
            }
        }
    }

    /// Marks an invoice SENT.
    pub async fn send_invoice(&self, id: &str) -> Result<Invoice> {
        match self.repository.update_status(id, InvoiceStatus::Sent).await {
            Ok(invoice) => {
                self.toasts.push(Toast::success(
                    INVOICE_SENT,
                    format!("Invoice sent to {} successfully!", invoice.customer_name),
                ));
                self.activities.record(
                    ActivityKind::Sent,
                    self.actor.as_str(),
                    format!("Invoice sent to {}", invoice.customer_name),
                );
                Ok(invoice)
            }
            Err(e) => {
                self.toasts.push(Toast::error(
                    SEND_INVOICE_ERROR,
                    "Failed to send invoice. Please try again.",
                ));
                Err(e)
            }
        }
    }

    /// Marks an invoice PAID.
    pub async fn mark_as_paid(&self, id: &str) -> Result<Invoice> {
        match self.repository.update_status(id, InvoiceStatus::Paid).await {
            Ok(invoice) => {
                self.toasts.push(Toast::success(
                    INVOICE_PAID,
                    format!("Invoice marked as paid for {}!", invoice.customer_name),
                ));
                self.activities.record(
                    ActivityKind::PaymentConfirmed,
                    self.actor.as_str(),
                    format!("Payment confirmed for invoice #{}", invoice.id),
                );
                Ok(invoice)
            }
            Err(e) => {
                self.toasts.push(Toast::error(
                    MARK_PAID_ERROR,
                    "Failed to mark invoice as paid. Please try again.",
                ));
                Err(e)
            }
        }
    }

    /// Marks an invoice OVERDUE.
    pub async fn mark_as_overdue(&self, id: &str) -> Result<Invoice> {
        match self.repository.update_status(id, InvoiceStatus::Overdue).await {
            Ok(invoice) => {
                self.toasts.push(Toast::success(
                    INVOICE_OVERDUE,
                    format!("Invoice marked as overdue for {}.", invoice.customer_name),
                ));
                self.activities.record(
                    ActivityKind::Overdue,
                    self.actor.as_str(),
                    format!("Invoice marked as overdue for {}", invoice.customer_name),
                );
                Ok(invoice)
            }
            Err(e) => {
                self.toasts.push(Toast::error(
                    MARK_OVERDUE_ERROR,
                    "Failed to mark invoice as overdue. Please try again.",
                ));
                Err(e)
            }
        }
    }

    /// Deletes an invoice.
    pub async fn remove_invoice(&self, id: &str) -> Result<()> {
        let customer = self.repository.get(id).await.map(|i| i.customer_name);
        match self.repository.delete(id).await {
            Ok(()) => {
                let customer = customer.unwrap_or_else(|| "customer".to_string());
                self.toasts.push(Toast::success(
                    INVOICE_DELETED,
                    format!("Invoice for {} deleted successfully.", customer),
                ));
                self.activities.record(
                    ActivityKind::Deleted,
                    self.actor.as_str(),
                    format!("Deleted invoice {}/{}", id, customer),
                );
                Ok(())
            }
            Err(e) => {
                self.toasts.push(Toast::error(
                    DELETE_INVOICE_ERROR,
                    "Failed to delete invoice. Please try again.",
                ));
                Err(e)
            }
        }
    }

    /// Duplicates an invoice as a fresh draft and selects the copy.
    pub async fn duplicate_invoice(&self, id: &str) -> Result<Invoice> {
        match self.repository.duplicate(id).await {
            Ok(copy) => {
                self.toasts
                    .push(Toast::success(INVOICE_DUPLICATED, "Invoice duplicated successfully!"));
                self.activities.record(
                    ActivityKind::Duplicated,
                    self.actor.as_str(),
                    format!("Duplicated invoice {} as {}", id, copy.id),
                );
                Ok(copy)
            }
            Err(e) => {
                self.toasts.push(Toast::error(
                    DUPLICATE_INVOICE_ERROR,
                    "Failed to duplicate invoice. Please try again.",
                ));
                Err(e)
            }
        }
    }

    /// Exports an invoice through the given renderer.
    pub async fn export_pdf<P: PdfExporter>(&self, exporter: &P, id: &str) -> Result<ExportReceipt> {
        let result = async {
            let invoice = self
                .repository
                .get(id)
                .await
                .ok_or_else(|| Error::NotFound(format!("invoice {}", id)))?;
            let file_name = pdf_file_name(&invoice.id, Utc::now().date_naive());
            exporter.export(&invoice, &file_name).await
        }
        .await;

        match result {
            Ok(receipt) => {
                self.toasts.push(Toast::success(
                    PDF_SUCCESS,
                    format!("PDF downloaded successfully: {}", receipt.file_name),
                ));
                Ok(receipt)
            }
            Err(e) => {
                self.toasts
                    .push(Toast::error(PDF_ERROR, format!("Failed to generate PDF: {}", e)));
                Err(e)
            }
        }
    }

    /// Publishes a shareable link for an invoice.
    pub async fn share_link<L: LinkSharer>(
        &self,
        sharer: &L,
        id: &str,
        base_url: &str,
    ) -> Result<SharedLink> {
        let result = async {
            let invoice = self
                .repository
                .get(id)
                .await
                .ok_or_else(|| Error::NotFound(format!("invoice {}", id)))?;
            let url = share_url(base_url, &invoice.id);
            sharer.share(&invoice, &url).await
        }
        .await;

        match result {
            Ok(link) => {
                self.toasts.push(Toast::success(
                    LINK_SUCCESS,
                    format!("Shareable link copied to clipboard: {}", link.url),
                ));
                Ok(link)
            }
            Err(e) => {
                self.toasts
                    .push(Toast::error(LINK_ERROR, format!("Failed to generate link: {}", e)));
                Err(e)
            }
        }
    }
}
