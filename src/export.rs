//! Export collaborator contracts.
//!
//! The engine derives file names and share URLs but ships no renderer and no
//! clipboard; hosts plug real implementations in behind [`PdfExporter`] and
//! [`LinkSharer`]. Test doubles implement the same traits.

use chrono::NaiveDate;

use crate::error::Result;
use crate::invoice::Invoice;

/// Outcome of a successful PDF export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportReceipt {
    pub file_name: String,
}

/// Outcome of a successful share-link generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedLink {
    pub url: String,
}

/// Renders an invoice to a PDF document.
#[allow(async_fn_in_trait)]
pub trait PdfExporter: Send + Sync {
    /// Renders `invoice` under the derived `file_name`.
    ///
    /// # Errors
    ///
    /// Implementations report rendering or delivery failures; the actions
    /// layer turns them into a failure toast.
    async fn export(&self, invoice: &Invoice, file_name: &str) -> Result<ExportReceipt>;
}

/// Publishes a shareable link for an invoice.
#[allow(async_fn_in_trait)]
pub trait LinkSharer: Send + Sync {
    /// Makes `url` available to the user (clipboard, share sheet).
    async fn share(&self, invoice: &Invoice, url: &str) -> Result<SharedLink>;
}

/// Export file name: `Invoice_{id}_{YYYY-MM-DD}.pdf`.
pub fn pdf_file_name(invoice_id: &str, date: NaiveDate) -> String {
    format!("Invoice_{}_{}.pdf", invoice_id, date.format("%Y-%m-%d"))
}

/// Share URL: `{base}/invoice/{id}`.
pub fn share_url(base_url: &str, invoice_id: &str) -> String {
    format!("{}/invoice/{}", base_url.trim_end_matches('/'), invoice_id)
}
