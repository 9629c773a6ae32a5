//! Dashboard summary statistics.
//!
//! [`aggregate`] is a pure full scan: same input, same output, no side
//! effects. The repository re-runs it after every mutation instead of
//! maintaining incremental counters; the set is small and in memory, so the
//! scan is cheap and immune to drift.

use serde::{Deserialize, Serialize};

use crate::invoice::{Invoice, InvoiceStatus};
use crate::money::Money;

/// One aggregate bucket: running value total plus record count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsBucket {
    pub value: Money,
    pub count: usize,
}

impl StatsBucket {
    fn add(&mut self, amount: Money) {
        self.value = self.value.saturating_add(amount);
        self.count += 1;
    }
}

/// Bucketed totals per status group.
///
/// SENT and PENDING PAYMENT share the unpaid bucket. Unrecognized statuses
/// land in no bucket, so the counts sum to the invoice count only when every
/// status is a known lifecycle state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceStats {
    pub total_paid: StatsBucket,
    pub total_overdue: StatsBucket,
    pub total_draft: StatsBucket,
    pub total_unpaid: StatsBucket,
}

impl InvoiceStats {
    /// Sum of all bucket counts.
    pub fn counted(&self) -> usize {
        self.total_paid.count
            + self.total_overdue.count
            + self.total_draft.count
            + self.total_unpaid.count
    }
}

/// Buckets every invoice by status group.
///
/// Amounts are already normalized [`Money`], so malformed inputs were zeroed
/// where they entered the engine and can never fail a scan here.
pub fn aggregate(invoices: &[Invoice]) -> InvoiceStats {
    let mut stats = InvoiceStats::default();

    for invoice in invoices {
        match &invoice.status {
            InvoiceStatus::Paid => stats.total_paid.add(invoice.amount),
            InvoiceStatus::Overdue => stats.total_overdue.add(invoice.amount),
            InvoiceStatus::Draft => stats.total_draft.add(invoice.amount),
            InvoiceStatus::Sent | InvoiceStatus::PendingPayment => {
                stats.total_unpaid.add(invoice.amount)
            }
            InvoiceStatus::Other(status) => {
                debug!(
                    "⚠ Unrecognized status '{}' on invoice {} excluded from stats",
                    status, invoice.id
                );
            }
        }
    }

    stats
}
