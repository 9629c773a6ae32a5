//! List filtering and ordering.
//!
//! [`apply`] never mutates its input: it clones the matching records into a
//! fresh sequence and sorts that. `Vec::sort_by` is stable, so records with
//! equal sort keys keep their relative input order.

use std::fmt;

use crate::invoice::{Invoice, InvoiceStatus};

/// Status predicate for list display.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum StatusFilter {
    /// Sentinel: match every status.
    #[default]
    All,
    /// Match exactly one status.
    Only(InvoiceStatus),
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusFilter::All => f.write_str("ALL"),
            StatusFilter::Only(status) => f.write_str(status.as_str()),
        }
    }
}

/// Sort order for list display.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortBy {
    /// Newest creation timestamp first.
    #[default]
    Date,
    /// Largest amount first.
    Amount,
    /// Customer name, ascending lexical.
    Customer,
    /// Status string, ascending lexical.
    Status,
}

impl SortBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortBy::Date => "date",
            SortBy::Amount => "amount",
            SortBy::Customer => "customer",
            SortBy::Status => "status",
        }
    }
}

impl fmt::Display for SortBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Search, filter and sort parameters for one list view.
///
/// # Example
///
/// ```
/// use invoice_kit::{ListQuery, SortBy, StatusFilter};
///
/// let query = ListQuery::new()
///     .with_search("jane")
///     .with_status(StatusFilter::All)
///     .with_sort(SortBy::Amount);
/// assert_eq!(query.sort, SortBy::Amount);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListQuery {
    /// Case-insensitive substring matched against customer name, invoice id
    /// and customer email. Empty matches all.
    pub search: String,
    pub status: StatusFilter,
    pub sort: SortBy,
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = search.into();
        self
    }

    pub fn with_status(mut self, status: StatusFilter) -> Self {
        self.status = status;
        self
    }

    pub fn with_sort(mut self, sort: SortBy) -> Self {
        self.sort = sort;
        self
    }

    fn matches(&self, invoice: &Invoice) -> bool {
        let status_ok = match &self.status {
            StatusFilter::All => true,
            StatusFilter::Only(status) => invoice.status == *status,
        };
        if !status_ok {
            return false;
        }

        if self.search.is_empty() {
            return true;
        }
        let needle = self.search.to_lowercase();
        invoice.customer_name.to_lowercase().contains(&needle)
            || invoice.id.to_lowercase().contains(&needle)
            || invoice.customer_email.to_lowercase().contains(&needle)
    }
}

/// Applies a [`ListQuery`] to an invoice sequence.
pub fn apply(invoices: &[Invoice], query: &ListQuery) -> Vec<Invoice> {
    let mut filtered: Vec<Invoice> = invoices
        .iter()
        .filter(|invoice| query.matches(invoice))
        .cloned()
        .collect();

    filtered.sort_by(|a, b| match query.sort {
        SortBy::Date => b.created_at.cmp(&a.created_at),
        SortBy::Amount => b.amount.cmp(&a.amount),
        SortBy::Customer => a.customer_name.cmp(&b.customer_name),
        SortBy::Status => a.status.as_str().cmp(b.status.as_str()),
    });

    debug!(
        "✓ Query [search='{}' status={} sort={}] matched {}/{}",
        query.search,
        query.status,
        query.sort,
        filtered.len(),
        invoices.len()
    );

    filtered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoice::{DraftItem, InvoiceDraft};
    use crate::money::Money;
    use chrono::{NaiveDate, TimeZone, Utc};

    fn invoice(id: &str, name: &str, email: &str, cents: i64, minute: u32) -> Invoice {
        let draft = InvoiceDraft {
            customer_name: name.to_string(),
            customer_email: email.to_string(),
            customer_phone: None,
            issue_date: NaiveDate::from_ymd_opt(2023, 5, 1).expect("Failed to build date"),
            due_date: NaiveDate::from_ymd_opt(2023, 5, 19).expect("Failed to build date"),
            items: vec![DraftItem::new("Work", 1, Money::from_cents(cents))],
            note: None,
        };
        let created = Utc
            .with_ymd_and_hms(2023, 5, 1, 10, minute, 0)
            .single()
            .expect("Failed to build timestamp");
        Invoice::from_draft(draft, id.to_string(), created)
    }

    fn fixture() -> Vec<Invoice> {
        let mut invoices = vec![
            invoice("100001-AAAA", "Jane Smith", "jane@corp.com", 400_000, 3),
            invoice("100002-BBBB", "Tech Corp Ltd", "billing@tech.io", 495_000, 2),
            invoice("100003-CCCC", "Olaniyi Ojo Adewale", "olaniyi@mail.com", 131_175_012, 1),
        ];
        invoices[0].set_status(InvoiceStatus::Overdue);
        invoices[1].set_status(InvoiceStatus::Draft);
        invoices[2].set_status(InvoiceStatus::Paid);
        invoices
    }

    #[test]
    fn test_empty_query_matches_all_newest_first() {
        let invoices = fixture();
        let result = apply(&invoices, &ListQuery::new());
        assert_eq!(result.len(), 3);
        assert_eq!(result[0].id, "100001-AAAA");
        assert_eq!(result[2].id, "100003-CCCC");
    }

    #[test]
    fn test_search_is_case_insensitive_across_fields() {
        let invoices = fixture();

        let by_name = apply(&invoices, &ListQuery::new().with_search("JANE"));
        assert_eq!(by_name.len(), 1);
        assert_eq!(by_name[0].customer_name, "Jane Smith");

        let by_id = apply(&invoices, &ListQuery::new().with_search("100002-bbbb"));
        assert_eq!(by_id.len(), 1);

        let by_email = apply(&invoices, &ListQuery::new().with_search("@tech.io"));
        assert_eq!(by_email.len(), 1);

        let nothing = apply(&invoices, &ListQuery::new().with_search("zebra"));
        assert!(nothing.is_empty());
    }

    #[test]
    fn test_status_filter_exact_and_sentinel() {
        let invoices = fixture();

        let all = apply(&invoices, &ListQuery::new().with_status(StatusFilter::All));
        assert_eq!(all.len(), 3);

        let paid = apply(
            &invoices,
            &ListQuery::new().with_status(StatusFilter::Only(InvoiceStatus::Paid)),
        );
        assert_eq!(paid.len(), 1);
        assert_eq!(paid[0].customer_name, "Olaniyi Ojo Adewale");
    }

    #[test]
    fn test_sort_amount_non_increasing() {
        let invoices = fixture();
        let result = apply(&invoices, &ListQuery::new().with_sort(SortBy::Amount));
        for pair in result.windows(2) {
            assert!(pair[0].amount >= pair[1].amount);
        }
        assert_eq!(result[0].customer_name, "Olaniyi Ojo Adewale");
    }

    #[test]
    fn test_sort_customer_and_status_ascending() {
        let invoices = fixture();

        let by_customer = apply(&invoices, &ListQuery::new().with_sort(SortBy::Customer));
        assert_eq!(by_customer[0].customer_name, "Jane Smith");
        assert_eq!(by_customer[2].customer_name, "Tech Corp Ltd");

        let by_status = apply(&invoices, &ListQuery::new().with_sort(SortBy::Status));
        assert_eq!(by_status[0].status, InvoiceStatus::Draft);
        assert_eq!(by_status[1].status, InvoiceStatus::Overdue);
        assert_eq!(by_status[2].status, InvoiceStatus::Paid);
    }

    #[test]
    fn test_sort_is_stable_for_equal_keys() {
        let mut invoices = vec![
            invoice("100001-AAAA", "Alpha", "a@x.com", 5_000, 1),
            invoice("100002-BBBB", "Beta", "b@x.com", 5_000, 2),
            invoice("100003-CCCC", "Gamma", "c@x.com", 5_000, 3),
        ];
        for inv in &mut invoices {
            inv.set_status(InvoiceStatus::Sent);
        }

        let by_amount = apply(&invoices, &ListQuery::new().with_sort(SortBy::Amount));
        let order: Vec<&str> = by_amount.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(order, vec!["100001-AAAA", "100002-BBBB", "100003-CCCC"]);

        let by_status = apply(&invoices, &ListQuery::new().with_sort(SortBy::Status));
        let order: Vec<&str> = by_status.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(order, vec!["100001-AAAA", "100002-BBBB", "100003-CCCC"]);
    }

    #[test]
    fn test_input_sequence_untouched() {
        let invoices = fixture();
        let before: Vec<String> = invoices.iter().map(|i| i.id.clone()).collect();
        let _ = apply(&invoices, &ListQuery::new().with_sort(SortBy::Customer));
        let after: Vec<String> = invoices.iter().map(|i| i.id.clone()).collect();
        assert_eq!(before, after);
    }
}
