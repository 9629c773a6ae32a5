//! Invoice domain model.
//!
//! Records serialize to the same JSON shape the dashboard has always
//! persisted: camelCase keys, formatted currency strings, `YYYY-MM-DD` dates
//! and RFC 3339 creation timestamps. Statuses are open-world: the five known
//! lifecycle states get typed variants, anything else is carried verbatim so
//! foreign records survive a load/save cycle untouched.

use std::fmt;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use rand::Rng;
use serde::de;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::money::Money;

// ============================================================================
// Status and color
// ============================================================================

/// Invoice lifecycle status.
///
/// The wire form is the uppercase display string (`"PENDING PAYMENT"` keeps
/// its space). Unrecognized strings deserialize into [`InvoiceStatus::Other`]
/// and re-serialize byte-for-byte; they are excluded from stats buckets and
/// render with the gray fallback color.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum InvoiceStatus {
    Draft,
    Sent,
    Paid,
    Overdue,
    PendingPayment,
    /// A status string this engine version does not recognize.
    Other(String),
}

impl InvoiceStatus {
    /// The wire/display string for this status.
    pub fn as_str(&self) -> &str {
        match self {
            InvoiceStatus::Draft => "DRAFT",
            InvoiceStatus::Sent => "SENT",
            InvoiceStatus::Paid => "PAID",
            InvoiceStatus::Overdue => "OVERDUE",
            InvoiceStatus::PendingPayment => "PENDING PAYMENT",
            InvoiceStatus::Other(s) => s,
        }
    }

    /// Parses a wire string; unknown values are carried verbatim.
    pub fn parse(s: &str) -> Self {
        match s {
            "DRAFT" => InvoiceStatus::Draft,
            "SENT" => InvoiceStatus::Sent,
            "PAID" => InvoiceStatus::Paid,
            "OVERDUE" => InvoiceStatus::Overdue,
            "PENDING PAYMENT" => InvoiceStatus::PendingPayment,
            other => InvoiceStatus::Other(other.to_string()),
        }
    }

    /// The derived display color. Fixed mapping, gray for unrecognized.
    pub fn color(&self) -> StatusColor {
        match self {
            InvoiceStatus::Paid => StatusColor::Green,
            InvoiceStatus::Overdue => StatusColor::Red,
            InvoiceStatus::Draft => StatusColor::Gray,
            InvoiceStatus::PendingPayment => StatusColor::Yellow,
            InvoiceStatus::Sent => StatusColor::Blue,
            InvoiceStatus::Other(_) => StatusColor::Gray,
        }
    }

    /// Whether this is one of the five known lifecycle states.
    pub fn is_recognized(&self) -> bool {
        !matches!(self, InvoiceStatus::Other(_))
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for InvoiceStatus {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for InvoiceStatus {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct StatusVisitor;

        impl de::Visitor<'_> for StatusVisitor {
            type Value = InvoiceStatus;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str("an invoice status string")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<InvoiceStatus, E> {
                Ok(InvoiceStatus::parse(v))
            }
        }

        deserializer.deserialize_str(StatusVisitor)
    }
}

/// Display color tag. Derived from the status, never set independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusColor {
    Green,
    Red,
    Gray,
    Yellow,
    Blue,
}

impl StatusColor {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusColor::Green => "green",
            StatusColor::Red => "red",
            StatusColor::Gray => "gray",
            StatusColor::Yellow => "yellow",
            StatusColor::Blue => "blue",
        }
    }
}

impl fmt::Display for StatusColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Line items
// ============================================================================

/// One billable entry within an invoice.
///
/// `amount` is always `rate × qty`; go through [`LineItem::set_qty`] and
/// [`LineItem::set_rate`] so it stays that way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub qty: u32,
    pub rate: Money,
    pub amount: Money,
}

impl LineItem {
    /// Builds a line item with its amount computed from `qty × rate`.
    pub fn new(name: impl Into<String>, description: Option<String>, qty: u32, rate: Money) -> Self {
        LineItem {
            name: name.into(),
            description,
            qty,
            rate,
            amount: rate.times(qty),
        }
    }

    /// Updates the quantity and recomputes the amount.
    pub fn set_qty(&mut self, qty: u32) {
        self.qty = qty;
        self.amount = self.rate.times(qty);
    }

    /// Updates the rate and recomputes the amount.
    pub fn set_rate(&mut self, rate: Money) {
        self.rate = rate;
        self.amount = rate.times(self.qty);
    }
}

// ============================================================================
// Invoice record
// ============================================================================

/// A billing record for one customer.
///
/// Created only through the repository; mutated only via status updates or
/// deletion. The invariant pair: `amount` equals the sum of line-item amounts
/// at creation time, and `status_color` always equals `status.color()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    /// Globally unique id, `{6-digit-timestamp-suffix}-{4-char-random}`.
    pub id: String,
    pub customer_name: String,
    pub customer_email: String,
    #[serde(default)]
    pub customer_phone: Option<String>,
    /// Human display date, derived from the due date at creation.
    pub date: String,
    pub amount: Money,
    pub status: InvoiceStatus,
    pub status_color: StatusColor,
    pub created_at: DateTime<Utc>,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub items: Vec<LineItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl Invoice {
    /// Materializes a draft into a full record.
    ///
    /// Status starts at DRAFT with the gray color tag; the amount is the sum
    /// of the item amounts; the display date comes from the due date.
    pub fn from_draft(draft: InvoiceDraft, id: String, created_at: DateTime<Utc>) -> Self {
        let items: Vec<LineItem> = draft
            .items
            .into_iter()
            .map(|item| LineItem::new(item.name, item.description, item.qty, item.rate))
            .collect();
        let amount: Money = items.iter().map(|item| item.amount).sum();

        Invoice {
            id,
            customer_name: draft.customer_name,
            customer_email: draft.customer_email,
            customer_phone: draft.customer_phone,
            date: display_date(draft.due_date),
            amount,
            status: InvoiceStatus::Draft,
            status_color: InvoiceStatus::Draft.color(),
            created_at,
            issue_date: draft.issue_date,
            due_date: draft.due_date,
            items,
            note: draft.note,
        }
    }

    /// Builds a copy of this invoice as a fresh draft-status record.
    ///
    /// The copy gets a new id, a " (Copy)" name suffix, today's issue date, a
    /// due date 30 days out, and a reset DRAFT status; items and amount carry
    /// over unchanged.
    pub fn duplicated(&self, id: String, today: NaiveDate, created_at: DateTime<Utc>) -> Self {
        let due_date = today + Duration::days(30);
        Invoice {
            id,
            customer_name: format!("{} (Copy)", self.customer_name),
            customer_email: self.customer_email.clone(),
            customer_phone: self.customer_phone.clone(),
            date: display_date(due_date),
            amount: self.amount,
            status: InvoiceStatus::Draft,
            status_color: InvoiceStatus::Draft.color(),
            created_at,
            issue_date: today,
            due_date,
            items: self.items.clone(),
            note: self.note.clone(),
        }
    }

    /// Replaces the status and its derived color together.
    pub fn set_status(&mut self, status: InvoiceStatus) {
        self.status_color = status.color();
        self.status = status;
    }

    /// Days from `today` until the due date (negative when past due).
    pub fn days_until_due(&self, today: NaiveDate) -> i64 {
        (self.due_date - today).num_days()
    }
}

/// Caller-supplied payload for creating an invoice.
///
/// Validation happens at the form boundary ([`crate::validate_draft`]); the
/// repository accepts any draft as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceDraft {
    pub customer_name: String,
    pub customer_email: String,
    #[serde(default)]
    pub customer_phone: Option<String>,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub items: Vec<DraftItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// One line-item entry on a draft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftItem {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub qty: u32,
    pub rate: Money,
}

impl DraftItem {
    pub fn new(name: impl Into<String>, qty: u32, rate: Money) -> Self {
        DraftItem {
            name: name.into(),
            description: None,
            qty,
            rate,
        }
    }
}

// ============================================================================
// Id generation and date display
// ============================================================================

pub(crate) const ID_ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// A random uppercase alphanumeric token of the given length.
pub(crate) fn random_token(len: usize) -> String {
    let mut rng = rand::rng();
    (0..len)
        .map(|_| ID_ALPHABET[rng.random_range(0..ID_ALPHABET.len())] as char)
        .collect()
}

/// Generates an invoice id: the last six digits of the current millisecond
/// timestamp, a dash, and four random alphanumerics (`483920-X7K2`).
///
/// One draw is not collision-proof on its own; the repository re-draws until
/// the id is absent from the live set.
pub fn generate_invoice_id() -> String {
    let millis = Utc::now().timestamp_millis().to_string();
    let suffix = &millis[millis.len().saturating_sub(6)..];
    format!("{}-{}", suffix, random_token(4))
}

/// Formats a date for display: `May 19th, 2023`.
pub fn display_date(date: NaiveDate) -> String {
    let day = date.day();
    let suffix = match day % 100 {
        11 | 12 | 13 => "th",
        _ => match day % 10 {
            1 => "st",
            2 => "nd",
            3 => "rd",
            _ => "th",
        },
    };
    format!("{} {}{}, {}", date.format("%B"), day, suffix, date.year())
}
