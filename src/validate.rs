//! Draft validation at the form boundary.
//!
//! The repository accepts any draft as-is; these checks run once, before the
//! create call, and report the first violated rule. Messages are the exact
//! strings the dashboard surfaces next to the form.

use crate::error::{Error, Result};
use crate::invoice::InvoiceDraft;

/// Checks a draft against the form rules, first violation wins.
///
/// Rules, in order: customer name present, customer email present, due date
/// not before issue date, at least one item, and every item carries a name, a
/// quantity of at least 1 and a non-negative rate.
///
/// # Errors
///
/// [`Error::Validation`] with the rule's display message.
pub fn validate_draft(draft: &InvoiceDraft) -> Result<()> {
    if draft.customer_name.trim().is_empty() {
        return Err(Error::Validation("Customer name is required".to_string()));
    }
    if draft.customer_email.trim().is_empty() {
        return Err(Error::Validation("Customer email is required".to_string()));
    }
    if draft.due_date < draft.issue_date {
        return Err(Error::Validation(
            "Due date cannot be before issue date".to_string(),
        ));
    }
    if draft.items.is_empty() {
        return Err(Error::Validation("At least one item is required".to_string()));
    }
    if draft
        .items
        .iter()
        .any(|item| item.name.trim().is_empty() || item.qty < 1 || item.rate.cents() < 0)
    {
        return Err(Error::Validation("All item fields are required".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoice::DraftItem;
    use crate::money::Money;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("Failed to build date")
    }

    fn valid_draft() -> InvoiceDraft {
        InvoiceDraft {
            customer_name: "Jane Doe".to_string(),
            customer_email: "jane@example.com".to_string(),
            customer_phone: None,
            issue_date: date(2023, 5, 1),
            due_date: date(2023, 5, 19),
            items: vec![DraftItem::new("Design", 2, Money::from_cents(5000))],
            note: None,
        }
    }

    fn message(result: Result<()>) -> String {
        match result {
            Err(Error::Validation(msg)) => msg,
            other => panic!("expected a validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_valid_draft_passes() {
        assert!(validate_draft(&valid_draft()).is_ok());
    }

    #[test]
    fn test_blank_customer_name_rejected() {
        let mut draft = valid_draft();
        draft.customer_name = "   ".to_string();
        assert_eq!(message(validate_draft(&draft)), "Customer name is required");
    }

    #[test]
    fn test_blank_customer_email_rejected() {
        let mut draft = valid_draft();
        draft.customer_email = String::new();
        assert_eq!(message(validate_draft(&draft)), "Customer email is required");
    }

    #[test]
    fn test_due_date_before_issue_date_rejected() {
        let mut draft = valid_draft();
        draft.due_date = date(2023, 4, 30);
        assert_eq!(
            message(validate_draft(&draft)),
            "Due date cannot be before issue date"
        );
    }

    #[test]
    fn test_due_date_equal_to_issue_date_allowed() {
        let mut draft = valid_draft();
        draft.due_date = draft.issue_date;
        assert!(validate_draft(&draft).is_ok());
    }

    #[test]
    fn test_empty_item_list_rejected() {
        let mut draft = valid_draft();
        draft.items.clear();
        assert_eq!(message(validate_draft(&draft)), "At least one item is required");
    }

    #[test]
    fn test_incomplete_item_rejected() {
        let mut draft = valid_draft();
        draft.items.push(DraftItem::new("", 1, Money::from_cents(100)));
        assert_eq!(message(validate_draft(&draft)), "All item fields are required");

        let mut draft = valid_draft();
        draft.items[0].qty = 0;
        assert_eq!(message(validate_draft(&draft)), "All item fields are required");

        let mut draft = valid_draft();
        draft.items[0].rate = Money::from_cents(-1);
        assert_eq!(message(validate_draft(&draft)), "All item fields are required");
    }

    #[test]
    fn test_first_violation_wins() {
        let mut draft = valid_draft();
        draft.customer_name = String::new();
        draft.customer_email = String::new();
        draft.items.clear();
        assert_eq!(message(validate_draft(&draft)), "Customer name is required");
    }
}
