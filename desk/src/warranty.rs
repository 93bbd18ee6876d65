//! Warranty coverage and document completeness.
//!
//! Pure date arithmetic over a purchase date and a category's warranty window.
//! Nothing here touches storage; the service persists the computed fields.

use crate::ticket::{Category, Ticket};
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Message returned when coverage cannot be computed.
pub const MISSING_DATA_MESSAGE: &str = "Faltan datos para validar la garantía";

/// Errors from the warranty validator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WarrantyError {
    /// No purchase date on the ticket
    #[error("purchase date is missing")]
    MissingPurchaseDate,

    /// No category on the ticket
    #[error("category is missing")]
    MissingCategory,
}

/// Coverage computed for one purchase.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarrantyStatus {
    /// Whether the claim is inside the warranty window
    pub valid: bool,
    /// Last covered day
    pub expires_on: NaiveDate,
    /// Days between purchase and `today`
    pub days_elapsed: i64,
}

impl WarrantyStatus {
    /// Days past expiry (zero while covered)
    #[must_use]
    pub fn days_expired(&self, warranty_days: u32) -> i64 {
        (self.days_elapsed - i64::from(warranty_days)).max(0)
    }

    /// User-facing summary
    #[must_use]
    pub fn message(&self, warranty_days: u32) -> String {
        if self.valid {
            format!(
                "Garantía vigente. Vence el {}",
                self.expires_on.format("%d/%m/%Y")
            )
        } else {
            format!(
                "Garantía vencida hace {} días",
                self.days_expired(warranty_days)
            )
        }
    }
}

/// Compute coverage for a purchase made on `purchase_date` under a
/// `warranty_days` window, as seen on `today`.
///
/// # Errors
///
/// Returns [`WarrantyError`] when either input is missing.
pub fn evaluate(
    purchase_date: Option<NaiveDate>,
    warranty_days: Option<u32>,
    today: NaiveDate,
) -> Result<WarrantyStatus, WarrantyError> {
    let purchase_date = purchase_date.ok_or(WarrantyError::MissingPurchaseDate)?;
    let warranty_days = warranty_days.ok_or(WarrantyError::MissingCategory)?;

    let days_elapsed = (today - purchase_date).num_days();
    let expires_on = purchase_date
        .checked_add_days(Days::new(u64::from(warranty_days)))
        .unwrap_or(NaiveDate::MAX);

    Ok(WarrantyStatus {
        valid: days_elapsed <= i64::from(warranty_days),
        expires_on,
        days_elapsed,
    })
}

/// Requirements the ticket does not yet satisfy (empty means complete).
///
/// `has_document` tells whether a document-kind file is attached to the
/// ticket; it stands in for the copy of the invoice.
#[must_use]
pub fn missing_documents(
    ticket: &Ticket,
    category: Option<&Category>,
    has_document: bool,
) -> Vec<String> {
    let mut missing = Vec::new();
    let requires_invoice = category.is_some_and(|c| c.requires_invoice);
    let requires_serial = category.is_some_and(|c| c.requires_serial);

    if requires_invoice && is_blank(ticket.invoice_number.as_deref()) {
        missing.push("Se requiere número de factura".to_string());
    }
    if requires_serial && is_blank(ticket.serial_number.as_deref()) {
        missing.push("Se requiere número de serie".to_string());
    }
    if ticket.purchase_date().is_none() {
        missing.push("Se requiere fecha de compra".to_string());
    }
    if requires_invoice && !has_document {
        missing.push("Se requiere adjuntar copia de la factura".to_string());
    }
    missing
}

fn is_blank(value: Option<&str>) -> bool {
    value.is_none_or(|v| v.trim().is_empty())
}

/// Combined warranty and document check.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Warranty coverage holds
    pub warranty_valid: bool,
    /// No missing documents
    pub documents_complete: bool,
    /// Blocking problems
    pub errors: Vec<String>,
    /// Informational messages
    pub warnings: Vec<String>,
    /// `warranty_valid && documents_complete`
    pub can_be_accepted: bool,
}

impl ValidationReport {
    /// Assemble a report from a warranty verdict and the missing documents.
    ///
    /// A valid warranty message is a warning (informational), an invalid one
    /// is an error.
    #[must_use]
    pub fn new(warranty_valid: bool, warranty_message: String, missing: Vec<String>) -> Self {
        let documents_complete = missing.is_empty();
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        if warranty_valid {
            warnings.push(warranty_message);
        } else {
            errors.push(warranty_message);
        }
        errors.extend(missing);

        Self {
            warranty_valid,
            documents_complete,
            errors,
            warnings,
            can_be_accepted: warranty_valid && documents_complete,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;
    use crate::ticket::TicketDraft;
    use crate::types::UserId;
    use chrono::{TimeZone, Utc};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_expired_warranty_reports_days() {
        let today = date(2025, 1, 1);
        let purchase = today - Days::new(400);

        let status = evaluate(Some(purchase), Some(365), today).unwrap();

        assert!(!status.valid);
        assert_eq!(status.days_elapsed, 400);
        assert!(status.message(365).contains("vencida hace 35 días"));
        assert_eq!(status.expires_on, purchase + Days::new(365));
    }

    #[test]
    fn test_last_day_is_covered() {
        let today = date(2025, 1, 1);
        let purchase = today - Days::new(90);

        let status = evaluate(Some(purchase), Some(90), today).unwrap();

        assert!(status.valid);
        assert_eq!(status.expires_on, today);
        assert_eq!(status.message(90), "Garantía vigente. Vence el 01/01/2025");
    }

    #[test]
    fn test_missing_inputs() {
        let today = date(2025, 1, 1);
        assert_eq!(
            evaluate(None, Some(30), today),
            Err(WarrantyError::MissingPurchaseDate)
        );
        assert_eq!(
            evaluate(Some(today), None, today),
            Err(WarrantyError::MissingCategory)
        );
    }

    #[test]
    fn test_missing_documents() {
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let category = Category::new("Hardware", 365, true, true, now);
        let ticket = Ticket::new(TicketDraft::default(), UserId::new(), now);

        let missing = missing_documents(&ticket, Some(&category), false);
        assert_eq!(
            missing,
            vec![
                "Se requiere número de factura",
                "Se requiere número de serie",
                "Se requiere fecha de compra",
                "Se requiere adjuntar copia de la factura",
            ]
        );

        let draft = TicketDraft {
            invoice_number: Some("F-001".into()),
            serial_number: Some("SN-9".into()),
            purchase_date: Some(date(2024, 12, 1)),
            ..TicketDraft::default()
        };
        let ticket = Ticket::new(draft, UserId::new(), now);
        assert!(missing_documents(&ticket, Some(&category), true).is_empty());
    }

    #[test]
    fn test_report_can_be_accepted() {
        let ok = ValidationReport::new(true, "Garantía vigente".into(), vec![]);
        assert!(ok.can_be_accepted);
        assert_eq!(ok.warnings.len(), 1);

        let missing = ValidationReport::new(true, "Garantía vigente".into(), vec!["x".into()]);
        assert!(!missing.can_be_accepted);
        assert!(!missing.documents_complete);

        let expired = ValidationReport::new(false, "vencida".into(), vec![]);
        assert!(!expired.can_be_accepted);
        assert_eq!(expired.errors, vec!["vencida"]);
    }
}
