//! Filter Engine: pure predicate evaluation over an invoice collection.
//!
//! The predicate is the logical AND of independently optional
//! sub-predicates; absent fields pass everything through, with one
//! deliberate exception on the due date (see [`matches`]).

use crate::api::types::{Invoice, InvoiceStatus};
use chrono::NaiveDate;

/// The user-chosen filter state. Absent fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSpec {
  pub client_id: Option<u64>,
  pub status: Option<InvoiceStatus>,
  /// Inclusive on both ends.
  pub invoice_date_range: Option<(NaiveDate, NaiveDate)>,
  /// Inclusive on both ends.
  pub due_date_range: Option<(NaiveDate, NaiveDate)>,
}

impl FilterSpec {
  pub fn is_empty(&self) -> bool {
    self.client_id.is_none()
      && self.status.is_none()
      && self.invoice_date_range.is_none()
      && self.due_date_range.is_none()
  }
}

/// Return the subset of `invoices` matching `spec`. Never mutates its
/// input; O(n) per application.
pub fn apply(invoices: &[Invoice], spec: &FilterSpec) -> Vec<Invoice> {
  invoices
    .iter()
    .filter(|invoice| matches(invoice, spec))
    .cloned()
    .collect()
}

/// Single-invoice predicate.
///
/// Note the asymmetry on the due date: even with no due-date range set,
/// an invoice without a due date fails the predicate. This is carried
/// production behavior, not an oversight here; see the regression test
/// below before "fixing" it.
pub fn matches(invoice: &Invoice, spec: &FilterSpec) -> bool {
  let client_ok = spec
    .client_id
    .map_or(true, |id| invoice.client_id == Some(id));

  let status_ok = spec.status.map_or(true, |status| invoice.status == status);

  let invoice_date_ok = spec
    .invoice_date_range
    .map_or(true, |(start, end)| {
      start <= invoice.invoice_date && invoice.invoice_date <= end
    });

  let due_date_ok = match spec.due_date_range {
    None => invoice.due_date.is_some(),
    Some((start, end)) => invoice
      .due_date
      .is_some_and(|due| start <= due && due <= end),
  };

  client_ok && status_ok && invoice_date_ok && due_date_ok
}
