//! Domain types for the four entity kinds plus the drafts submitted to
//! the gateways.
//!
//! Wire-facing serde types live in [`super::payloads`]; these types are
//! what the rest of the crate computes with.

use crate::error::{Error, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// A record with a server-assigned numeric id. List controllers key their
/// optimistic patches on this.
pub trait Record: Clone {
  fn id(&self) -> u64;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
  pub id: u64,
  pub name: String,
  pub phone: String,
  pub email: String,
  pub address: String,
  /// Epoch milliseconds, server-assigned.
  pub created_at: i64,
}

impl Record for Client {
  fn id(&self) -> u64 {
    self.id
  }
}

/// Invoice lifecycle status. The wire strings are fixed by the remote
/// store (`In payment` and `Timed out` contain spaces).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvoiceStatus {
  Invoiced,
  #[serde(rename = "In payment")]
  InPayment,
  Paid,
  #[serde(rename = "Timed out")]
  TimedOut,
}

impl InvoiceStatus {
  pub const ALL: [InvoiceStatus; 4] = [
    InvoiceStatus::Invoiced,
    InvoiceStatus::InPayment,
    InvoiceStatus::Paid,
    InvoiceStatus::TimedOut,
  ];

  pub const fn as_str(self) -> &'static str {
    match self {
      Self::Invoiced => "Invoiced",
      Self::InPayment => "In payment",
      Self::Paid => "Paid",
      Self::TimedOut => "Timed out",
    }
  }
}

impl fmt::Display for InvoiceStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for InvoiceStatus {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    match s {
      "Invoiced" => Ok(Self::Invoiced),
      "In payment" => Ok(Self::InPayment),
      "Paid" => Ok(Self::Paid),
      "Timed out" => Ok(Self::TimedOut),
      other => Err(Error::validation(
        "status",
        format!("unknown invoice status: {other}"),
      )),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
  pub id: u64,
  pub invoice_number: String,
  pub invoice_date: NaiveDate,
  /// The store tolerates invoices without a due date; see the filter
  /// engine for the (asymmetric) treatment of such records.
  pub due_date: Option<NaiveDate>,
  /// Denormalized sum of item totals, persisted independently. Can
  /// transiently diverge from the items; the detail aggregator recomputes
  /// it on save.
  pub amount: f64,
  pub status: InvoiceStatus,
  pub notes: String,
  /// Weak reference to a client (lookup only, no ownership).
  pub client_id: Option<u64>,
  pub created_at: i64,
  pub sent_at: Option<i64>,
}

impl Record for Invoice {
  fn id(&self) -> u64 {
    self.id
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceItem {
  pub id: u64,
  /// Strong relationship: every item belongs to exactly one invoice.
  pub invoice_id: u64,
  pub description: String,
  pub quantity: f64,
  pub unit_price: f64,
  /// Always `quantity * unit_price`; never accepted as supplied.
  pub total: f64,
}

impl Record for InvoiceItem {
  fn id(&self) -> u64 {
    self.id
  }
}

/// The authenticated user record from the identity probe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
  pub name: String,
}

/// Line total, recomputed on every item create/update.
pub fn line_total(quantity: f64, unit_price: f64) -> f64 {
  quantity * unit_price
}

/// Invoice amount as the sum of current item totals.
pub fn invoice_amount(items: &[InvoiceItem]) -> f64 {
  items.iter().map(|item| item.total).sum()
}

// ---------------------------------------------------------------------------
// Drafts: user-entered fields, validated before any request is sent.
// The required-field rules mirror the entry forms.
// ---------------------------------------------------------------------------

fn require(field: &'static str, value: &str) -> Result<()> {
  if value.trim().is_empty() {
    return Err(Error::validation(field, "required"));
  }
  Ok(())
}

fn require_number(field: &'static str, value: f64) -> Result<()> {
  if !value.is_finite() || value < 0.0 {
    return Err(Error::validation(field, "must be a non-negative number"));
  }
  Ok(())
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ClientDraft {
  pub name: String,
  pub phone: String,
  pub email: String,
  pub address: String,
}

impl ClientDraft {
  pub fn validate(&self) -> Result<()> {
    require("name", &self.name)?;
    require("phone", &self.phone)?;
    require("email", &self.email)?;
    Ok(())
  }
}

#[derive(Debug, Clone, Default)]
pub struct InvoiceDraft {
  pub invoice_number: String,
  /// Defaults to today when unset.
  pub invoice_date: Option<NaiveDate>,
  pub due_date: Option<NaiveDate>,
  /// Initial amount from the entry form. Superseded by the recomputed
  /// sum of item totals on the first detail save.
  pub amount: f64,
  pub status: Option<InvoiceStatus>,
  pub notes: String,
  pub client_id: Option<u64>,
}

impl InvoiceDraft {
  pub fn validate(&self) -> Result<()> {
    require("invoice_number", &self.invoice_number)?;
    if self.due_date.is_none() {
      return Err(Error::validation("due_date", "required"));
    }
    if self.status.is_none() {
      return Err(Error::validation("status", "required"));
    }
    require_number("amount", self.amount)?;
    Ok(())
  }
}

#[derive(Debug, Clone, Default)]
pub struct InvoiceItemDraft {
  pub description: String,
  pub quantity: f64,
  pub unit_price: f64,
}

impl InvoiceItemDraft {
  pub fn validate(&self) -> Result<()> {
    require("description", &self.description)?;
    require_number("quantity", self.quantity)?;
    require_number("unit_price", self.unit_price)?;
    Ok(())
  }
}

/// Partial edit of invoice header fields. Only `Some` fields are applied;
/// `amount` is deliberately absent (the aggregator recomputes it on save).
#[derive(Debug, Clone, Default)]
pub struct InvoicePatch {
  pub invoice_number: Option<String>,
  pub invoice_date: Option<NaiveDate>,
  pub due_date: Option<NaiveDate>,
  pub status: Option<InvoiceStatus>,
  pub notes: Option<String>,
  pub client_id: Option<u64>,
}

impl InvoicePatch {
  pub fn apply_to(&self, invoice: &mut Invoice) {
    if let Some(number) = &self.invoice_number {
      invoice.invoice_number = number.clone();
    }
    if let Some(date) = self.invoice_date {
      invoice.invoice_date = date;
    }
    if let Some(date) = self.due_date {
      invoice.due_date = Some(date);
    }
    if let Some(status) = self.status {
      invoice.status = status;
    }
    if let Some(notes) = &self.notes {
      invoice.notes = notes.clone();
    }
    if let Some(client_id) = self.client_id {
      invoice.client_id = Some(client_id);
    }
  }
}
