//! Serde-serializable types matching the remote record store's wire
//! format.
//!
//! These types are separate from domain types to allow clean
//! (de)serialization at the boundary while keeping domain types focused
//! on application needs. Entity payloads reject unknown fields; only the
//! identity probe response tolerates extras.

use crate::api::types::{Client, Invoice, InvoiceItem, InvoiceStatus, User};
use crate::error::{Error, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Wire date format for invoice and due dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

// ============================================================================
// Auth endpoints
// ============================================================================

#[derive(Debug, Serialize)]
pub struct LoginBody<'a> {
  pub email: &'a str,
  pub password: &'a str,
}

#[derive(Debug, Serialize)]
pub struct SignupBody<'a> {
  pub name: &'a str,
  pub email: &'a str,
  pub password: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct TokenResponse {
  #[serde(rename = "authToken")]
  pub auth_token: String,
}

/// Identity probe response. The store appends bookkeeping fields here, so
/// unknown fields are tolerated on this response only.
#[derive(Debug, Deserialize)]
pub struct ApiUser {
  pub name: String,
}

impl From<ApiUser> for User {
  fn from(user: ApiUser) -> Self {
    User { name: user.name }
  }
}

/// Error body shape for non-2xx responses.
#[derive(Debug, Default, Deserialize)]
pub struct ApiErrorBody {
  #[serde(default)]
  pub message: String,
}

// ============================================================================
// Client entity
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApiClient {
  pub id: u64,
  #[serde(default)]
  pub created_at: i64,
  #[serde(default)]
  pub name: String,
  #[serde(default)]
  pub email: String,
  #[serde(default)]
  pub phone: String,
  #[serde(default)]
  pub address: String,
}

impl From<ApiClient> for Client {
  fn from(c: ApiClient) -> Self {
    Client {
      id: c.id,
      name: c.name,
      phone: c.phone,
      email: c.email,
      address: c.address,
      created_at: c.created_at,
    }
  }
}

// ============================================================================
// Invoice entity
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApiInvoice {
  pub id: u64,
  #[serde(default)]
  pub created_at: i64,
  #[serde(default)]
  pub invoice_number: String,
  pub invoice_date: String,
  #[serde(default)]
  pub due_date: Option<String>,
  #[serde(default)]
  pub amount: f64,
  pub status: InvoiceStatus,
  #[serde(default)]
  pub notes: String,
  #[serde(default)]
  pub sent_at: Option<i64>,
  #[serde(default)]
  pub client_id: Option<u64>,
}

impl ApiInvoice {
  pub fn into_domain(self) -> Result<Invoice> {
    Ok(Invoice {
      id: self.id,
      invoice_number: self.invoice_number,
      invoice_date: parse_wire_date(&self.invoice_date)?,
      due_date: parse_optional_wire_date(self.due_date.as_deref())?,
      amount: self.amount,
      status: self.status,
      notes: self.notes,
      // The store writes 0 for "no client chosen".
      client_id: self.client_id.filter(|id| *id != 0),
      created_at: self.created_at,
      sent_at: self.sent_at.filter(|ts| *ts != 0),
    })
  }
}

/// Full invoice record as submitted on create and update. The PATCH on
/// save carries every field, including the recomputed amount.
#[derive(Debug, Serialize)]
pub struct InvoiceBody<'a> {
  pub invoice_number: &'a str,
  pub invoice_date: String,
  pub due_date: Option<String>,
  pub amount: f64,
  pub status: InvoiceStatus,
  pub notes: &'a str,
  pub client_id: Option<u64>,
}

impl<'a> InvoiceBody<'a> {
  pub fn from_domain(invoice: &'a Invoice) -> Self {
    InvoiceBody {
      invoice_number: &invoice.invoice_number,
      invoice_date: invoice.invoice_date.format(DATE_FORMAT).to_string(),
      due_date: invoice.due_date.map(|d| d.format(DATE_FORMAT).to_string()),
      amount: invoice.amount,
      status: invoice.status,
      notes: &invoice.notes,
      client_id: invoice.client_id,
    }
  }
}

/// Detail envelope returned by `GET /invoice/{id}`: the invoice header
/// plus its item collection in one response.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApiInvoiceRecord {
  pub result1: ApiInvoice,
  #[serde(default)]
  pub items: Vec<ApiInvoiceItem>,
}

// ============================================================================
// Invoice item entity
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApiInvoiceItem {
  pub id: u64,
  #[serde(default)]
  pub invoice_id: u64,
  #[serde(default)]
  pub description: String,
  #[serde(default)]
  pub quantity: f64,
  #[serde(default)]
  pub unit_price: f64,
  #[serde(default)]
  pub total: f64,
}

impl From<ApiInvoiceItem> for InvoiceItem {
  fn from(item: ApiInvoiceItem) -> Self {
    InvoiceItem {
      id: item.id,
      invoice_id: item.invoice_id,
      description: item.description,
      quantity: item.quantity,
      unit_price: item.unit_price,
      total: item.total,
    }
  }
}

#[derive(Debug, Serialize)]
pub struct InvoiceItemBody<'a> {
  pub invoice_id: u64,
  pub description: &'a str,
  pub quantity: f64,
  pub unit_price: f64,
  pub total: f64,
}

// ============================================================================
// Helpers
// ============================================================================

/// Parse a wire date. The store usually sends `YYYY-MM-DD` but older
/// records carry full ISO timestamps; only the date part matters here.
pub fn parse_wire_date(raw: &str) -> Result<NaiveDate> {
  let date_part = raw.get(..10).unwrap_or(raw);
  NaiveDate::parse_from_str(date_part, DATE_FORMAT)
    .map_err(|e| Error::Network(format!("malformed date {raw:?} in response: {e}")))
}

/// Absent or empty due dates map to `None` rather than an error; the
/// store tolerates invoices that never got one.
pub fn parse_optional_wire_date(raw: Option<&str>) -> Result<Option<NaiveDate>> {
  match raw {
    None => Ok(None),
    Some(s) if s.trim().is_empty() => Ok(None),
    Some(s) => parse_wire_date(s).map(Some),
  }
}
