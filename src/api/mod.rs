//! Resource Gateways: the boundary objects issuing CRUD calls against
//! the remote record store.
//!
//! The CRUD surface per entity kind is a trait so list and detail
//! controllers stay testable against stubs; [`gateway`] holds the real
//! reqwest-backed implementations and [`Gateways`] wires them up from a
//! [`Config`] with a shared transport and shared invalidation tags.

pub mod gateway;
pub mod http;
pub mod payloads;
pub mod types;

use crate::config::Config;
use crate::error::Result;
use crate::session::SessionToken;

use types::{Client, ClientDraft, Invoice, InvoiceDraft, InvoiceItem, InvoiceItemDraft, User};

/// Auth API group: token issuance and the identity probe.
#[allow(async_fn_in_trait)]
pub trait AuthApi {
  /// Returns the bearer token on success.
  async fn login(&self, email: &str, password: &str) -> Result<String>;
  async fn signup(&self, name: &str, email: &str, password: &str) -> Result<String>;
  async fn me(&self) -> Result<User>;
}

#[allow(async_fn_in_trait)]
pub trait ClientApi {
  async fn list(&self) -> Result<Vec<Client>>;
  async fn create(&self, draft: &ClientDraft) -> Result<Client>;
  async fn update(&self, id: u64, draft: &ClientDraft) -> Result<Client>;
  async fn remove(&self, id: u64) -> Result<()>;
}

#[allow(async_fn_in_trait)]
pub trait InvoiceApi {
  async fn list(&self) -> Result<Vec<Invoice>>;
  /// The detail endpoint returns the invoice header together with its
  /// item collection in one envelope.
  async fn get_record(&self, id: u64) -> Result<(Invoice, Vec<InvoiceItem>)>;
  async fn create(&self, draft: &InvoiceDraft) -> Result<Invoice>;
  /// Full-record PATCH; the caller submits the complete invoice
  /// including the recomputed amount.
  async fn update(&self, invoice: &Invoice) -> Result<Invoice>;
  async fn remove(&self, id: u64) -> Result<()>;
}

#[allow(async_fn_in_trait)]
pub trait InvoiceItemApi {
  /// The stored total is computed here from quantity and unit price;
  /// it is never accepted as independently supplied.
  async fn create(&self, invoice_id: u64, draft: &InvoiceItemDraft) -> Result<InvoiceItem>;
  async fn update(
    &self,
    id: u64,
    invoice_id: u64,
    draft: &InvoiceItemDraft,
  ) -> Result<InvoiceItem>;
  async fn remove(&self, id: u64) -> Result<()>;
}

/// One gateway per entity kind, sharing a transport (and bearer
/// snapshot source) plus the invalidation tag linking invoice items to
/// the invoice detail cache.
#[derive(Clone)]
pub struct Gateways {
  pub auth: gateway::AuthGateway,
  pub clients: gateway::ClientGateway,
  pub invoices: gateway::InvoiceGateway,
  pub invoice_items: gateway::InvoiceItemGateway,
}

impl Gateways {
  pub fn new(config: &Config, token: SessionToken) -> Self {
    let http = http::Http::new(token);

    let invoices = gateway::InvoiceGateway::new(http.clone(), &config.api.data_url);
    // Item mutations invalidate the invoice detail cache: the item
    // collection rides on the invoice record envelope.
    let invoice_items = gateway::InvoiceItemGateway::new(
      http.clone(),
      &config.api.data_url,
      invoices.record_cache(),
    );

    Self {
      auth: gateway::AuthGateway::new(http.clone(), &config.api.auth_url),
      clients: gateway::ClientGateway::new(http, &config.api.data_url),
      invoices,
      invoice_items,
    }
  }
}
