//! Resource Gateways, one per entity kind, generic over the transport.
//!
//! Reads go through a [`RequestCache`] keyed by `(entityKind, args)` so
//! concurrent identical fetches collapse onto one request; each mutation
//! declares its invalidation by evicting the cached reads of the entity
//! kinds it affects.

use crate::api::http::{Http, Transport};
use crate::api::payloads::{
  ApiClient, ApiInvoice, ApiInvoiceItem, ApiInvoiceRecord, ApiUser, InvoiceBody, InvoiceItemBody,
  LoginBody, SignupBody, TokenResponse, DATE_FORMAT,
};
use crate::api::types::{
  line_total, Client, ClientDraft, Invoice, InvoiceDraft, InvoiceItem, InvoiceItemDraft, User,
};
use crate::api::{AuthApi, ClientApi, InvoiceApi, InvoiceItemApi};
use crate::cache::RequestCache;
use crate::error::{Error, Result};

fn join(base: &str, path: &str) -> String {
  format!(
    "{}/{}",
    base.trim_end_matches('/'),
    path.trim_start_matches('/')
  )
}

// ============================================================================
// Auth
// ============================================================================

#[derive(Clone)]
pub struct AuthGateway<H = Http> {
  http: H,
  base: String,
}

impl<H: Transport> AuthGateway<H> {
  pub fn new(http: H, auth_url: &str) -> Self {
    Self {
      http,
      base: auth_url.trim_end_matches('/').to_string(),
    }
  }
}

impl<H: Transport> AuthApi for AuthGateway<H> {
  async fn login(&self, email: &str, password: &str) -> Result<String> {
    let response: TokenResponse = self
      .http
      .post(&join(&self.base, "login"), &LoginBody { email, password })
      .await?;
    Ok(response.auth_token)
  }

  async fn signup(&self, name: &str, email: &str, password: &str) -> Result<String> {
    let response: TokenResponse = self
      .http
      .post(
        &join(&self.base, "signup"),
        &SignupBody { name, email, password },
      )
      .await?;
    Ok(response.auth_token)
  }

  async fn me(&self) -> Result<User> {
    let user: ApiUser = self.http.get(&join(&self.base, "me")).await?;
    Ok(user.into())
  }
}

// ============================================================================
// Client
// ============================================================================

#[derive(Clone)]
pub struct ClientGateway<H = Http> {
  http: H,
  base: String,
  list_cache: RequestCache<Vec<Client>>,
}

impl<H: Transport> ClientGateway<H> {
  pub fn new(http: H, data_url: &str) -> Self {
    Self {
      http,
      base: join(data_url, "client"),
      list_cache: RequestCache::new(),
    }
  }
}

impl<H: Transport> ClientApi for ClientGateway<H> {
  async fn list(&self) -> Result<Vec<Client>> {
    let http = self.http.clone();
    let url = self.base.clone();
    self
      .list_cache
      .fetch("client:list", move || async move {
        let clients: Vec<ApiClient> = http.get(&url).await?;
        Ok(clients.into_iter().map(Client::from).collect())
      })
      .await
  }

  async fn create(&self, draft: &ClientDraft) -> Result<Client> {
    draft.validate()?;
    let client: ApiClient = self.http.post(&self.base, draft).await?;
    self.list_cache.invalidate_all().await;
    Ok(client.into())
  }

  async fn update(&self, id: u64, draft: &ClientDraft) -> Result<Client> {
    draft.validate()?;
    let client: ApiClient = self
      .http
      .patch(&join(&self.base, &id.to_string()), draft)
      .await?;
    self.list_cache.invalidate_all().await;
    Ok(client.into())
  }

  async fn remove(&self, id: u64) -> Result<()> {
    self.http.delete(&join(&self.base, &id.to_string())).await?;
    self.list_cache.invalidate_all().await;
    Ok(())
  }
}

// ============================================================================
// Invoice
// ============================================================================

#[derive(Clone)]
pub struct InvoiceGateway<H = Http> {
  http: H,
  base: String,
  list_cache: RequestCache<Vec<Invoice>>,
  record_cache: RequestCache<(Invoice, Vec<InvoiceItem>)>,
}

impl<H: Transport> InvoiceGateway<H> {
  pub fn new(http: H, data_url: &str) -> Self {
    Self {
      http,
      base: join(data_url, "invoice"),
      list_cache: RequestCache::new(),
      record_cache: RequestCache::new(),
    }
  }

  /// Handle to the detail cache, shared with the item gateway so item
  /// mutations can invalidate cached invoice records.
  pub(crate) fn record_cache(&self) -> RequestCache<(Invoice, Vec<InvoiceItem>)> {
    self.record_cache.clone()
  }

  async fn invalidate_reads(&self) {
    self.list_cache.invalidate_all().await;
    self.record_cache.invalidate_all().await;
  }
}

impl<H: Transport> InvoiceApi for InvoiceGateway<H> {
  async fn list(&self) -> Result<Vec<Invoice>> {
    let http = self.http.clone();
    let url = self.base.clone();
    self
      .list_cache
      .fetch("invoice:list", move || async move {
        let invoices: Vec<ApiInvoice> = http.get(&url).await?;
        invoices.into_iter().map(ApiInvoice::into_domain).collect()
      })
      .await
  }

  async fn get_record(&self, id: u64) -> Result<(Invoice, Vec<InvoiceItem>)> {
    let http = self.http.clone();
    let url = join(&self.base, &id.to_string());
    self
      .record_cache
      .fetch(&format!("invoice:get:{id}"), move || async move {
        let record: ApiInvoiceRecord = http.get(&url).await?;
        let invoice = record.result1.into_domain()?;
        let items = record.items.into_iter().map(InvoiceItem::from).collect();
        Ok((invoice, items))
      })
      .await
  }

  async fn create(&self, draft: &InvoiceDraft) -> Result<Invoice> {
    draft.validate()?;
    let status = draft
      .status
      .ok_or_else(|| Error::validation("status", "required"))?;
    let invoice_date = draft
      .invoice_date
      .unwrap_or_else(|| chrono::Local::now().date_naive());

    let body = InvoiceBody {
      invoice_number: &draft.invoice_number,
      invoice_date: invoice_date.format(DATE_FORMAT).to_string(),
      due_date: draft.due_date.map(|d| d.format(DATE_FORMAT).to_string()),
      amount: draft.amount,
      status,
      notes: &draft.notes,
      client_id: draft.client_id,
    };

    let invoice: ApiInvoice = self.http.post(&self.base, &body).await?;
    self.invalidate_reads().await;
    invoice.into_domain()
  }

  async fn update(&self, invoice: &Invoice) -> Result<Invoice> {
    let body = InvoiceBody::from_domain(invoice);
    let updated: ApiInvoice = self
      .http
      .patch(&join(&self.base, &invoice.id.to_string()), &body)
      .await?;
    self.invalidate_reads().await;
    updated.into_domain()
  }

  async fn remove(&self, id: u64) -> Result<()> {
    self.http.delete(&join(&self.base, &id.to_string())).await?;
    self.invalidate_reads().await;
    Ok(())
  }
}

// ============================================================================
// Invoice item
// ============================================================================

#[derive(Clone)]
pub struct InvoiceItemGateway<H = Http> {
  http: H,
  base: String,
  /// Shared with the invoice gateway: item mutations invalidate cached
  /// invoice records, since the item collection rides on that envelope.
  record_cache: RequestCache<(Invoice, Vec<InvoiceItem>)>,
}

impl<H: Transport> InvoiceItemGateway<H> {
  pub fn new(
    http: H,
    data_url: &str,
    record_cache: RequestCache<(Invoice, Vec<InvoiceItem>)>,
  ) -> Self {
    Self {
      http,
      base: join(data_url, "invoice_item"),
      record_cache,
    }
  }
}

impl<H: Transport> InvoiceItemApi for InvoiceItemGateway<H> {
  async fn create(&self, invoice_id: u64, draft: &InvoiceItemDraft) -> Result<InvoiceItem> {
    draft.validate()?;
    let body = InvoiceItemBody {
      invoice_id,
      description: &draft.description,
      quantity: draft.quantity,
      unit_price: draft.unit_price,
      total: line_total(draft.quantity, draft.unit_price),
    };
    let item: ApiInvoiceItem = self.http.post(&self.base, &body).await?;
    self.record_cache.invalidate_all().await;
    Ok(item.into())
  }

  async fn update(
    &self,
    id: u64,
    invoice_id: u64,
    draft: &InvoiceItemDraft,
  ) -> Result<InvoiceItem> {
    draft.validate()?;
    let body = InvoiceItemBody {
      invoice_id,
      description: &draft.description,
      quantity: draft.quantity,
      unit_price: draft.unit_price,
      total: line_total(draft.quantity, draft.unit_price),
    };
    let item: ApiInvoiceItem = self
      .http
      .patch(&join(&self.base, &id.to_string()), &body)
      .await?;
    self.record_cache.invalidate_all().await;
    Ok(item.into())
  }

  async fn remove(&self, id: u64) -> Result<()> {
    self.http.delete(&join(&self.base, &id.to_string())).await?;
    self.record_cache.invalidate_all().await;
    Ok(())
  }
}
