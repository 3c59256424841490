//! Detail Aggregator: one invoice record, its item collection, and the
//! client roster for name lookup, fetched in parallel and edited in
//! place.
//!
//! Item mutations land on the server first and are then patched into
//! the local collection without reloading, so concurrent header edits
//! survive. The denormalized invoice amount is only reconciled on
//! [`InvoiceDetail::save`], which recomputes it from the item totals and
//! submits the full record.

use crate::api::types::{
  invoice_amount, Client, Invoice, InvoiceItem, InvoiceItemDraft, InvoicePatch,
};
use crate::api::{ClientApi, InvoiceApi, InvoiceItemApi};
use crate::error::{Error, Result};
use crate::notify::{Notifier, NotifyKind};
use std::sync::Arc;

pub struct InvoiceDetail<I, T, C> {
  invoices: I,
  items_api: T,
  invoice: Invoice,
  items: Vec<InvoiceItem>,
  clients: Vec<Client>,
  read_only: bool,
  saving: bool,
  notifier: Arc<dyn Notifier>,
  // Kept alive for reloads even though the roster is fetched up front.
  clients_api: C,
}

impl<I, T, C> InvoiceDetail<I, T, C>
where
  I: InvoiceApi,
  T: InvoiceItemApi,
  C: ClientApi,
{
  /// Fetch the invoice record and the client roster in parallel.
  pub async fn load(
    invoices: I,
    items_api: T,
    clients_api: C,
    notifier: Arc<dyn Notifier>,
    id: u64,
  ) -> Result<Self> {
    let (record, clients) = tokio::join!(invoices.get_record(id), clients_api.list());
    let (invoice, items) = record?;
    let clients = clients?;

    Ok(Self {
      invoices,
      items_api,
      invoice,
      items,
      clients,
      read_only: true,
      saving: false,
      notifier,
      clients_api,
    })
  }

  pub fn invoice(&self) -> &Invoice {
    &self.invoice
  }

  pub fn items(&self) -> &[InvoiceItem] {
    &self.items
  }

  pub fn clients(&self) -> &[Client] {
    &self.clients
  }

  /// The billed client's name, if the invoice names one that is still on
  /// the roster.
  pub fn client_name(&self) -> Option<&str> {
    let client_id = self.invoice.client_id?;
    self
      .clients
      .iter()
      .find(|c| c.id == client_id)
      .map(|c| c.name.as_str())
  }

  /// Live sum of the item totals. Diverges from `invoice().amount` while
  /// unsaved item edits are outstanding.
  pub fn displayed_total(&self) -> f64 {
    invoice_amount(&self.items)
  }

  /// True after a load or a successful save, false after any edit.
  pub fn is_read_only(&self) -> bool {
    self.read_only
  }

  /// Merge header edits into the local record. Nothing is submitted
  /// until [`save`](Self::save).
  pub fn edit_fields(&mut self, patch: InvoicePatch) {
    patch.apply_to(&mut self.invoice);
    self.read_only = false;
  }

  pub async fn add_item(&mut self, draft: InvoiceItemDraft) -> Result<InvoiceItem> {
    let result = self.items_api.create(self.invoice.id, &draft).await;
    match result {
      Ok(item) => {
        self.items.push(item.clone());
        self.read_only = false;
        Ok(item)
      }
      Err(e) => {
        self.report_failure("Error during adding item!", &e);
        Err(e)
      }
    }
  }

  pub async fn edit_item(&mut self, id: u64, draft: InvoiceItemDraft) -> Result<()> {
    if !self.items.iter().any(|i| i.id == id) {
      return Err(Error::validation("item", "no such item on this invoice"));
    }
    let result = self.items_api.update(id, self.invoice.id, &draft).await;
    match result {
      Ok(updated) => {
        for item in &mut self.items {
          if item.id == id {
            *item = updated.clone();
          }
        }
        self.read_only = false;
        Ok(())
      }
      Err(e) => {
        self.report_failure("Error during editing item!", &e);
        Err(e)
      }
    }
  }

  pub async fn remove_item(&mut self, id: u64) -> Result<()> {
    let result = self.items_api.remove(id).await;
    match result {
      Ok(()) => {
        self.items.retain(|i| i.id != id);
        self.read_only = false;
        Ok(())
      }
      Err(e) => {
        self.report_failure("Error during deleting item!", &e);
        Err(e)
      }
    }
  }

  /// Reconcile and persist: the amount is recomputed from the current
  /// item totals and the full record is submitted. On failure the local
  /// edits stay in place for retry.
  pub async fn save(&mut self) -> Result<()> {
    if self.saving {
      return Err(Error::SubmissionInFlight);
    }
    self.saving = true;

    let mut submitted = self.invoice.clone();
    submitted.amount = invoice_amount(&self.items);
    let result = self.invoices.update(&submitted).await;
    self.saving = false;

    match result {
      Ok(updated) => {
        self.invoice = updated;
        self.read_only = true;
        self
          .notifier
          .notify(NotifyKind::Success, "The invoice is successfully updated!");
        Ok(())
      }
      Err(e) => {
        self.report_failure("Error during editing invoice!", &e);
        Err(e)
      }
    }
  }

  /// Refetch the record from the server, dropping unsaved edits. The
  /// roster is refetched too in case the billed client was renamed.
  pub async fn reload(&mut self) -> Result<()> {
    let (record, clients) = tokio::join!(
      self.invoices.get_record(self.invoice.id),
      self.clients_api.list()
    );
    let (invoice, items) = record?;
    self.invoice = invoice;
    self.items = items;
    self.clients = clients?;
    self.read_only = true;
    Ok(())
  }

  fn report_failure(&self, message: &str, err: &Error) {
    if !matches!(err, Error::Validation { .. }) {
      self.notifier.notify(NotifyKind::Error, message);
    }
    tracing::warn!(invoice_id = self.invoice.id, error = %err, "invoice detail mutation failed");
  }
}
