//! List View Controllers for the invoice and client lists.
//!
//! Each controller exclusively owns a canonical collection (the last
//! full fetch, ascending by id) and a displayed projection, applies
//! optimistic patches after successful mutations (no refetch), and
//! serializes mutation submissions through a per-instance in-flight
//! guard. Outcomes are reported through the notify side channel.

use crate::api::types::{Client, ClientDraft, Invoice, InvoiceDraft, InvoicePatch, Record};
use crate::api::{ClientApi, InvoiceApi};
use crate::error::{Error, Result};
use crate::filter::{self, FilterSpec};
use crate::notify::{Notifier, NotifyKind};
use crate::urlsync;
use std::sync::Arc;

/// Where invoice-create navigation goes. The shell routes; the
/// controller only announces the destination.
pub trait Navigator: Send + Sync {
  fn goto_invoice(&self, id: u64);
}

/// Navigator for shells without routing (and for tests that don't care).
#[derive(Debug, Default)]
pub struct NoopNavigator;

impl Navigator for NoopNavigator {
  fn goto_invoice(&self, _id: u64) {}
}

/// Per-list submission flag: a second submit while one is pending is
/// rejected client-side. Deliberately a plain boolean guard, not a
/// cancellation token.
#[derive(Debug, Default)]
struct SubmitGuard {
  in_flight: bool,
}

impl SubmitGuard {
  fn try_begin(&mut self) -> Result<()> {
    if self.in_flight {
      return Err(Error::SubmissionInFlight);
    }
    self.in_flight = true;
    Ok(())
  }

  fn finish(&mut self) {
    self.in_flight = false;
  }
}

/// Canonical + displayed collections with optimistic patches.
#[derive(Debug)]
pub struct ListState<E: Record> {
  canonical: Vec<E>,
  displayed: Vec<E>,
}

impl<E: Record> ListState<E> {
  fn new() -> Self {
    Self {
      canonical: Vec::new(),
      displayed: Vec::new(),
    }
  }

  /// Replace both collections from a full fetch, ascending by id.
  fn reset(&mut self, mut records: Vec<E>) {
    records.sort_by_key(Record::id);
    self.canonical.clone_from(&records);
    self.displayed = records;
  }

  pub fn canonical(&self) -> &[E] {
    &self.canonical
  }

  pub fn displayed(&self) -> &[E] {
    &self.displayed
  }

  fn set_displayed(&mut self, records: Vec<E>) {
    self.displayed = records;
  }

  /// Optimistic create: the new record lands in both collections.
  fn insert(&mut self, record: E) {
    debug_assert!(!self.canonical.iter().any(|r| r.id() == record.id()));
    self.canonical.push(record.clone());
    self.displayed.push(record);
  }

  /// Optimistic update: replace the matching record by id in both
  /// collections.
  fn replace(&mut self, record: E) {
    for existing in self.canonical.iter_mut().chain(self.displayed.iter_mut()) {
      if existing.id() == record.id() {
        *existing = record.clone();
      }
    }
  }

  /// Optimistic delete: drop the matching record from both collections.
  fn remove(&mut self, id: u64) {
    self.canonical.retain(|r| r.id() != id);
    self.displayed.retain(|r| r.id() != id);
  }
}

// ============================================================================
// Client list
// ============================================================================

pub struct ClientListController<G> {
  gateway: G,
  state: ListState<Client>,
  submit: SubmitGuard,
  notifier: Arc<dyn Notifier>,
}

impl<G: ClientApi> ClientListController<G> {
  pub fn new(gateway: G, notifier: Arc<dyn Notifier>) -> Self {
    Self {
      gateway,
      state: ListState::new(),
      submit: SubmitGuard::default(),
      notifier,
    }
  }

  /// Full fetch into the canonical collection. The client list has no
  /// filters, so the displayed collection tracks it exactly.
  pub async fn load(&mut self) -> Result<()> {
    let clients = self.gateway.list().await?;
    self.state.reset(clients);
    Ok(())
  }

  pub fn state(&self) -> &ListState<Client> {
    &self.state
  }

  pub fn clients(&self) -> &[Client] {
    self.state.displayed()
  }

  pub async fn create(&mut self, draft: ClientDraft) -> Result<Client> {
    self.submit.try_begin()?;
    let result = self.gateway.create(&draft).await;
    self.submit.finish();

    match result {
      Ok(client) => {
        self
          .notifier
          .notify(NotifyKind::Success, "The new client has been successfully added!");
        self.state.insert(client.clone());
        Ok(client)
      }
      Err(e) => {
        self.report_failure("Error when adding the client!", &e);
        Err(e)
      }
    }
  }

  pub async fn update(&mut self, id: u64, draft: ClientDraft) -> Result<Client> {
    self.submit.try_begin()?;
    let result = self.gateway.update(id, &draft).await;
    self.submit.finish();

    match result {
      Ok(client) => {
        self
          .notifier
          .notify(NotifyKind::Success, "The client is successfully updated!");
        self.state.replace(client.clone());
        Ok(client)
      }
      Err(e) => {
        self.report_failure("Error when updating the client!", &e);
        Err(e)
      }
    }
  }

  pub async fn remove(&mut self, id: u64) -> Result<()> {
    self.submit.try_begin()?;
    let result = self.gateway.remove(id).await;
    self.submit.finish();

    match result {
      Ok(()) => {
        self
          .notifier
          .notify(NotifyKind::Success, "Client is successfully deleted!");
        self.state.remove(id);
        Ok(())
      }
      Err(e) => {
        self.report_failure("Error when removing the client!", &e);
        Err(e)
      }
    }
  }

  fn report_failure(&self, message: &str, err: &Error) {
    // Validation failures render inline next to the input; only remote
    // and transport failures reach the toast channel.
    if !matches!(err, Error::Validation { .. }) {
      self.notifier.notify(NotifyKind::Error, message);
    }
    tracing::warn!(error = %err, "client mutation failed");
  }
}

// ============================================================================
// Invoice list
// ============================================================================

pub struct InvoiceListController<G> {
  gateway: G,
  state: ListState<Invoice>,
  spec: FilterSpec,
  query: String,
  submit: SubmitGuard,
  notifier: Arc<dyn Notifier>,
  navigator: Arc<dyn Navigator>,
}

impl<G: InvoiceApi> InvoiceListController<G> {
  pub fn new(gateway: G, notifier: Arc<dyn Notifier>, navigator: Arc<dyn Navigator>) -> Self {
    Self {
      gateway,
      state: ListState::new(),
      spec: FilterSpec::default(),
      query: String::new(),
      submit: SubmitGuard::default(),
      notifier,
      navigator,
    }
  }

  /// Full fetch; the current filter is re-applied to the fresh canonical
  /// collection.
  pub async fn load(&mut self) -> Result<()> {
    let invoices = self.gateway.list().await?;
    self.state.reset(invoices);
    self.reapply();
    Ok(())
  }

  pub fn state(&self) -> &ListState<Invoice> {
    &self.state
  }

  pub fn invoices(&self) -> &[Invoice] {
    self.state.displayed()
  }

  pub fn filter_spec(&self) -> &FilterSpec {
    &self.spec
  }

  /// The serialized form of the current filter. Shells replace (not
  /// push) their navigation entry with this whenever it changes.
  pub fn query(&self) -> &str {
    &self.query
  }

  /// Change the filter: recompute the displayed projection and
  /// re-serialize the query string.
  pub fn set_filter(&mut self, spec: FilterSpec) {
    self.spec = spec;
    self.reapply();
  }

  pub fn clear_filter(&mut self) {
    self.set_filter(FilterSpec::default());
  }

  /// Restore filter state from a shared link's query string.
  pub fn restore_from_query(&mut self, query: &str) -> Result<()> {
    let spec = urlsync::decode(query)?;
    self.set_filter(spec);
    Ok(())
  }

  fn reapply(&mut self) {
    let displayed = if self.spec.is_empty() {
      self.state.canonical().to_vec()
    } else {
      filter::apply(self.state.canonical(), &self.spec)
    };
    self.state.set_displayed(displayed);
    self.query = urlsync::encode(&self.spec);
  }

  /// Create an invoice and navigate to its detail view.
  pub async fn create(&mut self, draft: InvoiceDraft) -> Result<Invoice> {
    self.submit.try_begin()?;
    let result = self.gateway.create(&draft).await;
    self.submit.finish();

    match result {
      Ok(invoice) => {
        self
          .notifier
          .notify(NotifyKind::Success, "The new invoice has been successfully added!");
        self.state.insert(invoice.clone());
        self.navigator.goto_invoice(invoice.id);
        Ok(invoice)
      }
      Err(e) => {
        self.report_failure("Error when adding the invoice!", &e);
        Err(e)
      }
    }
  }

  /// Edit header fields of a listed invoice: the patch is merged onto
  /// the canonical record and the full record is submitted.
  pub async fn update(&mut self, id: u64, patch: InvoicePatch) -> Result<Invoice> {
    let Some(existing) = self.state.canonical().iter().find(|i| i.id() == id) else {
      return Err(Error::validation("invoice", "no such invoice in the list"));
    };
    let mut merged = existing.clone();
    patch.apply_to(&mut merged);

    self.submit.try_begin()?;
    let result = self.gateway.update(&merged).await;
    self.submit.finish();

    match result {
      Ok(invoice) => {
        self
          .notifier
          .notify(NotifyKind::Success, "The invoice is successfully updated!");
        self.state.replace(invoice.clone());
        Ok(invoice)
      }
      Err(e) => {
        self.report_failure("Error when updating the invoice!", &e);
        Err(e)
      }
    }
  }

  pub async fn remove(&mut self, id: u64) -> Result<()> {
    self.submit.try_begin()?;
    let result = self.gateway.remove(id).await;
    self.submit.finish();

    match result {
      Ok(()) => {
        self
          .notifier
          .notify(NotifyKind::Success, "Invoice successfully deleted!");
        self.state.remove(id);
        Ok(())
      }
      Err(e) => {
        self.report_failure("Error when removing the invoice!", &e);
        Err(e)
      }
    }
  }

  fn report_failure(&self, message: &str, err: &Error) {
    if !matches!(err, Error::Validation { .. }) {
      self.notifier.notify(NotifyKind::Error, message);
    }
    tracing::warn!(error = %err, "invoice mutation failed");
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::types::{InvoiceItem, InvoiceStatus};
  use crate::notify::RecordingNotifier;
  use chrono::NaiveDate;
  use std::sync::Mutex;

  fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("date")
  }

  fn invoice(id: u64) -> Invoice {
    Invoice {
      id,
      invoice_number: format!("INV-{id}"),
      invoice_date: date(2024, 3, 1),
      due_date: Some(date(2024, 4, 1)),
      amount: 0.0,
      status: InvoiceStatus::Invoiced,
      notes: String::new(),
      client_id: Some(7),
      created_at: 0,
      sent_at: None,
    }
  }

  #[derive(Default)]
  struct RecordingNavigator {
    visited: Mutex<Vec<u64>>,
  }

  impl Navigator for RecordingNavigator {
    fn goto_invoice(&self, id: u64) {
      self
        .visited
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
        .push(id);
    }
  }

  /// Stub invoice gateway: list is fixed, mutations echo their input,
  /// `fail_mutations` turns every mutation into a remote error.
  #[derive(Clone, Default)]
  struct StubInvoices {
    fail_mutations: bool,
  }

  impl InvoiceApi for StubInvoices {
    async fn list(&self) -> Result<Vec<Invoice>> {
      // Deliberately unsorted; the controller sorts.
      Ok(vec![invoice(2), invoice(1)])
    }

    async fn get_record(&self, id: u64) -> Result<(Invoice, Vec<InvoiceItem>)> {
      Ok((invoice(id), Vec::new()))
    }

    async fn create(&self, draft: &InvoiceDraft) -> Result<Invoice> {
      draft.validate()?;
      if self.fail_mutations {
        return Err(Error::Remote { status: 500, message: "boom".into() });
      }
      let mut created = invoice(3);
      created.invoice_number.clone_from(&draft.invoice_number);
      Ok(created)
    }

    async fn update(&self, invoice: &Invoice) -> Result<Invoice> {
      if self.fail_mutations {
        return Err(Error::Remote { status: 500, message: "boom".into() });
      }
      Ok(invoice.clone())
    }

    async fn remove(&self, _id: u64) -> Result<()> {
      if self.fail_mutations {
        return Err(Error::Remote { status: 500, message: "boom".into() });
      }
      Ok(())
    }
  }

  fn draft(number: &str) -> InvoiceDraft {
    InvoiceDraft {
      invoice_number: number.into(),
      due_date: Some(date(2024, 5, 1)),
      status: Some(InvoiceStatus::Invoiced),
      ..Default::default()
    }
  }

  fn controller(
    gateway: StubInvoices,
  ) -> (
    InvoiceListController<StubInvoices>,
    Arc<RecordingNotifier>,
    Arc<RecordingNavigator>,
  ) {
    let notifier = Arc::new(RecordingNotifier::default());
    let navigator = Arc::new(RecordingNavigator::default());
    let controller = InvoiceListController::new(
      gateway,
      Arc::clone(&notifier) as Arc<dyn Notifier>,
      Arc::clone(&navigator) as Arc<dyn Navigator>,
    );
    (controller, notifier, navigator)
  }

  #[tokio::test]
  async fn load_sorts_canonical_by_ascending_id() {
    let (mut ctl, _, _) = controller(StubInvoices::default());
    ctl.load().await.expect("load");

    let ids: Vec<u64> = ctl.state().canonical().iter().map(|i| i.id).collect();
    assert_eq!(ids, vec![1, 2]);
    assert_eq!(ctl.invoices().len(), 2);
  }

  #[tokio::test]
  async fn create_patches_both_collections_and_navigates() {
    let (mut ctl, notifier, navigator) = controller(StubInvoices::default());
    ctl.load().await.expect("load");

    let created = ctl.create(draft("INV-3")).await.expect("create");

    assert_eq!(ctl.state().canonical().len(), 3);
    assert_eq!(ctl.state().displayed().len(), 3);
    assert_eq!(
      ctl
        .state()
        .canonical()
        .iter()
        .filter(|i| i.id == created.id)
        .count(),
      1
    );
    assert_eq!(
      navigator
        .visited
        .lock()
        .expect("lock")
        .as_slice(),
      &[created.id]
    );
    assert_eq!(notifier.events().len(), 1);
    assert_eq!(notifier.events()[0].0, NotifyKind::Success);
  }

  #[tokio::test]
  async fn update_replaces_by_id_without_changing_length() {
    let (mut ctl, _, _) = controller(StubInvoices::default());
    ctl.load().await.expect("load");

    let patch = InvoicePatch {
      status: Some(InvoiceStatus::Paid),
      ..Default::default()
    };
    ctl.update(1, patch).await.expect("update");

    assert_eq!(ctl.state().canonical().len(), 2);
    let updated = ctl
      .state()
      .canonical()
      .iter()
      .find(|i| i.id == 1)
      .expect("still present");
    assert_eq!(updated.status, InvoiceStatus::Paid);
    // The merge preserved untouched fields.
    assert_eq!(updated.invoice_number, "INV-1");
  }

  #[tokio::test]
  async fn remove_drops_exactly_one_record() {
    let (mut ctl, notifier, _) = controller(StubInvoices::default());
    ctl.load().await.expect("load");

    ctl.remove(2).await.expect("remove");

    assert_eq!(ctl.state().canonical().len(), 1);
    assert!(ctl.state().canonical().iter().all(|i| i.id != 2));
    assert!(ctl.invoices().iter().all(|i| i.id != 2));
    assert_eq!(notifier.events()[0].1, "Invoice successfully deleted!");
  }

  #[tokio::test]
  async fn failed_mutation_leaves_collections_untouched_and_notifies() {
    let (mut ctl, notifier, navigator) = controller(StubInvoices {
      fail_mutations: true,
    });
    ctl.load().await.expect("load");

    let err = ctl.create(draft("INV-3")).await.unwrap_err();
    assert!(matches!(err, Error::Remote { status: 500, .. }));

    assert_eq!(ctl.state().canonical().len(), 2);
    assert!(navigator.visited.lock().expect("lock").is_empty());
    assert_eq!(notifier.events()[0].0, NotifyKind::Error);
  }

  #[tokio::test]
  async fn validation_failure_is_inline_not_toasted() {
    let (mut ctl, notifier, _) = controller(StubInvoices::default());
    ctl.load().await.expect("load");

    // Missing due date fails draft validation inside the gateway.
    let incomplete = InvoiceDraft {
      invoice_number: "INV-9".into(),
      ..Default::default()
    };
    let err = ctl.create(incomplete).await.unwrap_err();
    assert!(matches!(err, Error::Validation { .. }));
    assert!(notifier.events().is_empty());
    assert_eq!(ctl.state().canonical().len(), 2);
  }

  #[tokio::test]
  async fn filter_recomputes_displayed_and_query() {
    let (mut ctl, _, _) = controller(StubInvoices::default());
    ctl.load().await.expect("load");

    let mut spec = FilterSpec::default();
    spec.status = Some(InvoiceStatus::Invoiced);
    ctl.set_filter(spec);
    assert_eq!(ctl.query(), "selectedStatus=Invoiced");
    assert_eq!(ctl.invoices().len(), 2);

    let mut spec = FilterSpec::default();
    spec.client_id = Some(999);
    ctl.set_filter(spec);
    assert_eq!(ctl.query(), "selectedClient=999");
    assert!(ctl.invoices().is_empty());
    // The canonical collection is untouched by filtering.
    assert_eq!(ctl.state().canonical().len(), 2);

    ctl.clear_filter();
    assert_eq!(ctl.query(), "");
    assert_eq!(ctl.invoices().len(), 2);
  }

  #[tokio::test]
  async fn restore_from_query_rebuilds_spec_and_projection() {
    let (mut ctl, _, _) = controller(StubInvoices::default());
    ctl.load().await.expect("load");

    ctl
      .restore_from_query("?selectedClient=7&selectedStatus=Invoiced")
      .expect("restore");

    assert_eq!(ctl.filter_spec().client_id, Some(7));
    assert_eq!(ctl.filter_spec().status, Some(InvoiceStatus::Invoiced));
    // Both stub invoices belong to client 7 and are Invoiced.
    assert_eq!(ctl.invoices().len(), 2);
    assert_eq!(ctl.query(), "selectedClient=7&selectedStatus=Invoiced");

    assert!(ctl.restore_from_query("selectedClient=seven").is_err());
  }

  #[test]
  fn submit_guard_rejects_double_submit() {
    let mut guard = SubmitGuard::default();
    guard.try_begin().expect("first");
    assert!(matches!(
      guard.try_begin().unwrap_err(),
      Error::SubmissionInFlight
    ));
    guard.finish();
    guard.try_begin().expect("after finish");
  }
}
