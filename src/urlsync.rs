//! Filter/URL Synchronizer: bidirectional mapping between a
//! [`FilterSpec`] and its flat query-string form, so filter state can be
//! restored from a shared link.
//!
//! Absent fields are omitted entirely (never empty-stringed) to keep the
//! serialized form canonical; `decode(encode(spec)) == spec` for every
//! representable spec. Shells are expected to *replace* (not push) the
//! navigation entry when the query changes.

use crate::api::types::InvoiceStatus;
use crate::error::{Error, Result};
use crate::filter::FilterSpec;
use chrono::NaiveDate;
use url::form_urlencoded;

const KEY_CLIENT: &str = "selectedClient";
const KEY_STATUS: &str = "selectedStatus";
const KEY_INVOICE_START: &str = "invoiceDateRangeStart";
const KEY_INVOICE_END: &str = "invoiceDateRangeEnd";
const KEY_DUE_START: &str = "dueDateRangeStart";
const KEY_DUE_END: &str = "dueDateRangeEnd";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Serialize a filter spec to a query string (no leading `?`).
pub fn encode(spec: &FilterSpec) -> String {
  let mut query = form_urlencoded::Serializer::new(String::new());

  if let Some(client_id) = spec.client_id {
    query.append_pair(KEY_CLIENT, &client_id.to_string());
  }
  if let Some(status) = spec.status {
    query.append_pair(KEY_STATUS, status.as_str());
  }
  if let Some((start, end)) = spec.invoice_date_range {
    query.append_pair(KEY_INVOICE_START, &start.format(DATE_FORMAT).to_string());
    query.append_pair(KEY_INVOICE_END, &end.format(DATE_FORMAT).to_string());
  }
  if let Some((start, end)) = spec.due_date_range {
    query.append_pair(KEY_DUE_START, &start.format(DATE_FORMAT).to_string());
    query.append_pair(KEY_DUE_END, &end.format(DATE_FORMAT).to_string());
  }

  query.finish()
}

/// Parse a query string (with or without a leading `?`) back into a
/// filter spec. Missing keys map to `None`; present keys must parse.
/// Unknown keys are ignored — shared links may carry unrelated params.
pub fn decode(query: &str) -> Result<FilterSpec> {
  let query = query.strip_prefix('?').unwrap_or(query);

  let mut client_id = None;
  let mut status = None;
  let mut invoice_start = None;
  let mut invoice_end = None;
  let mut due_start = None;
  let mut due_end = None;

  for (key, value) in form_urlencoded::parse(query.as_bytes()) {
    match key.as_ref() {
      KEY_CLIENT => {
        let id: u64 = value.parse().map_err(|_| {
          Error::validation(KEY_CLIENT, format!("not a client id: {value:?}"))
        })?;
        client_id = Some(id);
      }
      KEY_STATUS => status = Some(value.parse::<InvoiceStatus>()?),
      KEY_INVOICE_START => invoice_start = Some(parse_date(KEY_INVOICE_START, &value)?),
      KEY_INVOICE_END => invoice_end = Some(parse_date(KEY_INVOICE_END, &value)?),
      KEY_DUE_START => due_start = Some(parse_date(KEY_DUE_START, &value)?),
      KEY_DUE_END => due_end = Some(parse_date(KEY_DUE_END, &value)?),
      _ => {}
    }
  }

  Ok(FilterSpec {
    client_id,
    status,
    invoice_date_range: pair_range(KEY_INVOICE_START, invoice_start, invoice_end)?,
    due_date_range: pair_range(KEY_DUE_START, due_start, due_end)?,
  })
}

fn parse_date(key: &'static str, value: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(value, DATE_FORMAT)
    .map_err(|_| Error::validation(key, format!("not an ISO date: {value:?}")))
}

/// A canonical serialized form always carries both bounds of a range; a
/// lone start or end is rejected rather than guessed at.
fn pair_range(
  key: &'static str,
  start: Option<NaiveDate>,
  end: Option<NaiveDate>,
) -> Result<Option<(NaiveDate, NaiveDate)>> {
  match (start, end) {
    (Some(start), Some(end)) => Ok(Some((start, end))),
    (None, None) => Ok(None),
    _ => Err(Error::validation(key, "range requires both start and end")),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use proptest::prelude::*;

  fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("date")
  }

  #[test]
  fn absent_fields_are_omitted_entirely() {
    let spec = FilterSpec {
      status: Some(InvoiceStatus::Paid),
      ..Default::default()
    };
    assert_eq!(encode(&spec), "selectedStatus=Paid");
  }

  #[test]
  fn empty_spec_encodes_to_an_empty_query() {
    assert_eq!(encode(&FilterSpec::default()), "");
    assert_eq!(decode("").expect("decode"), FilterSpec::default());
  }

  #[test]
  fn spaced_status_values_survive_the_trip() {
    let spec = FilterSpec {
      status: Some(InvoiceStatus::InPayment),
      ..Default::default()
    };
    let query = encode(&spec);
    assert_eq!(query, "selectedStatus=In+payment");
    assert_eq!(decode(&query).expect("decode"), spec);
  }

  #[test]
  fn full_spec_round_trips() {
    let spec = FilterSpec {
      client_id: Some(7),
      status: Some(InvoiceStatus::TimedOut),
      invoice_date_range: Some((date(2024, 1, 1), date(2024, 1, 31))),
      due_date_range: Some((date(2024, 2, 1), date(2024, 2, 28))),
    };
    assert_eq!(decode(&encode(&spec)).expect("decode"), spec);
  }

  #[test]
  fn leading_question_mark_is_tolerated() {
    let spec = decode("?selectedClient=7").expect("decode");
    assert_eq!(spec.client_id, Some(7));
  }

  #[test]
  fn unknown_keys_are_ignored() {
    let spec = decode("selectedClient=7&utm_source=mail").expect("decode");
    assert_eq!(spec.client_id, Some(7));
  }

  #[test]
  fn lone_range_bound_is_rejected() {
    let err = decode("invoiceDateRangeStart=2024-01-01").unwrap_err();
    assert!(matches!(
      err,
      Error::Validation { field: "invoiceDateRangeStart", .. }
    ));
  }

  #[test]
  fn garbage_values_are_rejected() {
    assert!(decode("selectedClient=seven").is_err());
    assert!(decode("selectedStatus=Cancelled").is_err());
    assert!(decode("dueDateRangeStart=tomorrow&dueDateRangeEnd=2024-01-01").is_err());
  }

  fn arb_date() -> impl Strategy<Value = NaiveDate> {
    (2000i32..2100, 1u32..=12, 1u32..=28)
      .prop_map(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d).expect("date"))
  }

  fn arb_range() -> impl Strategy<Value = Option<(NaiveDate, NaiveDate)>> {
    proptest::option::of((arb_date(), arb_date()))
  }

  fn arb_spec() -> impl Strategy<Value = FilterSpec> {
    (
      proptest::option::of(1u64..10_000),
      proptest::option::of(proptest::sample::select(&InvoiceStatus::ALL[..])),
      arb_range(),
      arb_range(),
    )
      .prop_map(|(client_id, status, invoice_date_range, due_date_range)| FilterSpec {
        client_id,
        status,
        invoice_date_range,
        due_date_range,
      })
  }

  proptest! {
    #[test]
    fn every_representable_spec_round_trips(spec in arb_spec()) {
      let query = encode(&spec);
      prop_assert_eq!(decode(&query).expect("decode"), spec);
    }
  }
}
