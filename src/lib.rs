//! Client-side data synchronization layer for the SmartInvoice service.
//!
//! Sits between a UI shell and the remote REST record store: typed
//! resource gateways with request-deduplicating read caches, a session
//! guard over bearer-token auth, list controllers with optimistic
//! patches, a detail aggregator that reconciles the denormalized
//! invoice amount on save, and a filter engine whose state round-trips
//! through a URL query string.

pub mod api;
pub mod cache;
pub mod config;
pub mod detail;
pub mod error;
pub mod filter;
pub mod list;
pub mod notify;
pub mod query;
pub mod session;
pub mod urlsync;

pub use api::types::{Client, Invoice, InvoiceItem, InvoiceStatus, User};
pub use api::Gateways;
pub use config::Config;
pub use detail::InvoiceDetail;
pub use error::{Error, Result};
pub use filter::FilterSpec;
pub use list::{ClientListController, InvoiceListController};
pub use notify::{Notifier, NotifyKind};
pub use query::{Query, QueryState};
pub use session::{AuthState, RouteDecision, SessionGuard, SessionToken, TokenStore};
