//! Application performance monitoring.
//!
//! An [`Application`] is created once per process and hands out a
//! [`Transaction`] per unit of work. Transactions collect what happened
//! (request facts, errors, the status written, custom attributes and timed
//! segments) and are passed to the application's [`Reporter`] when they end.
//!
//! ```rust
//! use tsu_apm::monitor::{AppConfig, Application};
//! use tsu_apm::StatusCode;
//!
//! let app = Application::new(AppConfig {
//!     app_name: "billing".into(),
//!     license: "0123456789abcdef0123456789abcdef01234567".into(),
//!     enabled: true,
//! })
//! .unwrap();
//!
//! let txn = app.start_transaction("nightly-invoice-run");
//! txn.add_attribute("invoices", "1204");
//! txn.set_web_response(StatusCode::OK);
//! txn.end();
//! ```
//!
//! Reporting is pluggable. [`TracingReporter`] (the default) writes each
//! transaction as a `tracing` event; any `Fn(&TransactionData)` works too.

mod application;
mod config;
mod reporter;
mod transaction;
mod web;

pub use application::Application;
pub use config::{AppConfig, ConfigError, LICENSE_LEN, MAX_APP_NAMES};
pub use reporter::{Reporter, TracingReporter};
pub use transaction::{NoticedError, Segment, SegmentRecord, Transaction, TransactionData};
pub use web::{RequestUrl, Transport, WebRequest};

pub(crate) const TRACING_TARGET: &str = "tsu_apm::monitor";
