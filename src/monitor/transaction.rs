//! Per-request transactions.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use http::StatusCode;
use parking_lot::Mutex;
use tracing::{debug, warn};

use super::TRACING_TARGET;
use super::application::AppShared;
use super::web::WebRequest;

/// A unit of work being timed, usually one HTTP request.
///
/// A `Transaction` is a handle: clones refer to the same transaction, so the
/// middleware that started it and a handler that looked it up both write to
/// one record. It is reported once, on the first [`end`](Self::end); anything
/// done to it afterwards is ignored.
///
/// Only handles descended from the one [`Application::start_transaction`]
/// returned may end the transaction. Handles published to a request are
/// observers: they can annotate the transaction, and `end` on them does
/// nothing, so the transaction outlives the handler that looked it up.
///
/// [`Application::start_transaction`]: super::Application::start_transaction
#[derive(Clone)]
pub struct Transaction {
    inner: Arc<Inner>,
    owner: bool,
}

struct Inner {
    name: String,
    app: Arc<AppShared>,
    started: Instant,
    ended: AtomicBool,
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    web_request: Option<WebRequest>,
    status: Option<StatusCode>,
    errors: Vec<NoticedError>,
    attributes: BTreeMap<String, String>,
    segments: Vec<SegmentRecord>,
}

/// An error recorded with [`Transaction::notice_error`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NoticedError {
    pub message: String,
    /// Messages of the error's `source()` chain, outermost first.
    pub causes: Vec<String>,
}

impl NoticedError {
    fn new(err: &dyn std::error::Error) -> Self {
        let mut causes = Vec::new();
        let mut source = err.source();
        while let Some(cause) = source {
            causes.push(cause.to_string());
            source = cause.source();
        }
        Self { message: err.to_string(), causes }
    }
}

/// A timed piece of a transaction, as reported.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SegmentRecord {
    pub name: String,
    pub duration: Duration,
}

/// Everything known about a transaction once it has ended.
#[derive(Clone, Debug)]
pub struct TransactionData {
    pub app_name: String,
    pub name: String,
    pub duration: Duration,
    pub web_request: Option<WebRequest>,
    pub status: Option<StatusCode>,
    pub errors: Vec<NoticedError>,
    pub attributes: BTreeMap<String, String>,
    pub segments: Vec<SegmentRecord>,
}

impl Transaction {
    pub(crate) fn start(app: Arc<AppShared>, name: String) -> Self {
        Self {
            inner: Arc::new(Inner {
                name,
                app,
                started: Instant::now(),
                ended: AtomicBool::new(false),
                state: Mutex::new(State::default()),
            }),
            owner: true,
        }
    }

    /// A handle to the same transaction that cannot end it.
    pub(crate) fn observer(&self) -> Self {
        Self { inner: Arc::clone(&self.inner), owner: false }
    }

    pub fn name(&self) -> &str { &self.inner.name }

    pub fn is_ended(&self) -> bool {
        self.inner.ended.load(Ordering::Acquire)
    }

    /// Whether both handles refer to the same transaction.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Marks this as a web transaction and records the request facts.
    pub fn set_web_request(&self, request: WebRequest) {
        self.update("set_web_request", |state| state.web_request = Some(request));
    }

    /// Records the status code written for the response.
    pub fn set_web_response(&self, status: StatusCode) {
        self.update("set_web_response", |state| state.status = Some(status));
    }

    /// Records an error against the transaction. The error is rendered
    /// immediately; the transaction keeps no reference to it.
    pub fn notice_error(&self, err: &dyn std::error::Error) {
        let noticed = NoticedError::new(err);
        self.update("notice_error", |state| state.errors.push(noticed));
    }

    /// Attaches a custom attribute. A later value for the same key wins.
    pub fn add_attribute(&self, key: impl Into<String>, value: impl Into<String>) {
        let (key, value) = (key.into(), value.into());
        self.update("add_attribute", |state| { state.attributes.insert(key, value); });
    }

    /// Starts timing a named piece of work inside this transaction. The
    /// segment is recorded when the returned guard is ended or dropped.
    pub fn start_segment(&self, name: impl Into<String>) -> Segment {
        Segment { txn: self.clone(), name: name.into(), started: Instant::now() }
    }

    /// Ends the transaction and hands it to the application's reporter.
    ///
    /// Only the first call has any effect. A disabled application ends
    /// transactions without reporting them. On an observer handle, such as
    /// one returned by [`apm::from_request`](crate::middleware::apm::from_request),
    /// this only logs a warning.
    pub fn end(&self) {
        if !self.owner {
            warn!(target: TRACING_TARGET, name = %self.inner.name, "end called on an observer handle, ignoring");
            return;
        }
        if self.inner.ended.swap(true, Ordering::AcqRel) {
            return;
        }
        let duration = self.inner.started.elapsed();
        if !self.inner.app.config.enabled {
            debug!(target: TRACING_TARGET, name = %self.inner.name, "monitoring disabled, transaction dropped");
            return;
        }
        let data = {
            let mut state = self.inner.state.lock();
            TransactionData {
                app_name: self.inner.app.config.app_name.clone(),
                name: self.inner.name.clone(),
                duration,
                web_request: state.web_request.take(),
                status: state.status,
                errors: std::mem::take(&mut state.errors),
                attributes: std::mem::take(&mut state.attributes),
                segments: std::mem::take(&mut state.segments),
            }
        };
        self.inner.app.reporter.report(&data);
    }

    fn update(&self, op: &'static str, f: impl FnOnce(&mut State)) {
        let mut state = self.inner.state.lock();
        if self.is_ended() {
            debug!(target: TRACING_TARGET, name = %self.inner.name, op, "transaction already ended, ignoring");
            return;
        }
        f(&mut state);
    }
}

impl fmt::Debug for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("name", &self.inner.name)
            .field("ended", &self.is_ended())
            .field("owner", &self.owner)
            .finish_non_exhaustive()
    }
}

/// A timed piece of work inside a [`Transaction`].
#[derive(Debug)]
#[must_use = "a segment is recorded when it is dropped; binding it to `_` ends it immediately"]
pub struct Segment {
    txn: Transaction,
    name: String,
    started: Instant,
}

impl Segment {
    pub fn end(self) {}
}

impl Drop for Segment {
    fn drop(&mut self) {
        let record = SegmentRecord { name: std::mem::take(&mut self.name), duration: self.started.elapsed() };
        self.txn.update("segment", |state| state.segments.push(record));
    }
}
