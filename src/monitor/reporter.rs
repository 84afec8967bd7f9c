//! Where finished transactions go.

use tracing::{info, warn};

use super::TRACING_TARGET;
use super::transaction::TransactionData;

/// Receives every transaction an enabled application ends.
///
/// Called synchronously from [`Transaction::end`](super::Transaction::end),
/// on the request's task. Implementations that ship data somewhere should
/// queue it and return.
pub trait Reporter: Send + Sync + 'static {
    fn report(&self, txn: &TransactionData);
}

impl<F> Reporter for F
where
    F: Fn(&TransactionData) + Send + Sync + 'static,
{
    fn report(&self, txn: &TransactionData) {
        self(txn)
    }
}

/// Emits one structured `tracing` event per transaction.
///
/// Transactions that noticed an error are logged at `WARN`, the rest at
/// `INFO`, so a subscriber filter on this target doubles as an access log.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn report(&self, txn: &TransactionData) {
        let status = txn.status.map(|s| s.as_u16()).unwrap_or_default();
        let duration_ms = txn.duration.as_secs_f64() * 1000.0;
        let url = txn.web_request.as_ref().map(|w| w.url.to_string()).unwrap_or_default();
        let transport = txn.web_request.as_ref().map(|w| w.transport.as_str()).unwrap_or_default();

        match txn.errors.first() {
            Some(first) => warn!(
                target: TRACING_TARGET,
                app = %txn.app_name,
                name = %txn.name,
                status,
                duration_ms,
                %url,
                transport,
                errors = txn.errors.len(),
                error = %first.message,
                "transaction"
            ),
            None => info!(
                target: TRACING_TARGET,
                app = %txn.app_name,
                name = %txn.name,
                status,
                duration_ms,
                %url,
                transport,
                segments = txn.segments.len(),
                "transaction"
            ),
        }
    }
}
