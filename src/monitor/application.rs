//! The process-wide monitoring application.

use std::fmt;
use std::sync::Arc;

use tracing::info;

use super::TRACING_TARGET;
use super::config::{AppConfig, ConfigError};
use super::reporter::{Reporter, TracingReporter};
use super::transaction::Transaction;

/// A connection to the monitoring backend, created once at startup.
///
/// Cloning is cheap and every clone is the same application, so one value can
/// be handed to each piece of middleware that needs it. Safe to use from any
/// number of concurrent requests.
#[derive(Clone)]
pub struct Application {
    shared: Arc<AppShared>,
}

/// What every transaction of an application needs to reach back to.
pub(crate) struct AppShared {
    pub(crate) config: AppConfig,
    pub(crate) reporter: Box<dyn Reporter>,
}

impl Application {
    /// Creates an application that reports through [`TracingReporter`].
    pub fn new(config: AppConfig) -> Result<Self, ConfigError> {
        Self::with_reporter(config, TracingReporter)
    }

    /// Creates an application that hands finished transactions to `reporter`.
    pub fn with_reporter(config: AppConfig, reporter: impl Reporter) -> Result<Self, ConfigError> {
        config.validate()?;
        info!(
            target: TRACING_TARGET,
            app_name = %config.app_name,
            enabled = config.enabled,
            "monitoring application created"
        );
        Ok(Self { shared: Arc::new(AppShared { config, reporter: Box::new(reporter) }) })
    }

    pub fn app_name(&self) -> &str { &self.shared.config.app_name }
    pub fn enabled(&self) -> bool { self.shared.config.enabled }

    /// Begins timing a new transaction. The transaction reports itself when
    /// [`Transaction::end`] is called.
    pub fn start_transaction(&self, name: impl Into<String>) -> Transaction {
        Transaction::start(Arc::clone(&self.shared), name.into())
    }

    /// Whether both handles refer to the same application.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

impl fmt::Debug for Application {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Application")
            .field("config", &self.shared.config)
            .finish_non_exhaustive()
    }
}
