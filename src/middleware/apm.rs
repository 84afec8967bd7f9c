//! One monitoring transaction per request.
//!
//! ```rust,no_run
//! use tsu_apm::middleware::apm;
//! use tsu_apm::{Method, Request, Router, Server};
//!
//! # async fn get_user(_: Request) -> &'static str { "" }
//! #[tokio::main]
//! async fn main() {
//!     let app = Router::new()
//!         .on(Method::GET, "/users/{id}", get_user)
//!         .layer(apm::new(apm::Config {
//!             license: std::env::var("TSU_APM_LICENSE").unwrap_or_default(),
//!             app_name: "users-api".into(),
//!             enabled: true,
//!             ..apm::Config::default()
//!         }));
//!
//!     Server::bind("0.0.0.0:3000").serve(app).await.unwrap();
//! }
//! ```
//!
//! Each request gets a transaction named `"<METHOD> <PATH>"` carrying the
//! host, method, transport and URL. Handlers reach it with [`from_request`]
//! to add attributes or time segments. When the chain returns, the response
//! status (or, for an error, the status the error maps to) is recorded, the
//! error is noticed, and the transaction ends. The handler's result is passed
//! up unchanged.

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use http::request::Parts;
use http::{Method, StatusCode};
use tracing::{debug, info};

use crate::error::HttpError;
use crate::handler::BoxFuture;
use crate::middleware::{Middleware, Next};
use crate::monitor::{AppConfig, Application, ConfigError, RequestUrl, Transaction, Transport, WebRequest};
use crate::request::Request;
use crate::response::{DEFAULT_STATUS, HandlerResult};

const TRACING_TARGET: &str = "tsu_apm::middleware::apm";

/// Reported app name when the configuration leaves it empty.
pub const DEFAULT_APP_NAME: &str = "fiber-api";

pub const LICENSE_ENV: &str = "TSU_APM_LICENSE";
pub const APP_NAME_ENV: &str = "TSU_APM_APP_NAME";
pub const ENABLED_ENV: &str = "TSU_APM_ENABLED";

/// Maps an error returned by the handler chain to the status code reported
/// for the request.
///
/// It receives the request head as the chain saw it: method, URI, headers,
/// and extensions including the request's transaction.
pub type ErrorStatusCodeHandler =
    Arc<dyn Fn(&Parts, &(dyn StdError + Send + Sync + 'static)) -> StatusCode + Send + Sync>;

/// Settings for [`new`].
#[derive(Clone)]
pub struct Config {
    /// Required unless `application` is set.
    pub license: String,
    /// Defaults to [`DEFAULT_APP_NAME`] when empty.
    pub app_name: String,
    /// When `false`, transactions are still created but never reported.
    pub enabled: bool,
    /// An application created elsewhere. When set, `license`, `app_name` and
    /// `enabled` are ignored.
    pub application: Option<Application>,
    /// Defaults to [`default_error_status_code`].
    pub error_status_code_handler: Option<ErrorStatusCodeHandler>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            license: String::new(),
            app_name: DEFAULT_APP_NAME.to_owned(),
            enabled: false,
            application: None,
            error_status_code_handler: None,
        }
    }
}

impl Config {
    /// Reads `TSU_APM_LICENSE`, `TSU_APM_APP_NAME` and `TSU_APM_ENABLED`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env), reading from `lookup` instead of the
    /// process environment. Unset and empty values take their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let enabled = match lookup(ENABLED_ENV) {
            Some(value) => parse_bool(&value)
                .ok_or(ConfigError::InvalidEnv { key: ENABLED_ENV, value })?,
            None => false,
        };
        Ok(Self {
            license: lookup(LICENSE_ENV).unwrap_or_default(),
            app_name: lookup(APP_NAME_ENV)
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| DEFAULT_APP_NAME.to_owned()),
            enabled,
            ..Self::default()
        })
    }

    /// Sets the error-to-status mapping.
    pub fn error_status_code_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&Parts, &(dyn StdError + Send + Sync + 'static)) -> StatusCode + Send + Sync + 'static,
    {
        self.error_status_code_handler = Some(Arc::new(handler));
        self
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("license", &"<redacted>")
            .field("app_name", &self.app_name)
            .field("enabled", &self.enabled)
            .field("application", &self.application)
            .field("error_status_code_handler", &self.error_status_code_handler.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "" | "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

// ── Construction ──────────────────────────────────────────────────────────────

/// Builds the middleware.
///
/// # Panics
///
/// Panics if no `application` is given and the license is empty, or if the
/// monitoring application cannot be created from the configuration. A
/// service that was meant to be monitored does not start unmonitored.
pub fn new(config: Config) -> Apm {
    try_new(config).unwrap_or_else(|e| panic!("{e}"))
}

/// Builds the middleware, returning configuration problems instead of
/// panicking.
pub fn try_new(config: Config) -> Result<Apm, ConfigError> {
    let error_status_code_handler: ErrorStatusCodeHandler = match config.error_status_code_handler {
        Some(handler) => handler,
        None => Arc::new(default_error_status_code),
    };

    let application = match config.application {
        Some(application) => application,
        None => {
            if config.license.is_empty() {
                return Err(ConfigError::MissingLicense);
            }
            let app_name = if config.app_name.is_empty() {
                DEFAULT_APP_NAME.to_owned()
            } else {
                config.app_name
            };
            Application::new(AppConfig { app_name, license: config.license, enabled: config.enabled })?
        }
    };

    info!(
        target: TRACING_TARGET,
        app_name = application.app_name(),
        enabled = application.enabled(),
        "apm middleware ready"
    );
    Ok(Apm { application, error_status_code_handler })
}

// ── Middleware ────────────────────────────────────────────────────────────────

/// The APM middleware. Install it with [`Router::layer`](crate::Router::layer).
#[derive(Clone)]
pub struct Apm {
    application: Application,
    error_status_code_handler: ErrorStatusCodeHandler,
}

impl Apm {
    /// The application transactions are started on.
    pub fn application(&self) -> &Application { &self.application }

    async fn observe(self, mut req: Request, next: Next) -> HandlerResult {
        let txn = self.application.start_transaction(transaction_name(req.method(), req.path()));
        let _end = EndOnDrop(txn.clone());

        let web_request = web_request(&req);
        debug!(target: TRACING_TARGET, name = txn.name(), transport = %web_request.transport, "transaction started");
        txn.set_web_request(web_request);
        req.extensions_mut().insert(txn.observer());
        let head = req.head().clone();

        let result = next.run(req).await;

        let status = match &result {
            Ok(res) => res.status_code(),
            Err(err) => {
                let status = (self.error_status_code_handler)(&head, &**err);
                txn.notice_error(&**err);
                status
            }
        };
        txn.set_web_response(status);
        result
    }
}

impl Middleware for Apm {
    fn call(&self, req: Request, next: Next) -> BoxFuture<HandlerResult> {
        Box::pin(self.clone().observe(req, next))
    }
}

impl fmt::Debug for Apm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Apm")
            .field("application", &self.application)
            .finish_non_exhaustive()
    }
}

/// Ends the transaction however the request's future stops: returning,
/// panicking in a handler, or being dropped mid-flight.
struct EndOnDrop(Transaction);

impl Drop for EndOnDrop {
    fn drop(&mut self) {
        self.0.end();
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Returns the transaction [`Apm`] started for this request, if it passed
/// through one.
///
/// The handle is an observer: it can add attributes, segments and errors,
/// but the transaction ends only when the middleware is done with it.
pub fn from_request(req: &Request) -> Option<Transaction> {
    req.extensions().get::<Transaction>().cloned()
}

/// The default [`ErrorStatusCodeHandler`].
///
/// An [`HttpError`] reports its own status. Any other error reports the
/// status staged on the response, [`DEFAULT_STATUS`], since the handler
/// never produced one.
pub fn default_error_status_code(
    _req: &Parts,
    err: &(dyn StdError + Send + Sync + 'static),
) -> StatusCode {
    err.downcast_ref::<HttpError>().map_or(DEFAULT_STATUS, HttpError::status)
}

fn transaction_name(method: &Method, path: &str) -> String {
    format!("{method} {path}")
}

fn web_request(req: &Request) -> WebRequest {
    let scheme = req.scheme();
    WebRequest {
        host: req.host().to_owned(),
        method: req.method().clone(),
        transport: Transport::from_scheme(scheme),
        url: RequestUrl {
            scheme: scheme.to_owned(),
            host: req.host().to_owned(),
            path: req.path().to_owned(),
            raw_query: req.query().to_owned(),
        },
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::BoxError;
    use crate::monitor::LICENSE_LEN;

    fn license() -> String {
        "0123456789abcdef0123456789abcdef01234567".to_owned()
    }

    fn some_head() -> Parts {
        http::Request::builder().uri("/orders/7").body(()).unwrap().into_parts().0
    }

    #[test]
    fn transaction_name_is_method_then_path() {
        assert_eq!(transaction_name(&Method::GET, "/users/42"), "GET /users/42");
        assert_eq!(transaction_name(&Method::DELETE, "/"), "DELETE /");
    }

    #[test]
    fn web_request_is_built_from_request_fields() {
        let req: Request = http::Request::builder()
            .method(Method::POST)
            .uri("/orders?dry_run=1")
            .header("host", "shop.example.com")
            .header("x-forwarded-proto", "https")
            .body(Bytes::new())
            .unwrap()
            .into();

        let web = web_request(&req);
        assert_eq!(web.host, "shop.example.com");
        assert_eq!(web.method, Method::POST);
        assert_eq!(web.transport, Transport::Https);
        assert_eq!(web.url.to_string(), "https://shop.example.com/orders?dry_run=1");
    }

    #[test]
    fn default_mapping_uses_carried_status() {
        let err: BoxError = HttpError::from(StatusCode::NOT_FOUND).into();
        assert_eq!(default_error_status_code(&some_head(), &*err), StatusCode::NOT_FOUND);
    }

    #[test]
    fn default_mapping_falls_back_to_staged_status() {
        let err: BoxError = std::io::Error::other("disk full").into();
        assert_eq!(default_error_status_code(&some_head(), &*err), DEFAULT_STATUS);
    }

    #[test]
    fn empty_license_without_application_is_rejected() {
        let err = try_new(Config::default()).unwrap_err();
        assert!(matches!(err, ConfigError::MissingLicense));
    }

    #[test]
    #[should_panic(expected = "license can not be empty")]
    fn new_panics_without_license() {
        let _ = new(Config { enabled: true, ..Config::default() });
    }

    #[test]
    fn application_initialisation_failures_surface() {
        let config = Config { license: "too-short".into(), enabled: true, ..Config::default() };
        assert!(matches!(try_new(config), Err(ConfigError::InvalidLicense { len: 9 })));
    }

    #[test]
    fn disabled_config_is_still_validated() {
        let config = Config { license: "short".into(), app_name: "a;b;c;d;e".into(), ..Config::default() };
        assert!(matches!(try_new(config), Err(ConfigError::InvalidLicense { len: 5 })));

        let config = Config { license: license(), app_name: "a;b;c;d;e".into(), ..Config::default() };
        assert!(matches!(try_new(config), Err(ConfigError::TooManyAppNames { count: 5 })));
    }

    #[test]
    fn injected_application_needs_no_license() {
        let application = Application::new(AppConfig {
            app_name: "injected".into(),
            license: "k".repeat(LICENSE_LEN),
            enabled: true,
        })
        .unwrap();

        let apm = try_new(Config { application: Some(application.clone()), ..Config::default() }).unwrap();
        assert!(apm.application().ptr_eq(&application));
        assert_eq!(apm.application().app_name(), "injected");
    }

    #[test]
    fn empty_app_name_takes_default() {
        let config = Config { license: license(), app_name: String::new(), ..Config::default() };
        let apm = try_new(config).unwrap();
        assert_eq!(apm.application().app_name(), DEFAULT_APP_NAME);
        assert!(!apm.application().enabled());
    }

    #[test]
    fn config_reads_lookup() {
        let config = Config::from_lookup(|key| match key {
            LICENSE_ENV => Some(license()),
            APP_NAME_ENV => Some("checkout".into()),
            ENABLED_ENV => Some("Yes".into()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.license, license());
        assert_eq!(config.app_name, "checkout");
        assert!(config.enabled);
    }

    #[test]
    fn config_lookup_defaults_and_rejects_garbage() {
        let config = Config::from_lookup(|_| None).unwrap();
        assert_eq!(config.app_name, DEFAULT_APP_NAME);
        assert!(!config.enabled);

        let err = Config::from_lookup(|key| (key == ENABLED_ENV).then(|| "maybe".to_owned())).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { key: ENABLED_ENV, .. }));
    }

    #[test]
    fn debug_output_hides_license() {
        let config = Config { license: license(), ..Config::default() };
        assert!(!format!("{config:?}").contains(&license()));
    }
}
