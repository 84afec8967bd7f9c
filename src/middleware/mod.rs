//! Middleware layer.
//!
//! Middleware intercepts requests and responses and is the right place for
//! cross-cutting concerns: APM transactions, metrics, request-id injection,
//! and authentication-header inspection.
//!
//! A middleware receives the request and a [`Next`] handle to the rest of the
//! chain. It may inspect or extend the request, call [`Next::run`] (or not),
//! and inspect the outcome before handing it back up:
//!
//! ```rust,no_run
//! use tsu_apm::middleware::{self, Next};
//! use tsu_apm::{Request, Router};
//!
//! async fn log_status(req: Request, next: Next) -> tsu_apm::HandlerResult {
//!     let path = req.path().to_owned();
//!     let res = next.run(req).await;
//!     if let Ok(res) = &res {
//!         tracing::info!(%path, status = %res.status_code(), "served");
//!     }
//!     res
//! }
//!
//! let app = Router::new().layer(middleware::from_fn(log_status));
//! ```
//!
//! Built-in middleware:
//! - [`apm`] — one monitoring transaction per request

use std::future::Future;
use std::sync::Arc;

use crate::handler::{BoxFuture, BoxedHandler};
use crate::request::Request;
use crate::response::{HandlerResult, IntoHandlerResult};

pub mod apm;

/// A request interceptor installed with [`Router::layer`](crate::Router::layer).
///
/// Errors returned by [`Next::run`] should be passed up unchanged unless the
/// middleware exists to translate them; the server renders whatever reaches
/// the top.
pub trait Middleware: Send + Sync + 'static {
    fn call(&self, req: Request, next: Next) -> BoxFuture<HandlerResult>;
}

pub(crate) type BoxedMiddleware = Arc<dyn Middleware>;

/// The remainder of the chain after the current middleware.
///
/// Owns `Arc`s to the stack and the endpoint, so it can move into the
/// middleware's future without borrowing the router.
#[derive(Clone)]
pub struct Next {
    stack: Arc<[BoxedMiddleware]>,
    index: usize,
    endpoint: BoxedHandler,
}

impl Next {
    pub(crate) fn new(stack: Arc<[BoxedMiddleware]>, endpoint: BoxedHandler) -> Self {
        Self { stack, index: 0, endpoint }
    }

    /// Runs the rest of the chain: the next middleware, or the handler once
    /// every middleware has been entered.
    pub fn run(self, req: Request) -> BoxFuture<HandlerResult> {
        match self.stack.get(self.index).cloned() {
            Some(middleware) => {
                let next = Self { index: self.index + 1, ..self };
                middleware.call(req, next)
            }
            None => self.endpoint.call(req),
        }
    }
}

impl std::fmt::Debug for Next {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Next")
            .field("remaining", &(self.stack.len() - self.index))
            .finish_non_exhaustive()
    }
}

/// Turns an `async fn(Request, Next) -> impl IntoHandlerResult` into a
/// [`Middleware`].
pub fn from_fn<F, Fut, R>(f: F) -> FromFn<F>
where
    F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoHandlerResult + Send + 'static,
{
    FromFn(f)
}

/// Middleware built by [`from_fn`].
#[derive(Clone, Copy, Debug)]
pub struct FromFn<F>(F);

impl<F, Fut, R> Middleware for FromFn<F>
where
    F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoHandlerResult + Send + 'static,
{
    fn call(&self, req: Request, next: Next) -> BoxFuture<HandlerResult> {
        let fut = (self.0)(req, next);
        Box::pin(async move { fut.await.into_handler_result() })
    }
}
