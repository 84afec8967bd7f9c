//! Radix-tree request router.
//!
//! One tree per HTTP method. O(path-length) lookup. You register a path, you
//! get a handler; middleware registered with [`Router::layer`] wraps every
//! request, matched or not.

use std::collections::HashMap;
use std::sync::Arc;

use http::Method;
use matchit::Router as MatchitRouter;

use crate::handler::{BoxedHandler, Handler, MethodNotAllowed, NotFound};
use crate::middleware::{BoxedMiddleware, Middleware, Next};
use crate::request::Request;
use crate::response::HandlerResult;

/// The application router.
///
/// Build it once at startup; pass it to [`Server::serve`](crate::Server::serve).
/// Each [`Router::on`] and [`Router::layer`] call returns `self` so
/// registrations chain naturally.
pub struct Router {
    routes: HashMap<Method, MatchitRouter<BoxedHandler>>,
    stack: Arc<[BoxedMiddleware]>,
}

impl Router {
    pub fn new() -> Self {
        Self { routes: HashMap::new(), stack: Arc::new([]) }
    }

    /// Register a handler for a method + path pair. Returns `self` for chaining.
    ///
    /// Path parameters use `{name}` syntax — `req.param("name")` retrieves them:
    ///
    /// ```rust,no_run
    /// # use tsu_apm::{Method, Request, Response, Router};
    /// # async fn get_user(_: Request) -> Response { Response::text("") }
    /// # async fn create_user(_: Request) -> Response { Response::text("") }
    /// # async fn delete_user(_: Request) -> Response { Response::text("") }
    /// Router::new()
    ///     .on(Method::DELETE, "/users/{id}", delete_user)
    ///     .on(Method::GET,    "/users/{id}", get_user)
    ///     .on(Method::POST,   "/users",      create_user);
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if `path` is not a valid route or conflicts with one already
    /// registered for `method`. Routes are fixed at startup, so this surfaces
    /// before the server accepts traffic.
    pub fn on(mut self, method: Method, path: &str, handler: impl Handler) -> Self {
        self.routes
            .entry(method)
            .or_default()
            .insert(path, handler.into_boxed_handler())
            .unwrap_or_else(|e| panic!("invalid route `{path}`: {e}"));
        self
    }

    /// Wrap every request in `middleware`.
    ///
    /// Middleware runs in registration order: the first `layer` call is the
    /// outermost and sees the request first and the outcome last.
    pub fn layer(mut self, middleware: impl Middleware) -> Self {
        let mut stack = self.stack.to_vec();
        stack.push(Arc::new(middleware));
        self.stack = stack.into();
        self
    }

    /// Dispatches one request through the middleware chain to its handler.
    ///
    /// Unmatched paths still run the chain and end in a `404` [`HttpError`];
    /// paths registered under other methods only end in a `405`.
    ///
    /// [`HttpError`]: crate::HttpError
    pub async fn handle(&self, mut req: Request) -> HandlerResult {
        let endpoint = match self.lookup(req.method(), req.path()) {
            Ok((handler, params)) => {
                req.set_params(params);
                handler
            }
            Err(fallback) => fallback,
        };
        Next::new(Arc::clone(&self.stack), endpoint).run(req).await
    }

    fn lookup(
        &self,
        method: &Method,
        path: &str,
    ) -> Result<(BoxedHandler, HashMap<String, String>), BoxedHandler> {
        if let Some(matched) = self.routes.get(method).and_then(|tree| tree.at(path).ok()) {
            let handler = Arc::clone(matched.value);
            let params = matched.params.iter()
                .map(|(k, v)| (k.to_owned(), v.to_owned()))
                .collect();
            return Ok((handler, params));
        }
        if self.routes.values().any(|tree| tree.at(path).is_ok()) {
            return Err(Arc::new(MethodNotAllowed));
        }
        Err(Arc::new(NotFound))
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("methods", &self.routes.keys().collect::<Vec<_>>())
            .field("middleware", &self.stack.len())
            .finish()
    }
}
