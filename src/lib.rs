//! # tsu-apm
//!
//! Application performance monitoring for services built on tsu, the minimal
//! HTTP framework for Rust services behind a reverse proxy.
//!
//! ## The contract
//!
//! Every request that passes through the [`apm`](middleware::apm) middleware
//! becomes one monitoring transaction:
//!
//! - started before the handler runs, named `"<METHOD> <PATH>"`
//! - annotated with host, method, transport (HTTP / HTTPS) and URL
//! - reachable from handlers through [`apm::from_request`](middleware::apm::from_request)
//! - ended on every exit path, panics and cancellation included, with the
//!   response status and, if the handler failed, its error noticed
//!
//! The handler's result travels back up the chain untouched. Monitoring
//! changes what is reported, never what the client sees.
//!
//! Where transactions go is up to the [`monitor::Reporter`]; by default they
//! become structured `tracing` events.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use tsu_apm::middleware::apm;
//! use tsu_apm::{HttpError, Method, Request, Response, Router, Server, StatusCode};
//!
//! #[tokio::main]
//! async fn main() {
//!     let app = Router::new()
//!         .on(Method::GET, "/users/{id}", get_user)
//!         .layer(apm::new(apm::Config::from_env().unwrap()));
//!
//!     Server::bind("0.0.0.0:3000").serve(app).await.unwrap();
//! }
//!
//! async fn get_user(req: Request) -> Result<Response, HttpError> {
//!     let id = req.param("id").unwrap_or("unknown");
//!     if id == "0" {
//!         return Err(HttpError::new(StatusCode::NOT_FOUND, "no such user"));
//!     }
//!     if let Some(txn) = apm::from_request(&req) {
//!         txn.add_attribute("user.id", id);
//!     }
//!     Ok(Response::json(format!(r#"{{"id":"{id}"}}"#).into_bytes()))
//! }
//! ```

mod error;
mod handler;
mod request;
mod response;
mod router;
mod server;

pub mod middleware;
pub mod monitor;

pub use error::{BoxError, Error, HttpError};
pub use handler::{BoxFuture, Handler};
pub use http::{Method, StatusCode};
pub use request::Request;
pub use response::{
    ContentType, DEFAULT_STATUS, HandlerResult, IntoHandlerResult, IntoResponse, Response,
    ResponseBuilder,
};
pub use router::Router;
pub use server::Server;
