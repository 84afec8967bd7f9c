//! Minimal tsu-apm example — CRUD-style JSON endpoints, one APM transaction
//! per request.
//!
//! Run with:
//!   RUST_LOG=info TSU_APM_LICENSE=0123456789abcdef0123456789abcdef01234567 \
//!   TSU_APM_ENABLED=true cargo run --example basic
//!
//! Try:
//!   curl http://localhost:3000/users/42
//!   curl http://localhost:3000/users/0          # 404, noticed on the transaction
//!   curl -X POST http://localhost:3000/users -d '{"name":"alice"}'
//!   curl -X DELETE http://localhost:3000/users/42
//!
//! Each request logs one `tsu_apm::monitor` event with its name, status,
//! duration and URL.

use tsu_apm::middleware::apm;
use tsu_apm::{HttpError, Method, Request, Response, Router, Server, StatusCode};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let config = apm::Config::from_env().expect("invalid TSU_APM_* environment");

    let app = Router::new()
        .on(Method::GET,    "/users/{id}", get_user)
        .on(Method::POST,   "/users",      create_user)
        .on(Method::DELETE, "/users/{id}", delete_user)
        .layer(apm::new(config));

    Server::bind("0.0.0.0:3000")
        .serve(app)
        .await
        .expect("server error");
}

// GET /users/{id}
async fn get_user(req: Request) -> Result<Response, HttpError> {
    let id = req.param("id").unwrap_or("unknown");
    if id == "0" {
        return Err(HttpError::new(StatusCode::NOT_FOUND, "no such user"));
    }

    if let Some(txn) = apm::from_request(&req) {
        txn.add_attribute("user.id", id);
        let _lookup = txn.start_segment("users.lookup");
    }

    Ok(Response::json(format!(r#"{{"id":"{id}","name":"alice"}}"#).into_bytes()))
}

// POST /users
async fn create_user(req: Request) -> Response {
    if req.body().is_empty() {
        return Response::status(StatusCode::BAD_REQUEST);
    }

    Response::builder()
        .status(StatusCode::CREATED)
        .header("location", "/users/99")
        .json(r#"{"id":"99","name":"new_user"}"#.to_owned().into_bytes())
}

// DELETE /users/{id} → 204 No Content
async fn delete_user(_req: Request) -> StatusCode {
    StatusCode::NO_CONTENT
}
