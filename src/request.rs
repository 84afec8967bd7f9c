//! Incoming HTTP request type.

use std::collections::HashMap;

use bytes::Bytes;
use http::header::HOST;
use http::request::Parts;
use http::{Extensions, HeaderMap, Method, Uri};

/// Proxies put the client-facing scheme here; tsu runs behind one.
const X_FORWARDED_PROTO: &str = "x-forwarded-proto";

/// An incoming HTTP request with its body fully read.
///
/// Besides the wire data, every request carries an [`Extensions`] map that
/// lives exactly as long as the request. Middleware stores per-request values
/// there (an APM transaction, a request id) and handlers further down the
/// chain look them up by type.
#[derive(Debug)]
pub struct Request {
    head: Parts,
    body: Bytes,
    params: HashMap<String, String>,
}

impl Request {
    pub fn method(&self) -> &Method { &self.head.method }
    pub fn uri(&self) -> &Uri { &self.head.uri }
    pub fn path(&self) -> &str { self.head.uri.path() }
    pub fn headers(&self) -> &HeaderMap { &self.head.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    /// Method, URI, version, headers and extensions, without the body.
    pub fn head(&self) -> &Parts { &self.head }

    /// The raw query string without the leading `?`, or `""`.
    pub fn query(&self) -> &str {
        self.head.uri.query().unwrap_or("")
    }

    /// Case-insensitive header lookup. Values that are not visible ASCII are
    /// treated as absent.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.head.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// The host the client addressed, port included when it sent one.
    ///
    /// Taken from the request target when it is absolute (HTTP/2, proxies
    /// speaking absolute-form), otherwise from the `Host` header.
    pub fn host(&self) -> &str {
        self.head.uri.authority()
            .map(|a| a.as_str())
            .or_else(|| self.header(HOST.as_str()))
            .unwrap_or("")
    }

    /// The scheme the client used.
    ///
    /// Absolute request targets carry it directly. Otherwise the first
    /// `X-Forwarded-Proto` value wins, and a bare connection is plain `http`
    /// since tsu never terminates TLS itself.
    ///
    /// The header is taken as sent. It is only trustworthy behind a proxy
    /// that overwrites it; a client reaching tsu directly can claim `https`.
    pub fn scheme(&self) -> &str {
        if let Some(scheme) = self.head.uri.scheme_str() {
            return scheme;
        }
        self.header(X_FORWARDED_PROTO)
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or("http")
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/users/{id}`, `req.param("id")` on `/users/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    pub fn extensions(&self) -> &Extensions { &self.head.extensions }
    pub fn extensions_mut(&mut self) -> &mut Extensions { &mut self.head.extensions }

    pub(crate) fn set_params(&mut self, params: HashMap<String, String>) {
        self.params = params;
    }
}

/// Builds a request from its parts; used by the server after reading the body,
/// and handy for driving a [`Router`](crate::Router) directly.
impl From<http::Request<Bytes>> for Request {
    fn from(req: http::Request<Bytes>) -> Self {
        let (head, body) = req.into_parts();
        Self { head, body, params: HashMap::new() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(uri: &str, headers: &[(&str, &str)]) -> Request {
        let mut builder = http::Request::builder().uri(uri);
        for (k, v) in headers {
            builder = builder.header(*k, *v);
        }
        builder.body(Bytes::new()).unwrap().into()
    }

    #[test]
    fn origin_form_reads_host_header() {
        let req = request("/users/42?active=true", &[("host", "api.example.com:8080")]);
        assert_eq!(req.host(), "api.example.com:8080");
        assert_eq!(req.path(), "/users/42");
        assert_eq!(req.query(), "active=true");
        assert_eq!(req.scheme(), "http");
    }

    #[test]
    fn absolute_form_wins_over_headers() {
        let req = request(
            "https://edge.example.com/a",
            &[("host", "internal:3000"), ("x-forwarded-proto", "http")],
        );
        assert_eq!(req.host(), "edge.example.com");
        assert_eq!(req.scheme(), "https");
    }

    #[test]
    fn forwarded_proto_takes_first_hop() {
        let req = request("/", &[("x-forwarded-proto", "https, http")]);
        assert_eq!(req.scheme(), "https");
    }

    #[test]
    fn forwarded_proto_is_not_verified() {
        // Nothing distinguishes a proxy's header from one the client sent.
        let req = request("http://plain.example.com/", &[]);
        assert_eq!(req.scheme(), "http");
        let req = request("/", &[("x-forwarded-proto", "https")]);
        assert_eq!(req.scheme(), "https");
    }

    #[test]
    fn head_carries_headers_and_extensions() {
        let mut req = request("/a?b=c", &[("x-request-id", "7")]);
        req.extensions_mut().insert(42_u32);
        let head = req.head().clone();
        assert_eq!(head.uri.query(), Some("b=c"));
        assert_eq!(head.headers["x-request-id"], "7");
        assert_eq!(head.extensions.get::<u32>(), Some(&42));
    }

    #[test]
    fn missing_host_and_query_are_empty() {
        let req = request("/", &[]);
        assert_eq!(req.host(), "");
        assert_eq!(req.query(), "");
        assert_eq!(req.param("id"), None);
    }
}
