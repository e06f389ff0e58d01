//! Host server boundary.
//!
//! A [`Handler`] receives request metadata and a [`ResponseSink`]; it declares
//! status and headers through the sink and returns the body as a
//! [`Body`]. Middleware implements [`Handler`] itself so it can wrap any
//! inner handler.

use super::body::Body;

/// `(name, value)` header pair
pub type Header = (String, String);

pub const STATUS_OK: &str = "200 OK";
pub const STATUS_NOT_FOUND: &str = "404 Not Found";

/// Request metadata
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    pub path: String,
    pub query: String,
    pub headers: Vec<Header>,
}

impl Request {
    /// Build a request from a method and a `path[?query]` target
    pub fn new(method: impl Into<String>, target: &str) -> Self {
        let (path, query) = target.split_once('?').unwrap_or((target, ""));
        Self {
            method: method.into(),
            path: path.to_string(),
            query: query.to_string(),
            headers: Vec::new(),
        }
    }

    pub fn get(target: &str) -> Self {
        Self::new("GET", target)
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Receives the status line and headers of a response
pub trait ResponseSink {
    fn start_response(&mut self, status: &str, headers: Vec<Header>);
}

impl<F> ResponseSink for F
where
    F: FnMut(&str, Vec<Header>),
{
    fn start_response(&mut self, status: &str, headers: Vec<Header>) {
        self(status, headers)
    }
}

/// Request handler interface of the host server
pub trait Handler: Send + Sync {
    type Error;

    fn call(&self, request: &Request, sink: &mut dyn ResponseSink) -> Result<Body, Self::Error>;
}

/// Handler backed by a closure, see [`handler_fn`]
#[derive(Debug, Clone)]
pub struct HandlerFn<F> {
    f: F,
}

/// Wrap a closure as a [`Handler`]
pub fn handler_fn<F, E>(f: F) -> HandlerFn<F>
where
    F: Fn(&Request, &mut dyn ResponseSink) -> Result<Body, E> + Send + Sync,
{
    HandlerFn { f }
}

impl<F, E> Handler for HandlerFn<F>
where
    F: Fn(&Request, &mut dyn ResponseSink) -> Result<Body, E> + Send + Sync,
{
    type Error = E;

    fn call(&self, request: &Request, sink: &mut dyn ResponseSink) -> Result<Body, E> {
        (self.f)(request, sink)
    }
}

/// Find a header by case-insensitive name
pub fn find_header<'a>(headers: &'a [Header], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(entry, _)| entry.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

/// Fully materialized response produced by the viewer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: &'static str,
    pub headers: Vec<Header>,
    pub body: Vec<u8>,
}

impl Response {
    pub fn new(status: &'static str, content_type: &str, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: vec![("Content-Type".to_string(), content_type.to_string())],
            body: body.into(),
        }
    }

    pub fn ok(content_type: &str, body: impl Into<Vec<u8>>) -> Self {
        Self::new(STATUS_OK, content_type, body)
    }

    pub fn content_type(&self) -> Option<&str> {
        find_header(&self.headers, "Content-Type")
    }

    /// Emit status and headers to `sink`, returning the body
    pub fn send(self, sink: &mut dyn ResponseSink) -> Body {
        sink.start_response(self.status, self.headers);
        Body::from(self.body)
    }
}
