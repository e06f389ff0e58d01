//! Request Profiler
//!
//! Per-request profiling for HTTP services.
//!
//! Wrap an application [`Handler`](middleware::Handler) in
//! [`ProfileMiddleware`](middleware::ProfileMiddleware): every request runs
//! under a [`Profiler`](profile::Profiler), its function-level statistics are
//! kept in a [`ProfileStore`](profile::ProfileStore), and the built-in viewer
//! at `/__profile__/` shows merged statistics and a call graph for any
//! request or path prefix.
//!
//! ## Getting Started
//!
//! ```ignore
//! use request_profiler::middleware::{handler_fn, Body, ProfileMiddleware, Request, ResponseSink};
//!
//! let app = handler_fn(|request: &Request, sink: &mut dyn ResponseSink| {
//!     request_profiler::profile_scope!("render");
//!     sink.start_response("200 OK", vec![("Content-Type".into(), "text/html".into())]);
//!     Ok::<_, std::convert::Infallible>(Body::from("<p>hello</p>"))
//! });
//! let profiled = ProfileMiddleware::new(app);
//! ```
//!
//! Exported profiles can be inspected offline with the `reqprof` CLI.

pub mod aggregator;
pub mod callgraph;
pub mod commands;
pub mod middleware;
pub mod output;
pub mod profile;
pub mod utils;
