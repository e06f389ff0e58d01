//! HTTP-facing half of the profiler.
//!
//! This module defines the host server boundary ([`Handler`], [`ResponseSink`],
//! [`Body`]), the profiling middleware that wraps an application handler,
//! and the viewer that serves captured profiles.

pub mod body;
pub mod http;
pub mod interceptor;
pub mod params;
pub mod template;
pub mod viewer;

// Re-export main types
pub use body::Body;
pub use http::{find_header, handler_fn, Handler, HandlerFn, Header, Request, Response, ResponseSink};
pub use interceptor::{is_html_content_type, ProfileMiddleware, ResponseHook};
pub use params::ViewerParams;
pub use template::{escape_html, Escaped, ViewerPage};
pub use viewer::{Viewer, ViewerRoute};
