//! Request profiling middleware.
//!
//! [`ProfileMiddleware`] wraps an inner [`Handler`]. Viewer routes are served
//! directly; every other request runs under the profiler, its profile is
//! committed to the store, and HTML responses get a link to the viewer
//! appended to the body.

use super::body::Body;
use super::http::{find_header, Handler, Header, Request, ResponseSink};
use super::template::escape_html;
use super::viewer::Viewer;
use crate::callgraph::GraphRenderer;
use crate::profile::{ProfileData, ProfileRecord, ProfileStore, Profiler, RequestId, ScopeProfiler};
use crate::utils::config::ProfilerConfig;
use log::{debug, warn};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::form_urlencoded;

const HTML_CONTENT_TYPES: [&str; 2] = ["text/html", "application/xhtml+xml"];

/// Response sink shim that records whether the response is HTML
///
/// When `inject_link` is set, every `Content-Length` header of an HTML
/// response is dropped before the headers reach the real sink, since the body
/// is about to grow.
pub struct ResponseHook<'a> {
    inner: &'a mut dyn ResponseSink,
    inject_link: bool,
    html_output: bool,
}

impl<'a> ResponseHook<'a> {
    pub fn new(inner: &'a mut dyn ResponseSink, inject_link: bool) -> Self {
        Self {
            inner,
            inject_link,
            html_output: false,
        }
    }

    /// Whether the last declared response was HTML
    pub fn html_output(&self) -> bool {
        self.html_output
    }
}

/// Check a `Content-Type` value against the HTML media types
pub fn is_html_content_type(value: &str) -> bool {
    let media_type = value.split(';').next().unwrap_or("").trim();
    HTML_CONTENT_TYPES
        .iter()
        .any(|html| media_type.eq_ignore_ascii_case(html))
}

impl ResponseSink for ResponseHook<'_> {
    fn start_response(&mut self, status: &str, mut headers: Vec<Header>) {
        self.html_output = find_header(&headers, "Content-Type").is_some_and(is_html_content_type);
        if self.html_output && self.inject_link {
            headers.retain(|(name, _)| !name.eq_ignore_ascii_case("Content-Length"));
        }
        self.inner.start_response(status, headers);
    }
}

/// Profiling middleware around an inner handler
///
/// # Example
/// ```ignore
/// let app = handler_fn(|request: &Request, sink: &mut dyn ResponseSink| {
///     sink.start_response("200 OK", vec![("Content-Type".into(), "text/html".into())]);
///     Ok::<_, Infallible>(Body::from("<html></html>"))
/// });
/// let profiled = ProfileMiddleware::new(app);
/// ```
pub struct ProfileMiddleware<H, P = ScopeProfiler> {
    app: H,
    profiler: P,
    viewer: Viewer,
}

impl<H: Handler> ProfileMiddleware<H, ScopeProfiler> {
    /// Wrap `app` with the default configuration and a fresh store
    pub fn new(app: H) -> Self {
        Self::with_config(app, ProfilerConfig::default())
    }

    pub fn with_config(app: H, config: ProfilerConfig) -> Self {
        let viewer = Viewer::new(Arc::new(ProfileStore::new()), config);
        Self {
            app,
            profiler: ScopeProfiler::new(),
            viewer,
        }
    }
}

impl<H: Handler, P: Profiler> ProfileMiddleware<H, P> {
    /// Share an existing store instead of the private one
    pub fn with_store(mut self, store: Arc<ProfileStore>) -> Self {
        self.viewer = self.viewer.with_store(store);
        self
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn GraphRenderer>) -> Self {
        self.viewer = self.viewer.with_renderer(renderer);
        self
    }

    /// Swap the profiler implementation
    pub fn with_profiler<Q: Profiler>(self, profiler: Q) -> ProfileMiddleware<H, Q> {
        ProfileMiddleware {
            app: self.app,
            profiler,
            viewer: self.viewer,
        }
    }

    pub fn store(&self) -> &Arc<ProfileStore> {
        self.viewer.store()
    }

    pub fn viewer(&self) -> &Viewer {
        &self.viewer
    }

    fn profile(&self, request: &Request, sink: &mut dyn ResponseSink) -> Result<Body, H::Error> {
        let request_id = RequestId::generate();
        let inject_link = self.viewer.config().inject_link;
        let mut hook = ResponseHook::new(sink, inject_link);

        let started = Instant::now();
        let (outcome, data) = self.profiler.run_and_capture(|| {
            panic::catch_unwind(AssertUnwindSafe(|| self.app.call(request, &mut hook)))
        });
        let elapsed = started.elapsed();
        let html_output = hook.html_output();

        // The profile is kept even when the handler failed or panicked
        self.commit(request_id.clone(), &request.path, data);

        let body = match outcome {
            Ok(result) => result?,
            Err(payload) => panic::resume_unwind(payload),
        };

        if html_output && inject_link {
            Ok(body.chain_chunk(self.profile_link(&request_id, elapsed).into_bytes()))
        } else {
            Ok(body)
        }
    }

    fn commit(&self, request_id: RequestId, path: &str, data: ProfileData) {
        debug!(
            "Captured profile {} for {} ({} functions)",
            request_id,
            path,
            data.len()
        );
        if let Err(err) = self.store().put(ProfileRecord::new(request_id, path, data)) {
            warn!("Dropping captured profile: {}", err);
        }
    }

    fn profile_link(&self, request_id: &RequestId, elapsed: Duration) -> String {
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("request_id", request_id.as_str())
            .finish();
        format!(
            "[ Profiler: {:.3}s. <a href=\"{}/?{}\">Details</a> ]",
            elapsed.as_secs_f64(),
            escape_html(&self.viewer.config().viewer_prefix),
            escape_html(&query)
        )
    }
}

impl<H: Handler, P: Profiler> Handler for ProfileMiddleware<H, P> {
    type Error = H::Error;

    fn call(&self, request: &Request, sink: &mut dyn ResponseSink) -> Result<Body, H::Error> {
        if let Some(route) = self.viewer.route(request) {
            return Ok(self.viewer.respond(route, request).send(sink));
        }
        self.profile(request, sink)
    }
}
