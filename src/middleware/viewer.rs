//! Built-in profile viewer.
//!
//! Two GET routes live under the configured prefix:
//! * `<prefix>/` - merged statistics table with a query form
//! * `<prefix>/tree.png` - call graph image rendered by the external renderer

use super::body::Body;
use super::http::{Handler, Request, Response, ResponseSink, STATUS_NOT_FOUND};
use super::params::ViewerParams;
use super::template::{Escaped, ViewerPage};
use crate::aggregator::{aggregate, render_stats};
use crate::callgraph::{build_pruned_graph, write_dot, DotRenderer, GraphRenderer, ImageFormat, Theme};
use crate::profile::ProfileStore;
use crate::utils::config::{renderer_missing_message, ProfilerConfig, NO_MATCHING_LOG};
use log::{debug, warn};
use std::convert::Infallible;
use std::sync::Arc;

const TEXT_HTML: &str = "text/html";
const TEXT_PLAIN: &str = "text/plain";

/// Viewer pages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerRoute {
    Stats,
    Tree,
}

/// Serves the statistics page and call graph image from a [`ProfileStore`]
pub struct Viewer {
    store: Arc<ProfileStore>,
    renderer: Arc<dyn GraphRenderer>,
    theme: Theme,
    config: ProfilerConfig,
}

impl Viewer {
    pub fn new(store: Arc<ProfileStore>, config: ProfilerConfig) -> Self {
        let renderer = Arc::new(DotRenderer::from_config(&config.renderer));
        Self {
            store,
            renderer,
            theme: Theme::temperature(),
            config,
        }
    }

    pub fn with_store(mut self, store: Arc<ProfileStore>) -> Self {
        self.store = store;
        self
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn GraphRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn with_theme(mut self, theme: Theme) -> Self {
        self.theme = theme;
        self
    }

    pub fn config(&self) -> &ProfilerConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<ProfileStore> {
        &self.store
    }

    /// Match a request against the viewer routes
    ///
    /// Only GET requests match. Leading and trailing slashes are ignored, so
    /// `<prefix>` and `<prefix>/` both reach the statistics page.
    pub fn route(&self, request: &Request) -> Option<ViewerRoute> {
        if !request.method.eq_ignore_ascii_case("GET") {
            return None;
        }
        let prefix = self.config.viewer_prefix.trim_matches('/');
        let path = request.path.trim_matches('/');
        let rest = path.strip_prefix(prefix)?;

        match rest {
            "" => Some(ViewerRoute::Stats),
            "/tree.png" => Some(ViewerRoute::Tree),
            _ => None,
        }
    }

    pub fn respond(&self, route: ViewerRoute, request: &Request) -> Response {
        let params = ViewerParams::parse(&request.query, &self.config);
        match route {
            ViewerRoute::Stats => self.stats_page(&params),
            ViewerRoute::Tree => self.tree_image(&params),
        }
    }

    /// Merged statistics as an HTML page
    ///
    /// When nothing matches the body is exactly [`NO_MATCHING_LOG`].
    pub fn stats_page(&self, params: &ViewerParams) -> Response {
        let records = self
            .store
            .resolve(params.request_id.as_ref(), &params.request_path_prefix);
        let Some(mut accumulator) = aggregate(&records) else {
            debug!("Viewer: no records for {:?}", params);
            return Response::ok(TEXT_HTML, NO_MATCHING_LOG);
        };

        accumulator.strip_dirs();
        let stats = accumulator.sort(params.sort);
        debug!(
            "Viewer: {} record(s), {} function(s) sorted by {}",
            stats.record_count(),
            stats.entries().len(),
            params.sort.as_str()
        );

        let page = ViewerPage {
            prefix: Escaped::text(&self.config.viewer_prefix),
            request_id: Escaped::text(params.request_id.as_ref().map(|id| id.as_str()).unwrap_or("")),
            request_path_prefix: Escaped::text(&params.request_path_prefix),
            node_thres: Escaped::text(&params.node_thres.to_string()),
            edge_thres: Escaped::text(&params.edge_thres.to_string()),
            tree_query: Escaped::text(&params.tree_query()),
            sort: params.sort,
            stats_dump: Escaped::text(&render_stats(&stats)),
        };
        Response::ok(TEXT_HTML, page.render())
    }

    /// Call graph as a PNG image, or a plain-text diagnostic
    pub fn tree_image(&self, params: &ViewerParams) -> Response {
        let records = self
            .store
            .resolve(params.request_id.as_ref(), &params.request_path_prefix);
        let Some(graph) = build_pruned_graph(&records, params.node_thres, params.edge_thres) else {
            return Response::ok(TEXT_PLAIN, NO_MATCHING_LOG);
        };

        let dot = write_dot(&graph, &self.theme);
        match self.renderer.render(&dot, ImageFormat::Png) {
            Ok(image) => Response::ok(ImageFormat::Png.content_type(), image),
            Err(err) => {
                warn!("Call graph rendering failed: {}", err);
                Response::ok(TEXT_PLAIN, renderer_missing_message(self.renderer.program()))
            }
        }
    }
}

/// Standalone mounting: requests outside the viewer routes get a 404
impl Handler for Viewer {
    type Error = Infallible;

    fn call(&self, request: &Request, sink: &mut dyn ResponseSink) -> Result<Body, Infallible> {
        let response = match self.route(request) {
            Some(route) => self.respond(route, request),
            None => Response::new(STATUS_NOT_FOUND, TEXT_PLAIN, "Not Found"),
        };
        Ok(response.send(sink))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::{CallStats, FunctionKey, FunctionStats, ProfileData, ProfileRecord, RequestId};
    use crate::utils::error::RenderError;

    struct FakeRenderer;

    impl GraphRenderer for FakeRenderer {
        fn render(&self, dot: &str, _format: ImageFormat) -> Result<Vec<u8>, RenderError> {
            Ok(dot.as_bytes().to_vec())
        }

        fn program(&self) -> &str {
            "fake"
        }
    }

    fn viewer() -> Viewer {
        let store = Arc::new(ProfileStore::new());
        let data = ProfileData::new().with_function(
            FunctionKey::new("/srv/app/views.rs", 10, "index"),
            FunctionStats::new(CallStats::new(1, 1, 0.2, 0.2)),
        );
        store
            .put(ProfileRecord::new(RequestId::new("r1"), "/index", data))
            .unwrap();
        Viewer::new(store, ProfilerConfig::default()).with_renderer(Arc::new(FakeRenderer))
    }

    #[test]
    fn test_routes() {
        let viewer = viewer();
        assert_eq!(viewer.route(&Request::get("/__profile__")), Some(ViewerRoute::Stats));
        assert_eq!(viewer.route(&Request::get("/__profile__/")), Some(ViewerRoute::Stats));
        assert_eq!(viewer.route(&Request::get("/__profile__/tree.png?x=1")), Some(ViewerRoute::Tree));
        assert_eq!(viewer.route(&Request::get("/__profile__x")), None);
        assert_eq!(viewer.route(&Request::get("/__profile__/other")), None);
        assert_eq!(viewer.route(&Request::new("POST", "/__profile__/")), None);
        assert_eq!(viewer.route(&Request::get("/index")), None);
    }

    #[test]
    fn test_stats_page_strips_directories() {
        let response = viewer().stats_page(&ViewerParams::defaults(&ProfilerConfig::default()));
        let html = String::from_utf8(response.body.clone()).unwrap();

        assert_eq!(response.content_type(), Some("text/html"));
        assert!(html.contains("views.rs:10(index)"));
        assert!(!html.contains("/srv/app"));
    }

    #[test]
    fn test_unknown_id_gives_no_matching_log() {
        let viewer = viewer();
        let response = viewer.respond(ViewerRoute::Stats, &Request::get("/__profile__/?request_id=nope"));
        assert_eq!(response.body, NO_MATCHING_LOG.as_bytes());

        let response = viewer.respond(ViewerRoute::Tree, &Request::get("/__profile__/tree.png?request_id=nope"));
        assert_eq!(response.content_type(), Some("text/plain"));
        assert_eq!(response.body, NO_MATCHING_LOG.as_bytes());
    }

    #[test]
    fn test_tree_image_uses_renderer() {
        let response = viewer().respond(ViewerRoute::Tree, &Request::get("/__profile__/tree.png"));
        assert_eq!(response.content_type(), Some("image/png"));
        assert!(String::from_utf8(response.body).unwrap().starts_with("digraph"));
    }

    #[test]
    fn test_standalone_not_found() {
        let viewer = viewer();
        let mut status = String::new();
        let mut sink = |s: &str, _: Vec<(String, String)>| status = s.to_string();
        let body = viewer.call(&Request::get("/elsewhere"), &mut sink).unwrap();
        assert_eq!(status, STATUS_NOT_FOUND);
        assert_eq!(body.into_bytes(), b"Not Found".to_vec());
    }
}
