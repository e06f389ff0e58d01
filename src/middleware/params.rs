//! Viewer query parameters.
//!
//! Parsing never fails: a malformed value falls back to the configured
//! default with a warning, and out-of-range thresholds are clamped to
//! `0..=100`.

use crate::aggregator::SortKey;
use crate::profile::RequestId;
use crate::utils::config::ProfilerConfig;
use log::warn;
use url::form_urlencoded;

/// Parameters understood by both viewer routes
#[derive(Debug, Clone, PartialEq)]
pub struct ViewerParams {
    pub request_id: Option<RequestId>,
    pub request_path_prefix: String,
    pub sort: SortKey,
    pub node_thres: f64,
    pub edge_thres: f64,
}

impl ViewerParams {
    /// Defaults used when the query string is empty
    pub fn defaults(config: &ProfilerConfig) -> Self {
        Self {
            request_id: None,
            request_path_prefix: String::new(),
            sort: SortKey::from_name(&config.default_sort).unwrap_or_default(),
            node_thres: config.node_thres,
            edge_thres: config.edge_thres,
        }
    }

    /// Parse a raw (still percent-encoded) query string
    pub fn parse(query: &str, config: &ProfilerConfig) -> Self {
        let mut params = Self::defaults(config);

        for (name, value) in form_urlencoded::parse(query.as_bytes()) {
            match name.as_ref() {
                "request_id" => {
                    params.request_id = if value.is_empty() {
                        None
                    } else {
                        Some(RequestId::new(value.into_owned()))
                    };
                }
                "request_path_prefix" => params.request_path_prefix = value.into_owned(),
                "sort" => {
                    params.sort = match SortKey::from_name(&value) {
                        Some(sort) => sort,
                        None => {
                            warn!("Unknown sort order {:?}, using {}", value, params.sort.as_str());
                            params.sort
                        }
                    };
                }
                "node_thres" => {
                    params.node_thres = parse_threshold("node_thres", &value, config.node_thres)
                }
                "edge_thres" => {
                    params.edge_thres = parse_threshold("edge_thres", &value, config.edge_thres)
                }
                _ => {}
            }
        }

        params
    }

    /// Query string for the graph thumbnail carrying the same selection
    pub fn tree_query(&self) -> String {
        let mut query = form_urlencoded::Serializer::new(String::new());
        if let Some(id) = &self.request_id {
            query.append_pair("request_id", id.as_str());
        }
        query.append_pair("request_path_prefix", &self.request_path_prefix);
        query.append_pair("node_thres", &self.node_thres.to_string());
        query.append_pair("edge_thres", &self.edge_thres.to_string());
        query.finish()
    }
}

fn parse_threshold(name: &str, raw: &str, default: f64) -> f64 {
    if raw.is_empty() {
        return default;
    }
    let value = match raw.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => value,
        _ => {
            warn!("Invalid {} {:?}, using {}", name, raw, default);
            return default;
        }
    };
    let clamped = value.clamp(0.0, 100.0);
    if clamped != value {
        warn!("{} {} out of range, clamped to {}", name, value, clamped);
    }
    clamped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(query: &str) -> ViewerParams {
        ViewerParams::parse(query, &ProfilerConfig::default())
    }

    #[test]
    fn test_empty_query_uses_defaults() {
        let params = parse("");
        assert_eq!(params, ViewerParams::defaults(&ProfilerConfig::default()));
        assert_eq!(params.sort, SortKey::CumulativeTime);
        assert_eq!(params.node_thres, 0.5);
        assert_eq!(params.edge_thres, 0.1);
    }

    #[test]
    fn test_full_query() {
        let params = parse("request_id=42-7&request_path_prefix=%2Fapi%2F&sort=tottime&node_thres=2&edge_thres=0.25");
        assert_eq!(params.request_id, Some(RequestId::new("42-7")));
        assert_eq!(params.request_path_prefix, "/api/");
        assert_eq!(params.sort, SortKey::InternalTime);
        assert_eq!(params.node_thres, 2.0);
        assert_eq!(params.edge_thres, 0.25);
    }

    #[test]
    fn test_empty_request_id_is_absent() {
        assert_eq!(parse("request_id=").request_id, None);
    }

    #[test]
    fn test_malformed_values_fall_back() {
        let params = parse("sort=bogus&node_thres=abc&edge_thres=NaN");
        assert_eq!(params.sort, SortKey::CumulativeTime);
        assert_eq!(params.node_thres, 0.5);
        assert_eq!(params.edge_thres, 0.1);
    }

    #[test]
    fn test_out_of_range_thresholds_clamped() {
        let params = parse("node_thres=250&edge_thres=-3");
        assert_eq!(params.node_thres, 100.0);
        assert_eq!(params.edge_thres, 0.0);
    }

    #[test]
    fn test_tree_query_round_trips_selection() {
        let params = parse("request_id=a%26b&request_path_prefix=/x y&node_thres=1");
        let reparsed = parse(&params.tree_query());
        assert_eq!(reparsed.request_id, Some(RequestId::new("a&b")));
        assert_eq!(reparsed.request_path_prefix, "/x y");
        assert_eq!(reparsed.node_thres, 1.0);
    }
}
