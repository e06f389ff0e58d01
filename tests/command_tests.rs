use request_profiler::aggregator::SortKey;
use request_profiler::callgraph::DotRenderer;
use request_profiler::commands::{
    execute_graph, execute_graph_with, render_stats_report, validate_graph_args, validate_profile_file,
    GraphArgs, Selection, StatsArgs,
};
use request_profiler::output::{read_profiles, write_profiles};
use request_profiler::profile::{CallStats, FunctionKey, FunctionStats, ProfileData, ProfileRecord, RequestId};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn data(query_calls: u64) -> ProfileData {
    let root = FunctionKey::builtin("<request>");
    let view = FunctionKey::new("/srv/app/views.rs", 12, "list_items");
    let query = FunctionKey::new("/srv/app/db.rs", 40, "fetch_rows");
    ProfileData::new()
        .with_function(root.clone(), FunctionStats::new(CallStats::new(1, 1, 0.05, 1.0)))
        .with_function(
            view.clone(),
            FunctionStats::new(CallStats::new(1, 1, 0.35, 0.95)).with_caller(root, CallStats::new(1, 1, 0.35, 0.95)),
        )
        .with_function(
            query,
            FunctionStats::new(CallStats::new(query_calls, query_calls, 0.6, 0.6))
                .with_caller(view, CallStats::new(query_calls, query_calls, 0.6, 0.6)),
        )
}

fn export(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("profiles.json");
    let records = vec![
        ProfileRecord::new(RequestId::new("100-1"), "/api/items", data(2)),
        ProfileRecord::new(RequestId::new("100-2"), "/api/items/7", data(3)),
        ProfileRecord::new(RequestId::new("100-3"), "/health", data(1)),
    ];
    write_profiles(&records, &path).unwrap();
    path
}

fn selection(input: &Path, request_id: Option<&str>, prefix: &str) -> Selection {
    Selection {
        input: input.to_path_buf(),
        request_id: request_id.map(str::to_string),
        path_prefix: prefix.to_string(),
    }
}

#[test]
fn test_stats_for_prefix() {
    let dir = TempDir::new().unwrap();
    let input = export(&dir);

    let report = render_stats_report(&StatsArgs {
        selection: selection(&input, None, "/api"),
        sort: SortKey::CallCount,
    })
    .unwrap();

    assert!(report.contains("Ordered by: call count"));
    // 2 + 3 query calls merged across the two /api records
    assert!(report.contains("        5"));
    assert!(report.contains("db.rs:40(fetch_rows)"));
    assert!(!report.contains("/srv/app"));
}

#[test]
fn test_stats_for_unknown_id() {
    let dir = TempDir::new().unwrap();
    let input = export(&dir);

    let report = render_stats_report(&StatsArgs {
        selection: selection(&input, Some("999999"), ""),
        sort: SortKey::default(),
    })
    .unwrap();

    assert_eq!(report, "No matching log.");
}

#[test]
fn test_graph_dot_output() {
    let dir = TempDir::new().unwrap();
    let input = export(&dir);
    let output = dir.path().join("out/graph.dot");

    let args = GraphArgs {
        selection: selection(&input, Some("100-3"), ""),
        output: output.clone(),
        dot_only: true,
        ..Default::default()
    };
    validate_graph_args(&args).unwrap();
    execute_graph(args).unwrap();

    let dot = std::fs::read_to_string(&output).unwrap();
    assert!(dot.starts_with("digraph {"));
    assert!(dot.contains("db:40:fetch_rows"));
}

#[test]
fn test_graph_with_missing_renderer_fails_with_hint() {
    let dir = TempDir::new().unwrap();
    let input = export(&dir);

    let args = GraphArgs {
        selection: selection(&input, None, "/api"),
        output: dir.path().join("graph.png"),
        ..Default::default()
    };
    let renderer = DotRenderer::new("/nonexistent/graphviz/dot");
    let err = execute_graph_with(args, &renderer).unwrap_err();

    assert!(err.to_string().contains("Please install graphviz"));
    assert!(!dir.path().join("graph.png").exists());
}

#[test]
fn test_graph_with_no_match_fails() {
    let dir = TempDir::new().unwrap();
    let input = export(&dir);

    let args = GraphArgs {
        selection: selection(&input, None, "/nothing"),
        output: dir.path().join("graph.dot"),
        dot_only: true,
        ..Default::default()
    };
    let err = execute_graph(args).unwrap_err();
    assert_eq!(err.to_string(), "No matching log.");
}

#[test]
fn test_validate_export() {
    let dir = TempDir::new().unwrap();
    let input = export(&dir);

    validate_profile_file(&input).unwrap();
    let loaded = read_profiles(&input).unwrap();
    assert_eq!(loaded.records.len(), 3);
    assert_eq!(loaded.records[2].path(), "/health");
}

#[test]
fn test_validate_rejects_garbage() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.json");
    std::fs::write(&path, "{ not json").unwrap();

    assert!(validate_profile_file(&path).is_err());
}
