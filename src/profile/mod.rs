//! Per-request profile capture, data model and storage.
//!
//! This module handles:
//! - The profile data model (functions, call counts, times, caller edges)
//! - Capturing a profile around a callable
//! - Indexing captured profiles by request id and request path

pub mod capture;
pub mod schema;
pub mod store;

// Re-export main types
pub use capture::{scope, Profiler, ScopeGuard, ScopeProfiler};
pub use schema::{CallStats, FunctionKey, FunctionStats, ProfileData, ProfileRecord, RequestId};
pub use store::ProfileStore;
