//! Profile data model.
//!
//! A [`ProfileRecord`] is the immutable, cheaply clonable snapshot of one
//! request's call statistics. Its [`ProfileData`] maps every function that ran
//! to its counters plus the contribution made through each of its callers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// File name used for built-in and synthetic functions
pub const BUILTIN_FILE: &str = "~";

static NEXT_REQUEST_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Opaque identifier of one profiled request
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(String);

impl RequestId {
    /// Wrap an existing id (e.g. from a query string)
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh id: `<wall clock micros>-<process-wide counter>`.
    ///
    /// The counter alone guarantees uniqueness within the process; the
    /// timestamp keeps ids readable and roughly sortable.
    pub fn generate() -> Self {
        let sequence = NEXT_REQUEST_SEQUENCE.fetch_add(1, Ordering::Relaxed);
        Self(format!("{}-{}", Utc::now().timestamp_micros(), sequence))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Function descriptor: (file, line, name)
///
/// Derived ordering compares file, then line, then name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FunctionKey {
    pub file: String,
    pub line: u32,
    pub name: String,
}

impl FunctionKey {
    pub fn new(file: impl Into<String>, line: u32, name: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            line,
            name: name.into(),
        }
    }

    /// Key for a built-in or synthetic function (no source location)
    pub fn builtin(name: impl Into<String>) -> Self {
        Self::new(BUILTIN_FILE, 0, name)
    }

    pub fn is_builtin(&self) -> bool {
        self.file == BUILTIN_FILE && self.line == 0
    }

    /// Standard display string: `file:line(name)`, or `{name}` for built-ins
    /// named like `<name>`
    pub fn std_string(&self) -> String {
        if self.is_builtin() {
            match self
                .name
                .strip_prefix('<')
                .and_then(|rest| rest.strip_suffix('>'))
            {
                Some(inner) => format!("{{{}}}", inner),
                None => self.name.clone(),
            }
        } else {
            format!("{}:{}({})", self.file, self.line, self.name)
        }
    }

    /// Same key with the directory part of the file removed
    pub fn stripped(&self) -> Self {
        let file = Path::new(&self.file)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.file.clone());
        Self {
            file,
            line: self.line,
            name: self.name.clone(),
        }
    }
}

impl fmt::Display for FunctionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.std_string())
    }
}

/// Call counters and times (seconds)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CallStats {
    /// Calls that were not recursive re-entries
    pub primitive_calls: u64,

    /// All calls, including recursive ones
    pub total_calls: u64,

    /// Time spent in the function itself
    pub total_time: f64,

    /// Time spent in the function and everything it called
    pub cumulative_time: f64,
}

impl CallStats {
    pub fn new(primitive_calls: u64, total_calls: u64, total_time: f64, cumulative_time: f64) -> Self {
        Self {
            primitive_calls,
            total_calls,
            total_time,
            cumulative_time,
        }
    }

    pub fn add(&mut self, other: &CallStats) {
        self.primitive_calls += other.primitive_calls;
        self.total_calls += other.total_calls;
        self.total_time += other.total_time;
        self.cumulative_time += other.cumulative_time;
    }
}

/// Statistics for one function plus the share contributed by each caller
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FunctionStats {
    pub calls: CallStats,

    #[serde(with = "keyed_entries")]
    pub callers: BTreeMap<FunctionKey, CallStats>,
}

impl FunctionStats {
    pub fn new(calls: CallStats) -> Self {
        Self {
            calls,
            callers: BTreeMap::new(),
        }
    }

    pub fn with_caller(mut self, caller: FunctionKey, stats: CallStats) -> Self {
        self.add_caller(caller, &stats);
        self
    }

    pub fn add_caller(&mut self, caller: FunctionKey, stats: &CallStats) {
        self.callers.entry(caller).or_default().add(stats);
    }

    /// Sum counters and union caller edges
    pub fn merge(&mut self, other: &FunctionStats) {
        self.calls.add(&other.calls);
        for (caller, stats) in &other.callers {
            self.add_caller(caller.clone(), stats);
        }
    }
}

/// Call statistics captured for one invocation, keyed by function
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileData {
    #[serde(with = "keyed_entries")]
    functions: BTreeMap<FunctionKey, FunctionStats>,
}

impl ProfileData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or merge the stats for one function
    pub fn insert(&mut self, key: FunctionKey, stats: FunctionStats) {
        match self.functions.get_mut(&key) {
            Some(existing) => existing.merge(&stats),
            None => {
                self.functions.insert(key, stats);
            }
        }
    }

    /// Builder-style [`ProfileData::insert`]
    pub fn with_function(mut self, key: FunctionKey, stats: FunctionStats) -> Self {
        self.insert(key, stats);
        self
    }

    /// Account one finished call of `callee`, made from `caller` if any
    pub fn record_call(&mut self, callee: FunctionKey, caller: Option<&FunctionKey>, stats: CallStats) {
        let entry = self.functions.entry(callee).or_default();
        entry.calls.add(&stats);
        if let Some(caller) = caller {
            entry.add_caller(caller.clone(), &stats);
        }
    }

    /// Fold another profile into this one
    pub fn merge(&mut self, other: &ProfileData) {
        for (key, stats) in &other.functions {
            self.insert(key.clone(), stats.clone());
        }
    }

    pub fn get(&self, key: &FunctionKey) -> Option<&FunctionStats> {
        self.functions.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FunctionKey, &FunctionStats)> {
        self.functions.iter()
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Sum of call counts over all functions
    pub fn total_calls(&self) -> u64 {
        self.functions.values().map(|s| s.calls.total_calls).sum()
    }

    /// Sum of primitive call counts over all functions
    pub fn primitive_calls(&self) -> u64 {
        self.functions.values().map(|s| s.calls.primitive_calls).sum()
    }

    /// Sum of internal time over all functions
    pub fn total_time(&self) -> f64 {
        self.functions.values().map(|s| s.calls.total_time).sum()
    }

    pub(crate) fn into_functions(self) -> BTreeMap<FunctionKey, FunctionStats> {
        self.functions
    }

    pub(crate) fn from_functions(functions: BTreeMap<FunctionKey, FunctionStats>) -> Self {
        Self { functions }
    }
}

/// Immutable snapshot of one request's profile
///
/// Cloning shares the underlying data; there is no way to mutate it once
/// the record exists. Aggregation copies the data into a
/// [`StatsAccumulator`](crate::aggregator::StatsAccumulator) instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileRecord {
    request_id: RequestId,
    path: String,
    captured_at: DateTime<Utc>,
    data: Arc<ProfileData>,

    /// Arrival order inside a store; assigned on insertion
    #[serde(skip)]
    sequence: u64,
}

impl ProfileRecord {
    pub fn new(request_id: RequestId, path: impl Into<String>, data: ProfileData) -> Self {
        Self {
            request_id,
            path: path.into(),
            captured_at: Utc::now(),
            data: Arc::new(data),
            sequence: 0,
        }
    }

    pub fn request_id(&self) -> &RequestId {
        &self.request_id
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    pub fn data(&self) -> &ProfileData {
        &self.data
    }

    pub(crate) fn sequence(&self) -> u64 {
        self.sequence
    }

    pub(crate) fn with_sequence(mut self, sequence: u64) -> Self {
        self.sequence = sequence;
        self
    }
}

/// Serialize maps with structured keys as a list of `[key, value]` pairs,
/// since JSON object keys must be strings.
mod keyed_entries {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::collections::BTreeMap;

    pub fn serialize<K, V, S>(map: &BTreeMap<K, V>, serializer: S) -> Result<S::Ok, S::Error>
    where
        K: Serialize,
        V: Serialize,
        S: Serializer,
    {
        serializer.collect_seq(map.iter())
    }

    pub fn deserialize<'de, K, V, D>(deserializer: D) -> Result<BTreeMap<K, V>, D::Error>
    where
        K: Deserialize<'de> + Ord,
        V: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        let entries = Vec::<(K, V)>::deserialize(deserializer)?;
        Ok(entries.into_iter().collect())
    }
}
