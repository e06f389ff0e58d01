//! Merge profile records into one sorted statistics view.
//!
//! Records are immutable, so merging happens in a separate owned
//! [`StatsAccumulator`]: it starts from a copy of the first record's data and
//! folds the remaining records in by summing counters per function and per
//! caller edge.

use crate::profile::schema::{FunctionKey, FunctionStats, ProfileData, ProfileRecord};
use log::debug;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Recognized sort orders for the statistics view
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SortKey {
    #[default]
    CumulativeTime,
    FileName,
    CallCount,
    PrimitiveCallCount,
    Line,
    Name,
    NameFileLine,
    StdName,
    InternalTime,
}

impl SortKey {
    /// All keys in the order the viewer lists them
    pub const ALL: [SortKey; 9] = [
        SortKey::CumulativeTime,
        SortKey::FileName,
        SortKey::CallCount,
        SortKey::PrimitiveCallCount,
        SortKey::Line,
        SortKey::Name,
        SortKey::NameFileLine,
        SortKey::StdName,
        SortKey::InternalTime,
    ];

    /// Parse a query-string sort name (canonical names and common aliases)
    pub fn from_name(name: &str) -> Option<Self> {
        let key = match name {
            "cumtime" | "cumulative" => SortKey::CumulativeTime,
            "filename" | "file" | "module" => SortKey::FileName,
            "ncalls" | "calls" => SortKey::CallCount,
            "pcalls" => SortKey::PrimitiveCallCount,
            "line" => SortKey::Line,
            "name" => SortKey::Name,
            "nfl" => SortKey::NameFileLine,
            "stdname" => SortKey::StdName,
            "tottime" | "time" => SortKey::InternalTime,
            _ => return None,
        };
        Some(key)
    }

    /// Canonical query-string name
    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::CumulativeTime => "cumtime",
            SortKey::FileName => "filename",
            SortKey::CallCount => "ncalls",
            SortKey::PrimitiveCallCount => "pcalls",
            SortKey::Line => "line",
            SortKey::Name => "name",
            SortKey::NameFileLine => "nfl",
            SortKey::StdName => "stdname",
            SortKey::InternalTime => "tottime",
        }
    }

    /// Human readable description
    pub fn description(&self) -> &'static str {
        match self {
            SortKey::CumulativeTime => "cumulative time",
            SortKey::FileName => "file name",
            SortKey::CallCount => "call count",
            SortKey::PrimitiveCallCount => "primitive call count",
            SortKey::Line => "line number",
            SortKey::Name => "function name",
            SortKey::NameFileLine => "name/file/line",
            SortKey::StdName => "standard name",
            SortKey::InternalTime => "internal time",
        }
    }

    /// Compare two entries by this key only (no tie-break)
    fn compare(&self, a: (&FunctionKey, &FunctionStats), b: (&FunctionKey, &FunctionStats)) -> Ordering {
        let (ka, sa) = a;
        let (kb, sb) = b;
        match self {
            // numeric keys sort descending
            SortKey::CumulativeTime => sb.calls.cumulative_time.total_cmp(&sa.calls.cumulative_time),
            SortKey::InternalTime => sb.calls.total_time.total_cmp(&sa.calls.total_time),
            SortKey::CallCount => sb.calls.total_calls.cmp(&sa.calls.total_calls),
            SortKey::PrimitiveCallCount => sb.calls.primitive_calls.cmp(&sa.calls.primitive_calls),
            SortKey::FileName => ka.file.cmp(&kb.file),
            SortKey::Line => ka.line.cmp(&kb.line),
            SortKey::Name => ka.name.cmp(&kb.name),
            SortKey::NameFileLine => ka
                .name
                .cmp(&kb.name)
                .then_with(|| ka.file.cmp(&kb.file))
                .then_with(|| ka.line.cmp(&kb.line)),
            SortKey::StdName => ka.std_string().cmp(&kb.std_string()),
        }
    }
}

/// Owned, mutable merge of one or more records
#[derive(Debug, Clone)]
pub struct StatsAccumulator {
    data: ProfileData,
    record_count: usize,
}

impl StatsAccumulator {
    /// Start from a copy of `record`'s data
    pub fn from_record(record: &ProfileRecord) -> Self {
        Self {
            data: record.data().clone(),
            record_count: 1,
        }
    }

    /// Fold another record in
    pub fn add(&mut self, record: &ProfileRecord) {
        self.data.merge(record.data());
        self.record_count += 1;
    }

    /// Drop directory components from every file name, merging entries that
    /// become identical
    pub fn strip_dirs(&mut self) {
        let functions = std::mem::take(&mut self.data).into_functions();
        let mut stripped: BTreeMap<FunctionKey, FunctionStats> = BTreeMap::new();

        for (key, stats) in functions {
            let mut new_stats = FunctionStats::new(stats.calls);
            for (caller, caller_stats) in &stats.callers {
                new_stats.add_caller(caller.stripped(), caller_stats);
            }
            stripped
                .entry(key.stripped())
                .or_default()
                .merge(&new_stats);
        }

        self.data = ProfileData::from_functions(stripped);
    }

    pub fn data(&self) -> &ProfileData {
        &self.data
    }

    pub fn record_count(&self) -> usize {
        self.record_count
    }

    /// Finish the merge as a sorted view
    ///
    /// The sort is stable and ties fall back to the (file, line, name) order
    /// of the function key, so identical inputs always print identically.
    pub fn sort(self, sort_key: SortKey) -> AggregatedStats {
        let total_calls = self.data.total_calls();
        let primitive_calls = self.data.primitive_calls();
        let total_time = self.data.total_time();

        let mut entries: Vec<(FunctionKey, FunctionStats)> =
            self.data.into_functions().into_iter().collect();
        entries.sort_by(|a, b| {
            sort_key
                .compare((&a.0, &a.1), (&b.0, &b.1))
                .then_with(|| a.0.cmp(&b.0))
        });

        AggregatedStats {
            entries,
            sort_key,
            total_calls,
            primitive_calls,
            total_time,
            record_count: self.record_count,
        }
    }
}

/// Merge an ordered sequence of records
///
/// Returns `None` for an empty sequence; callers show that as "no match"
/// rather than treating it as an error.
pub fn aggregate(records: &[ProfileRecord]) -> Option<StatsAccumulator> {
    let (first, rest) = records.split_first()?;
    let mut accumulator = StatsAccumulator::from_record(first);
    for record in rest {
        accumulator.add(record);
    }
    debug!(
        "Aggregated {} records into {} functions",
        accumulator.record_count(),
        accumulator.data().len()
    );
    Some(accumulator)
}

/// Sorted, request-scoped statistics over one or more records
#[derive(Debug, Clone)]
pub struct AggregatedStats {
    entries: Vec<(FunctionKey, FunctionStats)>,
    sort_key: SortKey,
    total_calls: u64,
    primitive_calls: u64,
    total_time: f64,
    record_count: usize,
}

impl AggregatedStats {
    pub fn entries(&self) -> &[(FunctionKey, FunctionStats)] {
        &self.entries
    }

    pub fn get(&self, key: &FunctionKey) -> Option<&FunctionStats> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, s)| s)
    }

    pub fn sort_key(&self) -> SortKey {
        self.sort_key
    }

    pub fn total_calls(&self) -> u64 {
        self.total_calls
    }

    pub fn primitive_calls(&self) -> u64 {
        self.primitive_calls
    }

    pub fn total_time(&self) -> f64 {
        self.total_time
    }

    pub fn record_count(&self) -> usize {
        self.record_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::schema::{CallStats, RequestId};

    fn record(id: &str, functions: &[(&str, &str, u32, f64, f64)]) -> ProfileRecord {
        let mut data = ProfileData::new();
        for (file, name, calls, tt, ct) in functions {
            data.insert(
                FunctionKey::new(*file, 1, *name),
                FunctionStats::new(CallStats::new(*calls as u64, *calls as u64, *tt, *ct)),
            );
        }
        ProfileRecord::new(RequestId::new(id), "/", data)
    }

    #[test]
    fn test_sort_key_names() {
        for key in SortKey::ALL {
            assert_eq!(SortKey::from_name(key.as_str()), Some(key));
        }
        assert_eq!(SortKey::from_name("cumulative"), Some(SortKey::CumulativeTime));
        assert_eq!(SortKey::from_name("bogus"), None);
        assert_eq!(SortKey::default(), SortKey::CumulativeTime);
    }

    #[test]
    fn test_aggregate_empty() {
        assert!(aggregate(&[]).is_none());
    }

    #[test]
    fn test_add_does_not_touch_records() {
        let first = record("1", &[("a.rs", "f", 1, 0.5, 1.0)]);
        let second = record("2", &[("a.rs", "f", 2, 0.5, 1.0)]);

        let mut acc = StatsAccumulator::from_record(&first);
        acc.add(&second);

        let key = FunctionKey::new("a.rs", 1, "f");
        assert_eq!(acc.data().get(&key).unwrap().calls.total_calls, 3);
        assert_eq!(first.data().get(&key).unwrap().calls.total_calls, 1);
        assert_eq!(second.data().get(&key).unwrap().calls.total_calls, 2);
    }

    #[test]
    fn test_strip_dirs_merges_collisions() {
        let rec = record(
            "1",
            &[("/srv/a/util.rs", "f", 1, 0.1, 0.1), ("/srv/b/util.rs", "f", 2, 0.2, 0.2)],
        );
        let mut acc = StatsAccumulator::from_record(&rec);
        acc.strip_dirs();

        let stats = acc.data().get(&FunctionKey::new("util.rs", 1, "f")).unwrap();
        assert_eq!(acc.data().len(), 1);
        assert_eq!(stats.calls.total_calls, 3);
    }

    #[test]
    fn test_sort_ties_broken_by_key() {
        let rec = record(
            "1",
            &[("b.rs", "x", 1, 0.1, 0.5), ("a.rs", "y", 1, 0.1, 0.5), ("c.rs", "z", 1, 0.1, 0.9)],
        );
        let stats = aggregate(&[rec]).unwrap().sort(SortKey::CumulativeTime);
        let files: Vec<&str> = stats.entries().iter().map(|(k, _)| k.file.as_str()).collect();
        assert_eq!(files, vec!["c.rs", "a.rs", "b.rs"]);
    }

    #[test]
    fn test_sort_by_name_ascending() {
        let rec = record("1", &[("a.rs", "zeta", 1, 0.1, 0.5), ("b.rs", "alpha", 5, 0.1, 0.1)]);
        let stats = aggregate(&[rec]).unwrap().sort(SortKey::Name);
        assert_eq!(stats.entries()[0].0.name, "alpha");
    }

    #[test]
    fn test_sort_by_calls_descending() {
        let rec = record("1", &[("a.rs", "few", 1, 0.1, 0.5), ("b.rs", "many", 5, 0.1, 0.1)]);
        let stats = aggregate(&[rec]).unwrap().sort(SortKey::CallCount);
        assert_eq!(stats.entries()[0].0.name, "many");
        assert_eq!(stats.total_calls(), 6);
    }
}
