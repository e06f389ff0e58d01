//! Plain-text statistics dump.
//!
//! Layout:
//! ```text
//!          12 function calls (10 primitive calls) in 0.042 seconds
//!
//!    Ordered by: cumulative time
//!
//!    ncalls  tottime  percall  cumtime  percall filename:lineno(function)
//!         1    0.001    0.001    0.042    0.042 {request}
//! ```

use super::stats::AggregatedStats;
use crate::profile::schema::CallStats;

const TITLE: &str = "   ncalls  tottime  percall  cumtime  percall filename:lineno(function)";

/// Render aggregated statistics as a fixed-width text table
pub fn render_stats(stats: &AggregatedStats) -> String {
    let mut out = String::new();

    out.push_str(&format!("         {} function calls ", stats.total_calls()));
    if stats.total_calls() != stats.primitive_calls() {
        out.push_str(&format!("({} primitive calls) ", stats.primitive_calls()));
    }
    out.push_str(&format!("in {:.3} seconds\n\n", stats.total_time()));

    out.push_str(&format!(
        "   Ordered by: {}\n\n",
        stats.sort_key().description()
    ));

    if stats.entries().is_empty() {
        return out;
    }

    out.push_str(TITLE);
    out.push('\n');
    for (key, function) in stats.entries() {
        out.push_str(&format_line(&function.calls));
        out.push_str(&key.std_string());
        out.push('\n');
    }
    out.push_str("\n\n");

    out
}

/// Numeric columns of one row, including the trailing separator
fn format_line(calls: &CallStats) -> String {
    let mut count = calls.total_calls.to_string();
    if calls.total_calls != calls.primitive_calls {
        count = format!("{}/{}", count, calls.primitive_calls);
    }

    let per_call_internal = per_call(calls.total_time, calls.total_calls);
    let per_call_cumulative = per_call(calls.cumulative_time, calls.primitive_calls);

    format!(
        "{:>9} {:8.3} {} {:8.3} {} ",
        count, calls.total_time, per_call_internal, calls.cumulative_time, per_call_cumulative
    )
}

fn per_call(time: f64, calls: u64) -> String {
    if calls == 0 {
        " ".repeat(8)
    } else {
        format!("{:8.3}", time / calls as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::stats::{aggregate, SortKey};
    use crate::profile::schema::{FunctionKey, FunctionStats, ProfileData, ProfileRecord, RequestId};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_render_single_record() {
        let data = ProfileData::new()
            .with_function(
                FunctionKey::builtin("<request>"),
                FunctionStats::new(CallStats::new(1, 1, 0.5, 2.0)),
            )
            .with_function(
                FunctionKey::new("app.rs", 10, "fib"),
                FunctionStats::new(CallStats::new(1, 5, 1.5, 1.5)),
            );
        let record = ProfileRecord::new(RequestId::new("1"), "/", data);
        let stats = aggregate(&[record]).unwrap().sort(SortKey::CumulativeTime);

        let expected = "         6 function calls (2 primitive calls) in 2.000 seconds\n\
                        \n\
                        \x20  Ordered by: cumulative time\n\
                        \n\
                        \x20  ncalls  tottime  percall  cumtime  percall filename:lineno(function)\n\
                        \x20       1    0.500    0.500    2.000    2.000 {request}\n\
                        \x20     5/1    1.500    0.300    1.500    1.500 app.rs:10(fib)\n\
                        \n\n";
        assert_eq!(render_stats(&stats), expected);
    }

    #[test]
    fn test_zero_calls_leave_per_call_blank() {
        let line = format_line(&CallStats::new(0, 0, 0.0, 0.0));
        assert_eq!(line, format!("{:>9} {:8.3} {} {:8.3} {} ", "0", 0.0, " ".repeat(8), 0.0, " ".repeat(8)));
    }
}
