//! Date alignment of a ticker against a benchmark.
//!
//! Inner join: only dates present in both series survive. No forward-fill.

use crate::domain::Series;
use chrono::NaiveDate;

/// Closes of both series on one shared date.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlignedClose {
    pub date: NaiveDate,
    pub close: f64,
    pub benchmark_close: f64,
}

/// Join two date-sorted series on date, keeping shared dates in order.
pub fn inner_join(series: &Series, benchmark: &Series) -> Vec<AlignedClose> {
    let a = series.bars();
    let b = benchmark.bars();
    let mut out = Vec::with_capacity(a.len().min(b.len()));

    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].date.cmp(&b[j].date) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                out.push(AlignedClose {
                    date: a[i].date,
                    close: a[i].close,
                    benchmark_close: b[j].close,
                });
                i += 1;
                j += 1;
            }
        }
    }
    out
}
