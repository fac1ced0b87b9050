//! Series: a validated, date-ordered run of bars for one symbol.

use super::Bar;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SeriesError {
    #[error("series for {symbol} has no bars")]
    Empty { symbol: String },

    #[error("series for {symbol} is not strictly increasing at {date} (previous {previous})")]
    NotIncreasing {
        symbol: String,
        date: NaiveDate,
        previous: NaiveDate,
    },

    #[error("series for {symbol} has an invalid bar on {date}: {reason}")]
    InvalidBar {
        symbol: String,
        date: NaiveDate,
        reason: String,
    },
}

/// Daily bars for one symbol, strictly increasing by date with no duplicates.
///
/// Immutable once built. Truncation returns a new series. Deserialization
/// goes through [`Series::new`], so decoded series hold the same invariants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSeries")]
pub struct Series {
    symbol: String,
    bars: Vec<Bar>,
}

#[derive(Deserialize)]
struct RawSeries {
    symbol: String,
    bars: Vec<Bar>,
}

impl TryFrom<RawSeries> for Series {
    type Error = SeriesError;

    fn try_from(raw: RawSeries) -> Result<Self, Self::Error> {
        Series::new(raw.symbol, raw.bars)
    }
}

impl Series {
    pub fn new(symbol: impl Into<String>, bars: Vec<Bar>) -> Result<Self, SeriesError> {
        let symbol = symbol.into();
        if bars.is_empty() {
            return Err(SeriesError::Empty { symbol });
        }

        for (i, bar) in bars.iter().enumerate() {
            if bar.has_non_finite() {
                return Err(SeriesError::InvalidBar {
                    symbol,
                    date: bar.date,
                    reason: "non-finite price".into(),
                });
            }
            if bar.open < 0.0 || bar.high < 0.0 || bar.low < 0.0 || bar.close < 0.0 {
                return Err(SeriesError::InvalidBar {
                    symbol,
                    date: bar.date,
                    reason: "negative price".into(),
                });
            }
            if i > 0 && bar.date <= bars[i - 1].date {
                return Err(SeriesError::NotIncreasing {
                    symbol,
                    date: bar.date,
                    previous: bars[i - 1].date,
                });
            }
        }

        Ok(Self { symbol, bars })
    }

    /// Sort by date and drop duplicate dates (keeping the last occurrence) before validating.
    pub fn from_unsorted(symbol: impl Into<String>, mut bars: Vec<Bar>) -> Result<Self, SeriesError> {
        bars.sort_by_key(|b| b.date);
        let mut deduped: Vec<Bar> = Vec::with_capacity(bars.len());
        for bar in bars {
            match deduped.last_mut() {
                Some(last) if last.date == bar.date => *last = bar,
                _ => deduped.push(bar),
            }
        }
        Self::new(symbol, deduped)
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn first_date(&self) -> NaiveDate {
        self.bars[0].date
    }

    pub fn last_date(&self) -> NaiveDate {
        self.bars[self.bars.len() - 1].date
    }

    pub fn last(&self) -> &Bar {
        &self.bars[self.bars.len() - 1]
    }

    pub fn opens(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.open).collect()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn volumes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.volume as f64).collect()
    }

    /// The last `n` bars (or all of them when shorter).
    pub fn tail(&self, n: usize) -> &[Bar] {
        let start = self.bars.len().saturating_sub(n);
        &self.bars[start..]
    }

    /// Bars dated on or before `cutoff`. `None` when nothing remains.
    pub fn truncate_at(&self, cutoff: NaiveDate) -> Option<Series> {
        let end = self.bars.partition_point(|b| b.date <= cutoff);
        if end == 0 {
            return None;
        }
        Some(Self {
            symbol: self.symbol.clone(),
            bars: self.bars[..end].to_vec(),
        })
    }

    /// Mean volume over the last `window` bars (at least one).
    pub fn avg_volume(&self, window: usize) -> f64 {
        let tail = self.tail(window.max(1));
        if tail.is_empty() {
            return 0.0;
        }
        tail.iter().map(|b| b.volume as f64).sum::<f64>() / tail.len() as f64
    }

    /// Feed the symbol and every bar field into a BLAKE3 hasher.
    pub fn hash_into(&self, hasher: &mut blake3::Hasher) {
        hasher.update(self.symbol.as_bytes());
        for bar in &self.bars {
            hasher.update(bar.date.to_string().as_bytes());
            hasher.update(&bar.open.to_le_bytes());
            hasher.update(&bar.high.to_le_bytes());
            hasher.update(&bar.low.to_le_bytes());
            hasher.update(&bar.close.to_le_bytes());
            hasher.update(&bar.volume.to_le_bytes());
        }
    }
}
