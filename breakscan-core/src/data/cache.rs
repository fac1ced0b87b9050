//! Parquet cache layer with Hive-style partitioning.
//!
//! Layout: `{cache_dir}/symbol={SYMBOL}/{year}.parquet` plus a `meta.json`
//! sidecar per symbol.
//!
//! - Atomic writes (write to .tmp, rename into place)
//! - Merge on write: new bars replace cached bars for the same date
//! - Corrupt partitions are quarantined (`{year}.parquet.quarantined`)

use super::provider::{DataError, DataSource, FetchResult, SeriesProvider};
use crate::domain::{Bar, Series};
use chrono::{Datelike, NaiveDate};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Metadata sidecar for a cached symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheMeta {
    pub symbol: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub bar_count: usize,
    pub data_hash: String,
    pub source: DataSource,
    pub cached_at: chrono::NaiveDateTime,
}

/// The Parquet cache.
#[derive(Debug, Clone)]
pub struct ParquetCache {
    cache_dir: PathBuf,
}

impl ParquetCache {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    fn symbol_dir(&self, symbol: &str) -> PathBuf {
        self.cache_dir.join(format!("symbol={symbol}"))
    }

    fn year_path(&self, symbol: &str, year: i32) -> PathBuf {
        self.symbol_dir(symbol).join(format!("{year}.parquet"))
    }

    fn meta_path(&self, symbol: &str) -> PathBuf {
        self.symbol_dir(symbol).join("meta.json")
    }

    /// Merge a series into the cache.
    ///
    /// Existing bars are kept unless the incoming series has the same date.
    /// Only the year partitions touched by the merged data are rewritten.
    pub fn write(&self, series: &Series, source: DataSource) -> Result<(), DataError> {
        let symbol = series.symbol();
        let merged = match self.load(symbol) {
            Ok(existing) => {
                let mut bars = existing.bars().to_vec();
                bars.extend_from_slice(series.bars());
                Series::from_unsorted(symbol, bars)?
            }
            Err(DataError::NoCachedData { .. }) => series.clone(),
            Err(e) => return Err(e),
        };

        fs::create_dir_all(self.symbol_dir(symbol))
            .map_err(|e| DataError::CacheError(format!("failed to create dir: {e}")))?;

        let mut by_year: BTreeMap<i32, Vec<&Bar>> = BTreeMap::new();
        for bar in merged.bars() {
            by_year.entry(bar.date.year()).or_default().push(bar);
        }

        for (year, year_bars) in &by_year {
            let mut df = bars_to_dataframe(year_bars)?;
            let path = self.year_path(symbol, *year);
            let tmp_path = path.with_extension("parquet.tmp");

            write_parquet(&mut df, &tmp_path)?;

            fs::rename(&tmp_path, &path).map_err(|e| {
                let _ = fs::remove_file(&tmp_path);
                DataError::CacheError(format!("atomic rename failed: {e}"))
            })?;
        }

        let mut hasher = blake3::Hasher::new();
        merged.hash_into(&mut hasher);
        let meta = CacheMeta {
            symbol: symbol.to_string(),
            start_date: merged.first_date(),
            end_date: merged.last_date(),
            bar_count: merged.len(),
            data_hash: hasher.finalize().to_hex().to_string(),
            source,
            cached_at: chrono::Local::now().naive_local(),
        };
        let meta_json = serde_json::to_string_pretty(&meta)
            .map_err(|e| DataError::CacheError(format!("meta serialization: {e}")))?;
        fs::write(self.meta_path(symbol), meta_json)
            .map_err(|e| DataError::CacheError(format!("meta write: {e}")))?;

        tracing::debug!(symbol, bars = merged.len(), "cache updated");
        Ok(())
    }

    /// Load all cached bars for a symbol.
    pub fn load(&self, symbol: &str) -> Result<Series, DataError> {
        let sym_dir = self.symbol_dir(symbol);
        if !sym_dir.exists() {
            return Err(DataError::NoCachedData {
                symbol: symbol.to_string(),
            });
        }

        let mut all_bars = Vec::new();
        let entries = fs::read_dir(&sym_dir).map_err(|e| DataError::CacheError(format!("read dir: {e}")))?;

        for entry in entries {
            let path = entry
                .map_err(|e| DataError::CacheError(format!("dir entry: {e}")))?
                .path();

            if path.extension().and_then(|e| e.to_str()) != Some("parquet") {
                continue;
            }

            match load_and_validate_parquet(&path) {
                Ok(bars) => all_bars.extend(bars),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "quarantining corrupt cache file");
                    let _ = fs::rename(&path, path.with_extension("parquet.quarantined"));
                }
            }
        }

        if all_bars.is_empty() {
            return Err(DataError::NoCachedData {
                symbol: symbol.to_string(),
            });
        }

        Ok(Series::from_unsorted(symbol, all_bars)?)
    }

    /// Cached bars within an inclusive date range.
    pub fn load_range(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Result<Series, DataError> {
        let full = self.load(symbol)?;
        let bars: Vec<Bar> = full
            .bars()
            .iter()
            .filter(|b| b.date >= start && b.date <= end)
            .copied()
            .collect();
        if bars.is_empty() {
            return Err(DataError::NoCachedData {
                symbol: symbol.to_string(),
            });
        }
        Ok(Series::new(symbol, bars)?)
    }

    pub fn get_meta(&self, symbol: &str) -> Option<CacheMeta> {
        let content = fs::read_to_string(self.meta_path(symbol)).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// Check if cached data for a symbol covers the requested date range.
    pub fn covers_range(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> CoverageResult {
        match self.get_meta(symbol) {
            None => CoverageResult::NotCached,
            Some(meta) if meta.start_date <= start && meta.end_date >= end => CoverageResult::FullyCovered,
            Some(meta) => CoverageResult::PartiallyCovered {
                cached_start: meta.start_date,
                cached_end: meta.end_date,
            },
        }
    }
}

/// How well the cache covers the requested date range.
#[derive(Debug, Clone, PartialEq)]
pub enum CoverageResult {
    NotCached,
    FullyCovered,
    PartiallyCovered {
        cached_start: NaiveDate,
        cached_end: NaiveDate,
    },
}

/// Read-through, write-through wrapper around another provider.
///
/// Fully covered ranges are served from disk. Anything else goes to the
/// inner provider and the result is merged into the cache. When the inner
/// provider fails, whatever the cache holds for the range is returned.
pub struct CachedProvider<P> {
    cache: ParquetCache,
    inner: P,
}

impl<P: SeriesProvider> CachedProvider<P> {
    pub fn new(cache: ParquetCache, inner: P) -> Self {
        Self { cache, inner }
    }

    pub fn cache(&self) -> &ParquetCache {
        &self.cache
    }
}

impl<P: SeriesProvider> SeriesProvider for CachedProvider<P> {
    fn name(&self) -> &str {
        "cached"
    }

    fn fetch(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Result<FetchResult, DataError> {
        if self.cache.covers_range(symbol, start, end) == CoverageResult::FullyCovered {
            if let Ok(series) = self.cache.load_range(symbol, start, end) {
                return Ok(FetchResult {
                    series,
                    source: DataSource::Cache,
                });
            }
        }

        match self.inner.fetch(symbol, start, end) {
            Ok(fetched) => {
                if let Err(e) = self.cache.write(&fetched.series, fetched.source) {
                    tracing::warn!(symbol, error = %e, "cache write failed");
                }
                Ok(fetched)
            }
            Err(e) => match self.cache.load_range(symbol, start, end) {
                Ok(series) => {
                    tracing::warn!(symbol, error = %e, "provider failed; serving stale cache");
                    Ok(FetchResult {
                        series,
                        source: DataSource::Cache,
                    })
                }
                Err(_) => Err(e),
            },
        }
    }

    fn is_available(&self) -> bool {
        true
    }
}

// ── Parquet I/O helpers ─────────────────────────────────────────────

fn epoch() -> NaiveDate {
    NaiveDate::default()
}

fn bars_to_dataframe(bars: &[&Bar]) -> Result<DataFrame, DataError> {
    let dates: Vec<i32> = bars.iter().map(|b| (b.date - epoch()).num_days() as i32).collect();
    let opens: Vec<f64> = bars.iter().map(|b| b.open).collect();
    let highs: Vec<f64> = bars.iter().map(|b| b.high).collect();
    let lows: Vec<f64> = bars.iter().map(|b| b.low).collect();
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let volumes: Vec<u64> = bars.iter().map(|b| b.volume).collect();

    DataFrame::new(vec![
        Column::new("date".into(), dates)
            .cast(&DataType::Date)
            .map_err(|e| DataError::ParquetError(format!("date cast: {e}")))?,
        Column::new("open".into(), opens),
        Column::new("high".into(), highs),
        Column::new("low".into(), lows),
        Column::new("close".into(), closes),
        Column::new("volume".into(), volumes),
    ])
    .map_err(|e| DataError::ParquetError(format!("dataframe creation: {e}")))
}

fn write_parquet(df: &mut DataFrame, path: &Path) -> Result<(), DataError> {
    let file = fs::File::create(path).map_err(|e| DataError::ParquetError(format!("create file: {e}")))?;
    ParquetWriter::new(file)
        .finish(df)
        .map_err(|e| DataError::ParquetError(format!("write parquet: {e}")))?;
    Ok(())
}

fn load_and_validate_parquet(path: &Path) -> Result<Vec<Bar>, DataError> {
    let file = fs::File::open(path).map_err(|e| DataError::ParquetError(format!("open: {e}")))?;
    let df = ParquetReader::new(file)
        .finish()
        .map_err(|e| DataError::ParquetError(format!("read: {e}")))?;

    if df.height() == 0 {
        return Err(DataError::ValidationError("empty parquet file".into()));
    }
    for col_name in ["date", "open", "high", "low", "close", "volume"] {
        if df.column(col_name).is_err() {
            return Err(DataError::ValidationError(format!("missing column '{col_name}'")));
        }
    }

    dataframe_to_bars(&df)
}

fn dataframe_to_bars(df: &DataFrame) -> Result<Vec<Bar>, DataError> {
    let col = |name: &str| {
        df.column(name)
            .map_err(|e| DataError::ParquetError(format!("column read: {e}")))
    };
    let type_err = |name: &'static str| move |e: PolarsError| DataError::ParquetError(format!("{name} column type: {e}"));

    let date_col = col("date")?;
    let open_col = col("open")?;
    let high_col = col("high")?;
    let low_col = col("low")?;
    let close_col = col("close")?;
    let volume_col = col("volume")?;

    let date_ca = date_col.date().map_err(type_err("date"))?;
    let open_ca = open_col.f64().map_err(type_err("open"))?;
    let high_ca = high_col.f64().map_err(type_err("high"))?;
    let low_ca = low_col.f64().map_err(type_err("low"))?;
    let close_ca = close_col.f64().map_err(type_err("close"))?;
    let vol_ca = volume_col.u64().map_err(type_err("volume"))?;

    let null = |name: &str, i: usize| DataError::ValidationError(format!("null {name} at row {i}"));

    (0..df.height())
        .map(|i| {
            let days = date_ca.get(i).ok_or_else(|| null("date", i))?;
            Ok(Bar {
                date: epoch() + chrono::Duration::days(i64::from(days)),
                open: open_ca.get(i).ok_or_else(|| null("open", i))?,
                high: high_ca.get(i).ok_or_else(|| null("high", i))?,
                low: low_ca.get(i).ok_or_else(|| null("low", i))?,
                close: close_ca.get(i).ok_or_else(|| null("close", i))?,
                volume: vol_ca.get(i).unwrap_or(0),
            })
        })
        .collect()
}
