//! Series resolution for scans and replays.
//!
//! [`DataLoader`] implements the fallback policy:
//! 1. If the cache covers the requested range → use it
//! 2. If a remote provider is configured and reachable → fetch and write through
//! 3. If the remote failed but the cache holds part of the range → serve it (stale)
//! 4. If `synthetic` is enabled → generate synthetic bars (tagged)
//! 5. Otherwise → fail with a clear error
//!
//! Synthetic data is a developer-only debug mode. Results produced on
//! synthetic data are tagged through [`DataSource::Synthetic`].

use breakscan_core::data::{CoverageResult, DataError, DataSource, FetchResult, ParquetCache, SeriesProvider};
use breakscan_core::{Bar, Series, SeriesError};
use chrono::{Datelike, NaiveDate};
use thiserror::Error;
use tracing::{debug, warn};

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("no cached data for '{symbol}' and no network access (use --synthetic for synthetic data)")]
    NoDataOffline { symbol: String },

    #[error("no cached data for '{symbol}' and fetch failed: {source}")]
    FetchFailed { symbol: String, source: DataError },

    #[error("no data source configured for '{symbol}'")]
    NoSource { symbol: String },

    #[error("data error: {0}")]
    Data(#[from] DataError),
}

impl From<LoadError> for DataError {
    fn from(e: LoadError) -> Self {
        match e {
            LoadError::NoDataOffline { symbol } | LoadError::NoSource { symbol } => DataError::NoCachedData { symbol },
            LoadError::FetchFailed { source, .. } => source,
            LoadError::Data(inner) => inner,
        }
    }
}

/// Options controlling how series are resolved.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// If true, never make network requests.
    pub offline: bool,
    /// If true, generate synthetic bars when real data is unavailable.
    pub synthetic: bool,
    /// Skip the cache lookup and always go to the remote provider.
    pub force: bool,
}

/// Cache → remote → synthetic resolver usable anywhere a provider is expected.
pub struct DataLoader {
    cache: Option<ParquetCache>,
    remote: Option<Box<dyn SeriesProvider>>,
    opts: LoadOptions,
}

impl DataLoader {
    pub fn new(opts: LoadOptions) -> Self {
        Self {
            cache: None,
            remote: None,
            opts,
        }
    }

    pub fn with_cache(mut self, cache: ParquetCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_remote(mut self, remote: Box<dyn SeriesProvider>) -> Self {
        self.remote = Some(remote);
        self
    }

    pub fn options(&self) -> &LoadOptions {
        &self.opts
    }

    /// Resolve one symbol over an inclusive date range.
    pub fn load(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Result<FetchResult, LoadError> {
        // Step 1: cache
        if let Some(cache) = &self.cache {
            if !self.opts.force && cache.covers_range(symbol, start, end) == CoverageResult::FullyCovered {
                if let Ok(series) = cache.load_range(symbol, start, end) {
                    debug!(symbol, bars = series.len(), "served from cache");
                    return Ok(FetchResult {
                        series,
                        source: DataSource::Cache,
                    });
                }
            }
        }

        // Step 2: remote, with write-through
        let mut remote_error = None;
        if !self.opts.offline {
            if let Some(remote) = self.remote.as_deref().filter(|r| r.is_available()) {
                match remote.fetch(symbol, start, end) {
                    Ok(fetched) => {
                        if let Some(cache) = &self.cache {
                            if let Err(e) = cache.write(&fetched.series, fetched.source) {
                                warn!(symbol, error = %e, "cache write failed");
                            }
                        }
                        return Ok(fetched);
                    }
                    Err(e) => {
                        warn!(symbol, provider = remote.name(), error = %e, "remote fetch failed");
                        remote_error = Some(e);
                    }
                }
            }
        }

        // Step 3: whatever the cache holds for the range
        if let Some(cache) = &self.cache {
            if let Ok(series) = cache.load_range(symbol, start, end) {
                warn!(symbol, bars = series.len(), "serving partial cache");
                return Ok(FetchResult {
                    series,
                    source: DataSource::Cache,
                });
            }
        }

        // Step 4: synthetic
        if self.opts.synthetic {
            warn!(symbol, "generating synthetic data; results will be tagged as synthetic");
            let series = generate_synthetic_series(symbol, start, end).map_err(DataError::from)?;
            return Ok(FetchResult {
                series,
                source: DataSource::Synthetic,
            });
        }

        // Step 5: fail
        match remote_error {
            Some(source) => Err(LoadError::FetchFailed {
                symbol: symbol.to_string(),
                source,
            }),
            None if self.opts.offline => Err(LoadError::NoDataOffline {
                symbol: symbol.to_string(),
            }),
            None => Err(LoadError::NoSource {
                symbol: symbol.to_string(),
            }),
        }
    }
}

impl SeriesProvider for DataLoader {
    fn name(&self) -> &str {
        "loader"
    }

    fn fetch(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Result<FetchResult, DataError> {
        Ok(self.load(symbol, start, end)?)
    }

    fn is_available(&self) -> bool {
        self.cache.is_some() || self.opts.synthetic || self.remote.as_ref().is_some_and(|r| r.is_available())
    }
}

/// Generate synthetic bars for testing/development.
///
/// A random walk from 100.0 seeded by the symbol name, weekdays only.
pub fn generate_synthetic_series(symbol: &str, start: NaiveDate, end: NaiveDate) -> Result<Series, SeriesError> {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    let seed: [u8; 32] = *blake3::hash(symbol.as_bytes()).as_bytes();
    let mut rng = StdRng::from_seed(seed);

    let mut bars = Vec::new();
    let mut price = 100.0_f64;
    let mut current = start;

    while current <= end {
        let weekday = current.weekday();
        if weekday == chrono::Weekday::Sat || weekday == chrono::Weekday::Sun {
            current += chrono::Duration::days(1);
            continue;
        }

        let daily_return: f64 = rng.gen_range(-0.03..0.03);
        let open = price;
        let close = price * (1.0 + daily_return);
        let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.01));
        let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.01));
        let volume = rng.gen_range(500_000..5_000_000u64);

        bars.push(Bar {
            date: current,
            open,
            high,
            low,
            close,
            volume,
        });

        price = close;
        current += chrono::Duration::days(1);
    }

    Series::new(symbol, bars)
}

#[cfg(test)]
mod tests {
    use super::*;
    use breakscan_core::data::StaticProvider;
    use std::sync::atomic::{AtomicU64, Ordering};

    static TEST_COUNTER: AtomicU64 = AtomicU64::new(0);

    fn temp_cache_dir() -> std::path::PathBuf {
        let id = TEST_COUNTER.fetch_add(1, Ordering::Relaxed);
        let dir = std::env::temp_dir().join(format!("breakscan_loader_test_{}_{id}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, day).unwrap()
    }

    fn sample_series(symbol: &str) -> Series {
        let bars = (0..10)
            .map(|i| Bar {
                date: d(1, 2) + chrono::Duration::days(i),
                open: 100.0 + i as f64,
                high: 102.0 + i as f64,
                low: 99.0 + i as f64,
                close: 101.0 + i as f64,
                volume: 1_000,
            })
            .collect();
        Series::new(symbol, bars).unwrap()
    }

    #[test]
    fn load_from_cache_succeeds() {
        let dir = temp_cache_dir();
        let cache = ParquetCache::new(&dir);
        cache.write(&sample_series("SPY"), DataSource::YahooFinance).unwrap();

        let loader = DataLoader::new(LoadOptions::default()).with_cache(ParquetCache::new(&dir));
        let loaded = loader.load("SPY", d(1, 3), d(1, 8)).unwrap();

        assert_eq!(loaded.source, DataSource::Cache);
        assert_eq!(loaded.series.len(), 6);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn remote_fetch_writes_through() {
        let dir = temp_cache_dir();
        let remote = StaticProvider::new().with(sample_series("AAA"));
        let loader = DataLoader::new(LoadOptions::default())
            .with_cache(ParquetCache::new(&dir))
            .with_remote(Box::new(remote));

        let loaded = loader.load("AAA", d(1, 2), d(1, 11)).unwrap();
        assert_eq!(loaded.source, DataSource::Fixture);

        let meta = ParquetCache::new(&dir).get_meta("AAA").unwrap();
        assert_eq!(meta.bar_count, 10);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn offline_without_cache_fails_without_synthetic() {
        let dir = temp_cache_dir();
        let opts = LoadOptions {
            offline: true,
            ..LoadOptions::default()
        };
        let loader = DataLoader::new(opts)
            .with_cache(ParquetCache::new(&dir))
            .with_remote(Box::new(StaticProvider::new().with(sample_series("SPY"))));

        let err = loader.load("SPY", d(1, 2), d(1, 11)).unwrap_err();
        assert!(matches!(err, LoadError::NoDataOffline { .. }));
        assert!(err.to_string().contains("no cached data"));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn remote_failure_keeps_the_provider_error() {
        let loader = DataLoader::new(LoadOptions::default()).with_remote(Box::new(StaticProvider::new()));
        let err = loader.load("NOPE", d(1, 2), d(1, 11)).unwrap_err();
        assert!(matches!(err, LoadError::FetchFailed { .. }));

        let as_data: DataError = err.into();
        assert!(matches!(as_data, DataError::SymbolNotFound { .. }));
    }

    #[test]
    fn partial_cache_served_when_remote_fails() {
        let dir = temp_cache_dir();
        ParquetCache::new(&dir)
            .write(&sample_series("AAA"), DataSource::YahooFinance)
            .unwrap();

        let loader = DataLoader::new(LoadOptions::default())
            .with_cache(ParquetCache::new(&dir))
            .with_remote(Box::new(StaticProvider::new()));

        // Range extends past the cached end, so step 1 is skipped.
        let loaded = loader.load("AAA", d(1, 2), d(2, 1)).unwrap();
        assert_eq!(loaded.source, DataSource::Cache);
        assert_eq!(loaded.series.len(), 10);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn synthetic_fallback_produces_tagged_data() {
        let opts = LoadOptions {
            synthetic: true,
            ..LoadOptions::default()
        };
        let loader = DataLoader::new(opts);
        let loaded = loader.load("FAKE", d(1, 1), d(3, 31)).unwrap();

        assert_eq!(loaded.source, DataSource::Synthetic);
        assert!(loaded.series.len() > 60);
        assert!(loaded
            .series
            .bars()
            .iter()
            .all(|b| !matches!(b.date.weekday(), chrono::Weekday::Sat | chrono::Weekday::Sun)));
    }

    #[test]
    fn synthetic_data_is_deterministic() {
        let a = generate_synthetic_series("SPY", d(1, 1), d(1, 31)).unwrap();
        let b = generate_synthetic_series("SPY", d(1, 1), d(1, 31)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn different_symbols_get_different_synthetic_data() {
        let spy = generate_synthetic_series("SPY", d(1, 1), d(1, 31)).unwrap();
        let qqq = generate_synthetic_series("QQQ", d(1, 1), d(1, 31)).unwrap();

        assert_eq!(spy.len(), qqq.len());
        assert_ne!(spy.last().close, qqq.last().close);
    }

    #[test]
    fn weekend_only_range_is_an_error() {
        // 2024-01-06 and 07 are Saturday and Sunday.
        assert!(generate_synthetic_series("SPY", d(1, 6), d(1, 7)).is_err());
    }

    #[test]
    fn loader_works_as_a_provider() {
        let opts = LoadOptions {
            synthetic: true,
            ..LoadOptions::default()
        };
        let provider: &dyn SeriesProvider = &DataLoader::new(opts);
        assert!(provider.is_available());
        let fetched = provider.fetch_recent("ABC", d(3, 1), 60).unwrap();
        assert_eq!(fetched.source, DataSource::Synthetic);
        assert!(fetched.series.last().date <= d(3, 1));
    }
}
