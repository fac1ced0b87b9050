//! Multi-symbol download into the parquet cache.

use super::cache::{CoverageResult, ParquetCache};
use super::provider::{DataError, DownloadProgress, SeriesProvider};
use chrono::NaiveDate;

/// Download symbols and merge them into the cache.
///
/// Symbols already covered for the range are skipped unless `force` is set.
/// Stops early once the provider reports itself unavailable.
pub fn download_symbols(
    provider: &dyn SeriesProvider,
    cache: &ParquetCache,
    symbols: &[String],
    start: NaiveDate,
    end: NaiveDate,
    force: bool,
    progress: &dyn DownloadProgress,
) -> DownloadSummary {
    let total = symbols.len();
    let mut succeeded = 0;
    let mut errors: Vec<(String, DataError)> = Vec::new();

    for (i, symbol) in symbols.iter().enumerate() {
        progress.on_start(symbol, i, total);

        if !force && cache.covers_range(symbol, start, end) == CoverageResult::FullyCovered {
            let bars = cache.get_meta(symbol).map(|m| m.bar_count).unwrap_or(0);
            progress.on_complete(symbol, i, total, &Ok(bars));
            succeeded += 1;
            continue;
        }

        let result = provider
            .fetch(symbol, start, end)
            .and_then(|fetched| {
                cache.write(&fetched.series, fetched.source)?;
                Ok(fetched.series.len())
            });
        progress.on_complete(symbol, i, total, &result);

        match result {
            Ok(_) => succeeded += 1,
            Err(e) => errors.push((symbol.clone(), e)),
        }

        if !provider.is_available() {
            tracing::warn!(remaining = total - i - 1, "provider unavailable; aborting download");
            for sym in &symbols[(i + 1)..] {
                errors.push((sym.clone(), DataError::CircuitBreakerTripped));
            }
            break;
        }
    }

    let failed = errors.len();
    progress.on_batch_complete(succeeded, failed, total);

    DownloadSummary {
        total,
        succeeded,
        failed,
        errors,
    }
}

#[derive(Debug)]
pub struct DownloadSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub errors: Vec<(String, DataError)>,
}

impl DownloadSummary {
    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::provider::{StaticProvider, StdoutProgress};
    use crate::domain::{Bar, Series};

    #[test]
    fn downloads_known_and_reports_unknown() {
        let dir = std::env::temp_dir().join(format!("breakscan_download_test_{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        let cache = ParquetCache::new(&dir);
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let series = Series::new(
            "AAA",
            vec![Bar {
                date,
                open: 1.0,
                high: 2.0,
                low: 0.5,
                close: 1.5,
                volume: 10,
            }],
        )
        .unwrap();
        let provider = StaticProvider::new().with(series);
        let symbols = vec!["AAA".to_string(), "ZZZ".to_string()];

        let summary = download_symbols(&provider, &cache, &symbols, date, date, false, &StdoutProgress);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 1);
        assert!(!summary.all_succeeded());
        assert_eq!(summary.errors[0].0, "ZZZ");
        assert_eq!(cache.load("AAA").unwrap().len(), 1);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
