//! Data sources, caching, and alignment.

pub mod align;
pub mod cache;
pub mod circuit_breaker;
pub mod csv_import;
pub mod download;
pub mod provider;
pub mod universe;
pub mod yahoo;

pub use align::{inner_join, AlignedClose};
pub use cache::{CacheMeta, CachedProvider, CoverageResult, ParquetCache};
pub use circuit_breaker::{BreakerState, CircuitBreaker};
pub use csv_import::CsvProvider;
pub use download::{download_symbols, DownloadSummary};
pub use provider::{DataError, DataSource, DownloadProgress, FetchResult, SeriesProvider, StaticProvider, StdoutProgress};
pub use universe::{load_tickers, parse_ticker_list, Universe, UniverseError};
pub use yahoo::YahooProvider;
