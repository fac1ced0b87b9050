//! Ticker universes.
//!
//! Two on-disk forms are accepted:
//! - plain text, one symbol per line, `#` starts a comment
//! - TOML with named sectors, `[sectors] Technology = ["AAPL", ...]`
//!
//! Symbols are trimmed, uppercased, and deduplicated keeping first occurrence.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UniverseError {
    #[error("read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse universe TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("serialize universe: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("unknown sector '{0}'")]
    UnknownSector(String),

    #[error("universe is empty")]
    Empty,
}

/// Sector-organized ticker universe.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Universe {
    pub sectors: BTreeMap<String, Vec<String>>,
}

impl Universe {
    pub fn from_toml(content: &str) -> Result<Self, UniverseError> {
        let mut universe: Universe = toml::from_str(content)?;
        for tickers in universe.sectors.values_mut() {
            *tickers = normalize(tickers.iter().map(String::as_str));
        }
        Ok(universe)
    }

    pub fn to_toml(&self) -> Result<String, UniverseError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// All tickers across sectors, deduplicated in sector order.
    pub fn all_tickers(&self) -> Vec<String> {
        normalize(self.sectors.values().flatten().map(String::as_str))
    }

    pub fn sector_tickers(&self, sector: &str) -> Result<&[String], UniverseError> {
        self.sectors
            .get(sector)
            .map(Vec::as_slice)
            .ok_or_else(|| UniverseError::UnknownSector(sector.to_string()))
    }

    pub fn sector_names(&self) -> Vec<&str> {
        self.sectors.keys().map(String::as_str).collect()
    }

    pub fn ticker_count(&self) -> usize {
        self.all_tickers().len()
    }

    /// A small default universe of liquid US names and sector ETFs.
    pub fn default_us() -> Self {
        let sector = |tickers: &[&str]| tickers.iter().map(|t| t.to_string()).collect::<Vec<_>>();
        let mut sectors = BTreeMap::new();
        sectors.insert(
            "Technology".into(),
            sector(&["AAPL", "MSFT", "NVDA", "AMD", "CRM", "ADBE", "ORCL", "PLTR", "SNOW", "NET"]),
        );
        sectors.insert(
            "Healthcare".into(),
            sector(&["JNJ", "UNH", "PFE", "ABBV", "MRK", "LLY", "TMO", "ISRG"]),
        );
        sectors.insert(
            "Finance".into(),
            sector(&["JPM", "BAC", "GS", "MS", "SCHW", "AXP", "V", "COIN"]),
        );
        sectors.insert(
            "Energy".into(),
            sector(&["XOM", "CVX", "COP", "SLB", "EOG", "OXY"]),
        );
        sectors.insert(
            "Consumer".into(),
            sector(&["WMT", "COST", "HD", "MCD", "NKE", "SBUX", "TGT", "LULU"]),
        );
        sectors.insert(
            "ETFs".into(),
            sector(&["QQQ", "IWM", "XLF", "XLE", "XLK", "XLV", "SMH"]),
        );
        Self { sectors }
    }
}

/// Parse a plain-text ticker list.
pub fn parse_ticker_list(content: &str) -> Vec<String> {
    normalize(
        content
            .lines()
            .map(|line| line.split('#').next().unwrap_or_default())
            .flat_map(|line| line.split([',', ' ', '\t'])),
    )
}

/// Load tickers from a file: `.toml` is read as a [`Universe`], anything
/// else as a plain list.
pub fn load_tickers(path: &Path) -> Result<Vec<String>, UniverseError> {
    let content = std::fs::read_to_string(path).map_err(|source| UniverseError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let tickers = if path.extension().and_then(|e| e.to_str()) == Some("toml") {
        Universe::from_toml(&content)?.all_tickers()
    } else {
        parse_ticker_list(&content)
    };
    if tickers.is_empty() {
        return Err(UniverseError::Empty);
    }
    Ok(tickers)
}

fn normalize<'a>(raw: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    raw.map(|t| t.trim().to_ascii_uppercase())
        .filter(|t| !t.is_empty())
        .filter(|t| seen.insert(t.clone()))
        .collect()
}
