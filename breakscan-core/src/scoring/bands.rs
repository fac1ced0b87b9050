//! Breakpoint tables.
//!
//! A [`BandTable`] maps one metric value to points: bands are tried in order,
//! the first whose bound contains the value wins, and the default band
//! applies when none do. Each table declares the [`Trend`] its points must
//! follow so a tuned table can be checked for inversions.

use serde::{Deserialize, Serialize};

/// Condition a value must satisfy for a band to match.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bound {
    /// value < x
    Below(f64),
    /// value <= x
    AtMost(f64),
    /// value > x
    Above(f64),
    /// value >= x
    AtLeast(f64),
    /// lo <= value <= hi
    Between(f64, f64),
}

impl Bound {
    pub fn contains(&self, value: f64) -> bool {
        match *self {
            Bound::Below(x) => value < x,
            Bound::AtMost(x) => value <= x,
            Bound::Above(x) => value > x,
            Bound::AtLeast(x) => value >= x,
            Bound::Between(lo, hi) => value >= lo && value <= hi,
        }
    }

    fn edges(&self) -> Vec<f64> {
        match *self {
            Bound::Below(x) | Bound::AtMost(x) | Bound::Above(x) | Bound::AtLeast(x) => vec![x],
            Bound::Between(lo, hi) => vec![lo, hi],
        }
    }
}

/// Expected shape of points as the metric value increases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    /// Points never rise as the value rises.
    Decreasing,
    /// Points never fall as the value rises.
    Increasing,
    /// Points rise to a single plateau, then fall.
    Unimodal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub bound: Bound,
    pub points: i32,
    pub label: String,
}

impl Band {
    pub fn new(bound: Bound, points: i32, label: impl Into<String>) -> Self {
        Self {
            bound,
            points,
            label: label.into(),
        }
    }
}

/// Result of looking a value up in a table.
#[derive(Debug, Clone, PartialEq)]
pub struct BandMatch<'a> {
    pub points: i32,
    pub label: &'a str,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandTable {
    pub trend: Trend,
    pub default_points: i32,
    pub default_label: String,
    pub bands: Vec<Band>,
}

impl BandTable {
    pub fn new(trend: Trend, bands: Vec<Band>, default_points: i32, default_label: impl Into<String>) -> Self {
        Self {
            trend,
            default_points,
            default_label: default_label.into(),
            bands,
        }
    }

    /// First matching band, or the default band. NaN never matches a band.
    pub fn lookup(&self, value: f64) -> BandMatch<'_> {
        self.bands
            .iter()
            .find(|b| b.bound.contains(value))
            .map(|b| BandMatch {
                points: b.points,
                label: &b.label,
            })
            .unwrap_or(BandMatch {
                points: self.default_points,
                label: &self.default_label,
            })
    }

    /// Highest points any input can produce.
    pub fn max_points(&self) -> i32 {
        self.bands
            .iter()
            .map(|b| b.points)
            .chain(std::iter::once(self.default_points))
            .max()
            .unwrap_or(self.default_points)
    }

    /// Check that points follow the declared trend.
    ///
    /// Probes every band edge, points just either side of it, and values
    /// well outside the outermost edges, then walks the probes in ascending
    /// order. On failure returns the pair of probe values where the trend breaks.
    pub fn check_trend(&self) -> Result<(), (f64, f64)> {
        let mut edges: Vec<f64> = self.bands.iter().flat_map(|b| b.bound.edges()).collect();
        if edges.iter().any(|e| !e.is_finite()) {
            return Err((f64::NAN, f64::NAN));
        }
        if edges.is_empty() {
            return Ok(());
        }
        edges.sort_by(f64::total_cmp);

        let lo = edges[0];
        let hi = edges[edges.len() - 1];
        let span = (hi - lo).abs().max(1.0);
        let mut probes = vec![lo - span * 10.0, hi + span * 10.0];
        for &e in &edges {
            let delta = e.abs().max(1.0) * 1e-9;
            probes.extend([e - delta, e, e + delta]);
        }
        probes.sort_by(f64::total_cmp);
        probes.dedup();

        let mut descending = false;
        for pair in probes.windows(2) {
            let prev = self.lookup(pair[0]).points;
            let cur = self.lookup(pair[1]).points;
            let broken = match self.trend {
                Trend::Increasing => cur < prev,
                Trend::Decreasing => cur > prev,
                Trend::Unimodal => {
                    if cur < prev {
                        descending = true;
                        false
                    } else {
                        cur > prev && descending
                    }
                }
            };
            if broken {
                return Err((pair[0], pair[1]));
            }
        }
        Ok(())
    }
}
