//! Domain types for the breakout scanner

pub mod bar;
pub mod series;

pub use bar::Bar;
pub use series::{Series, SeriesError};

/// Symbol type alias
pub type Symbol = String;
