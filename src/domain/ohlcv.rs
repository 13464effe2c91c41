//! OHLCV bars and the key components derived from them.

use chrono::NaiveDate;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct OhlcvBar {
    pub code: String,
    pub exchange: String,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

impl OhlcvBar {
    /// (high + low) / 2
    pub fn median_price(&self) -> f64 {
        (self.high + self.low) / 2.0
    }

    /// (high + low + close) / 3
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }

    /// (high + low + 2 * close) / 4
    pub fn weighted_price(&self) -> f64 {
        (self.high + self.low + 2.0 * self.close) / 4.0
    }
}

/// Which price of a bar a series is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AppliedPrice {
    Open,
    High,
    Low,
    Close,
    Median,
    Typical,
    Weighted,
}

impl AppliedPrice {
    pub fn of(self, bar: &OhlcvBar) -> f64 {
        match self {
            AppliedPrice::Open => bar.open,
            AppliedPrice::High => bar.high,
            AppliedPrice::Low => bar.low,
            AppliedPrice::Close => bar.close,
            AppliedPrice::Median => bar.median_price(),
            AppliedPrice::Typical => bar.typical_price(),
            AppliedPrice::Weighted => bar.weighted_price(),
        }
    }
}

impl fmt::Display for AppliedPrice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AppliedPrice::Open => "open",
            AppliedPrice::High => "high",
            AppliedPrice::Low => "low",
            AppliedPrice::Close => "close",
            AppliedPrice::Median => "median",
            AppliedPrice::Typical => "typical",
            AppliedPrice::Weighted => "weighted",
        };
        f.write_str(name)
    }
}

impl FromStr for AppliedPrice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "open" => Ok(AppliedPrice::Open),
            "high" => Ok(AppliedPrice::High),
            "low" => Ok(AppliedPrice::Low),
            "close" => Ok(AppliedPrice::Close),
            "median" => Ok(AppliedPrice::Median),
            "typical" => Ok(AppliedPrice::Typical),
            "weighted" => Ok(AppliedPrice::Weighted),
            other => Err(format!("unknown applied price '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Timeframe {
    M1,
    M5,
    M15,
    M30,
    H1,
    H4,
    D1,
    W1,
    MN1,
}

impl Timeframe {
    pub const ALL: [Timeframe; 9] = [
        Timeframe::M1,
        Timeframe::M5,
        Timeframe::M15,
        Timeframe::M30,
        Timeframe::H1,
        Timeframe::H4,
        Timeframe::D1,
        Timeframe::W1,
        Timeframe::MN1,
    ];
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Timeframe::M1 => "M1",
            Timeframe::M5 => "M5",
            Timeframe::M15 => "M15",
            Timeframe::M30 => "M30",
            Timeframe::H1 => "H1",
            Timeframe::H4 => "H4",
            Timeframe::D1 => "D1",
            Timeframe::W1 => "W1",
            Timeframe::MN1 => "MN1",
        };
        f.write_str(name)
    }
}

impl FromStr for Timeframe {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_uppercase();
        Timeframe::ALL
            .into_iter()
            .find(|tf| tf.to_string() == wanted)
            .ok_or_else(|| format!("unknown timeframe '{}'", s.trim()))
    }
}
