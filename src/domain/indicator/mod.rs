//! Indicators computed over a shared [`PriceStorage`].
//!
//! - `IndicatorType`: indicator identity + parameters, parsed from and printed as `SMA(20)`
//! - `Indicator`: an indicator bound to one storage through a strong handle
//!
//! Ownership runs one way: an indicator keeps its storage alive, a storage
//! knows nothing about the indicators reading it.

pub mod ema;
pub mod sma;
pub mod wma;

use std::fmt;
use std::str::FromStr;

use crate::domain::error::RefcacheError;
use crate::domain::refs::Ref;
use crate::domain::storage::PriceStorage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndicatorType {
    Sma(usize),
    Ema(usize),
    Wma(usize),
}

impl IndicatorType {
    pub fn period(self) -> usize {
        match self {
            IndicatorType::Sma(p) | IndicatorType::Ema(p) | IndicatorType::Wma(p) => p,
        }
    }

    /// Applies the indicator to `values`; `None` marks warmup positions.
    pub fn calculate(self, values: &[f64]) -> Vec<Option<f64>> {
        match self {
            IndicatorType::Sma(p) => sma::calculate_sma(values, p),
            IndicatorType::Ema(p) => ema::calculate_ema(values, p),
            IndicatorType::Wma(p) => wma::calculate_wma(values, p),
        }
    }
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Sma(period) => write!(f, "SMA({})", period),
            IndicatorType::Ema(period) => write!(f, "EMA({})", period),
            IndicatorType::Wma(period) => write!(f, "WMA({})", period),
        }
    }
}

impl FromStr for IndicatorType {
    type Err = RefcacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unknown = || RefcacheError::UnknownIndicator {
            spec: s.trim().to_string(),
        };
        let text = s.trim().to_uppercase();
        let (name, rest) = text.split_once('(').ok_or_else(unknown)?;
        let period: usize = rest
            .strip_suffix(')')
            .ok_or_else(unknown)?
            .trim()
            .parse()
            .map_err(|_| unknown())?;
        if period == 0 {
            return Err(unknown());
        }
        match name.trim() {
            "SMA" => Ok(IndicatorType::Sma(period)),
            "EMA" => Ok(IndicatorType::Ema(period)),
            "WMA" => Ok(IndicatorType::Wma(period)),
            _ => Err(unknown()),
        }
    }
}

/// Parses a comma separated indicator list such as `SMA(20), EMA(10)`.
pub fn parse_indicator_list(input: &str) -> Result<Vec<IndicatorType>, RefcacheError> {
    input
        .split(',')
        .filter(|token| !token.trim().is_empty())
        .map(str::parse)
        .collect()
}

/// An indicator reading one shared price series.
#[derive(Debug)]
pub struct Indicator {
    kind: IndicatorType,
    source: Ref<PriceStorage>,
}

impl Indicator {
    pub fn new(kind: IndicatorType, source: Ref<PriceStorage>) -> Self {
        Self { kind, source }
    }

    /// Registry key: the storage key followed by the indicator.
    pub fn key(storage_key: &str, kind: IndicatorType) -> String {
        format!("{storage_key}/{kind}")
    }

    pub fn kind(&self) -> IndicatorType {
        self.kind
    }

    pub fn source(&self) -> &Ref<PriceStorage> {
        &self.source
    }

    pub fn values(&self) -> Vec<Option<f64>> {
        match self.source.get() {
            Some(storage) => storage.with_values(|values| self.kind.calculate(values)),
            None => Vec::new(),
        }
    }

    /// The most recent value, if past warmup.
    pub fn last_value(&self) -> Option<f64> {
        self.values().last().copied().flatten()
    }
}
