//! Per symbol/timeframe/applied-price value storage.
//!
//! One `PriceStorage` exists per key in a [`MarketCache`](crate::domain::market::MarketCache);
//! indicators over the same series share it through [`Ref`](crate::domain::refs::Ref).

use std::cell::RefCell;

use chrono::NaiveDate;

use crate::domain::ohlcv::{AppliedPrice, OhlcvBar, Timeframe};
use crate::domain::refs::{CounterSlot, RefCounted};

#[derive(Debug)]
pub struct PriceStorage {
    slot: CounterSlot<PriceStorage>,
    symbol: String,
    timeframe: Timeframe,
    applied_price: AppliedPrice,
    series: RefCell<Series>,
}

#[derive(Debug, Default)]
struct Series {
    dates: Vec<NaiveDate>,
    values: Vec<f64>,
}

impl PriceStorage {
    pub fn new(symbol: &str, timeframe: Timeframe, applied_price: AppliedPrice) -> Self {
        Self {
            slot: CounterSlot::new(),
            symbol: symbol.to_string(),
            timeframe,
            applied_price,
            series: RefCell::new(Series::default()),
        }
    }

    /// Registry key for a series: `SYMBOL/TIMEFRAME/applied`.
    pub fn key(symbol: &str, timeframe: Timeframe, applied_price: AppliedPrice) -> String {
        format!("{symbol}/{timeframe}/{applied_price}")
    }

    pub fn cache_key(&self) -> String {
        Self::key(&self.symbol, self.timeframe, self.applied_price)
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    pub fn applied_price(&self) -> AppliedPrice {
        self.applied_price
    }

    /// Appends the applied price of every bar dated after the last stored one
    /// and returns how many were added. Bars are expected in date order.
    pub fn feed(&self, bars: &[OhlcvBar]) -> usize {
        let mut series = self.series.borrow_mut();
        let mut added = 0;
        for bar in bars {
            if series.dates.last().is_some_and(|last| bar.date <= *last) {
                continue;
            }
            series.dates.push(bar.date);
            series.values.push(self.applied_price.of(bar));
            added += 1;
        }
        added
    }

    pub fn len(&self) -> usize {
        self.series.borrow().values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn last(&self) -> Option<(NaiveDate, f64)> {
        let series = self.series.borrow();
        Some((*series.dates.last()?, *series.values.last()?))
    }

    pub fn values(&self) -> Vec<f64> {
        self.series.borrow().values.clone()
    }

    /// Runs `f` over the stored values without copying them.
    pub fn with_values<R>(&self, f: impl FnOnce(&[f64]) -> R) -> R {
        f(&self.series.borrow().values)
    }
}

// SAFETY: `slot` is a field of `PriceStorage`.
unsafe impl RefCounted for PriceStorage {
    fn counter_slot(&self) -> &CounterSlot<Self> {
        &self.slot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::refs::Ref;

    fn bar(date: &str, close: f64) -> OhlcvBar {
        OhlcvBar {
            code: "BHP".into(),
            exchange: "ASX".into(),
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            open: close - 1.0,
            high: close + 2.0,
            low: close - 2.0,
            close,
            volume: 1000,
        }
    }

    #[test]
    fn key_joins_components() {
        assert_eq!(
            PriceStorage::key("BHP", Timeframe::D1, AppliedPrice::Close),
            "BHP/D1/close"
        );
        let storage = PriceStorage::new("EURUSD", Timeframe::H1, AppliedPrice::Typical);
        assert_eq!(storage.cache_key(), "EURUSD/H1/typical");
    }

    #[test]
    fn feed_applies_price() {
        let storage = PriceStorage::new("BHP", Timeframe::D1, AppliedPrice::Open);
        let added = storage.feed(&[bar("2024-01-02", 10.0), bar("2024-01-03", 11.0)]);
        assert_eq!(added, 2);
        assert_eq!(storage.values(), vec![9.0, 10.0]);
    }

    #[test]
    fn feed_skips_bars_already_stored() {
        let storage = PriceStorage::new("BHP", Timeframe::D1, AppliedPrice::Close);
        storage.feed(&[bar("2024-01-02", 10.0), bar("2024-01-03", 11.0)]);
        let added = storage.feed(&[bar("2024-01-03", 11.0), bar("2024-01-04", 12.0)]);
        assert_eq!(added, 1);
        assert_eq!(storage.len(), 3);
        assert_eq!(
            storage.last(),
            Some((NaiveDate::from_ymd_opt(2024, 1, 4).unwrap(), 12.0))
        );
    }

    #[test]
    fn empty_storage_has_no_last() {
        let storage = PriceStorage::new("BHP", Timeframe::D1, AppliedPrice::Close);
        assert!(storage.is_empty());
        assert!(storage.last().is_none());
    }

    #[test]
    fn shared_storage_sees_updates_from_any_holder() {
        let a = Ref::new(PriceStorage::new("BHP", Timeframe::D1, AppliedPrice::Close));
        let b = a.clone();
        a.get().unwrap().feed(&[bar("2024-01-02", 10.0)]);
        assert_eq!(b.get().unwrap().len(), 1);
        assert_eq!(b.get().unwrap().with_values(|v| v.iter().sum::<f64>()), 10.0);
    }
}
