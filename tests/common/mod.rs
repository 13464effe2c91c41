#![allow(dead_code)]

use chrono::NaiveDate;
use refcache::domain::error::RefcacheError;
pub use refcache::domain::ohlcv::OhlcvBar;
use refcache::domain::refs::{CounterSlot, Ref, RefCounted};
use refcache::ports::data_port::DataPort;
use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;

/// Managed object that records how many times it was dropped.
pub struct Tracked {
    slot: CounterSlot<Tracked>,
    pub id: u32,
    drops: Rc<Cell<usize>>,
}

impl Tracked {
    pub fn new(id: u32, drops: &Rc<Cell<usize>>) -> Self {
        Self {
            slot: CounterSlot::new(),
            id,
            drops: Rc::clone(drops),
        }
    }

    pub fn shared(id: u32, drops: &Rc<Cell<usize>>) -> Ref<Tracked> {
        Ref::new(Self::new(id, drops))
    }
}

// SAFETY: `slot` is a field of `Tracked`.
unsafe impl RefCounted for Tracked {
    fn counter_slot(&self) -> &CounterSlot<Self> {
        &self.slot
    }
}

impl Drop for Tracked {
    fn drop(&mut self) {
        self.drops.set(self.drops.get() + 1);
    }
}

pub fn drop_counter() -> Rc<Cell<usize>> {
    Rc::new(Cell::new(0))
}

pub struct MockDataPort {
    pub data: HashMap<String, Vec<OhlcvBar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, code: &str, bars: Vec<OhlcvBar>) -> Self {
        self.data.insert(code.to_string(), bars);
        self
    }

    pub fn with_error(mut self, code: &str, reason: &str) -> Self {
        self.errors.insert(code.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_ohlcv(
        &self,
        code: &str,
        exchange: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, RefcacheError> {
        if let Some(reason) = self.errors.get(code) {
            return Err(RefcacheError::Data {
                reason: reason.clone(),
            });
        }
        match self.data.get(code) {
            Some(bars) => Ok(bars
                .iter()
                .filter(|b| b.date >= start_date && b.date <= end_date)
                .cloned()
                .collect()),
            None => Err(RefcacheError::NoData {
                code: code.to_string(),
                exchange: exchange.to_string(),
            }),
        }
    }

    fn list_symbols(&self, _exchange: &str) -> Result<Vec<String>, RefcacheError> {
        let mut symbols: Vec<String> = self.data.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn generate_bars(
    code: &str,
    start_date: &str,
    count: usize,
    start_price: f64,
) -> Vec<OhlcvBar> {
    let start = NaiveDate::parse_from_str(start_date, "%Y-%m-%d").unwrap();
    (0..count)
        .map(|i| OhlcvBar {
            code: code.to_string(),
            exchange: "ASX".to_string(),
            date: start + chrono::Duration::days(i as i64),
            open: start_price + i as f64,
            high: start_price + i as f64 + 1.0,
            low: start_price + i as f64 - 1.0,
            close: start_price + i as f64,
            volume: 1000,
        })
        .collect()
}

/// Renders bars in the CSV adapter's file format.
pub fn bars_to_csv(bars: &[OhlcvBar]) -> String {
    let mut out = String::from("date,open,high,low,close,volume\n");
    for b in bars {
        out.push_str(&format!(
            "{},{},{},{},{},{}\n",
            b.date.format("%Y-%m-%d"),
            b.open,
            b.high,
            b.low,
            b.close,
            b.volume
        ));
    }
    out
}
