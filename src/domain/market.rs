//! Explicitly owned context bundling the price-storage and indicator registries.

use crate::domain::cache::{Objects, ObjectsCache};
use crate::domain::indicator::{Indicator, IndicatorType};
use crate::domain::ohlcv::{AppliedPrice, OhlcvBar, Timeframe};
use crate::domain::refs::{live_counters, Ref, WeakRef};
use crate::domain::storage::PriceStorage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub storages: usize,
    pub indicators: usize,
    /// Reference counters alive on the calling thread, whichever cache or
    /// handle owns them.
    pub thread_live_counters: usize,
}

/// One storage per (symbol, timeframe, applied price) and one indicator per
/// (storage, indicator type), shared by every caller holding this context.
pub struct MarketCache {
    indicators: ObjectsCache<Indicator>,
    storages: Objects<PriceStorage>,
}

impl MarketCache {
    pub fn new() -> Self {
        Self {
            indicators: ObjectsCache::new(),
            storages: Objects::new(),
        }
    }

    /// The shared storage for a series, created empty on first request.
    pub fn storage(
        &mut self,
        symbol: &str,
        timeframe: Timeframe,
        applied_price: AppliedPrice,
    ) -> Ref<PriceStorage> {
        let key = PriceStorage::key(symbol, timeframe, applied_price);
        self.storages.get_or_insert_with(&key, || {
            PriceStorage::new(symbol, timeframe, applied_price)
        })
    }

    /// Feeds `bars` into the shared storage for their series and returns it
    /// with the number of new values.
    pub fn load(
        &mut self,
        symbol: &str,
        timeframe: Timeframe,
        applied_price: AppliedPrice,
        bars: &[OhlcvBar],
    ) -> (Ref<PriceStorage>, usize) {
        let storage = self.storage(symbol, timeframe, applied_price);
        let added = storage.get().map_or(0, |s| s.feed(bars));
        (storage, added)
    }

    /// The shared indicator over a series, created on first request.
    pub fn indicator(
        &mut self,
        symbol: &str,
        timeframe: Timeframe,
        applied_price: AppliedPrice,
        kind: IndicatorType,
    ) -> &Indicator {
        let storage_key = PriceStorage::key(symbol, timeframe, applied_price);
        let key = Indicator::key(&storage_key, kind);
        let storages = &mut self.storages;
        self.indicators.get_or_insert_with(&key, || {
            let storage = storages.get_or_insert_with(&storage_key, || {
                PriceStorage::new(symbol, timeframe, applied_price)
            });
            Indicator::new(kind, storage)
        })
    }

    pub fn try_storage(&self, key: &str) -> Option<Ref<PriceStorage>> {
        self.storages.try_get(key)
    }

    pub fn try_indicator(&self, key: &str) -> Option<&Indicator> {
        self.indicators.try_get(key)
    }

    /// A weak observer of the storage under `key`; unbound on a miss.
    pub fn observe(&self, key: &str) -> WeakRef<PriceStorage> {
        self.storages
            .try_get(key)
            .map(|storage| storage.downgrade())
            .unwrap_or_default()
    }

    pub fn storage_keys(&self) -> Vec<&str> {
        self.storages.keys()
    }

    pub fn indicator_keys(&self) -> Vec<&str> {
        self.indicators.keys()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            storages: self.storages.len(),
            indicators: self.indicators.len(),
            thread_live_counters: live_counters(),
        }
    }

    /// Releases indicators first, then the registry's storage handles.
    /// Returns (indicators, storages) released.
    pub fn shutdown(&mut self) -> (usize, usize) {
        let indicators = self.indicators.shutdown();
        let storages = self.storages.shutdown();
        (indicators, storages)
    }
}

impl Default for MarketCache {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for MarketCache {
    fn drop(&mut self) {
        self.shutdown();
    }
}
