//! Core domain: the shared-ownership model, keyed registries, and the market
//! objects built on them.

pub mod refs;
pub mod cache;
pub mod ohlcv;
pub mod storage;
pub mod indicator;
pub mod market;
pub mod config_validation;
pub mod error;
