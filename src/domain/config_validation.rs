//! Load configuration: validation and construction from a [`ConfigPort`].
//!
//! ```ini
//! [data]
//! path = ./data
//!
//! [load]
//! exchange = ASX
//! codes = BHP,CBA
//! start_date = 2024-01-01
//! end_date = 2024-12-31
//! timeframe = D1
//! applied_price = close
//! indicators = SMA(20),EMA(10)
//! ```

use std::path::PathBuf;

use chrono::NaiveDate;

use crate::domain::error::RefcacheError;
use crate::domain::indicator::{parse_indicator_list, IndicatorType};
use crate::domain::ohlcv::{AppliedPrice, Timeframe};
use crate::ports::config_port::ConfigPort;

#[derive(Debug, Clone, PartialEq)]
pub struct LoadConfig {
    pub data_path: PathBuf,
    pub exchange: String,
    pub codes: Vec<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Series label in the storage key; bar spacing comes from the data source.
    pub timeframe: Timeframe,
    pub applied_price: AppliedPrice,
    pub indicators: Vec<IndicatorType>,
}

pub fn validate_load_config(config: &dyn ConfigPort) -> Result<(), RefcacheError> {
    build_load_config(config).map(|_| ())
}

pub fn build_load_config(config: &dyn ConfigPort) -> Result<LoadConfig, RefcacheError> {
    let data_path = required(config, "data", "path")?;
    let exchange = required(config, "load", "exchange")?;
    let codes = parse_codes(&required(config, "load", "codes")?)?;
    let (start_date, end_date) = parse_dates(config)?;

    let timeframe: Timeframe = match config.get_string("load", "timeframe") {
        Some(s) => s.parse().map_err(|reason| invalid("timeframe", reason))?,
        None => Timeframe::D1,
    };
    let applied_price: AppliedPrice = match config.get_string("load", "applied_price") {
        Some(s) => s.parse().map_err(|reason| invalid("applied_price", reason))?,
        None => AppliedPrice::Close,
    };
    let indicators = match config.get_string("load", "indicators") {
        Some(s) => parse_indicator_list(&s)?,
        None => Vec::new(),
    };

    Ok(LoadConfig {
        data_path: PathBuf::from(data_path),
        exchange,
        codes,
        start_date,
        end_date,
        timeframe,
        applied_price,
        indicators,
    })
}

fn required(config: &dyn ConfigPort, section: &str, key: &str) -> Result<String, RefcacheError> {
    match config.get_string(section, key) {
        Some(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        _ => Err(RefcacheError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        }),
    }
}

fn invalid(key: &str, reason: String) -> RefcacheError {
    RefcacheError::ConfigInvalid {
        section: "load".to_string(),
        key: key.to_string(),
        reason,
    }
}

/// Upper-cases and trims each code. Repeats are kept: they resolve to the
/// same cached storage.
fn parse_codes(input: &str) -> Result<Vec<String>, RefcacheError> {
    input
        .split(',')
        .map(|token| {
            let code = token.trim();
            if code.is_empty() {
                Err(invalid("codes", "empty token in code list".to_string()))
            } else {
                Ok(code.to_uppercase())
            }
        })
        .collect()
}

fn parse_dates(config: &dyn ConfigPort) -> Result<(NaiveDate, NaiveDate), RefcacheError> {
    let start_date = parse_date(config.get_string("load", "start_date"), "start_date")?
        .unwrap_or(NaiveDate::MIN);
    let end_date =
        parse_date(config.get_string("load", "end_date"), "end_date")?.unwrap_or(NaiveDate::MAX);

    if start_date > end_date {
        return Err(invalid(
            "start_date",
            "start_date must not be after end_date".to_string(),
        ));
    }
    Ok((start_date, end_date))
}

fn parse_date(value: Option<String>, field: &str) -> Result<Option<NaiveDate>, RefcacheError> {
    value
        .map(|s| {
            NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| {
                invalid(field, format!("invalid {} format, expected YYYY-MM-DD", field))
            })
        })
        .transpose()
}
