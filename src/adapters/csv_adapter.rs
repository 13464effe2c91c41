//! CSV file data adapter.
//!
//! One file per symbol, named `{CODE}_{EXCHANGE}.csv`, with a header row and
//! columns `date,open,high,low,close,volume`.

use crate::domain::error::RefcacheError;
use crate::domain::ohlcv::OhlcvBar;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, code: &str, exchange: &str) -> PathBuf {
        self.base_path.join(format!("{}_{}.csv", code, exchange))
    }
}

fn data_error(reason: String) -> RefcacheError {
    RefcacheError::Data { reason }
}

fn column<T>(record: &csv::StringRecord, index: usize, name: &str) -> Result<T, RefcacheError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    record
        .get(index)
        .ok_or_else(|| data_error(format!("missing {} column", name)))?
        .trim()
        .parse()
        .map_err(|e| data_error(format!("invalid {} value: {}", name, e)))
}

impl DataPort for CsvAdapter {
    fn fetch_ohlcv(
        &self,
        code: &str,
        exchange: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, RefcacheError> {
        let path = self.csv_path(code, exchange);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(RefcacheError::NoData {
                    code: code.to_string(),
                    exchange: exchange.to_string(),
                });
            }
            Err(e) => return Err(data_error(format!("failed to read {}: {}", path.display(), e))),
        };

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut bars = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(|e| data_error(format!("CSV parse error: {}", e)))?;

            let date_str = record
                .get(0)
                .ok_or_else(|| data_error("missing date column".into()))?;
            let date = NaiveDate::parse_from_str(date_str.trim(), "%Y-%m-%d")
                .map_err(|e| data_error(format!("invalid date format: {}", e)))?;

            if date < start_date || date > end_date {
                continue;
            }

            bars.push(OhlcvBar {
                code: code.to_string(),
                exchange: exchange.to_string(),
                date,
                open: column(&record, 1, "open")?,
                high: column(&record, 2, "high")?,
                low: column(&record, 3, "low")?,
                close: column(&record, 4, "close")?,
                volume: column(&record, 5, "volume")?,
            });
        }

        bars.sort_by_key(|b| b.date);
        tracing::debug!(code, exchange, bars = bars.len(), "bars read from csv");
        Ok(bars)
    }

    fn list_symbols(&self, exchange: &str) -> Result<Vec<String>, RefcacheError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| {
            data_error(format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ))
        })?;

        let suffix = format!("_{}.csv", exchange);
        let mut symbols = Vec::new();

        for entry in entries {
            let entry = entry.map_err(|e| data_error(format!("directory entry error: {}", e)))?;
            let name = entry.file_name();
            if let Some(code) = name.to_string_lossy().strip_suffix(&suffix) {
                symbols.push(code.to_string());
            }
        }

        symbols.sort();
        Ok(symbols)
    }
}
