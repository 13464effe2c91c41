//! CLI integration tests.
//!
//! Tests cover:
//! - Scenario walk output, one line per handle step
//! - Config loading from real INI files on disk
//! - Full load pipeline over CSV files in a temp directory

mod common;

use common::*;
use refcache::adapters::csv_adapter::CsvAdapter;
use refcache::adapters::file_config_adapter::FileConfigAdapter;
use refcache::cli;
use refcache::domain::config_validation::build_load_config;
use refcache::domain::error::RefcacheError;
use refcache::domain::indicator::IndicatorType;
use std::fs;
use std::io::Write;
use tempfile::TempDir;

fn write_temp_ini(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn ini_for(dir: &TempDir, codes: &str, indicators: &str) -> String {
    format!(
        "[data]\npath = {}\n\n[load]\nexchange = ASX\ncodes = {}\nindicators = {}\n",
        dir.path().display(),
        codes,
        indicators
    )
}

mod scenario {
    use super::*;

    fn lines() -> Vec<String> {
        let mut out: Vec<u8> = Vec::new();
        cli::run_scenario(&mut out).unwrap();
        String::from_utf8(out)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn prints_seven_steps() {
        let lines = lines();
        assert_eq!(lines.len(), 7);
        for (i, line) in lines.iter().enumerate() {
            assert!(line.starts_with(&format!("{}. ", i + 1)), "{line}");
        }
    }

    #[test]
    fn counts_track_each_release() {
        let lines = lines();
        assert!(lines[0].ends_with("counter (1, 0)"));
        assert!(lines[1].ends_with("counter (2, 0)"));
        assert!(lines[2].ends_with("counter (2, 1)"));
        assert!(lines[3].ends_with("counter (1, 1) exists true"));
        assert!(lines[4].ends_with("counter (0, 1) deleted"));
        assert!(lines[5].ends_with("exists false ptr null true"));
        assert!(lines[6].ends_with("counter none live counters 0"));
    }
}

mod config_loading {
    use super::*;

    #[test]
    fn load_config_reads_file() {
        let file = write_temp_ini("[data]\npath = /srv\n[load]\nexchange = ASX\ncodes = bhp\n");
        let adapter = cli::load_config(&file.path().to_path_buf()).unwrap();
        let config = build_load_config(&adapter).unwrap();
        assert_eq!(config.codes, vec!["BHP"]);
    }

    #[test]
    fn load_config_missing_file_fails() {
        let path = std::path::PathBuf::from("/nonexistent/refcache.ini");
        let err = cli::load_config(&path).err().unwrap();
        assert!(matches!(err, RefcacheError::ConfigParse { .. }));
    }

    #[test]
    fn overrides_apply_to_file_config() {
        let dir = TempDir::new().unwrap();
        let file = write_temp_ini(&ini_for(&dir, "BHP,CBA", "SMA(5)"));
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        let mut config = build_load_config(&adapter).unwrap();

        cli::apply_overrides(&mut config, Some("wbc"), None);
        assert_eq!(config.codes, vec!["WBC"]);
        assert_eq!(config.exchange, "ASX");
        assert_eq!(config.indicators, vec![IndicatorType::Sma(5)]);
    }
}

mod csv_pipeline {
    use super::*;

    fn setup() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("BHP_ASX.csv"),
            bars_to_csv(&generate_bars("BHP", "2024-01-01", 20, 40.0)),
        )
        .unwrap();
        fs::write(
            dir.path().join("CBA_ASX.csv"),
            bars_to_csv(&generate_bars("CBA", "2024-01-01", 5, 100.0)),
        )
        .unwrap();
        dir
    }

    #[test]
    fn loads_every_file_through_shared_storages() {
        let dir = setup();
        let file = write_temp_ini(&ini_for(&dir, "BHP,CBA,BHP", "SMA(3),EMA(3)"));
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        let config = build_load_config(&adapter).unwrap();
        let port = CsvAdapter::new(config.data_path.clone());

        let mut out: Vec<u8> = Vec::new();
        let summary = cli::run_load_pipeline(&port, &config, &mut out).unwrap();
        let output = String::from_utf8(out).unwrap();

        assert_eq!(summary.storages, 2);
        assert_eq!(summary.indicators, 4);
        assert_eq!(summary.bars_added, 25);
        assert_eq!(summary.alive_after_shutdown, 0);
        assert!(output.contains("BHP/D1/close/EMA(3)"));
        assert!(output.contains("CBA/D1/close/SMA(3)"));
        assert!(output.contains("shutdown released 4 indicators, 2 storages; 0 still alive"));
    }

    #[test]
    fn missing_csv_is_skipped() {
        let dir = setup();
        let file = write_temp_ini(&ini_for(&dir, "BHP,NAB", "SMA(2)"));
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        let config = build_load_config(&adapter).unwrap();
        let port = CsvAdapter::new(config.data_path.clone());

        let summary = cli::run_load_pipeline(&port, &config, &mut std::io::sink()).unwrap();
        assert_eq!(summary.storages, 1);
        assert_eq!(summary.skipped, vec!["NAB"]);
    }

    #[test]
    fn malformed_csv_fails() {
        let dir = setup();
        fs::write(
            dir.path().join("BAD_ASX.csv"),
            "date,open,high,low,close,volume\n2024-01-01,x,1,1,1,1\n",
        )
        .unwrap();
        let file = write_temp_ini(&ini_for(&dir, "BHP,BAD", "SMA(2)"));
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        let config = build_load_config(&adapter).unwrap();
        let port = CsvAdapter::new(config.data_path.clone());

        let err = cli::run_load_pipeline(&port, &config, &mut std::io::sink()).unwrap_err();
        assert!(matches!(err, RefcacheError::Data { .. }));
    }
}
