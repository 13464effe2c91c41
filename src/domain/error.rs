//! Domain error types.
//!
//! These cover the fallible collaborator paths (configuration, bar data,
//! indicator specs). The ownership core never returns errors: contract
//! violations there panic, and absence is reported through `Option`.

#[derive(Debug, thiserror::Error)]
pub enum RefcacheError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("no data for {code} on {exchange}")]
    NoData { code: String, exchange: String },

    #[error("unknown indicator '{spec}'")]
    UnknownIndicator { spec: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&RefcacheError> for std::process::ExitCode {
    fn from(err: &RefcacheError) -> Self {
        let code: u8 = match err {
            RefcacheError::Io(_) => 1,
            RefcacheError::ConfigParse { .. }
            | RefcacheError::ConfigMissing { .. }
            | RefcacheError::ConfigInvalid { .. } => 2,
            RefcacheError::Data { .. } => 3,
            RefcacheError::UnknownIndicator { .. } => 4,
            RefcacheError::NoData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
