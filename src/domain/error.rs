//! Domain error types.

/// Strategy construction failures. Each variant is a distinct configuration
/// mistake that callers can match on.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StrategyConfigError {
    #[error("allocation #{index} has no percentage")]
    NullAllocation { index: usize },

    #[error("allocation #{index} has no asset name")]
    MissingAssetName { index: usize },

    #[error("total allocation {total}% exceeds 100%")]
    AllocationExceeded { total: f64 },

    #[error("asset {0} is allocated more than once")]
    DuplicateAssetName(String),

    #[error("periodic rebalancing requires a periodicity")]
    MissingPeriodicity,
}

/// Top-level error type for tradesim.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
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

    #[error(transparent)]
    StrategyConfig(#[from] StrategyConfigError),

    #[error("quote data error: {reason}")]
    QuoteData { reason: String },

    #[error("no quotes for {name}")]
    NoData { name: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SimError {
    pub(crate) fn invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        SimError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn missing(section: &str, key: &str) -> Self {
        SimError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        }
    }
}

impl From<&SimError> for std::process::ExitCode {
    fn from(err: &SimError) -> Self {
        let code: u8 = match err {
            SimError::Io(_) => 1,
            SimError::ConfigParse { .. }
            | SimError::ConfigMissing { .. }
            | SimError::ConfigInvalid { .. } => 2,
            SimError::StrategyConfig(_) => 3,
            SimError::QuoteData { .. } | SimError::NoData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
