//! Domain error types.

/// Top-level error type for valuescreen.
///
/// Only configuration and I/O problems surface through this type. Missing
/// prices, missing PE values and failed sector lookups are absorbed by the
/// engine as per-period skip decisions.
#[derive(Debug, thiserror::Error)]
pub enum ValueScreenError {
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

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ValueScreenError {
    pub(crate) fn invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        ValueScreenError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn missing(section: &str, key: &str) -> Self {
        ValueScreenError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        }
    }
}

impl From<&ValueScreenError> for std::process::ExitCode {
    fn from(err: &ValueScreenError) -> Self {
        let code: u8 = match err {
            ValueScreenError::Io(_) | ValueScreenError::Csv(_) => 1,
            ValueScreenError::ConfigParse { .. }
            | ValueScreenError::ConfigMissing { .. }
            | ValueScreenError::ConfigInvalid { .. } => 2,
            ValueScreenError::Data { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
