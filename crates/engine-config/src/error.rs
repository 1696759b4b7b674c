use thiserror::Error;

/// Errors raised while loading compiler settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The settings file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The settings file is not valid JSON for `CompilerSettings`.
    #[error("Invalid settings JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// An environment override could not be parsed.
    #[error("Invalid value '{value}' for environment variable {var}")]
    InvalidEnvValue { var: String, value: String },
}
