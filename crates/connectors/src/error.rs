use expression_engine::ExpressionError;
use thiserror::Error;

/// Errors raised while talking to a concrete datasource.
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// Any SQL driver error.
    #[error("SQL error: {0}")]
    Sql(#[from] sqlx::Error),

    /// Building the runtime that drives the driver failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A directory filter that is not valid RFC 4515.
    #[error("Invalid directory filter '{filter}': {message}")]
    FilterSyntax { filter: String, message: String },

    /// A statement or record the datasource cannot store or run.
    #[error("Schema error: {0}")]
    Schema(String),
}

impl ConnectorError {
    pub fn filter_syntax(filter: &str, message: impl Into<String>) -> Self {
        ConnectorError::FilterSyntax {
            filter: filter.to_string(),
            message: message.into(),
        }
    }
}

impl From<ConnectorError> for ExpressionError {
    fn from(err: ConnectorError) -> Self {
        ExpressionError::Datasource(Box::new(err))
    }
}
