use connectors::ConnectorError;
use engine_config::ConfigError;
use expression_engine::ExpressionError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Failed to read an input file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse JSON input: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Failed to serialize data to JSON: {0}")]
    JsonSerialize(serde_json::Error),

    #[error("Failed to load compiler settings: {0}")]
    Config(#[from] ConfigError),

    #[error("Expression error: {0}")]
    Expression(#[from] ExpressionError),

    #[error("Datasource error: {0}")]
    Connector(#[from] ConnectorError),

    #[error("Unknown backend '{0}', expected postgres, mysql, sqlite, oracle or ldap")]
    UnknownBackend(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
