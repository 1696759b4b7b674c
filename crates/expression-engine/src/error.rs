use std::fmt::Display;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExpressionError {
    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Evaluation of {context} failed: {source}")]
    Evaluation {
        context: String,
        #[source]
        source: Box<ExpressionError>,
    },

    #[error("Evaluation failed: {0}")]
    EvaluationFailed(String),

    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    #[error("Invalid function arguments for {function}: {message}")]
    InvalidFunctionArgs { function: String, message: String },

    #[error("Unknown postprocessor: {0}")]
    UnknownPostProcessor(String),

    #[error("Postprocessor '{name}' failed: {message}")]
    PostProcessor { name: String, message: String },

    #[error("Datasource error: {0}")]
    Datasource(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Rule parse error: {0}")]
    Parse(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ExpressionError {
    pub fn type_mismatch(expected: impl Display, actual: impl Display) -> Self {
        ExpressionError::TypeMismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        ExpressionError::UnsupportedOperation(message.into())
    }

    pub fn invalid_args(function: &str, message: impl Into<String>) -> Self {
        ExpressionError::InvalidFunctionArgs {
            function: function.to_string(),
            message: message.into(),
        }
    }

    /// Wraps the error with the name of what was being evaluated.
    pub fn in_context(self, context: impl Into<String>) -> Self {
        ExpressionError::Evaluation {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error once evaluation context has been peeled off.
    pub fn root(&self) -> &ExpressionError {
        match self {
            ExpressionError::Evaluation { source, .. } => source.root(),
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, ExpressionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_wrapping_keeps_root() {
        let err = ExpressionError::unsupported("arithmetic")
            .in_context("matches()")
            .in_context("nested query");
        assert!(matches!(
            err.root(),
            ExpressionError::UnsupportedOperation(msg) if msg == "arithmetic"
        ));
        assert_eq!(
            err.to_string(),
            "Evaluation of nested query failed: Evaluation of matches() failed: Unsupported operation: arithmetic"
        );
    }
}
