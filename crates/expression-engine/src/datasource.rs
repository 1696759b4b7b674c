use crate::{
    error::{ExpressionError, Result},
    operand::Operand,
};
use chrono::{DateTime, Utc};
use grammar::{Backend, Statement};
use model::records::record::ResultSet;

/// A queryable store that filters can be run against.
pub trait Datasource {
    fn backend(&self) -> Backend;

    /// Attribute that identifies an object, used by `matches()`.
    fn id_attribute(&self) -> &str {
        "id"
    }

    /// Parses rule text, as handed to `subrule()`, into an expression.
    fn parse_rule(&self, rule: &str) -> Result<Operand> {
        JsonRuleParser.parse(rule)
    }

    /// Runs a resolved filter and returns `attributes` of the matching
    /// objects, as of `version` when given.
    fn execute(
        &self,
        statement: &Statement,
        attributes: &[String],
        version: Option<DateTime<Utc>>,
    ) -> Result<ResultSet>;
}

pub trait RuleParser {
    fn parse(&self, rule: &str) -> Result<Operand>;
}

/// Rules written as the JSON form of an expression tree.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRuleParser;

impl RuleParser for JsonRuleParser {
    fn parse(&self, rule: &str) -> Result<Operand> {
        serde_json::from_str(rule).map_err(|e| ExpressionError::Parse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{eq, lit, name};

    #[test]
    fn test_json_rule_parser() {
        let rule = r#"{"call": {"function": "eq", "operands": [
            {"name": {"path": "object.kind"}},
            {"literal": "team"}
        ]}}"#;
        assert_eq!(
            JsonRuleParser.parse(rule).unwrap(),
            eq(name("object.kind"), lit("team"))
        );
        assert!(matches!(
            JsonRuleParser.parse("kind == team"),
            Err(ExpressionError::Parse(_))
        ));
    }
}
