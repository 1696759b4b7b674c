use serde::{Deserialize, Serialize};
use std::fmt;

/// Type tag requested from, or declared by, an operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    Boolean,
    Number,
    String,
    /// A LIKE pattern, `%` and `_` are wildcards.
    WildcardString,
    Collection,
    Binary,
    #[default]
    Any,
}

impl ValueType {
    /// Whether a value declared as `other` may be handed to a consumer expecting `self`.
    pub fn accepts(self, other: ValueType) -> bool {
        use ValueType::*;
        match (self, other) {
            (Any, _) | (_, Any) => true,
            (String, WildcardString) | (WildcardString, String) => true,
            (a, b) => a == b,
        }
    }

    pub fn is_textual(self) -> bool {
        matches!(self, ValueType::String | ValueType::WildcardString)
    }

    pub fn name(self) -> &'static str {
        match self {
            ValueType::Boolean => "boolean",
            ValueType::Number => "number",
            ValueType::String => "string",
            ValueType::WildcardString => "wildcard string",
            ValueType::Collection => "collection",
            ValueType::Binary => "binary",
            ValueType::Any => "any",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
