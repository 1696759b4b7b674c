pub mod arithmetic;
pub mod comparison;
pub mod contains;
pub mod empty;
pub mod filter;
pub mod like;
pub mod logical;
pub mod matches;
pub mod registry;
pub mod string;
pub mod subrule;

use crate::{
    context::QueryContext,
    error::{ExpressionError, Result},
    filter::{FilterPart, generator::ConstantGenerator},
    operand::{Classification, Operand},
};
use grammar::BackendSet;
use model::core::{value::Value, value_type::ValueType};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Every function the expression language knows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FunctionId {
    And,
    Or,
    Not,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Like,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Concat,
    Lower,
    Upper,
    IsEmpty,
    ContainsOneOf,
    ContainsNone,
    ContainsAll,
    Matches,
    Subrule,
    Filter,
}

impl FunctionId {
    pub const ALL: [FunctionId; 25] = [
        FunctionId::And,
        FunctionId::Or,
        FunctionId::Not,
        FunctionId::Eq,
        FunctionId::Ne,
        FunctionId::Lt,
        FunctionId::Le,
        FunctionId::Gt,
        FunctionId::Ge,
        FunctionId::Like,
        FunctionId::Add,
        FunctionId::Sub,
        FunctionId::Mul,
        FunctionId::Div,
        FunctionId::Mod,
        FunctionId::Concat,
        FunctionId::Lower,
        FunctionId::Upper,
        FunctionId::IsEmpty,
        FunctionId::ContainsOneOf,
        FunctionId::ContainsNone,
        FunctionId::ContainsAll,
        FunctionId::Matches,
        FunctionId::Subrule,
        FunctionId::Filter,
    ];

    pub fn name(self) -> &'static str {
        match self {
            FunctionId::And => "and",
            FunctionId::Or => "or",
            FunctionId::Not => "not",
            FunctionId::Eq => "==",
            FunctionId::Ne => "!=",
            FunctionId::Lt => "<",
            FunctionId::Le => "<=",
            FunctionId::Gt => ">",
            FunctionId::Ge => ">=",
            FunctionId::Like => "like",
            FunctionId::Add => "+",
            FunctionId::Sub => "-",
            FunctionId::Mul => "*",
            FunctionId::Div => "/",
            FunctionId::Mod => "%",
            FunctionId::Concat => "concat",
            FunctionId::Lower => "lower",
            FunctionId::Upper => "upper",
            FunctionId::IsEmpty => "isempty",
            FunctionId::ContainsOneOf => "containsoneof",
            FunctionId::ContainsNone => "containsnone",
            FunctionId::ContainsAll => "containsall",
            FunctionId::Matches => "matches",
            FunctionId::Subrule => "subrule",
            FunctionId::Filter => "filter",
        }
    }

    /// Case-insensitive lookup by name; `=` and `<>` are accepted aliases.
    pub fn from_name(name: &str) -> Option<FunctionId> {
        let name = name.trim().to_lowercase();
        match name.as_str() {
            "=" => Some(FunctionId::Eq),
            "<>" => Some(FunctionId::Ne),
            _ => FunctionId::ALL.into_iter().find(|id| id.name() == name),
        }
    }

    pub fn arity(self) -> Arity {
        use FunctionId::*;
        match self {
            Not | Lower | Upper | IsEmpty => Arity::exactly(1),
            And | Or | Eq | Ne | Lt | Le | Gt | Ge | Like | Add | Sub | Mul | Div | Mod
            | ContainsOneOf | ContainsNone | ContainsAll | Matches | Subrule => Arity::exactly(2),
            Concat => Arity::at_least(2),
            Filter => Arity::between(2, 3),
        }
    }

    /// Backends a call can be lowered for. An empty set means evaluation only.
    pub fn supported_backends(self) -> BackendSet {
        use FunctionId::*;
        match self {
            And | Or | Not | Eq | Ne | Lt | Le | Gt | Ge | Like | Concat | IsEmpty
            | ContainsOneOf | Matches | Subrule | Filter => BackendSet::all(),
            Add | Sub | Mul | Div | Mod | Lower | Upper => BackendSet::RELATIONAL,
            ContainsNone => BackendSet::DIRECTORY,
            ContainsAll => BackendSet::empty(),
        }
    }
}

impl fmt::Display for FunctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Number of operands a function takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arity {
    pub min: usize,
    pub max: Option<usize>,
}

impl Arity {
    pub const fn exactly(n: usize) -> Self {
        Self { min: n, max: Some(n) }
    }

    pub const fn at_least(n: usize) -> Self {
        Self { min: n, max: None }
    }

    pub const fn between(min: usize, max: usize) -> Self {
        Self { min, max: Some(max) }
    }

    pub fn accepts(self, count: usize) -> bool {
        count >= self.min && self.max.is_none_or(|max| count <= max)
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max {
            Some(max) if max == self.min => write!(f, "{max}"),
            Some(max) => write!(f, "{} to {max}", self.min),
            None => write!(f, "at least {}", self.min),
        }
    }
}

/// Handler for one or more functions.
///
/// `evaluate` computes the result in-process. `emit` appends filter text for
/// the context's backend; handlers match on the backend exhaustively and
/// reject unsupported combinations with `UnsupportedOperation`.
pub trait Function: Send + Sync {
    fn ids(&self) -> &'static [FunctionId];

    fn result_type(&self, id: FunctionId) -> ValueType;

    /// `false` when evaluating needs query-time inputs even for literal
    /// operands; such calls are never folded at compile time.
    fn supports_static_evaluation(&self) -> bool {
        true
    }

    fn arity(&self, id: FunctionId) -> Arity {
        id.arity()
    }

    fn backends(&self, id: FunctionId) -> BackendSet {
        id.supported_backends()
    }

    fn evaluate(
        &self,
        id: FunctionId,
        ctx: &QueryContext<'_>,
        operands: &[Operand],
        expected: ValueType,
    ) -> Result<Value>;

    fn emit(
        &self,
        id: FunctionId,
        ctx: &QueryContext<'_>,
        part: &mut FilterPart,
        operands: &[Operand],
        expected: ValueType,
    ) -> Result<()>;
}

/// Combined classification of a call's operands.
pub(crate) fn classify_operands(ctx: &QueryContext<'_>, operands: &[Operand]) -> Classification {
    operands
        .iter()
        .map(|operand| operand.classify(ctx))
        .fold(Classification::Static, Classification::combine)
}

/// Emits a boolean call that tests no attribute: evaluated now when static,
/// otherwise deferred to query time.
pub(crate) fn fold_boolean(
    id: FunctionId,
    ctx: &QueryContext<'_>,
    part: &mut FilterPart,
    operands: &[Operand],
) -> Result<()> {
    match classify_operands(ctx, operands) {
        Classification::Static => {
            let value = ctx
                .registry()
                .evaluate(id, ctx, operands, ValueType::Boolean)?;
            part.push_constant(value.as_bool().unwrap_or(false));
        }
        Classification::NonStatic => {
            part.push_generator(ConstantGenerator::new(id, operands.to_vec()));
        }
        Classification::Variable => {
            return Err(ExpressionError::Internal(format!(
                "{id}() tests an attribute and cannot be folded"
            )));
        }
    }
    Ok(())
}

pub(crate) fn no_backend(id: FunctionId) -> ExpressionError {
    ExpressionError::unsupported(format!("{id}() cannot be lowered without a backend"))
}

/// Truth value of an evaluated condition; `Null` is false.
pub(crate) fn truthy(value: &Value) -> bool {
    value.as_bool().unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use grammar::BackendKind;

    #[test]
    fn test_names_round_trip() {
        for id in FunctionId::ALL {
            assert_eq!(FunctionId::from_name(id.name()), Some(id));
        }
        assert_eq!(FunctionId::from_name("ContainsOneOf"), Some(FunctionId::ContainsOneOf));
        assert_eq!(FunctionId::from_name("<>"), Some(FunctionId::Ne));
        assert_eq!(FunctionId::from_name("nope"), None);
    }

    #[test]
    fn test_backend_table() {
        assert!(FunctionId::Add.supported_backends().supports(BackendKind::Relational));
        assert!(!FunctionId::Add.supported_backends().supports(BackendKind::Directory));
        assert!(!FunctionId::ContainsNone.supported_backends().supports(BackendKind::Relational));
        assert!(FunctionId::ContainsNone.supported_backends().supports(BackendKind::Directory));
        assert!(FunctionId::ContainsAll.supported_backends().is_empty());
    }

    #[test]
    fn test_arity() {
        assert!(FunctionId::Concat.arity().accepts(5));
        assert!(!FunctionId::Concat.arity().accepts(1));
        assert!(FunctionId::Filter.arity().accepts(3));
        assert!(!FunctionId::Filter.arity().accepts(4));
        assert_eq!(FunctionId::Filter.arity().to_string(), "2 to 3");
    }
}
