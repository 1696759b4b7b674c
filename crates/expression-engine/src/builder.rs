//! Shorthand constructors for expression trees in tests. Enabled for other
//! crates by the `test-support` feature.

use crate::{
    functions::FunctionId,
    operand::Operand,
};
use model::core::{value::Value, value_type::ValueType};

pub fn lit(value: impl Into<Value>) -> Operand {
    Operand::Literal(value.into())
}

pub fn null() -> Operand {
    Operand::Literal(Value::Null)
}

/// A name with no declared type.
///
/// # Panics
/// On a malformed path; use [`Operand::parse_name`] for untrusted input.
pub fn name(path: &str) -> Operand {
    typed_name(path, ValueType::Any)
}

pub fn typed_name(path: &str, value_type: ValueType) -> Operand {
    Operand::parse_name(path, value_type).unwrap_or_else(|e| panic!("{e}"))
}

pub fn list(items: Vec<Operand>) -> Operand {
    Operand::List(items)
}

pub fn call(function: FunctionId, operands: Vec<Operand>) -> Operand {
    Operand::Call { function, operands }
}

pub fn eq(lhs: Operand, rhs: Operand) -> Operand {
    call(FunctionId::Eq, vec![lhs, rhs])
}

pub fn ne(lhs: Operand, rhs: Operand) -> Operand {
    call(FunctionId::Ne, vec![lhs, rhs])
}

pub fn lt(lhs: Operand, rhs: Operand) -> Operand {
    call(FunctionId::Lt, vec![lhs, rhs])
}

pub fn le(lhs: Operand, rhs: Operand) -> Operand {
    call(FunctionId::Le, vec![lhs, rhs])
}

pub fn gt(lhs: Operand, rhs: Operand) -> Operand {
    call(FunctionId::Gt, vec![lhs, rhs])
}

pub fn ge(lhs: Operand, rhs: Operand) -> Operand {
    call(FunctionId::Ge, vec![lhs, rhs])
}

pub fn and(lhs: Operand, rhs: Operand) -> Operand {
    call(FunctionId::And, vec![lhs, rhs])
}

pub fn or(lhs: Operand, rhs: Operand) -> Operand {
    call(FunctionId::Or, vec![lhs, rhs])
}

pub fn not(operand: Operand) -> Operand {
    call(FunctionId::Not, vec![operand])
}

pub fn concat(operands: Vec<Operand>) -> Operand {
    call(FunctionId::Concat, operands)
}

pub fn like(lhs: Operand, pattern: Operand) -> Operand {
    call(FunctionId::Like, vec![lhs, pattern])
}

pub fn is_empty(operand: Operand) -> Operand {
    call(FunctionId::IsEmpty, vec![operand])
}

pub fn contains_one_of(lhs: Operand, rhs: Operand) -> Operand {
    call(FunctionId::ContainsOneOf, vec![lhs, rhs])
}

pub fn contains_none(lhs: Operand, rhs: Operand) -> Operand {
    call(FunctionId::ContainsNone, vec![lhs, rhs])
}

pub fn contains_all(lhs: Operand, rhs: Operand) -> Operand {
    call(FunctionId::ContainsAll, vec![lhs, rhs])
}

pub fn matches(candidates: Operand, rule: Operand) -> Operand {
    call(FunctionId::Matches, vec![candidates, rule])
}

pub fn subrule(attribute: &str, rule: &str) -> Operand {
    call(FunctionId::Subrule, vec![lit(attribute), lit(rule)])
}

pub fn filter(rule: Operand, postprocessor: &str, data: Option<Operand>) -> Operand {
    let mut operands = vec![rule, lit(postprocessor)];
    operands.extend(data);
    call(FunctionId::Filter, operands)
}
