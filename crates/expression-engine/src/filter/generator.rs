use crate::{
    context::QueryContext,
    error::Result,
    filter::FilterPart,
    functions::FunctionId,
    operand::Operand,
};
use model::core::value_type::ValueType;
use std::fmt;
use tracing::trace;

/// Produces filter fragments once query-time values are known.
///
/// Generators own everything they need and may be invoked any number of
/// times, once per resolution of the filter they belong to.
pub trait Generator: fmt::Debug + Send + Sync {
    fn generate(&self, ctx: &QueryContext<'_>, part: &mut FilterPart) -> Result<()>;
}

/// Evaluates a non-static operand and writes its value as a literal.
#[derive(Debug, Clone)]
pub struct ValueGenerator {
    operand: Operand,
    expected: ValueType,
}

impl ValueGenerator {
    pub fn new(operand: Operand, expected: ValueType) -> Self {
        Self { operand, expected }
    }
}

impl Generator for ValueGenerator {
    fn generate(&self, ctx: &QueryContext<'_>, part: &mut FilterPart) -> Result<()> {
        let value = self.operand.evaluate(ctx, self.expected)?;
        trace!(operand = %self.operand, value = ?value, "Resolved deferred value");
        if self.expected == ValueType::Boolean {
            part.push_constant(value.as_bool().unwrap_or(false));
        } else {
            part.push_literal(value);
        }
        Ok(())
    }
}

/// Evaluates a boolean call that tests no attribute and writes the result as
/// a constant filter.
#[derive(Debug, Clone)]
pub struct ConstantGenerator {
    function: FunctionId,
    operands: Vec<Operand>,
}

impl ConstantGenerator {
    pub fn new(function: FunctionId, operands: Vec<Operand>) -> Self {
        Self { function, operands }
    }
}

impl Generator for ConstantGenerator {
    fn generate(&self, ctx: &QueryContext<'_>, part: &mut FilterPart) -> Result<()> {
        let value = ctx
            .registry()
            .evaluate(self.function, ctx, &self.operands, ValueType::Boolean)?;
        part.push_constant(value.as_bool().unwrap_or(false));
        Ok(())
    }
}
