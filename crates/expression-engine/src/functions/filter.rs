use super::{Function, FunctionId};
use crate::{
    context::QueryContext,
    error::{ExpressionError, Result},
    filter::{FilterPart, PostProcessorRegistration},
    operand::{Classification, Operand},
};
use model::core::{value::Value, value_type::ValueType};
use tracing::warn;

/// `filter(rule, postprocessor[, data])`: filters by `rule` and runs the named
/// postprocessor over the results.
pub struct FilterFunction;

impl Function for FilterFunction {
    fn ids(&self) -> &'static [FunctionId] {
        &[FunctionId::Filter]
    }

    fn result_type(&self, _id: FunctionId) -> ValueType {
        ValueType::Boolean
    }

    fn evaluate(
        &self,
        _id: FunctionId,
        ctx: &QueryContext<'_>,
        operands: &[Operand],
        _expected: ValueType,
    ) -> Result<Value> {
        operands[0].evaluate(ctx, ValueType::Boolean)
    }

    fn emit(
        &self,
        _id: FunctionId,
        ctx: &QueryContext<'_>,
        part: &mut FilterPart,
        operands: &[Operand],
        _expected: ValueType,
    ) -> Result<()> {
        let name = &operands[1];
        let data = operands.get(2);
        if name.is_variable(ctx) || data.is_some_and(|data| data.is_variable(ctx)) {
            return Err(ExpressionError::invalid_args(
                "filter",
                "the postprocessor name and data must not depend on the object under test",
            ));
        }

        // A literal name is checked now so typos fail at compile time
        if name.classify(ctx) == Classification::Static {
            let resolved = name.evaluate(ctx, ValueType::String)?.to_text();
            let resolved = resolved.trim();
            if resolved.is_empty() {
                warn!("filter() was given a blank postprocessor name, ignoring it");
                return operands[0].emit(ctx, part, ValueType::Boolean);
            }
            if !ctx.postprocessors().contains(resolved) {
                return Err(ExpressionError::UnknownPostProcessor(resolved.to_string()));
            }
        }

        operands[0].emit(ctx, part, ValueType::Boolean)?;
        part.attach_postprocessor(PostProcessorRegistration {
            name: name.clone(),
            data: data.cloned(),
        });
        Ok(())
    }
}
