use super::{Function, FunctionId, no_backend};
use crate::{
    context::QueryContext,
    error::{ExpressionError, Result},
    eval::binary::{BinaryOp, BinaryOpEvaluator},
    filter::FilterPart,
    lower::{ldap, sql},
    operand::Operand,
};
use grammar::Backend;
use model::core::{value::Value, value_type::ValueType};

/// `+`, `-`, `*`, `/`, `%` over numbers.
pub struct ArithmeticFunction;

impl ArithmeticFunction {
    fn operator(id: FunctionId) -> Result<BinaryOp> {
        BinaryOp::from_function(id)
            .filter(|op| op.is_arithmetic())
            .ok_or_else(|| ExpressionError::Internal(format!("{id} is not arithmetic")))
    }
}

impl Function for ArithmeticFunction {
    fn ids(&self) -> &'static [FunctionId] {
        &[
            FunctionId::Add,
            FunctionId::Sub,
            FunctionId::Mul,
            FunctionId::Div,
            FunctionId::Mod,
        ]
    }

    fn result_type(&self, _id: FunctionId) -> ValueType {
        ValueType::Number
    }

    fn evaluate(
        &self,
        id: FunctionId,
        ctx: &QueryContext<'_>,
        operands: &[Operand],
        _expected: ValueType,
    ) -> Result<Value> {
        let op = Self::operator(id)?;
        let left = operands[0].evaluate(ctx, ValueType::Number)?;
        let right = operands[1].evaluate(ctx, ValueType::Number)?;
        BinaryOpEvaluator::new(&left, &right, op).evaluate()
    }

    fn emit(
        &self,
        id: FunctionId,
        ctx: &QueryContext<'_>,
        part: &mut FilterPart,
        operands: &[Operand],
        _expected: ValueType,
    ) -> Result<()> {
        let op = Self::operator(id)?;
        for operand in operands {
            let declared = operand.value_type(ctx);
            if !ValueType::Number.accepts(declared) {
                return Err(ExpressionError::type_mismatch(ValueType::Number, declared));
            }
        }

        match ctx.backend() {
            Backend::Relational(_) => sql::binary(
                ctx,
                part,
                &operands[0],
                op.sql_token(),
                &operands[1],
                ValueType::Number,
            ),
            Backend::Directory => ldap::arithmetic(id),
            Backend::None => Err(no_backend(id)),
        }
    }
}
