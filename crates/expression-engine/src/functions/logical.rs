use super::{Function, FunctionId, fold_boolean, no_backend, truthy};
use crate::{
    context::QueryContext, error::Result, filter::FilterPart, lower::{ldap, sql},
    operand::Operand,
};
use grammar::Backend;
use model::core::{value::Value, value_type::ValueType};

/// `and`, `or` and `not`.
pub struct LogicalFunction;

impl Function for LogicalFunction {
    fn ids(&self) -> &'static [FunctionId] {
        &[FunctionId::And, FunctionId::Or, FunctionId::Not]
    }

    fn result_type(&self, _id: FunctionId) -> ValueType {
        ValueType::Boolean
    }

    fn evaluate(
        &self,
        id: FunctionId,
        ctx: &QueryContext<'_>,
        operands: &[Operand],
        _expected: ValueType,
    ) -> Result<Value> {
        let result = match id {
            FunctionId::Not => !truthy(&operands[0].evaluate(ctx, ValueType::Boolean)?),
            FunctionId::And => {
                let mut all = true;
                for operand in operands {
                    if !truthy(&operand.evaluate(ctx, ValueType::Boolean)?) {
                        all = false;
                        break;
                    }
                }
                all
            }
            _ => {
                let mut any = false;
                for operand in operands {
                    if truthy(&operand.evaluate(ctx, ValueType::Boolean)?) {
                        any = true;
                        break;
                    }
                }
                any
            }
        };
        Ok(Value::Boolean(result))
    }

    fn emit(
        &self,
        id: FunctionId,
        ctx: &QueryContext<'_>,
        part: &mut FilterPart,
        operands: &[Operand],
        _expected: ValueType,
    ) -> Result<()> {
        if !operands.iter().any(|operand| operand.is_variable(ctx)) {
            return fold_boolean(id, ctx, part, operands);
        }
        match ctx.backend() {
            Backend::Relational(_) => sql::logical(ctx, part, id, operands),
            Backend::Directory => ldap::logical(ctx, part, id, operands),
            Backend::None => Err(no_backend(id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        builder::{and, eq, lit, name, not, or},
        testing::{emit_inline, with_context},
    };
    use grammar::{Backend, dialect::Postgres};
    use model::core::{value::Value, value_type::ValueType};

    #[test]
    fn test_sql_logical() {
        let expr = and(
            eq(name("object.a"), lit(1)),
            not(or(eq(name("object.b"), lit(2)), eq(name("object.c"), lit(3)))),
        );
        assert_eq!(
            emit_inline(Backend::relational(Postgres), &expr),
            "((object.a = 1) AND (NOT ((object.b = 2) OR (object.c = 3))))"
        );
    }

    #[test]
    fn test_ldap_logical() {
        let expr = and(
            eq(name("object.a"), lit(1)),
            not(eq(name("object.b"), lit("x"))),
        );
        assert_eq!(emit_inline(Backend::Directory, &expr), "(&(a=1)(!(b=x)))");
    }

    #[test]
    fn test_static_logical_folds_to_constant() {
        let expr = and(lit(true), or(lit(false), lit(true)));
        assert_eq!(emit_inline(Backend::Directory, &expr), "(objectClass=*)");
        assert_eq!(emit_inline(Backend::relational(Postgres), &not(lit(true))), "1 = 0");
    }

    #[test]
    fn test_evaluate_short_circuits() {
        with_context(Backend::None, |ctx| {
            // the right side would fail to coerce if evaluated
            let expr = and(lit(false), lit("not a boolean"));
            assert_eq!(
                expr.evaluate(ctx, ValueType::Boolean).unwrap(),
                Value::Boolean(false)
            );
        });
    }
}
