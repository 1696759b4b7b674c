use super::{Function, FunctionId, no_backend};
use crate::{
    context::QueryContext,
    error::{ExpressionError, Result},
    filter::{FilterPart, generator::ValueGenerator},
    lower::sql,
    operand::{Classification, Operand},
};
use grammar::Backend;
use model::core::{value::Value, value_type::ValueType};

/// `concat`, `lower` and `upper`.
pub struct StringFunction;

impl Function for StringFunction {
    fn ids(&self) -> &'static [FunctionId] {
        &[FunctionId::Concat, FunctionId::Lower, FunctionId::Upper]
    }

    fn result_type(&self, _id: FunctionId) -> ValueType {
        ValueType::String
    }

    fn evaluate(
        &self,
        id: FunctionId,
        ctx: &QueryContext<'_>,
        operands: &[Operand],
        _expected: ValueType,
    ) -> Result<Value> {
        match id {
            FunctionId::Concat => {
                let mut concatenated = String::new();
                for operand in operands {
                    concatenated.push_str(&operand.evaluate(ctx, ValueType::Any)?.to_text());
                }
                Ok(Value::String(concatenated))
            }
            _ => {
                let value = operands[0].evaluate(ctx, ValueType::String)?;
                Ok(match value {
                    Value::String(s) if id == FunctionId::Lower => Value::String(s.to_lowercase()),
                    Value::String(s) => Value::String(s.to_uppercase()),
                    other => other,
                })
            }
        }
    }

    fn emit(
        &self,
        id: FunctionId,
        ctx: &QueryContext<'_>,
        part: &mut FilterPart,
        operands: &[Operand],
        expected: ValueType,
    ) -> Result<()> {
        match (ctx.backend(), id) {
            (Backend::Relational(dialect), FunctionId::Concat) => {
                sql::concat(ctx, part, dialect.as_ref(), operands)
            }
            (Backend::Relational(_), _) => {
                let name = if id == FunctionId::Lower { "LOWER" } else { "UPPER" };
                sql::function_call(ctx, part, name, &operands[0], ValueType::String)
            }
            (Backend::Directory, FunctionId::Concat) => fold_concat(ctx, part, operands, expected),
            (Backend::Directory, _) => Err(ExpressionError::unsupported(format!(
                "{id}() is not supported for directory filters"
            ))),
            (Backend::None, _) => Err(no_backend(id)),
        }
    }
}

/// Directory filters have no string functions, so a concat is only possible
/// when its value does not depend on the entry under test.
fn fold_concat(
    ctx: &QueryContext<'_>,
    part: &mut FilterPart,
    operands: &[Operand],
    expected: ValueType,
) -> Result<()> {
    let call = Operand::Call {
        function: FunctionId::Concat,
        operands: operands.to_vec(),
    };
    match call.classify(ctx) {
        Classification::Variable => Err(ExpressionError::unsupported(
            "concat() over attributes is not supported for directory filters",
        )),
        Classification::Static => {
            part.push_literal(call.evaluate(ctx, expected)?);
            Ok(())
        }
        Classification::NonStatic => {
            part.push_generator(ValueGenerator::new(call, expected));
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        builder::{call, concat, eq, lit, name},
        error::ExpressionError,
        functions::FunctionId,
        operand::Operand,
        testing::{emit_inline, emit_inline_as, try_emit, with_context},
    };
    use grammar::{
        Backend,
        dialect::{MySql, Postgres},
    };
    use model::core::{value::Value, value_type::ValueType};

    fn abc() -> Operand {
        concat(vec![lit("a"), lit("b"), lit("c")])
    }

    #[test]
    fn test_operator_style_concat() {
        assert_eq!(
            emit_inline_as(Backend::relational(Postgres), &abc(), ValueType::String),
            "('a' || 'b' || 'c')"
        );
    }

    #[test]
    fn test_function_style_concat_nests_right() {
        assert_eq!(
            emit_inline_as(Backend::relational(MySql), &abc(), ValueType::String),
            "concat('a',concat('b','c'))"
        );
        let expr = eq(
            name("object.fullname"),
            concat(vec![name("object.first"), lit(" "), name("object.last")]),
        );
        assert_eq!(
            emit_inline(Backend::relational(MySql), &expr),
            "(object.fullname = concat(COALESCE(object.first, ''),concat(' ',COALESCE(object.last, ''))))"
        );
    }

    #[test]
    fn test_operator_style_concat_reads_null_as_empty() {
        let expr = concat(vec![name("object.first"), lit("-"), crate::builder::null()]);
        assert_eq!(
            emit_inline_as(Backend::relational(Postgres), &expr, ValueType::String),
            "(COALESCE(object.first, '') || '-' || COALESCE(NULL, ''))"
        );
    }

    #[test]
    fn test_static_concat_compared_to_attribute_is_evaluated() {
        let expr = eq(name("object.fullname"), abc());
        assert_eq!(
            emit_inline(Backend::relational(Postgres), &expr),
            "(object.fullname = 'abc')"
        );
        with_context(Backend::None, |ctx| {
            assert_eq!(abc().evaluate(ctx, ValueType::String).unwrap(), Value::from("abc"));
        });
    }

    #[test]
    fn test_directory_concat_folds_static_operands() {
        let expr = eq(name("object.cn"), concat(vec![lit("a"), lit(1)]));
        assert_eq!(emit_inline(Backend::Directory, &expr), "(cn=a1)");
    }

    #[test]
    fn test_directory_concat_over_attributes_is_unsupported() {
        let expr = eq(
            name("object.cn"),
            concat(vec![name("object.given"), name("object.sn")]),
        );
        assert!(matches!(
            try_emit(Backend::Directory, &expr),
            Err(ExpressionError::UnsupportedOperation(_))
        ));
    }

    #[test]
    fn test_lower_upper() {
        let expr = eq(call(FunctionId::Lower, vec![name("object.name")]), lit("ada"));
        assert_eq!(
            emit_inline(Backend::relational(Postgres), &expr),
            "(LOWER(object.name) = 'ada')"
        );
        with_context(Backend::None, |ctx| {
            let expr = call(FunctionId::Upper, vec![lit("ada")]);
            assert_eq!(expr.evaluate(ctx, ValueType::String).unwrap(), Value::from("ADA"));
        });
    }

    #[test]
    fn test_evaluate_concat_treats_null_as_empty() {
        with_context(Backend::None, |ctx| {
            let expr = concat(vec![lit("a"), crate::builder::null(), lit(2)]);
            assert_eq!(expr.evaluate(ctx, ValueType::String).unwrap(), Value::from("a2"));
        });
    }
}
