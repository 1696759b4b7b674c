use super::{Function, FunctionId, fold_boolean, no_backend};
use crate::{
    context::QueryContext,
    error::Result,
    filter::FilterPart,
    lower::{ldap, sql},
    operand::Operand,
};
use grammar::Backend;
use model::core::{value::Value, value_type::ValueType};

/// `isEmpty(x)`: null, the empty string, or an empty collection.
pub struct IsEmptyFunction;

impl Function for IsEmptyFunction {
    fn ids(&self) -> &'static [FunctionId] {
        &[FunctionId::IsEmpty]
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
        let empty = match operands[0].evaluate(ctx, ValueType::Any)? {
            Value::Null => true,
            Value::String(s) => s.is_empty(),
            Value::Bytes(b) => b.is_empty(),
            Value::Collection(items) => items.is_empty(),
            _ => false,
        };
        Ok(Value::Boolean(empty))
    }

    fn emit(
        &self,
        id: FunctionId,
        ctx: &QueryContext<'_>,
        part: &mut FilterPart,
        operands: &[Operand],
        _expected: ValueType,
    ) -> Result<()> {
        let operand = &operands[0];
        if !operand.is_variable(ctx) {
            return fold_boolean(id, ctx, part, operands);
        }
        match ctx.backend() {
            Backend::Relational(_) => sql::is_empty(ctx, part, operand),
            Backend::Directory => ldap::is_empty(ctx, part, operand),
            Backend::None => Err(no_backend(id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        builder::{is_empty, lit, list, name, typed_name},
        testing::{emit_inline, with_context},
    };
    use grammar::{Backend, dialect::Postgres};
    use model::core::{value::Value, value_type::ValueType};

    #[test]
    fn test_sql_is_empty() {
        assert_eq!(
            emit_inline(Backend::relational(Postgres), &is_empty(name("object.name"))),
            "(('' IS NOT NULL AND object.name = '') OR object.name IS NULL)"
        );
        assert_eq!(
            emit_inline(
                Backend::relational(Postgres),
                &is_empty(typed_name("object.avatar", ValueType::Binary))
            ),
            "(object.avatar IS NULL)"
        );
    }

    #[test]
    fn test_directory_is_empty() {
        assert_eq!(
            emit_inline(Backend::Directory, &is_empty(name("object.mail"))),
            "(!(mail=*))"
        );
    }

    #[test]
    fn test_static_is_empty_folds() {
        assert_eq!(emit_inline(Backend::Directory, &is_empty(lit(""))), "(objectClass=*)");
        assert_eq!(
            emit_inline(Backend::relational(Postgres), &is_empty(list(vec![lit(1)]))),
            "1 = 0"
        );
    }

    #[test]
    fn test_evaluate() {
        with_context(Backend::None, |ctx| {
            for (operand, expected) in [
                (lit(""), true),
                (crate::builder::null(), true),
                (list(vec![]), true),
                (lit(" "), false),
                (lit(0), false),
            ] {
                assert_eq!(
                    is_empty(operand).evaluate(ctx, ValueType::Boolean).unwrap(),
                    Value::Boolean(expected)
                );
            }
        });
    }
}
