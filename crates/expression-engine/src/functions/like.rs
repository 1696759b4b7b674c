use super::{Function, FunctionId, fold_boolean, no_backend};
use crate::{
    context::QueryContext,
    error::{ExpressionError, Result},
    eval::wildcard::like_matches,
    filter::{FilterPart, generator::Generator},
    lower::{ldap, sql},
    operand::{Classification, Operand},
};
use grammar::Backend;
use model::core::{value::Value, value_type::ValueType};

/// `lhs LIKE pattern` with `%` and `_` wildcards.
pub struct LikeFunction;

impl Function for LikeFunction {
    fn ids(&self) -> &'static [FunctionId] {
        &[FunctionId::Like]
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
        let text = operands[0].evaluate(ctx, ValueType::String)?;
        let pattern = operands[1].evaluate(ctx, ValueType::WildcardString)?;
        let matched = match (text, pattern) {
            (Value::String(text), Value::String(pattern)) => like_matches(&text, &pattern),
            _ => false,
        };
        Ok(Value::Boolean(matched))
    }

    fn emit(
        &self,
        id: FunctionId,
        ctx: &QueryContext<'_>,
        part: &mut FilterPart,
        operands: &[Operand],
        _expected: ValueType,
    ) -> Result<()> {
        let (lhs, pattern) = (&operands[0], &operands[1]);
        let (lc, pc) = (lhs.classify(ctx), pattern.classify(ctx));
        if lc != Classification::Variable && pc != Classification::Variable {
            return fold_boolean(id, ctx, part, operands);
        }

        match ctx.backend() {
            Backend::Relational(_) => {
                sql::binary(ctx, part, lhs, "LIKE", pattern, ValueType::WildcardString)
            }
            Backend::Directory => match (lc, pc) {
                (Classification::Variable, Classification::Static) => {
                    let value = pattern.evaluate(ctx, ValueType::WildcardString)?;
                    ldap::like(ctx, part, lhs, &value)
                }
                (Classification::Variable, Classification::NonStatic) => {
                    part.push_generator(PatternGenerator {
                        variable: lhs.clone(),
                        pattern: pattern.clone(),
                    });
                    Ok(())
                }
                _ => Err(ExpressionError::unsupported(
                    "directory LIKE needs an attribute on the left and a pattern on the right",
                )),
            },
            Backend::None => Err(no_backend(id)),
        }
    }
}

/// A directory substring assertion whose pattern is known at query time.
#[derive(Debug, Clone)]
struct PatternGenerator {
    variable: Operand,
    pattern: Operand,
}

impl Generator for PatternGenerator {
    fn generate(&self, ctx: &QueryContext<'_>, part: &mut FilterPart) -> Result<()> {
        let value = self.pattern.evaluate(ctx, ValueType::WildcardString)?;
        ldap::like(ctx, part, &self.variable, &value)
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        builder::{like, lit, name},
        error::ExpressionError,
        resolver::MapResolver,
        testing::{emit_inline, try_emit, with_context, with_resolver},
    };
    use grammar::{Backend, dialect::Postgres};
    use model::{
        core::{value::Value, value_type::ValueType},
        records::record::Record,
    };

    #[test]
    fn test_sql_like() {
        assert_eq!(
            emit_inline(Backend::relational(Postgres), &like(name("object.name"), lit("Ad%"))),
            "(object.name LIKE 'Ad%')"
        );
    }

    #[test]
    fn test_directory_like_becomes_substring_assertion() {
        assert_eq!(
            emit_inline(Backend::Directory, &like(name("object.cn"), lit("Ad%a*"))),
            r"(cn=Ad*a\2a)"
        );
        assert_eq!(
            emit_inline(Backend::Directory, &like(name("object.cn"), lit("%"))),
            "(cn=*)"
        );
    }

    #[test]
    fn test_directory_single_char_wildcard_is_unsupported() {
        assert!(matches!(
            try_emit(Backend::Directory, &like(name("object.cn"), lit("A_a"))),
            Err(ExpressionError::UnsupportedOperation(_))
        ));
    }

    #[test]
    fn test_evaluate_like() {
        let resolver = MapResolver::new().with("object", Record::new().with("name", "Ada"));
        with_resolver(Backend::None, &resolver, |ctx| {
            let expr = like(name("object.name"), lit("A_a"));
            assert_eq!(expr.evaluate(ctx, ValueType::Boolean).unwrap(), Value::Boolean(true));
            let expr = like(name("object.missing"), lit("%"));
            assert_eq!(expr.evaluate(ctx, ValueType::Boolean).unwrap(), Value::Boolean(false));
        });
        with_context(Backend::None, |ctx| {
            let expr = like(lit("abc"), lit("%c"));
            assert_eq!(expr.evaluate(ctx, ValueType::Boolean).unwrap(), Value::Boolean(true));
        });
    }
}
