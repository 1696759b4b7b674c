use super::{Function, FunctionId, fold_boolean, no_backend};
use crate::{
    context::QueryContext,
    error::{ExpressionError, Result},
    eval::binary::{BinaryOp, BinaryOpEvaluator},
    filter::{FilterPart, generator::Generator},
    lower::{ldap, sql},
    operand::{Classification, Operand},
};
use grammar::Backend;
use model::core::{value::Value, value_type::ValueType};
use tracing::trace;

/// `==`, `!=`, `<`, `<=`, `>`, `>=`.
pub struct ComparisonFunction;

impl Function for ComparisonFunction {
    fn ids(&self) -> &'static [FunctionId] {
        &[
            FunctionId::Eq,
            FunctionId::Ne,
            FunctionId::Lt,
            FunctionId::Le,
            FunctionId::Gt,
            FunctionId::Ge,
        ]
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
        let op = operator(id)?;
        let left = operands[0].evaluate(ctx, ValueType::Any)?;
        let right = operands[1].evaluate(ctx, ValueType::Any)?;
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
        let op = operator(id)?;
        let (lhs, rhs) = (&operands[0], &operands[1]);

        match (lhs.classify(ctx), rhs.classify(ctx)) {
            (Classification::Variable, Classification::Variable) => match ctx.backend() {
                Backend::Relational(_) => {
                    sql::binary(ctx, part, lhs, op.sql_token(), rhs, ValueType::Any)
                }
                Backend::Directory => Err(ExpressionError::unsupported(
                    "directory filters cannot compare two attributes",
                )),
                Backend::None => Err(no_backend(id)),
            },
            (Classification::Variable, _) => emit_against_value(ctx, part, op, lhs, rhs, true),
            (_, Classification::Variable) => {
                emit_against_value(ctx, part, op.flip(), rhs, lhs, false)
            }
            _ => fold_boolean(id, ctx, part, operands),
        }
    }
}

fn operator(id: FunctionId) -> Result<BinaryOp> {
    BinaryOp::from_function(id)
        .ok_or_else(|| ExpressionError::Internal(format!("{id} is not a comparison")))
}

/// Lowers `variable OP other` where `other` tests no attribute. `op` is
/// already oriented with the attribute on the left; `written_left` tells
/// whether the expression was written that way.
fn emit_against_value(
    ctx: &QueryContext<'_>,
    part: &mut FilterPart,
    op: BinaryOp,
    variable: &Operand,
    other: &Operand,
    written_left: bool,
) -> Result<()> {
    match ctx.backend() {
        Backend::Relational(_) if !op.is_equality() => {
            match other.classify(ctx) {
                Classification::Static => {
                    if let Value::Collection(items) = other.evaluate(ctx, ValueType::Any)? {
                        return sql::order_against_any(ctx, part, op, variable, &items);
                    }
                }
                // May only turn out to be a list once resolved
                _ => {
                    part.push_generator(ComparisonGenerator {
                        op,
                        variable: variable.clone(),
                        value: other.clone(),
                    });
                    return Ok(());
                }
            }
            // SQL three-valued logic already treats NULL as unknown here
            let (lhs, rhs, op) = if written_left {
                (variable, other, op)
            } else {
                (other, variable, op.flip())
            };
            sql::binary(ctx, part, lhs, op.sql_token(), rhs, ValueType::Any)
        }
        Backend::Relational(_) | Backend::Directory => match other.classify(ctx) {
            Classification::Static => {
                let value = other.evaluate(ctx, ValueType::Any)?;
                emit_with_value(ctx, part, op, variable, &value)
            }
            _ => {
                part.push_generator(ComparisonGenerator {
                    op,
                    variable: variable.clone(),
                    value: other.clone(),
                });
                Ok(())
            }
        },
        Backend::None => Err(ExpressionError::unsupported(
            "comparisons cannot be lowered without a backend",
        )),
    }
}

fn emit_with_value(
    ctx: &QueryContext<'_>,
    part: &mut FilterPart,
    op: BinaryOp,
    variable: &Operand,
    value: &Value,
) -> Result<()> {
    match ctx.backend() {
        Backend::Relational(_) => sql::compare_with_value(ctx, part, op, variable, value),
        Backend::Directory => ldap::compare_with_value(ctx, part, op, variable, value),
        Backend::None => Err(ExpressionError::unsupported(
            "comparisons cannot be lowered without a backend",
        )),
    }
}

/// Compares an attribute with a value only known at query time. The shape of
/// the filter depends on the value, e.g. `IS NULL` for a null.
#[derive(Debug, Clone)]
pub struct ComparisonGenerator {
    op: BinaryOp,
    variable: Operand,
    value: Operand,
}

impl Generator for ComparisonGenerator {
    fn generate(&self, ctx: &QueryContext<'_>, part: &mut FilterPart) -> Result<()> {
        let value = self.value.evaluate(ctx, ValueType::Any)?;
        trace!(value = ?value, "Lowering deferred comparison against {}", self.variable);
        emit_with_value(ctx, part, self.op, &self.variable, &value)
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        builder::{eq, ge, gt, le, list, lit, lt, name, ne, null},
        compiler::Compiler,
        error::ExpressionError,
        resolver::MapResolver,
        testing::{emit_inline, emit_inline_with, try_emit},
    };
    use engine_config::CompilerSettings;
    use grammar::{Backend, dialect::Postgres};
    use model::{core::value::Value, records::record::Record};

    fn pg() -> Backend {
        Backend::relational(Postgres)
    }

    #[test]
    fn test_sql_null_comparisons() {
        assert_eq!(
            emit_inline(pg(), &eq(name("object.x"), null())),
            "(object.x IS NULL)"
        );
        assert_eq!(
            emit_inline(pg(), &ne(name("object.x"), null())),
            "(object.x IS NOT NULL)"
        );
        assert_eq!(
            emit_inline(pg(), &eq(null(), name("object.x"))),
            "(object.x IS NULL)"
        );
    }

    #[test]
    fn test_sql_not_equal_includes_null_rows() {
        assert_eq!(
            emit_inline(pg(), &ne(name("object.status"), lit("active"))),
            "(object.status <> 'active' OR object.status IS NULL)"
        );
    }

    #[test]
    fn test_sql_empty_string_handling() {
        let compat = Compiler::with_settings(CompilerSettings {
            empty_string_is_null: true,
            ..CompilerSettings::default()
        });
        assert_eq!(
            emit_inline_with(&compat, pg(), &eq(name("object.x"), lit(""))),
            "(object.x = '' OR object.x IS NULL)"
        );
        assert_eq!(
            emit_inline(pg(), &eq(name("object.x"), lit(""))),
            "(object.x = '')"
        );
        assert_eq!(
            emit_inline(pg(), &ne(name("object.x"), lit(""))),
            "(object.x <> '' OR object.x IS NULL OR ('' IS NULL AND object.x IS NOT NULL))"
        );
    }

    #[test]
    fn test_sql_relational_is_verbatim() {
        assert_eq!(
            emit_inline(pg(), &gt(name("object.age"), lit(30))),
            "(object.age > 30)"
        );
        assert_eq!(
            emit_inline(pg(), &le(lit(30), name("object.age"))),
            "(30 <= object.age)"
        );
        assert_eq!(
            emit_inline(pg(), &lt(name("object.a"), name("object.b"))),
            "(object.a < object.b)"
        );
    }

    #[test]
    fn test_sql_ordering_against_a_list_holds_for_any_element() {
        assert_eq!(
            emit_inline(pg(), &lt(name("object.age"), list(vec![lit(1), null(), lit(2)]))),
            "(object.age < 1 OR object.age < 2)"
        );
        assert_eq!(
            emit_inline(pg(), &le(list(vec![lit(30)]), name("object.age"))),
            "(object.age >= 30)"
        );
        assert_eq!(emit_inline(pg(), &gt(name("object.age"), list(vec![]))), "1 = 0");

        let compiler = Compiler::with_settings(CompilerSettings {
            inline_literals: true,
            ..CompilerSettings::default()
        });
        let mut filter = compiler
            .compile(ge(name("object.age"), name("portal.limits")), pg())
            .unwrap();
        filter.add_resolvable("portal", Record::new().with("limits", vec![Value::from(18), Value::from(21)]));
        let resolved = filter.resolve(None, None).unwrap();
        assert_eq!(resolved.statement.text, "(object.age >= 18 OR object.age >= 21)");

        filter.add_resolvable("portal", Record::new().with("limits", 18));
        let resolved = filter.resolve(None, None).unwrap();
        assert_eq!(resolved.statement.text, "(object.age >= 18)");
    }

    #[test]
    fn test_ldap_rewrite_table() {
        let cases = [
            (eq(name("object.age"), lit(30)), "(age=30)"),
            (ne(name("object.age"), lit(30)), "(!(age=30))"),
            (lt(name("object.age"), lit(30)), "(!(age>=30))"),
            (gt(name("object.age"), lit(30)), "(!(age<=30))"),
            (le(name("object.age"), lit(30)), "(age<=30)"),
            (ge(name("object.age"), lit(30)), "(age>=30)"),
            // attribute on the right flips the operator
            (lt(lit(30), name("object.age")), "(!(age<=30))"),
            (ge(lit(30), name("object.age")), "(age<=30)"),
        ];
        for (expr, expected) in cases {
            assert_eq!(emit_inline(Backend::Directory, &expr), expected, "{expr}");
        }
    }

    #[test]
    fn test_ldap_null_comparisons() {
        assert_eq!(
            emit_inline(Backend::Directory, &eq(name("object.mail"), null())),
            "(!(mail=*))"
        );
        assert_eq!(
            emit_inline(Backend::Directory, &ne(name("object.mail"), null())),
            "(mail=*)"
        );
    }

    #[test]
    fn test_ldap_rejects_attribute_pairs() {
        let result = try_emit(
            Backend::Directory,
            &eq(name("object.a"), name("object.b")),
        );
        assert!(matches!(result, Err(ExpressionError::UnsupportedOperation(_))));
    }

    #[test]
    fn test_static_comparison_folds() {
        assert_eq!(emit_inline(pg(), &eq(lit(1), lit(1))), "1 = 1");
        assert_eq!(
            emit_inline(Backend::Directory, &gt(lit(1), lit(2))),
            "(!(objectClass=*))"
        );
    }

    #[test]
    fn test_non_static_value_is_lowered_per_resolution() {
        let compiler = Compiler::with_settings(CompilerSettings {
            inline_literals: true,
            ..CompilerSettings::default()
        });
        let mut filter = compiler
            .compile(eq(name("object.owner"), name("portal.user.id")), pg())
            .unwrap();

        let resolved = filter.resolve(None, None).unwrap();
        assert_eq!(resolved.statement.text, "(object.owner IS NULL)");

        filter.set_resolvables(
            MapResolver::new().with("portal", Record::new().with("user", Record::new().with("id", 7))),
        );
        let resolved = filter.resolve(None, None).unwrap();
        assert_eq!(resolved.statement.text, "(object.owner = 7)");
    }
}
