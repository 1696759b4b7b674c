use super::{Function, FunctionId, no_backend};
use crate::{
    context::QueryContext,
    error::{ExpressionError, Result},
    filter::{FilterPart, generator::Generator},
    lower::{ldap, sql},
    operand::{Classification, Operand},
};
use grammar::Backend;
use model::core::{value::Value, value_type::ValueType};
use tracing::trace;

/// `containsOneOf`, `containsNone` and `containsAll` between an attribute's
/// values and a list known by query time.
pub struct ContainsFunction;

impl Function for ContainsFunction {
    fn ids(&self) -> &'static [FunctionId] {
        &[
            FunctionId::ContainsOneOf,
            FunctionId::ContainsNone,
            FunctionId::ContainsAll,
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
        let held = operands[0]
            .evaluate(ctx, ValueType::Collection)?
            .into_collection();
        let wanted = operands[1]
            .evaluate(ctx, ValueType::Collection)?
            .into_collection();

        let result = match id {
            FunctionId::ContainsOneOf => contains_any(&held, &wanted),
            FunctionId::ContainsNone => !contains_any(&held, &wanted),
            FunctionId::ContainsAll => wanted.iter().all(|value| contains(&held, value)),
            _ => {
                return Err(ExpressionError::Internal(format!(
                    "{id} is not a containment test"
                )));
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
        let (held, wanted) = (&operands[0], &operands[1]);
        match (held.classify(ctx), wanted.classify(ctx)) {
            (_, Classification::Variable) => Err(ExpressionError::unsupported(format!(
                "the right side of {id}() must not depend on the object under test"
            ))),
            (Classification::Variable, Classification::Static) => {
                let values = wanted
                    .evaluate(ctx, ValueType::Collection)?
                    .into_collection();
                emit_with_values(id, ctx, part, held, &values)
            }
            (Classification::Variable, Classification::NonStatic) => {
                part.push_generator(ContainsGenerator {
                    id,
                    attribute: held.clone(),
                    values: wanted.clone(),
                });
                Ok(())
            }
            _ => Err(ExpressionError::unsupported(format!(
                "the left side of {id}() must be an attribute of the object under test"
            ))),
        }
    }
}

/// A null in `wanted` matches an absent (empty) attribute.
fn contains_any(held: &[Value], wanted: &[Value]) -> bool {
    wanted.iter().any(|value| contains(held, value))
}

fn contains(held: &[Value], value: &Value) -> bool {
    if value.is_null() {
        return held.iter().all(Value::is_null);
    }
    held.iter().any(|item| item.equal(value))
}

fn emit_with_values(
    id: FunctionId,
    ctx: &QueryContext<'_>,
    part: &mut FilterPart,
    attribute: &Operand,
    values: &[Value],
) -> Result<()> {
    match (ctx.backend(), id) {
        (Backend::Relational(_), FunctionId::ContainsOneOf) => {
            sql::contains_one_of(ctx, part, attribute, values)
        }
        (Backend::Relational(_), _) => Err(sql::unsupported(
            id,
            "only containsOneOf has a relational form",
        )),
        (Backend::Directory, FunctionId::ContainsOneOf | FunctionId::ContainsNone) => {
            let name = ldap::attribute_name(ctx, attribute)?;
            ldap::contains(part, &name, id == FunctionId::ContainsNone, values);
            Ok(())
        }
        (Backend::Directory, _) => Err(ExpressionError::unsupported(format!(
            "{id}() is not supported for directory filters"
        ))),
        (Backend::None, _) => Err(no_backend(id)),
    }
}

/// Containment against a list that is only known at query time.
#[derive(Debug, Clone)]
pub struct ContainsGenerator {
    id: FunctionId,
    attribute: Operand,
    values: Operand,
}

impl Generator for ContainsGenerator {
    fn generate(&self, ctx: &QueryContext<'_>, part: &mut FilterPart) -> Result<()> {
        let values = self
            .values
            .evaluate(ctx, ValueType::Collection)?
            .into_collection();
        trace!(count = values.len(), "Lowering deferred {}()", self.id);
        emit_with_values(self.id, ctx, part, &self.attribute, &values)
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        builder::{contains_all, contains_none, contains_one_of, lit, list, name, null},
        error::ExpressionError,
        resolver::MapResolver,
        testing::{emit_inline, resolve_inline_with, try_emit, with_context},
    };
    use grammar::{Backend, dialect::Postgres};
    use model::{
        core::{value::Value, value_type::ValueType},
        records::record::Record,
    };

    #[test]
    fn test_directory_contains_one_of() {
        let expr = contains_one_of(name("object.ou"), list(vec![lit("a"), lit("b")]));
        assert_eq!(emit_inline(Backend::Directory, &expr), "(|(ou=a)(ou=b))");
        let expr = contains_one_of(name("object.ou"), list(vec![lit("a")]));
        assert_eq!(emit_inline(Backend::Directory, &expr), "(ou=a)");
    }

    #[test]
    fn test_directory_contains_none() {
        let expr = contains_none(name("object.ou"), list(vec![lit("a"), lit("b")]));
        assert_eq!(emit_inline(Backend::Directory, &expr), "(&(!(ou=a))(!(ou=b)))");
    }

    #[test]
    fn test_directory_null_elements_test_presence() {
        let expr = contains_one_of(name("object.ou"), list(vec![lit("a"), null()]));
        assert_eq!(emit_inline(Backend::Directory, &expr), "(|(ou=a)(!(ou=*)))");
        let expr = contains_none(name("object.ou"), list(vec![null()]));
        assert_eq!(emit_inline(Backend::Directory, &expr), "(ou=*)");
    }

    #[test]
    fn test_empty_input() {
        let expr = contains_one_of(name("object.ou"), list(vec![]));
        assert_eq!(emit_inline(Backend::Directory, &expr), "(!(objectClass=*))");
        let expr = contains_none(name("object.ou"), list(vec![]));
        assert_eq!(emit_inline(Backend::Directory, &expr), "(objectClass=*)");
        let expr = contains_one_of(name("object.ou"), list(vec![]));
        assert_eq!(emit_inline(Backend::relational(Postgres), &expr), "1 = 0");
    }

    #[test]
    fn test_relational_contains_one_of() {
        let expr = contains_one_of(name("object.tag"), list(vec![lit("a"), null(), lit("b")]));
        assert_eq!(
            emit_inline(Backend::relational(Postgres), &expr),
            "(object.tag IN ('a', 'b') OR object.tag IS NULL)"
        );
    }

    #[test]
    fn test_relational_contains_none_is_unsupported() {
        let expr = contains_none(name("object.tag"), list(vec![lit("a")]));
        assert!(matches!(
            try_emit(Backend::relational(Postgres), &expr),
            Err(ExpressionError::UnsupportedOperation(_))
        ));
    }

    #[test]
    fn test_contains_all_is_evaluation_only() {
        let expr = contains_all(name("object.tag"), list(vec![lit("a")]));
        assert!(try_emit(Backend::Directory, &expr).is_err());
        assert!(try_emit(Backend::relational(Postgres), &expr).is_err());

        with_context(Backend::None, |ctx| {
            let expr = contains_all(list(vec![lit("a"), lit("b")]), list(vec![lit("b"), lit("a")]));
            assert_eq!(expr.evaluate(ctx, ValueType::Boolean).unwrap(), Value::Boolean(true));
            let expr = contains_all(list(vec![lit("a")]), list(vec![lit("b"), lit("a")]));
            assert_eq!(expr.evaluate(ctx, ValueType::Boolean).unwrap(), Value::Boolean(false));
        });
    }

    #[test]
    fn test_variable_right_side_is_rejected() {
        let expr = contains_one_of(lit("a"), name("object.tags"));
        assert!(matches!(
            try_emit(Backend::Directory, &expr),
            Err(ExpressionError::UnsupportedOperation(_))
        ));
    }

    #[test]
    fn test_left_side_must_be_an_attribute() {
        let known = list(vec![lit("a"), lit("b")]);
        for backend in [Backend::Directory, Backend::relational(Postgres)] {
            for held in [known.clone(), name("portal.regions")] {
                let expr = contains_one_of(held, list(vec![lit("a")]));
                assert!(matches!(
                    try_emit(backend.clone(), &expr),
                    Err(ExpressionError::UnsupportedOperation(_))
                ));
            }
        }

        // Still evaluable in-process
        with_context(Backend::None, |ctx| {
            let expr = contains_none(known, list(vec![lit("c")]));
            assert_eq!(expr.evaluate(ctx, ValueType::Boolean).unwrap(), Value::Boolean(true));
        });
    }

    #[test]
    fn test_deferred_values() {
        let expr = contains_one_of(name("object.region"), name("this.regions"));
        let resolvables = MapResolver::new().with(
            "this",
            Record::new().with("regions", vec![Value::from("eu"), Value::from("us")]),
        );
        assert_eq!(
            resolve_inline_with(Backend::Directory, &expr, resolvables),
            "(|(region=eu)(region=us))"
        );
    }

    #[test]
    fn test_evaluate_laws() {
        with_context(Backend::None, |ctx| {
            let held = list(vec![lit("a"), lit("b")]);
            for wanted in [list(vec![]), list(vec![lit("b")]), list(vec![lit("c"), null()])] {
                let one = contains_one_of(held.clone(), wanted.clone())
                    .evaluate(ctx, ValueType::Boolean)
                    .unwrap();
                let none = contains_none(held.clone(), wanted)
                    .evaluate(ctx, ValueType::Boolean)
                    .unwrap();
                assert_ne!(one, none);
            }
            let absent = contains_one_of(null(), list(vec![null()]));
            assert_eq!(absent.evaluate(ctx, ValueType::Boolean).unwrap(), Value::Boolean(true));
        });
    }
}
