//! `subrule(attribute, rule)`: runs `rule` as a separate query on the same
//! datasource and yields the values of `attribute` across its results. In the
//! rule text, `subobject` addresses the objects of the nested query.

use super::{Function, FunctionId};
use crate::{
    context::QueryContext,
    error::{ExpressionError, Result},
    filter::{FilterPart, generator::Generator},
    operand::Operand,
};
use model::core::{value::Value, value_type::ValueType};
use std::collections::HashSet;
use tracing::debug;

pub const SUBRULE_OBJECT: &str = "subobject";

pub struct SubruleFunction;

impl SubruleFunction {
    fn check_operands(ctx: &QueryContext<'_>, operands: &[Operand]) -> Result<()> {
        if operands.iter().any(|operand| operand.is_variable(ctx)) {
            return Err(ExpressionError::invalid_args(
                "subrule",
                "the attribute and the rule must not depend on the object under test",
            ));
        }
        Ok(())
    }
}

impl Function for SubruleFunction {
    fn ids(&self) -> &'static [FunctionId] {
        &[FunctionId::Subrule]
    }

    fn result_type(&self, _id: FunctionId) -> ValueType {
        ValueType::Any
    }

    fn supports_static_evaluation(&self) -> bool {
        false
    }

    fn evaluate(
        &self,
        _id: FunctionId,
        ctx: &QueryContext<'_>,
        operands: &[Operand],
        expected: ValueType,
    ) -> Result<Value> {
        Self::check_operands(ctx, operands)?;
        run_subrule(ctx, &operands[0], &operands[1], expected)
    }

    fn emit(
        &self,
        _id: FunctionId,
        ctx: &QueryContext<'_>,
        part: &mut FilterPart,
        operands: &[Operand],
        expected: ValueType,
    ) -> Result<()> {
        Self::check_operands(ctx, operands)?;
        part.push_generator(SubruleGenerator {
            attribute: operands[0].clone(),
            rule: operands[1].clone(),
            expected,
        });
        Ok(())
    }
}

fn run_subrule(
    ctx: &QueryContext<'_>,
    attribute: &Operand,
    rule: &Operand,
    expected: ValueType,
) -> Result<Value> {
    let datasource = ctx.require_datasource("subrule")?;
    let attribute = attribute.evaluate(ctx, ValueType::String)?.to_text();
    let text = rule
        .evaluate(ctx, ValueType::String)?
        .to_text()
        .replace(SUBRULE_OBJECT, ctx.object_prefix());

    let rule = datasource
        .parse_rule(&text)
        .map_err(|e| e.in_context("subrule()"))?;
    let results = ctx
        .nested_query(&rule, std::slice::from_ref(&attribute))
        .map_err(|e| e.in_context("subrule()"))?;

    let mut seen = HashSet::new();
    let values = results
        .column(&attribute)
        .into_iter()
        .filter(|value| !value.is_null() && seen.insert(value.clone()))
        .collect::<Vec<_>>();
    debug!(%attribute, count = values.len(), "subrule() collected values");

    Ok(match expected {
        ValueType::Any | ValueType::Collection => Value::Collection(values),
        _ => values.into_iter().next().unwrap_or(Value::Null),
    })
}

/// Splices the subrule's result in as a literal at resolution time.
#[derive(Debug, Clone)]
pub struct SubruleGenerator {
    attribute: Operand,
    rule: Operand,
    expected: ValueType,
}

impl Generator for SubruleGenerator {
    fn generate(&self, ctx: &QueryContext<'_>, part: &mut FilterPart) -> Result<()> {
        let value = run_subrule(ctx, &self.attribute, &self.rule, self.expected)?;
        if self.expected == ValueType::Boolean {
            part.push_constant(value.as_bool().unwrap_or(false));
        } else {
            part.push_literal(value);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        builder::{call, contains_one_of, eq, lit, name, subrule},
        compiler::Compiler,
        error::ExpressionError,
        functions::FunctionId,
        testing::{StubDatasource, try_emit},
    };
    use engine_config::CompilerSettings;
    use grammar::{Backend, dialect::Postgres};
    use model::records::record::{Record, ResultSet};

    #[test]
    fn test_subrule_values_are_spliced_in() {
        let rule = serde_json::to_string(&eq(name("subobject.kind"), lit("team"))).unwrap();
        let ds = StubDatasource::new(Backend::relational(Postgres)).returning(ResultSet::new(vec![
            Record::new().with("name", "red"),
            Record::new().with("name", "blue"),
            Record::new().with("name", "red"),
        ]));

        let compiler = Compiler::with_settings(CompilerSettings {
            inline_literals: true,
            ..CompilerSettings::default()
        });
        let filter = compiler
            .compile(
                contains_one_of(name("object.team"), subrule("name", &rule)),
                Backend::relational(Postgres),
            )
            .unwrap();

        let resolved = filter.resolve(Some(&ds), None).unwrap();
        assert_eq!(resolved.statement.text, "(object.team IN ('red', 'blue'))");
        let executed = ds.executed();
        assert_eq!(executed.len(), 1);
        assert_eq!(executed[0].text, "(object.kind = 'team')");
        assert_eq!(ds.requested_attributes(), vec![vec!["name".to_string()]]);
    }

    #[test]
    fn test_subrule_requires_a_datasource() {
        let filter = Compiler::new()
            .compile(
                contains_one_of(name("object.team"), subrule("name", "{}")),
                Backend::Directory,
            )
            .unwrap();
        let err = filter.resolve(None, None).unwrap_err();
        assert!(matches!(err.root(), ExpressionError::EvaluationFailed(_)));
    }

    #[test]
    fn test_variable_operands_are_rejected() {
        let expr = eq(
            name("object.team"),
            call(FunctionId::Subrule, vec![name("object.attr"), lit("{}")]),
        );
        assert!(matches!(
            try_emit(Backend::relational(Postgres), &expr),
            Err(ExpressionError::InvalidFunctionArgs { .. })
        ));
    }
}
