//! `matches(candidates, rule)`: true when at least one candidate object
//! satisfies `rule`, with `this` bound to the candidate.
//!
//! Lowering cannot express the rule directly, so resolution runs one nested
//! query per candidate to collect the ids of the matching objects and then
//! tests the object's id against that set. This costs one round trip per
//! candidate (N+1 queries); keep candidate lists short.

use super::{Function, FunctionId, no_backend, truthy};
use crate::{
    context::QueryContext,
    error::{ExpressionError, Result},
    filter::{FilterPart, generator::Generator},
    lower::{ldap, sql},
    operand::Operand,
    resolver::ScopedResolver,
};
use grammar::Backend;
use model::core::{value::Value, value_type::ValueType};
use std::collections::HashSet;
use tracing::{debug, warn};

/// Name the candidate is bound to while the rule is evaluated.
pub const CANDIDATE_NAME: &str = "this";

pub struct MatchesFunction;

impl Function for MatchesFunction {
    fn ids(&self) -> &'static [FunctionId] {
        &[FunctionId::Matches]
    }

    fn result_type(&self, _id: FunctionId) -> ValueType {
        ValueType::Boolean
    }

    fn supports_static_evaluation(&self) -> bool {
        false
    }

    fn evaluate(
        &self,
        _id: FunctionId,
        ctx: &QueryContext<'_>,
        operands: &[Operand],
        _expected: ValueType,
    ) -> Result<Value> {
        let (candidates, rule) = (&operands[0], &operands[1]);
        for candidate in candidate_objects(ctx, candidates)? {
            let scoped = ScopedResolver::new(CANDIDATE_NAME, candidate, ctx.resolver());
            let scoped_ctx = ctx.with_resolver(&scoped);
            let matched = rule
                .evaluate(&scoped_ctx, ValueType::Boolean)
                .map_err(|e| e.in_context("matches()"))?;
            if truthy(&matched) {
                return Ok(Value::Boolean(true));
            }
        }
        Ok(Value::Boolean(false))
    }

    fn emit(
        &self,
        id: FunctionId,
        ctx: &QueryContext<'_>,
        part: &mut FilterPart,
        operands: &[Operand],
        _expected: ValueType,
    ) -> Result<()> {
        let (candidates, rule) = (&operands[0], &operands[1]);
        if candidates.is_variable(ctx) {
            return Err(ExpressionError::unsupported(
                "matches() candidates must not depend on the object under test",
            ));
        }
        if let Backend::None = ctx.backend() {
            return Err(no_backend(id));
        }
        part.push_generator(MatchesGenerator {
            candidates: candidates.clone(),
            rule: rule.clone(),
        });
        Ok(())
    }
}

/// Candidate values that are objects; anything else is skipped.
fn candidate_objects(ctx: &QueryContext<'_>, candidates: &Operand) -> Result<Vec<Value>> {
    let values = candidates
        .evaluate(ctx, ValueType::Collection)?
        .into_collection();
    Ok(values
        .into_iter()
        .filter(|value| {
            let is_object = matches!(value, Value::Object(_));
            if !is_object {
                warn!(candidate = ?value, "matches() skips a candidate that is not an object");
            }
            is_object
        })
        .collect())
}

/// Runs the nested queries at resolution time and emits the id test.
#[derive(Debug, Clone)]
pub struct MatchesGenerator {
    candidates: Operand,
    rule: Operand,
}

impl Generator for MatchesGenerator {
    fn generate(&self, ctx: &QueryContext<'_>, part: &mut FilterPart) -> Result<()> {
        let candidates = candidate_objects(ctx, &self.candidates)?;
        if candidates.is_empty() {
            debug!("matches() has no candidates");
            part.push_constant(false);
            return Ok(());
        }

        let datasource = ctx.require_datasource("matches")?;
        let id_attribute = datasource.id_attribute().to_string();
        let attributes = [id_attribute.clone()];

        let mut seen = HashSet::new();
        let mut ids = Vec::new();
        for candidate in candidates {
            let scoped = ScopedResolver::new(CANDIDATE_NAME, candidate, ctx.resolver());
            let scoped_ctx = ctx.with_resolver(&scoped);
            let results = scoped_ctx
                .nested_query(&self.rule, &attributes)
                .map_err(|e| e.in_context("matches()"))?;
            for id in results.column(&id_attribute) {
                if !id.is_null() && seen.insert(id.clone()) {
                    ids.push(id);
                }
            }
        }
        debug!(matched = ids.len(), "matches() collected ids");

        if ids.is_empty() {
            part.push_constant(false);
            return Ok(());
        }
        match ctx.backend() {
            Backend::Relational(_) => sql::id_in(ctx, part, &id_attribute, ids),
            Backend::Directory => ldap::id_in(part, &id_attribute, &ids),
            Backend::None => return Err(no_backend(FunctionId::Matches)),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        builder::{contains_one_of, eq, lit, list, matches, name},
        compiler::Compiler,
        resolver::MapResolver,
        testing::{StubDatasource, with_resolver},
    };
    use engine_config::CompilerSettings;
    use grammar::{Backend, dialect::Postgres};
    use model::{
        core::{value::Value, value_type::ValueType},
        records::record::{Record, ResultSet},
    };

    fn inline_compiler() -> Compiler {
        Compiler::with_settings(CompilerSettings {
            inline_literals: true,
            ..CompilerSettings::default()
        })
    }

    fn permissions(regions: &[&str]) -> Value {
        Value::Collection(
            regions
                .iter()
                .map(|r| Record::new().with("region", *r).into())
                .collect(),
        )
    }

    #[test]
    fn test_no_candidates_issue_no_queries() {
        let ds = StubDatasource::new(Backend::Directory);
        let mut filter = inline_compiler()
            .compile(
                matches(
                    name("portal.user.permissions"),
                    contains_one_of(name("object.region"), name("this.region")),
                ),
                Backend::Directory,
            )
            .unwrap();
        filter.set_resolvables(MapResolver::new().with(
            "portal",
            Record::new().with("user", Record::new().with("permissions", permissions(&[]))),
        ));

        let resolved = filter.resolve(Some(&ds), None).unwrap();
        assert_eq!(resolved.statement.text, "(!(objectClass=*))");
        assert_eq!(ds.executed().len(), 0);
    }

    #[test]
    fn test_one_nested_query_per_candidate() {
        let ds = StubDatasource::new(Backend::relational(Postgres))
            .returning(ResultSet::new(vec![
                Record::new().with("id", 1),
                Record::new().with("id", 2),
            ]))
            .returning(ResultSet::new(vec![
                Record::new().with("id", 2),
                Record::new().with("id", 3),
            ]));

        let mut filter = inline_compiler()
            .compile(
                matches(
                    name("portal.perms"),
                    eq(name("object.region"), name("this.region")),
                ),
                Backend::relational(Postgres),
            )
            .unwrap();
        filter.add_resolvable(
            "portal",
            Record::new().with("perms", permissions(&["eu", "us"])),
        );

        let resolved = filter.resolve(Some(&ds), None).unwrap();
        assert_eq!(resolved.statement.text, "(object.id IN (1, 2, 3))");

        let executed = ds.executed();
        assert_eq!(executed.len(), 2);
        assert_eq!(executed[0].text, "(object.region = 'eu')");
        assert_eq!(executed[1].text, "(object.region = 'us')");
    }

    #[test]
    fn test_non_object_candidates_are_skipped() {
        let resolver = MapResolver::new()
            .with("object", Record::new().with("region", "eu"))
            .with("portal", Record::new().with(
                "perms",
                vec![Value::from("junk"), Record::new().with("region", "eu").into()],
            ));
        with_resolver(Backend::None, &resolver, |ctx| {
            let expr = matches(
                name("portal.perms"),
                eq(name("object.region"), name("this.region")),
            );
            assert_eq!(
                expr.evaluate(ctx, ValueType::Boolean).unwrap(),
                Value::Boolean(true)
            );

            let expr = matches(list(vec![lit(1), lit(2)]), eq(lit(1), lit(1)));
            assert_eq!(
                expr.evaluate(ctx, ValueType::Boolean).unwrap(),
                Value::Boolean(false)
            );
        });
    }
}
